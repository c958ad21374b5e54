//! # Event handlers and the subscription runner.
//!
//! This module provides the [`Handle`] capability and the loop that drives it
//! ([`EventManager::run_subscription`](crate::EventManager::run_subscription)).
//!
//! ## Architecture
//! ```text
//! TreeService ── publish(UpdateTree) ──► EventManager ──► [chan UpdateTree#0]
//!                                                               │
//!                                                       runner loop (one task)
//!                                                               │
//!                                              TreeClusterHandler::handle_event()
//! ```
//!
//! ## Handler types
//! - **Domain reactions** - small adapters over a service (see [`crate::domain`])
//! - **Passive observers** - logging, metrics ([`LogWriter`] with `logging`)

mod handler;
mod runner;

#[cfg(feature = "logging")]
mod log;

pub use handler::Handle;

#[cfg(feature = "logging")]
pub use log::LogWriter;
