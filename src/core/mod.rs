//! Runtime core: supervised dispatch and graceful shutdown.
//!
//! The only public API from this module is [`Supervisor`] (and its builder),
//! which keeps the dispatcher and every subscription runner alive for the
//! process lifetime.
//!
//! Internal modules:
//! - [`supervisor`]: spawns dispatcher and runners, drives shutdown with grace;
//! - [`builder`]: assembles a supervisor from config, manager and handlers;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod shutdown;
mod supervisor;

pub use builder::SupervisorBuilder;
pub use supervisor::Supervisor;
