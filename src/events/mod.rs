//! Event distribution core: event capability, subscriptions and the manager.
//!
//! ## Contents
//! - [`Event`] the capability every published value implements
//! - [`Subscription`], [`SubscriptionId`] the receiving end of one registration
//! - [`EventManager`] Intake Queue + Subscription Registry + Dispatcher
//! - [`DispatchStats`] dispatcher counters
//!
//! ## Quick reference
//! - **Publishers**: domain services after committing a change (`publish`).
//! - **Consumers**: subscription runners (see [`crate::handlers`]) or direct
//!   readers of a [`Subscription`].
//! - **Dispatcher**: exactly one task running [`EventManager::run`], usually
//!   owned by the [`Supervisor`](crate::Supervisor).

mod event;
mod manager;
mod registry;
mod subscription;

pub use event::Event;
pub use manager::{DispatchStats, EventManager};
pub use subscription::{Subscription, SubscriptionId};
