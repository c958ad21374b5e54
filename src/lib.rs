//! # greenbus
//!
//! **Greenbus** is the in-process event distribution core of a green-space
//! management backend.
//!
//! It provides a typed publish/subscribe bus that decouples domain services:
//! a state change in one aggregate (a tree is updated) triggers reactions in
//! others (its cluster's watering status is recomputed) without synchronous
//! call chains between services.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ TreeService  │   │SensorService │   │ WateringPlan │
//!   │              │   │              │   │   Service    │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          │ publish(ctx, ev) │                  │
//!          ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  EventManager                                             │
//! │  - Intake Queue (bounded mpsc, Config::queue_capacity)    │
//! │  - Registry (kind → ordered {id → subscriber channel})    │
//! │  - Dispatcher (run: FIFO fan-out, one event at a time)    │
//! └──────┬──────────────────┬──────────────────┬──────────────┘
//!        ▼                  ▼                  ▼
//!   [chan kind#0]      [chan kind#1]      [chan kind#N]
//!        ▼                  ▼                  ▼
//!   runner loop        runner loop        runner loop
//!        ▼                  ▼                  ▼
//!   handle_event()     handle_event()     handle_event()
//! ```
//!
//! ### Lifecycle
//! ```text
//! Supervisor::run(ctx)
//!   ├─► subscribe every handler (eager, so nothing published later is missed)
//!   ├─► spawn dispatcher: manager.run(runtime_ctx)
//!   ├─► spawn one runner per handler
//!   ├─► wait: ctx done | OS signal | all tasks exited
//!   └─► cancel runtime_ctx, join tasks within Config::grace
//!         └─ stuck tasks ─► abort, RuntimeError::GraceExceeded
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                     |
//! |-------------------|----------------------------------------------------------|----------------------------------------|
//! | **Events**        | Publish, subscribe, unsubscribe, dispatch.               | [`Event`], [`EventManager`], [`Subscription`] |
//! | **Handlers**      | Bind a reaction to a subscription.                       | [`Handle`]                             |
//! | **Supervision**   | Dispatcher and runners with graceful shutdown.           | [`Supervisor`]                         |
//! | **Cancellation**  | Deadline/cancel scopes for blocking calls.               | [`Context`]                            |
//! | **Errors**        | Typed errors for bus, handlers and runtime.              | [`EventError`], [`HandlerError`], [`RuntimeError`] |
//! | **Configuration** | Queue sizes, delivery timeout, shutdown grace.           | [`Config`]                             |
//! | **Domain**        | Trees, clusters, sensors, watering plans.                | [`domain::Services`]                   |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] handler _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use greenbus::{Context, EventManager};
//! use greenbus::domain::{DomainEvent, EventKind};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = Arc::new(EventManager::<DomainEvent>::new(EventKind::ALL));
//!     let mut sub = manager.subscribe(EventKind::NewSensorData)?;
//!
//!     let ctx = Context::background().with_cancel();
//!     let dispatcher = {
//!         let (manager, ctx) = (Arc::clone(&manager), ctx.clone());
//!         tokio::spawn(async move { manager.run(&ctx).await })
//!     };
//!
//!     let reading = greenbus::domain::SensorData {
//!         sensor_id: "sensor-1".into(),
//!         battery: 3.4,
//!         humidity: 50.0,
//!         temperature: 12.0,
//!         watermarks: vec![],
//!         received_at: chrono::Utc::now(),
//!     };
//!     manager.publish(&ctx, DomainEvent::NewSensorData { new: reading }).await?;
//!
//!     let got = sub.recv().await.expect("delivered");
//!     assert!(matches!(*got, DomainEvent::NewSensorData { .. }));
//!
//!     manager.unsubscribe(sub.kind(), sub.id())?;
//!     ctx.cancel();
//!     dispatcher.await?;
//!     Ok(())
//! }
//! ```
mod config;
mod context;
mod core;
mod error;
mod events;
mod handlers;

pub mod domain;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_QUEUE_CAPACITY};
pub use context::Context;
pub use crate::core::{Supervisor, SupervisorBuilder};
pub use error::{ContextError, EventError, HandlerError, RuntimeError};
pub use events::{DispatchStats, Event, EventManager, Subscription, SubscriptionId};
pub use handlers::Handle;

// Optional: expose a simple built-in logger handler (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use handlers::LogWriter;
