//! # Event handler capability.
//!
//! Provides [`Handle`] the narrow interface a domain reaction implements to be
//! driven by a subscription runner.
//!
//! ## Architecture
//! ```text
//! EventManager ──► [chan kind#id] ──► runner loop ──► handler.handle_event()
//!                                              └─► Err / panic → logged, next event
//! ```
//!
//! ## Rules
//! - One handler listens to exactly one kind ([`Handle::event_kind`]).
//! - Events are handled sequentially (FIFO) per handler.
//! - A failing or panicking handler does not stop its runner and never reaches
//!   the publisher.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use greenbus::{Context, Event, Handle, HandlerError};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Kind { Ping }
//! struct Ping;
//! impl Event for Ping {
//!     type Kind = Kind;
//!     fn kind(&self) -> Kind { Kind::Ping }
//! }
//!
//! struct Pong;
//!
//! #[async_trait]
//! impl Handle<Ping> for Pong {
//!     fn event_kind(&self) -> Kind { Kind::Ping }
//!
//!     async fn handle_event(&self, _ctx: &Context, _event: &Ping) -> Result<(), HandlerError> {
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str { "pong" }
//! }
//! ```

use async_trait::async_trait;

use crate::context::Context;
use crate::error::HandlerError;
use crate::events::Event;

/// Reaction to one kind of event.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Return errors instead of panicking; they are logged per event.
/// - Watch `ctx` in long operations: it is cancelled on shutdown.
#[async_trait]
pub trait Handle<E: Event>: Send + Sync + 'static {
    /// Kind this handler subscribes to.
    fn event_kind(&self) -> E::Kind;

    /// Processes a single event.
    ///
    /// Called from the runner's task, never in the publisher's context.
    async fn handle_event(&self, ctx: &Context, event: &E) -> Result<(), HandlerError>;

    /// Name used in logs and shutdown reports.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose; override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
