//! # LogWriter: simple event logger
//!
//! A minimal handler that writes every event of one kind to `tracing` at
//! `INFO`. Use it for tests or demos.
//!
//! ## Example output
//! ```text
//! INFO greenbus::handlers::log: event received kind=UpdateTree event=UpdateTree { .. }
//! ```

use std::fmt::Debug;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::handler::Handle;
use crate::context::Context;
use crate::error::HandlerError;
use crate::events::Event;

/// Event logging handler.
pub struct LogWriter<E: Event> {
    kind: E::Kind,
    _event: PhantomData<fn(&E)>,
}

impl<E: Event> LogWriter<E> {
    /// Construct a [`LogWriter`] listening to `kind`.
    #[must_use]
    pub fn new(kind: E::Kind) -> Self {
        Self {
            kind,
            _event: PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event + Debug> Handle<E> for LogWriter<E> {
    fn event_kind(&self) -> E::Kind {
        self.kind
    }

    async fn handle_event(&self, _ctx: &Context, event: &E) -> Result<(), HandlerError> {
        tracing::info!(kind = ?event.kind(), event = ?event, "event received");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
