//! # Subscription runner.
//!
//! Binds a [`Handle`] to a subscription and feeds it events until the context
//! ends.
//!
//! ## Flow
//! ```text
//! run_subscription(ctx, handler)
//!   ├─► subscribe(handler.event_kind())      (Err → returned immediately)
//!   └─► drive_subscription(ctx, handler, sub)
//!         loop {
//!           select {
//!             ctx.done()   ─► break
//!             sub.recv()   ─► handle_event(ctx, &event)
//!                               ├─ Ok     → next
//!                               ├─ Err    → error! log, next
//!                               └─ panic  → error! log, next
//!             closed       ─► break
//!           }
//!         }
//!         unsubscribe(kind, id)
//! ```
//!
//! ## Rules
//! - No retries, no dead-lettering: a failed event is gone.
//! - The runner always unsubscribes itself on exit, so registry entries never leak.

use std::any::Any;

use futures::FutureExt;
use tracing::{debug, error, warn};

use super::handler::Handle;
use crate::context::Context;
use crate::error::EventError;
use crate::events::{Event, EventManager, Subscription};

impl<E: Event> EventManager<E> {
    /// Subscribes `handler` to its kind and drives it until `ctx` ends.
    ///
    /// Returns the subscribe error immediately if the kind is not registered;
    /// otherwise returns `Ok(())` after unsubscribing on cancellation.
    pub async fn run_subscription<H>(&self, ctx: &Context, handler: &H) -> Result<(), EventError>
    where
        H: Handle<E> + ?Sized,
    {
        let sub = self.subscribe(handler.event_kind())?;
        self.drive_subscription(ctx, handler, sub).await
    }

    /// Drives an already established subscription.
    ///
    /// Lets callers subscribe eagerly (so no event published in between is
    /// missed) and spawn the loop afterwards.
    pub async fn drive_subscription<H>(
        &self,
        ctx: &Context,
        handler: &H,
        mut sub: Subscription<E>,
    ) -> Result<(), EventError>
    where
        H: Handle<E> + ?Sized,
    {
        let name = handler.name();
        debug!(handler = name, kind = ?sub.kind(), id = %sub.id(), "subscription runner started");

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.done() => break,
                next = sub.recv() => match next {
                    Some(ev) => ev,
                    None => break,
                },
            };

            let fut = handler.handle_event(ctx, event.as_ref());
            match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(
                        handler = name,
                        kind = ?event.kind(),
                        label = err.as_label(),
                        error = %err,
                        "failed to handle event"
                    );
                }
                Err(panic) => {
                    error!(
                        handler = name,
                        kind = ?event.kind(),
                        info = %panic_message(panic.as_ref()),
                        "handler panicked"
                    );
                }
            }
        }

        if let Err(err) = self.unsubscribe(sub.kind(), sub.id()) {
            warn!(handler = name, error = %err, "runner could not unsubscribe");
        }
        debug!(handler = name, "subscription runner stopped");
        Ok(())
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
