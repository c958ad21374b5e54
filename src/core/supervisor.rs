//! # Supervisor: runs the dispatcher and subscription runners, handles shutdown.
//!
//! The [`Supervisor`] owns a shared [`EventManager`] and the set of
//! [`Handle`]s the process reacts with. It keeps the dispatcher and one runner
//! per handler alive until its context ends or an OS termination signal arrives.
//!
//! ## High-level architecture
//! ```text
//! run(ctx):
//!   subscribe every handler up front          (Err → RuntimeError::Subscribe)
//!   runtime = ctx.with_cancel()
//!   JoinSet:
//!     "dispatcher"  ── manager.run(runtime)
//!     handler #1    ── manager.drive_subscription(runtime, h1, sub1)
//!     handler #N    ── manager.drive_subscription(runtime, hN, subN)
//!
//! wait for:
//!   ctx.done() | shutdown::wait_for_shutdown_signal() | every task exited
//!
//! shutdown path:
//!   runtime.cancel()       → dispatcher and runners return, runners unsubscribe
//!   wait_all_with_grace(cfg.grace):
//!     ├─ Ok (all joined)   → Ok(())
//!     └─ timeout           → abort, RuntimeError::GraceExceeded { stuck }
//! ```
//!
//! Events still in the Intake Queue at shutdown are dropped.

use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::builder::SupervisorBuilder;
use super::shutdown;
use crate::config::Config;
use crate::context::Context;
use crate::error::RuntimeError;
use crate::events::{Event, EventManager};
use crate::handlers::Handle;

const DISPATCHER: &str = "dispatcher";

/// Coordinates the dispatcher, the subscription runners and graceful shutdown.
pub struct Supervisor<E: Event> {
    cfg: Config,
    manager: Arc<EventManager<E>>,
    handlers: Vec<Arc<dyn Handle<E>>>,
}

impl<E: Event> Supervisor<E> {
    /// Starts a builder around an existing manager.
    pub fn builder(cfg: Config, manager: Arc<EventManager<E>>) -> SupervisorBuilder<E> {
        SupervisorBuilder::new(cfg, manager)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        manager: Arc<EventManager<E>>,
        handlers: Vec<Arc<dyn Handle<E>>>,
    ) -> Self {
        Self {
            cfg,
            manager,
            handlers,
        }
    }

    /// Shared event manager (publish through it).
    pub fn manager(&self) -> &Arc<EventManager<E>> {
        &self.manager
    }

    /// Runs until `ctx` ends or a termination signal arrives, then shuts down
    /// within [`Config::grace`].
    pub async fn run(&self, ctx: &Context) -> Result<(), RuntimeError> {
        let runtime = ctx.with_cancel();
        let mut set = JoinSet::new();
        let mut pending: Vec<&'static str> = Vec::with_capacity(self.handlers.len() + 1);

        self.spawn_runners(&mut set, &mut pending, &runtime)?;
        self.spawn_dispatcher(&mut set, &mut pending, &runtime);
        info!(handlers = self.handlers.len(), "supervisor started");

        self.drive_shutdown(ctx, &runtime, &mut set, &mut pending)
            .await
    }

    /// Subscribes every handler, then spawns its runner.
    ///
    /// Subscribing before spawning means no event published after `run`
    /// started is missed by a handler whose task has not been polled yet.
    fn spawn_runners(
        &self,
        set: &mut JoinSet<&'static str>,
        pending: &mut Vec<&'static str>,
        runtime: &Context,
    ) -> Result<(), RuntimeError> {
        let mut subs = Vec::with_capacity(self.handlers.len());
        for handler in &self.handlers {
            match self.manager.subscribe(handler.event_kind()) {
                Ok(sub) => subs.push(sub),
                Err(source) => {
                    for sub in &subs {
                        if let Err(err) = self.manager.unsubscribe(sub.kind(), sub.id()) {
                            warn!(error = %err, "could not roll back subscription");
                        }
                    }
                    return Err(RuntimeError::Subscribe {
                        handler: handler.name(),
                        source,
                    });
                }
            }
        }

        for (handler, sub) in self.handlers.iter().zip(subs) {
            let name = handler.name();
            let manager = Arc::clone(&self.manager);
            let handler = Arc::clone(handler);
            let ctx = runtime.clone();

            pending.push(name);
            set.spawn(async move {
                if let Err(err) = manager.drive_subscription(&ctx, handler.as_ref(), sub).await {
                    error!(handler = name, error = %err, "subscription runner failed");
                }
                name
            });
        }
        Ok(())
    }

    fn spawn_dispatcher(
        &self,
        set: &mut JoinSet<&'static str>,
        pending: &mut Vec<&'static str>,
        runtime: &Context,
    ) {
        let manager = Arc::clone(&self.manager);
        let ctx = runtime.clone();
        pending.push(DISPATCHER);
        set.spawn(async move {
            manager.run(&ctx).await;
            DISPATCHER
        });
    }

    /// Waits for a stop condition, then cancels the runtime and drains the set.
    async fn drive_shutdown(
        &self,
        ctx: &Context,
        runtime: &Context,
        set: &mut JoinSet<&'static str>,
        pending: &mut Vec<&'static str>,
    ) -> Result<(), RuntimeError> {
        let signal = async {
            if let Err(err) = shutdown::wait_for_shutdown_signal().await {
                warn!(error = %err, "failed to install signal handlers");
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            _ = signal => {
                info!("shutdown requested");
            }
            reason = ctx.done() => {
                debug!(reason = reason.as_label(), "supervisor context ended");
            }
            _ = join_all(set, pending) => {
                info!("all supervised tasks exited");
                return Ok(());
            }
        }

        runtime.cancel();
        self.wait_all_with_grace(set, pending).await
    }

    /// Waits for all tasks within the configured grace period.
    ///
    /// On timeout the remaining tasks are aborted and reported as stuck.
    async fn wait_all_with_grace(
        &self,
        set: &mut JoinSet<&'static str>,
        pending: &mut Vec<&'static str>,
    ) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let timed = tokio::time::timeout(grace, join_all(set, pending)).await;

        match timed {
            Ok(()) => {
                info!("all tasks stopped within grace");
                Ok(())
            }
            Err(_) => {
                set.abort_all();
                let mut stuck: Vec<String> = pending.iter().map(|s| s.to_string()).collect();
                stuck.sort_unstable();
                warn!(?grace, ?stuck, "grace exceeded");
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

/// Joins every task in `set`, crossing finished names off `pending`.
async fn join_all(set: &mut JoinSet<&'static str>, pending: &mut Vec<&'static str>) {
    while let Some(res) = set.join_next().await {
        match res {
            Ok(name) => {
                if let Some(pos) = pending.iter().position(|p| *p == name) {
                    pending.swap_remove(pos);
                }
            }
            Err(join_err) if join_err.is_panic() => {
                error!("supervised task panicked");
            }
            Err(_) => {}
        }
    }
}
