//! # Event manager: intake queue, subscription registry and dispatcher.
//!
//! [`EventManager`] combines a single bounded Intake Queue shared by all
//! publishers with a [`Registry`] of per-kind subscriber channels and the
//! dispatcher loop ([`EventManager::run`]) that connects the two.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                     Dispatcher (one):              Subscribers (N):
//!   TreeService    ──┐                                            ┌──► [chan K1#0] ──► runner
//!   SensorService  ──┼──► [Intake Queue] ──► run() ── targets(K) ─┼──► [chan K1#1] ──► reader
//!   WateringPlan   ──┘     (bounded, FIFO)                        └──► [chan K2#0] ──► runner
//! ```
//!
//! ## Rules
//! - **Registered kinds only**: publish/subscribe of an unknown kind fails with
//!   [`EventError::UnknownEventKind`] and leaves the queue untouched.
//! - **Backpressure**: a full queue blocks `publish` until a slot frees up or the
//!   caller's [`Context`] ends; the context error is returned verbatim.
//! - **FIFO**: successfully enqueued events are dispatched in enqueue order.
//! - **Fan-out**: each event goes to every subscriber of its kind registered at
//!   dispatch time; no replay for late subscribers.
//! - **At-most-once**: cancelling the dispatcher drops whatever is still queued.
//!
//! ## Slow subscribers
//! With [`Config::delivery_timeout`] at its default (`0s`), a subscriber that
//! does not drain its channel stalls the dispatcher and, through the full
//! queue, every publisher. A non-zero timeout bounds each send instead: the
//! event is dropped for that subscriber only and counted in [`DispatchStats`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::time;
use tracing::{debug, trace, warn};

use super::event::Event;
use super::registry::{Registry, Target};
use super::subscription::{Subscription, SubscriptionId};
use crate::config::Config;
use crate::context::Context;
use crate::error::EventError;

/// Counters maintained by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events taken off the Intake Queue.
    pub dispatched: u64,
    /// Events handed to a subscriber channel.
    pub delivered: u64,
    /// Per-subscriber deliveries abandoned (timeout or receiver dropped).
    pub dropped: u64,
}

/// Outcome of one per-subscriber send.
enum Delivery {
    Delivered,
    Unsubscribed,
    ReceiverGone,
    TimedOut,
}

/// Typed publish/subscribe core.
///
/// Share it behind an `Arc`: every method takes `&self`.
pub struct EventManager<E: Event> {
    cfg: Config,
    registry: Registry<E>,
    intake_tx: mpsc::Sender<Arc<E>>,
    intake_rx: Mutex<mpsc::Receiver<Arc<E>>>,
    dispatched: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl<E: Event> EventManager<E> {
    /// Creates a manager for the given kinds with [`Config::default`]
    /// (Intake Queue capacity 100).
    pub fn new(kinds: impl IntoIterator<Item = E::Kind>) -> Self {
        Self::with_config(Config::default(), kinds)
    }

    /// Creates a manager for the given kinds with explicit configuration.
    pub fn with_config(cfg: Config, kinds: impl IntoIterator<Item = E::Kind>) -> Self {
        let (intake_tx, intake_rx) = mpsc::channel(cfg.queue_capacity_clamped());
        let registry = Registry::new(kinds, cfg.subscriber_capacity_clamped());
        Self {
            cfg,
            registry,
            intake_tx,
            intake_rx: Mutex::new(intake_rx),
            dispatched: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Enqueues an event for dispatch.
    ///
    /// ### Behavior
    /// - Unknown kind → `Err(UnknownEventKind)` immediately, nothing enqueued.
    /// - Room in the queue → enqueued, returns without waiting.
    /// - Queue full → waits for a free slot; if `ctx` ends first, returns
    ///   `Err(EventError::Context(..))` and the event is **not** enqueued.
    pub async fn publish(&self, ctx: &Context, event: E) -> Result<(), EventError> {
        let kind = event.kind();
        if !self.registry.is_registered(kind) {
            return Err(EventError::unknown_kind(kind));
        }

        let event = Arc::new(event);
        match self.intake_tx.try_send(event) {
            Ok(()) => {
                trace!(kind = ?kind, "event enqueued");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(kind = ?kind, "intake queue full, waiting for a slot");
                tokio::select! {
                    biased;
                    err = ctx.done() => Err(err.into()),
                    permit = self.intake_tx.reserve() => {
                        permit.map_err(|_| EventError::Closed)?.send(event);
                        Ok(())
                    }
                }
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EventError::Closed),
        }
    }

    /// Registers a new listener for `kind`.
    ///
    /// The returned [`Subscription`] receives every event of `kind` dispatched
    /// after this call.
    pub fn subscribe(&self, kind: E::Kind) -> Result<Subscription<E>, EventError> {
        let sub = self.registry.subscribe(kind)?;
        debug!(kind = ?kind, id = %sub.id(), "subscribed");
        Ok(sub)
    }

    /// Removes the listener `(kind, id)`.
    ///
    /// Fails with [`EventError::NotSubscribed`] if the pair is not active,
    /// including a second unsubscribe of the same pair. Events already in the
    /// subscriber's channel stay there for the reader to drain.
    pub fn unsubscribe(&self, kind: E::Kind, id: SubscriptionId) -> Result<(), EventError> {
        self.registry.unsubscribe(kind, id)?;
        debug!(kind = ?kind, id = %id, "unsubscribed");
        Ok(())
    }

    /// Dispatcher loop: drains the Intake Queue and fans every event out to
    /// the subscribers of its kind until `ctx` ends.
    ///
    /// Intended to run once for the lifetime of the manager on its own task.
    /// A concurrent second call waits until the first one returns, or until
    /// its own `ctx` ends.
    pub async fn run(&self, ctx: &Context) {
        let mut intake = tokio::select! {
            biased;
            _ = ctx.done() => return,
            guard = self.intake_rx.lock() => guard,
        };
        debug!("dispatcher started");

        loop {
            let event = tokio::select! {
                biased;
                _ = ctx.done() => break,
                next = intake.recv() => match next {
                    Some(ev) => ev,
                    None => break,
                },
            };
            self.dispatched.fetch_add(1, Ordering::Relaxed);

            tokio::select! {
                biased;
                _ = ctx.done() => break,
                _ = self.dispatch(event) => {}
            }
        }

        debug!(left_in_queue = intake.len(), "dispatcher stopped");
    }

    /// Sends one event to every current subscriber of its kind.
    async fn dispatch(&self, event: Arc<E>) {
        let kind = event.kind();
        let targets = self.registry.targets(kind);
        trace!(kind = ?kind, subscribers = targets.len(), "dispatching event");

        for target in &targets {
            match self.deliver(target, Arc::clone(&event)).await {
                Delivery::Delivered => {
                    self.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Delivery::Unsubscribed => {
                    trace!(kind = ?kind, id = %target.id, "skipped unsubscribed target");
                }
                Delivery::ReceiverGone => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        kind = ?kind,
                        id = %target.id,
                        "subscriber receiver dropped without unsubscribe"
                    );
                }
                Delivery::TimedOut => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        kind = ?kind,
                        id = %target.id,
                        "delivery timed out, event dropped for subscriber"
                    );
                }
            }
        }
    }

    async fn deliver(&self, target: &Target<E>, event: Arc<E>) -> Delivery {
        if target.closed.is_cancelled() {
            return Delivery::Unsubscribed;
        }

        let send = async {
            tokio::select! {
                biased;
                _ = target.closed.cancelled() => Delivery::Unsubscribed,
                res = target.sender.send(event) => match res {
                    Ok(()) => Delivery::Delivered,
                    Err(_) => Delivery::ReceiverGone,
                },
            }
        };

        match self.cfg.delivery_timeout() {
            Some(limit) => time::timeout(limit, send)
                .await
                .unwrap_or(Delivery::TimedOut),
            None => send.await,
        }
    }

    /// True if `kind` belongs to the registered set.
    pub fn is_registered(&self, kind: E::Kind) -> bool {
        self.registry.is_registered(kind)
    }

    /// Registered kinds (unordered).
    pub fn kinds(&self) -> Vec<E::Kind> {
        self.registry.kinds().collect()
    }

    /// Number of active subscriptions for `kind`.
    pub fn subscriber_count(&self, kind: E::Kind) -> Result<usize, EventError> {
        self.registry.len(kind)
    }

    /// Number of events currently waiting in the Intake Queue.
    pub fn queued(&self) -> usize {
        self.intake_tx.max_capacity() - self.intake_tx.capacity()
    }

    /// Intake Queue capacity.
    pub fn capacity(&self) -> usize {
        self.intake_tx.max_capacity()
    }

    /// Snapshot of the dispatcher counters.
    pub fn stats(&self) -> DispatchStats {
        DispatchStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Configuration this manager was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ContextError;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Test,
        Other,
    }

    #[derive(Debug, PartialEq)]
    struct Ev {
        kind: Kind,
        n: u32,
    }

    impl Event for Ev {
        type Kind = Kind;
        fn kind(&self) -> Kind {
            self.kind
        }
    }

    fn ev(n: u32) -> Ev {
        Ev {
            kind: Kind::Test,
            n,
        }
    }

    #[tokio::test]
    async fn test_publish_registered_kind() {
        let em = EventManager::<Ev>::new([Kind::Test]);
        em.publish(&Context::background(), ev(0)).await.unwrap();
        assert_eq!(em.queued(), 1);
    }

    #[tokio::test]
    async fn test_publish_unknown_kind() {
        let em = EventManager::<Ev>::new([]);
        let err = em.publish(&Context::background(), ev(0)).await.unwrap_err();
        assert!(matches!(err, EventError::UnknownEventKind { .. }));
        assert!(!err.is_retryable());
        assert_eq!(em.queued(), 0);
    }

    #[test]
    fn test_subscribe_unknown_kind() {
        let em = EventManager::<Ev>::new([Kind::Test]);
        let err = em.subscribe(Kind::Other).unwrap_err();
        assert!(matches!(err, EventError::UnknownEventKind { .. }));
    }

    #[test]
    fn test_unsubscribe_exactly_once() {
        let em = EventManager::<Ev>::new([Kind::Test]);
        let sub = em.subscribe(Kind::Test).unwrap();
        em.unsubscribe(Kind::Test, sub.id()).unwrap();
        let err = em.unsubscribe(Kind::Test, sub.id()).unwrap_err();
        assert!(matches!(err, EventError::NotSubscribed { .. }));
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let em = EventManager::<Ev>::new([Kind::Test]);
        let err = em.unsubscribe(Kind::Test, SubscriptionId(42)).unwrap_err();
        assert!(matches!(err, EventError::NotSubscribed { .. }));
    }

    #[tokio::test]
    async fn test_full_queue_blocks_then_expired_context_fails() {
        let em = EventManager::<Ev>::new([Kind::Test]);
        let bg = Context::background();
        for n in 0..100 {
            em.publish(&bg, ev(n)).await.unwrap();
        }
        assert_eq!(em.queued(), 100);

        let blocked = time::timeout(Duration::from_millis(50), em.publish(&bg, ev(100))).await;
        assert!(blocked.is_err(), "publish on a full queue must block");

        let expired = bg.with_timeout(Duration::ZERO);
        let err = em.publish(&expired, ev(101)).await.unwrap_err();
        assert_eq!(err, EventError::Context(ContextError::DeadlineExceeded));
        assert_eq!(em.queued(), 100);
    }

    #[tokio::test]
    async fn test_blocked_publish_resumes_when_slot_frees() {
        let em = Arc::new(EventManager::<Ev>::with_config(
            Config {
                queue_capacity: 1,
                ..Config::default()
            },
            [Kind::Test],
        ));
        let bg = Context::background();
        em.publish(&bg, ev(0)).await.unwrap();

        let publisher = {
            let em = Arc::clone(&em);
            tokio::spawn(async move { em.publish(&Context::background(), ev(1)).await })
        };

        let mut sub = em.subscribe(Kind::Test).unwrap();
        let ctx = Context::background();
        let dispatcher = {
            let em = Arc::clone(&em);
            let ctx = ctx.clone();
            tokio::spawn(async move { em.run(&ctx).await })
        };

        assert_eq!(sub.recv().await.unwrap().n, 0);
        assert_eq!(sub.recv().await.unwrap().n, 1);
        publisher.await.unwrap().unwrap();

        ctx.cancel();
        dispatcher.await.unwrap();
    }

    #[tokio::test]
    async fn test_blocked_publish_fails_with_cancel_verbatim() {
        let em = Arc::new(EventManager::<Ev>::with_config(
            Config {
                queue_capacity: 1,
                ..Config::default()
            },
            [Kind::Test],
        ));
        em.publish(&Context::background(), ev(0)).await.unwrap();

        let ctx = Context::background().with_cancel();
        let publisher = {
            let (em, ctx) = (Arc::clone(&em), ctx.clone());
            tokio::spawn(async move { em.publish(&ctx, ev(1)).await })
        };
        tokio::task::yield_now().await;
        assert!(!publisher.is_finished());

        ctx.cancel();
        let err = publisher.await.unwrap().unwrap_err();
        assert_eq!(err, EventError::Context(ContextError::Canceled));
        assert!(err.is_retryable());
        assert_eq!(em.queued(), 1);
    }

    #[tokio::test]
    async fn test_second_run_returns_on_its_own_cancel() {
        let em = Arc::new(EventManager::<Ev>::new([Kind::Test]));
        let first_ctx = Context::background().with_cancel();
        let first = {
            let (em, ctx) = (Arc::clone(&em), first_ctx.clone());
            tokio::spawn(async move { em.run(&ctx).await })
        };
        tokio::task::yield_now().await;

        let cancelled = Context::background().with_cancel();
        cancelled.cancel();
        time::timeout(Duration::from_millis(500), em.run(&cancelled))
            .await
            .expect("second run must not wait for the first dispatcher");
        assert!(!first.is_finished());

        first_ctx.cancel();
        first.await.unwrap();
    }

    #[test]
    fn test_introspection() {
        let cfg = Config {
            queue_capacity: 7,
            ..Config::default()
        };
        let em = EventManager::<Ev>::with_config(cfg, [Kind::Test, Kind::Other]);

        let mut kinds = em.kinds();
        kinds.sort_by_key(|k| *k == Kind::Other);
        assert_eq!(kinds, vec![Kind::Test, Kind::Other]);
        assert_eq!(em.capacity(), 7);
        assert_eq!(em.config().queue_capacity, 7);
        assert!(em.is_registered(Kind::Other));
    }
}
