//! # Subscription handle.
//!
//! [`Subscription`] is the receiving end handed out by
//! [`EventManager::subscribe`](crate::EventManager::subscribe): the kind, the
//! id that identifies it for `unsubscribe`, and the bounded channel the
//! dispatcher pushes into.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::event::Event;

/// Subscription id, unique within its event kind.
///
/// Allocated monotonically per kind starting at 0 and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub(crate) u64);

impl SubscriptionId {
    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Active registration of one listener for one event kind.
///
/// Dropping the handle does **not** unsubscribe; call
/// [`EventManager::unsubscribe`](crate::EventManager::unsubscribe) with
/// [`id`](Self::id), or let a subscription runner do it.
pub struct Subscription<E: Event> {
    kind: E::Kind,
    id: SubscriptionId,
    rx: mpsc::Receiver<Arc<E>>,
}

impl<E: Event> Subscription<E> {
    pub(crate) fn new(kind: E::Kind, id: SubscriptionId, rx: mpsc::Receiver<Arc<E>>) -> Self {
        Self { kind, id, rx }
    }

    /// Kind this subscription listens to.
    pub fn kind(&self) -> E::Kind {
        self.kind
    }

    /// Id to pass to `unsubscribe`.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the subscription was removed and every in-flight
    /// event has been drained. Cancel-safe.
    pub async fn recv(&mut self) -> Option<Arc<E>> {
        self.rx.recv().await
    }

    /// Returns a buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<E>> {
        self.rx.try_recv().ok()
    }
}

impl<E: Event> fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("id", &self.id)
            .finish()
    }
}
