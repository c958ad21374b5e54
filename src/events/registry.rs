//! # Subscription registry.
//!
//! Maps every registered event kind to its active subscriber channels.
//!
//! ## Architecture
//! ```text
//! kinds (immutable)     slots: Mutex<HashMap<Kind, Slots>>
//!   {K1, K2, ...}         K1 ─► next_id=3, {0 ─► Target, 2 ─► Target}
//!                         K2 ─► next_id=0, {}
//! ```
//!
//! ## Rules
//! - The set of kinds is fixed at construction.
//! - One lock guards all slots; `subscribe`, `unsubscribe` and the dispatcher's
//!   snapshot never observe a torn map.
//! - The lock is never held across an `.await`: the dispatcher clones the
//!   targets and sends outside the lock.
//! - Ids grow monotonically per kind and are never reclaimed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::event::Event;
use super::subscription::{Subscription, SubscriptionId};
use crate::error::EventError;

/// Sending side of one subscription, as seen by the dispatcher.
pub(crate) struct Target<E> {
    pub(crate) id: SubscriptionId,
    pub(crate) sender: mpsc::Sender<Arc<E>>,
    /// Cancelled on unsubscribe; aborts a send the dispatcher is blocked on.
    pub(crate) closed: CancellationToken,
}

impl<E> Clone for Target<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            sender: self.sender.clone(),
            closed: self.closed.clone(),
        }
    }
}

/// Per-kind subscription table.
struct Slots<E> {
    next_id: u64,
    active: BTreeMap<SubscriptionId, Target<E>>,
}

impl<E> Default for Slots<E> {
    fn default() -> Self {
        Self {
            next_id: 0,
            active: BTreeMap::new(),
        }
    }
}

/// Thread-safe kind → subscribers map.
pub(crate) struct Registry<E: Event> {
    kinds: HashSet<E::Kind>,
    slots: Mutex<HashMap<E::Kind, Slots<E>>>,
    channel_capacity: usize,
}

impl<E: Event> Registry<E> {
    /// Creates a registry for a fixed set of kinds.
    pub(crate) fn new(kinds: impl IntoIterator<Item = E::Kind>, channel_capacity: usize) -> Self {
        let kinds: HashSet<E::Kind> = kinds.into_iter().collect();
        let slots = kinds.iter().map(|k| (*k, Slots::default())).collect();
        Self {
            kinds,
            slots: Mutex::new(slots),
            channel_capacity: channel_capacity.max(1),
        }
    }

    pub(crate) fn is_registered(&self, kind: E::Kind) -> bool {
        self.kinds.contains(&kind)
    }

    pub(crate) fn kinds(&self) -> impl Iterator<Item = E::Kind> + '_ {
        self.kinds.iter().copied()
    }

    /// Allocates a channel and registers it under a fresh id.
    pub(crate) fn subscribe(&self, kind: E::Kind) -> Result<Subscription<E>, EventError> {
        let mut slots = self.lock();
        let table = slots
            .get_mut(&kind)
            .ok_or_else(|| EventError::unknown_kind(kind))?;

        let id = SubscriptionId(table.next_id);
        table.next_id += 1;

        let (tx, rx) = mpsc::channel(self.channel_capacity);
        table.active.insert(
            id,
            Target {
                id,
                sender: tx,
                closed: CancellationToken::new(),
            },
        );
        Ok(Subscription::new(kind, id, rx))
    }

    /// Removes a registration and signals the dispatcher to stop sending to it.
    pub(crate) fn unsubscribe(&self, kind: E::Kind, id: SubscriptionId) -> Result<(), EventError> {
        let removed = {
            let mut slots = self.lock();
            let table = slots
                .get_mut(&kind)
                .ok_or_else(|| EventError::not_subscribed(kind, id))?;
            table.active.remove(&id)
        };

        match removed {
            Some(target) => {
                target.closed.cancel();
                Ok(())
            }
            None => Err(EventError::not_subscribed(kind, id)),
        }
    }

    /// Snapshot of the current targets for `kind` (empty for unknown kinds).
    pub(crate) fn targets(&self, kind: E::Kind) -> Vec<Target<E>> {
        self.lock()
            .get(&kind)
            .map(|t| t.active.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of active subscriptions for `kind`.
    pub(crate) fn len(&self, kind: E::Kind) -> Result<usize, EventError> {
        self.lock()
            .get(&kind)
            .map(|t| t.active.len())
            .ok_or_else(|| EventError::unknown_kind(kind))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<E::Kind, Slots<E>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    struct Ev(Kind);

    impl Event for Ev {
        type Kind = Kind;
        fn kind(&self) -> Kind {
            self.0
        }
    }

    #[test]
    fn test_ids_are_monotonic_per_kind() {
        let reg = Registry::<Ev>::new([Kind::A, Kind::B], 1);
        let a0 = reg.subscribe(Kind::A).unwrap();
        let a1 = reg.subscribe(Kind::A).unwrap();
        let b0 = reg.subscribe(Kind::B).unwrap();
        assert_eq!(a0.id().get(), 0);
        assert_eq!(a1.id().get(), 1);
        assert_eq!(b0.id().get(), 0);
    }

    #[test]
    fn test_ids_not_reclaimed_after_unsubscribe() {
        let reg = Registry::<Ev>::new([Kind::A], 1);
        let first = reg.subscribe(Kind::A).unwrap();
        reg.unsubscribe(Kind::A, first.id()).unwrap();
        let second = reg.subscribe(Kind::A).unwrap();
        assert_eq!(second.id().get(), 1);
    }

    #[test]
    fn test_unsubscribe_cancels_target() {
        let reg = Registry::<Ev>::new([Kind::A], 1);
        let sub = reg.subscribe(Kind::A).unwrap();
        let targets = reg.targets(Kind::A);
        assert_eq!(targets.len(), 1);
        assert!(!targets[0].closed.is_cancelled());

        reg.unsubscribe(Kind::A, sub.id()).unwrap();
        assert!(targets[0].closed.is_cancelled());
        assert!(reg.targets(Kind::A).is_empty());
    }

    #[test]
    fn test_unregistered_kind() {
        let reg = Registry::<Ev>::new([Kind::A], 1);
        assert!(!reg.is_registered(Kind::B));
        assert!(matches!(
            reg.subscribe(Kind::B),
            Err(EventError::UnknownEventKind { .. })
        ));
        assert!(matches!(
            reg.unsubscribe(Kind::B, SubscriptionId(0)),
            Err(EventError::NotSubscribed { .. })
        ));
        assert!(reg.targets(Kind::B).is_empty());
    }
}
