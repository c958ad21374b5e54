//! # Event capability.
//!
//! An [`Event`] is an immutable value that reports its own [`Kind`](Event::Kind).
//! The kind is the dispatch key: every subscriber registers for exactly one kind
//! and only ever receives events of that kind.
//!
//! Events are usually a closed enum whose variants carry payload snapshots:
//! ```rust
//! use greenbus::Event;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Kind { Created, Deleted }
//!
//! #[derive(Debug)]
//! enum Change { Created { id: i32 }, Deleted { id: i32 } }
//!
//! impl Event for Change {
//!     type Kind = Kind;
//!
//!     fn kind(&self) -> Kind {
//!         match self {
//!             Change::Created { .. } => Kind::Created,
//!             Change::Deleted { .. } => Kind::Deleted,
//!         }
//!     }
//! }
//!
//! assert_eq!(Change::Deleted { id: 7 }.kind(), Kind::Deleted);
//! ```

use std::fmt::Debug;
use std::hash::Hash;

/// Immutable domain occurrence tagged with a discrete kind.
///
/// Ownership moves into the manager on publish; subscribers share the value
/// read-only through an `Arc`.
pub trait Event: Send + Sync + 'static {
    /// Discrete category of the event (the dispatch key).
    type Kind: Copy + Eq + Hash + Debug + Send + Sync + 'static;

    /// Returns the kind of this event.
    fn kind(&self) -> Self::Kind;
}
