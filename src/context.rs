//! # Cancellation and deadline context.
//!
//! Every blocking operation of the event core takes a [`Context`]: a
//! [`CancellationToken`] paired with an optional deadline.
//!
//! ## Rules
//! - Children derived with [`Context::with_cancel`] / [`Context::with_timeout`] are
//!   cancelled together with their parent; cancelling a child never touches the parent.
//! - A child's deadline is the earlier of the parent's deadline and its own.
//! - Cancellation wins over an elapsed deadline when both hold.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use greenbus::{Context, ContextError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let root = Context::background();
//! let ctx = root.with_timeout(Duration::from_millis(10));
//!
//! assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
//! assert!(root.err().is_none());
//! # }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

/// Cancellation signal with an optional deadline.
///
/// Cheap to clone; clones share the same token and deadline.
#[derive(Clone, Debug, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never cancelled unless [`cancel`](Self::cancel) is called on it.
    pub fn background() -> Self {
        Self::default()
    }

    /// Wraps an existing token (no deadline).
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Derives a child that can be cancelled independently of its parent.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Derives a child that expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child that expires at `at` (or earlier, if the parent does).
    pub fn with_deadline(&self, at: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent <= at => parent,
            _ => at,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// Cancels this context and all contexts derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns why the context ended, or `None` while it is live.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(at) if Instant::now() >= at => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Completes when the context is cancelled or its deadline passes.
    ///
    /// Cancel-safe: dropping the future has no side effects.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(at) => tokio::select! {
                biased;
                _ = self.token.cancelled() => ContextError::Canceled,
                _ = time::sleep_until(at) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = Context::background().with_timeout(Duration::from_secs(1));
        assert!(ctx.err().is_none());
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let parent = Context::background();
        let child = parent.with_cancel();
        parent.cancel();
        assert_eq!(child.done().await, ContextError::Canceled);
    }

    #[tokio::test]
    async fn test_child_cancel_leaves_parent_alive() {
        let parent = Context::background();
        let child = parent.with_cancel();
        child.cancel();
        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert!(parent.err().is_none());
    }

    #[tokio::test]
    async fn test_from_token_follows_external_cancel() {
        let token = CancellationToken::new();
        let ctx = Context::from_token(token.clone());
        assert!(ctx.deadline().is_none());
        token.cancel();
        assert_eq!(ctx.done().await, ContextError::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_keeps_earlier_parent_deadline() {
        let parent = Context::background().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(60));
        assert_eq!(child.deadline(), parent.deadline());
    }
}
