//! Error types used by the event core, its handlers and the supervisor.
//!
//! - [`ContextError`]: why a [`Context`](crate::Context) ended.
//! - [`EventError`]: failures of `publish` / `subscribe` / `unsubscribe`.
//! - [`HandlerError`]: failures returned by a [`Handle`](crate::Handle) implementation.
//! - [`RuntimeError`]: failures of the [`Supervisor`](crate::Supervisor) itself.
//!
//! Every type provides `as_label` for logs/metrics.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::events::SubscriptionId;

/// Reason a context is no longer live.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    /// The context (or one of its ancestors) was cancelled.
    #[error("context canceled")]
    Canceled,
    /// The context deadline elapsed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ContextError::Canceled => "context_canceled",
            ContextError::DeadlineExceeded => "context_deadline_exceeded",
        }
    }
}

/// # Errors produced by the event manager.
///
/// `UnknownEventKind` and `NotSubscribed` are caller bugs and never retryable.
/// `Context` carries the caller's own cancellation/deadline verbatim.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// Publish or subscribe referenced a kind outside the registered set.
    #[error("unknown event kind: {kind}")]
    UnknownEventKind {
        /// Debug rendering of the offending kind.
        kind: String,
    },

    /// Unsubscribe referenced an id that is not currently registered.
    #[error("not subscribed: kind={kind} id={id}")]
    NotSubscribed {
        /// Debug rendering of the kind.
        kind: String,
        /// The unknown subscription id.
        id: SubscriptionId,
    },

    /// A blocked publish gave up because the caller's context ended.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The Intake Queue has no receiving end.
    #[error("event manager closed")]
    Closed,
}

impl EventError {
    pub(crate) fn unknown_kind(kind: impl fmt::Debug) -> Self {
        EventError::UnknownEventKind {
            kind: format!("{kind:?}"),
        }
    }

    pub(crate) fn not_subscribed(kind: impl fmt::Debug, id: SubscriptionId) -> Self {
        EventError::NotSubscribed {
            kind: format!("{kind:?}"),
            id,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use greenbus::{ContextError, EventError};
    ///
    /// let err = EventError::from(ContextError::DeadlineExceeded);
    /// assert_eq!(err.as_label(), "context_deadline_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            EventError::UnknownEventKind { .. } => "event_unknown_kind",
            EventError::NotSubscribed { .. } => "event_not_subscribed",
            EventError::Context(e) => e.as_label(),
            EventError::Closed => "event_manager_closed",
        }
    }

    /// Indicates whether the caller may retry the same call.
    ///
    /// Only context-derived failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EventError::Context(_))
    }
}

/// # Errors returned by event handlers.
///
/// Handler errors are isolated per event: the subscription runner logs them
/// and moves on to the next event.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler received an event variant it does not handle.
    #[error("unexpected event: expected {expected}, got {actual}")]
    UnexpectedEvent {
        /// What the handler subscribed to.
        expected: String,
        /// What was delivered.
        actual: String,
    },

    /// Handling failed.
    #[error("handler failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },
}

impl HandlerError {
    /// Convenience constructor for [`HandlerError::Fail`].
    pub fn fail(error: impl fmt::Display) -> Self {
        HandlerError::Fail {
            error: error.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            HandlerError::UnexpectedEvent { .. } => "handler_unexpected_event",
            HandlerError::Fail { .. } => "handler_failed",
        }
    }
}

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A handler could not be subscribed at start-up.
    #[error("failed to subscribe handler '{handler}': {source}")]
    Subscribe {
        /// Name of the handler.
        handler: &'static str,
        /// Underlying subscribe failure.
        source: EventError,
    },

    /// Shutdown grace period was exceeded; the listed tasks were aborted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use greenbus::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Subscribe { .. } => "runtime_subscribe_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}
