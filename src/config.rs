//! # Event core configuration.
//!
//! Provides [`Config`] centralized settings for the [`EventManager`](crate::EventManager)
//! and the [`Supervisor`](crate::Supervisor) that drives it.
//!
//! ## Sentinel values
//! - `delivery_timeout = 0s` → unbounded per-subscriber send (dispatcher waits on slow subscribers)
//! - `grace = 0s` → no wait on shutdown, stuck tasks are reported immediately

use std::time::Duration;

/// Intake Queue capacity used when nothing else is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Global configuration for the event core.
///
/// ## Field semantics
/// - `queue_capacity`: Intake Queue size shared by all publishers (min 1)
/// - `subscriber_capacity`: buffer of every subscriber channel (min 1)
/// - `delivery_timeout`: bound for one fan-out send (`0s` = unbounded)
/// - `grace`: maximum wait for dispatcher and runners to stop on shutdown
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the single bounded Intake Queue.
    ///
    /// Once full, `publish` blocks until the dispatcher frees a slot or the
    /// caller's context ends.
    pub queue_capacity: usize,

    /// Capacity of each subscriber channel.
    ///
    /// A subscriber that does not drain its channel stalls the dispatcher for
    /// its kind (unless `delivery_timeout` is set).
    pub subscriber_capacity: usize,

    /// Upper bound for a single send into a subscriber channel.
    ///
    /// - `Duration::ZERO` = wait as long as it takes
    /// - `> 0` = drop the event for that subscriber after the timeout and count it
    pub delivery_timeout: Duration,

    /// Maximum time to wait for graceful shutdown before reporting stuck tasks.
    pub grace: Duration,
}

impl Config {
    /// Returns the Intake Queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        self.queue_capacity.max(1)
    }

    /// Returns the subscriber channel capacity clamped to a minimum of 1.
    #[inline]
    pub fn subscriber_capacity_clamped(&self) -> usize {
        self.subscriber_capacity.max(1)
    }

    /// Returns the per-subscriber send bound as an `Option`.
    ///
    /// - `None` → unbounded send
    /// - `Some(d)` → each send is abandoned after `d`
    #[inline]
    pub fn delivery_timeout(&self) -> Option<Duration> {
        if self.delivery_timeout == Duration::ZERO {
            None
        } else {
            Some(self.delivery_timeout)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `queue_capacity = 100`
    /// - `subscriber_capacity = 1`
    /// - `delivery_timeout = 0s` (unbounded)
    /// - `grace = 30s`
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            subscriber_capacity: 1,
            delivery_timeout: Duration::ZERO,
            grace: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_queue() {
        let cfg = Config::default();
        assert_eq!(cfg.queue_capacity_clamped(), 100);
        assert_eq!(cfg.subscriber_capacity_clamped(), 1);
        assert_eq!(cfg.delivery_timeout(), None);
    }

    #[test]
    fn test_zero_capacities_are_clamped() {
        let cfg = Config {
            queue_capacity: 0,
            subscriber_capacity: 0,
            delivery_timeout: Duration::from_millis(5),
            ..Config::default()
        };
        assert_eq!(cfg.queue_capacity_clamped(), 1);
        assert_eq!(cfg.subscriber_capacity_clamped(), 1);
        assert_eq!(cfg.delivery_timeout(), Some(Duration::from_millis(5)));
    }
}
