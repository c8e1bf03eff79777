//! Exponential backoff reconnection policy.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};

/// Delays for one outage. Held by the adapter across awaits.
pub type Backoff = Box<dyn Iterator<Item = Duration> + Send + Sync>;

/// Configuration for reconnecting after the Discord gateway drops.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Whether dropped connections are re-established at all.
    pub enabled: bool,
    /// Initial delay before first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Multiplier for each successive attempt.
    pub multiplier: f32,
    /// Maximum number of attempts per outage.
    pub max_attempts: usize,
    /// Randomize delays to avoid reconnect storms.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
            multiplier: 2.0,
            max_attempts: 5,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Create a fresh backoff iterator for one outage.
    ///
    /// The iterator yields `None` once `max_attempts` delays were handed out.
    pub fn backoff(&self) -> Backoff {
        if !self.enabled {
            return Box::new(std::iter::empty());
        }

        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.multiplier)
            .with_max_times(self.max_attempts);
        if self.jitter {
            builder = builder.with_jitter();
        }
        Box::new(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_is_bounded() {
        let policy = ReconnectPolicy {
            max_attempts: 3,
            jitter: false,
            ..ReconnectPolicy::default()
        };
        assert_eq!(policy.backoff().count(), 3);
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = ReconnectPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            multiplier: 2.0,
            max_attempts: 4,
            jitter: false,
            enabled: true,
        };
        let delays: Vec<Duration> = policy.backoff().collect();
        assert_eq!(delays[0], Duration::from_secs(1));
        assert_eq!(delays[1], Duration::from_secs(2));
        assert_eq!(delays[2], Duration::from_secs(3));
        assert_eq!(delays[3], Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_can_be_shared_across_tasks() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        assert_send_sync(&ReconnectPolicy::default().backoff());
    }

    #[test]
    fn test_disabled_policy_never_retries() {
        assert!(ReconnectPolicy::disabled().backoff().next().is_none());
    }
}
