//! Reconnection policy.

use std::time::Duration;

/// Configuration for reconnection behavior
///
/// Backoff is linear: the delay before attempt `k` (1-indexed) is
/// `base_interval * k`. After `max_attempts` failed attempts no further retry
/// is scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Maximum number of reconnection attempts
    pub max_attempts: u32,
    /// Delay unit between reconnection attempts
    pub base_interval: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_interval: Duration::from_secs(3),
        }
    }
}

impl ReconnectConfig {
    /// Create a new reconnect config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum attempts
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay unit
    #[must_use]
    pub fn base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Delay before the given attempt, or `None` once the ceiling is reached
    ///
    /// `attempt` is 1-indexed; attempt 0 is the initial connect and has no delay.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Option<Duration> {
        (1..=self.max_attempts)
            .contains(&attempt)
            .then(|| self.base_interval.saturating_mul(attempt))
    }
}
