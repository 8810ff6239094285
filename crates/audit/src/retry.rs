//! Retry/backoff policy for message processing.

use std::time::Duration;

/// Exponential backoff with a fixed retry budget.
///
/// The default mirrors the broker-side configuration this consumer replaces:
/// first retry after 1s, doubling each time, at most 3 retries (4 attempts
/// total) before a message is dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay for each further retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries (every failure dead-letters immediately).
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether another retry is allowed after `retries_done` retries.
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Delay before the given retry (1-indexed): initial * multiplier^(n-1).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        self.initial_delay * self.multiplier.pow(retry - 1)
    }

    /// Total attempts a message gets, including the first delivery.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}
