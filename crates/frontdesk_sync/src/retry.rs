//! Retry decisions.
//!
//! The connection machine asks its policy once per failed attempt, passing
//! the number of consecutive failures so far. The answer depends on nothing
//! else.

use crate::config::RetryConfig;
use std::time::Duration;

/// Default cap on attempts per failure episode, the first attempt included.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Default delay before a retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(3000);

/// Longest delay the retry timer accepts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(3600);

/// Outcome of consulting a retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether another attempt should be made.
    pub retry: bool,
    /// Delay before that attempt. Zero when `retry` is false.
    pub delay: Duration,
}

impl RetryDecision {
    /// Retry after `delay`.
    pub fn retry_after(delay: Duration) -> Self {
        Self { retry: true, delay }
    }

    /// Give up.
    pub fn stop() -> Self {
        Self {
            retry: false,
            delay: Duration::ZERO,
        }
    }
}

/// Decides whether to retry after a failed attempt.
pub trait RetryPolicy: Send + Sync {
    /// `attempt` is the number of consecutive failed attempts (1 after the
    /// first failure).
    fn should_retry(&self, attempt: u32) -> RetryDecision;
}

impl RetryPolicy for RetryConfig {
    fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            RetryDecision::stop()
        } else {
            RetryDecision::retry_after(self.delay_for_attempt(attempt))
        }
    }
}
