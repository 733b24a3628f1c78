//! Configuration for the sync client.

use crate::dispatcher::NewRecordPolicy;
use crate::error::{SyncError, SyncResult};
use crate::retry::{DEFAULT_RETRY_DELAY, MAX_RETRY_ATTEMPTS, MAX_RETRY_DELAY};
use frontdesk_protocol::{endpoint_url, Credential, DEFAULT_WS_PATH};
use rand::Rng;
use std::time::Duration;
use url::Url;

/// Configuration for the live connection.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend base address (e.g. "https://hotel.example.com").
    pub base_url: String,
    /// Path of the live socket below the base address.
    pub ws_path: String,
    /// Retry configuration.
    pub retry: RetryConfig,
    /// How "new" events treat an id that is already present.
    pub new_records: NewRecordPolicy,
    /// Capacity of the status event channel.
    pub event_capacity: usize,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ws_path: DEFAULT_WS_PATH.to_string(),
            retry: RetryConfig::default(),
            new_records: NewRecordPolicy::default(),
            event_capacity: 256,
        }
    }

    /// Sets the socket path.
    pub fn with_ws_path(mut self, path: impl Into<String>) -> Self {
        self.ws_path = path.into();
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets the policy for "new" events.
    pub fn with_new_record_policy(mut self, policy: NewRecordPolicy) -> Self {
        self.new_records = policy;
        self
    }

    /// Sets the status event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Checks the configuration for values that can never work.
    pub fn validate(&self) -> SyncResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SyncError::InvalidConfig("base URL is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::InvalidConfig(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(SyncError::InvalidConfig(
                "event_capacity must be at least 1".into(),
            ));
        }
        self.retry.validate()
    }

    /// Builds the socket URL for `credential`.
    pub fn endpoint(&self, credential: &Credential) -> SyncResult<Url> {
        Ok(endpoint_url(&self.base_url, &self.ws_path, credential)?)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000")
    }
}

/// How the delay between attempts evolves.
#[derive(Debug, Clone, PartialEq)]
pub enum Backoff {
    /// The same delay before every retry.
    Fixed,
    /// `delay * multiplier^(attempt - 1)`, capped at `max_delay`.
    Exponential {
        /// Growth factor per failed attempt.
        multiplier: f64,
        /// Upper bound for a single delay.
        max_delay: Duration,
        /// Add up to 25% random jitter.
        jitter: bool,
    },
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Base delay before a retry.
    pub delay: Duration,
    /// Delay growth.
    pub backoff: Backoff,
}

impl RetryConfig {
    /// Creates a fixed-delay configuration with the default delay.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: DEFAULT_RETRY_DELAY,
            backoff: Backoff::Fixed,
        }
    }

    /// Creates a fixed-delay configuration.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts).with_delay(delay)
    }

    /// Creates an exponential backoff configuration without jitter.
    pub fn exponential(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            delay: initial_delay,
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay,
                jitter: false,
            },
        }
    }

    /// Creates a configuration with a single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Sets the base delay.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the backoff.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enables or disables jitter for exponential backoff.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        if let Backoff::Exponential { jitter, .. } = &mut self.backoff {
            *jitter = enabled;
        }
        self
    }

    /// Checks for delays the retry timer cannot represent.
    pub fn validate(&self) -> SyncResult<()> {
        if self.delay > MAX_RETRY_DELAY {
            return Err(SyncError::InvalidConfig(format!(
                "retry delay must not exceed {:?}",
                MAX_RETRY_DELAY
            )));
        }
        if let Backoff::Exponential {
            multiplier,
            max_delay,
            ..
        } = &self.backoff
        {
            if !multiplier.is_finite() || *multiplier < 1.0 {
                return Err(SyncError::InvalidConfig(
                    "backoff multiplier must be a finite number of at least 1".into(),
                ));
            }
            if *max_delay > MAX_RETRY_DELAY {
                return Err(SyncError::InvalidConfig(format!(
                    "maximum backoff delay must not exceed {:?}",
                    MAX_RETRY_DELAY
                )));
            }
        }
        Ok(())
    }

    /// Calculates the delay after `attempt` failed attempts (1-indexed).
    ///
    /// Never exceeds [`MAX_RETRY_DELAY`], whatever the configuration.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = match &self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
                jitter,
            } => {
                let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
                let base = self.delay.as_secs_f64() * multiplier.powi(exponent);
                let mut capped = base.min(max_delay.as_secs_f64());

                if *jitter {
                    capped += capped * rand::thread_rng().gen_range(0.0..=0.25);
                }
                // NaN or negative when the multiplier is out of range.
                Duration::try_from_secs_f64(capped).unwrap_or(*max_delay)
            }
        };
        delay.min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(MAX_RETRY_ATTEMPTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("https://hotel.example.com")
            .with_ws_path("/live")
            .with_retry(RetryConfig::fixed(5, Duration::from_millis(10)))
            .with_new_record_policy(NewRecordPolicy::Upsert)
            .with_event_capacity(8);

        assert_eq!(config.base_url, "https://hotel.example.com");
        assert_eq!(config.ws_path, "/live");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.new_records, NewRecordPolicy::Upsert);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn defaults_match_baseline_policy() {
        let config = SyncConfig::default();
        assert_eq!(config.ws_path, "/ws");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_millis(3000));
        assert_eq!(config.retry.backoff, Backoff::Fixed);
        assert_eq!(config.new_records, NewRecordPolicy::Insert);
    }

    #[test]
    fn validate_rejects_unusable_values() {
        assert!(SyncConfig::new("  ").validate().is_err());
        assert!(SyncConfig::default()
            .with_retry(RetryConfig::new(0))
            .validate()
            .is_err());
        assert!(SyncConfig::default()
            .with_event_capacity(0)
            .validate()
            .is_err());
    }

    #[test]
    fn endpoint_carries_token() {
        let config = SyncConfig::new("http://localhost:8000");
        let url = config.endpoint(&Credential::new("tok")).unwrap();
        assert_eq!(url.as_str(), "ws://localhost:8000/ws?token=tok");
    }

    #[test]
    fn retry_config_no_retry() {
        let config = RetryConfig::no_retry();
        assert_eq!(config.max_attempts, 1);
    }

    #[test]
    fn fixed_delay_is_constant() {
        let config = RetryConfig::fixed(5, Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(250));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(250));
    }

    #[test]
    fn exponential_delay_grows_and_caps() {
        let config = RetryConfig::exponential(
            10,
            Duration::from_millis(100),
            Duration::from_millis(500),
        );

        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(config.delay_for_attempt(4), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(9), Duration::from_millis(500));
    }

    #[test]
    fn validate_rejects_unrepresentable_delays() {
        let huge = SyncConfig::default().with_retry(RetryConfig::fixed(3, Duration::MAX));
        assert!(matches!(huge.validate(), Err(SyncError::InvalidConfig(_))));

        let huge_cap = SyncConfig::default().with_retry(RetryConfig::exponential(
            3,
            Duration::from_millis(100),
            Duration::MAX,
        ));
        assert!(huge_cap.validate().is_err());

        let at_ceiling = SyncConfig::default().with_retry(RetryConfig::fixed(3, MAX_RETRY_DELAY));
        assert!(at_ceiling.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_multiplier() {
        for multiplier in [f64::NAN, f64::INFINITY, -2.0, 0.5] {
            let retry = RetryConfig::new(3).with_backoff(Backoff::Exponential {
                multiplier,
                max_delay: Duration::from_secs(10),
                jitter: false,
            });
            assert!(retry.validate().is_err(), "multiplier {} accepted", multiplier);
        }
    }

    #[test]
    fn delay_for_attempt_is_total() {
        for multiplier in [f64::NAN, -2.0, f64::INFINITY] {
            let retry = RetryConfig::new(3).with_backoff(Backoff::Exponential {
                multiplier,
                max_delay: Duration::from_secs(10),
                jitter: true,
            });
            assert!(retry.delay_for_attempt(2) <= Duration::from_secs(10));
        }

        let huge = RetryConfig::fixed(3, Duration::MAX);
        assert_eq!(huge.delay_for_attempt(1), MAX_RETRY_DELAY);
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let config = RetryConfig::exponential(5, Duration::from_secs(1), Duration::from_secs(5))
            .with_jitter(true);

        let delay = config.delay_for_attempt(5);
        assert!(delay >= Duration::from_secs(5));
        assert!(delay <= Duration::from_millis(6250));
    }
}
