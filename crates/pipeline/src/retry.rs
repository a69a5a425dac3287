//! Bounded exponential-backoff retry for provider calls.
//!
//! Only transient [`ProviderError`]s are retried. Extraction and schema
//! failures never reach this policy: the orchestrator surfaces them
//! immediately.

use std::time::Duration;

use roomcraft_gateway::ProviderError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default delay before the first retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
/// Upper bound on any single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

/// Tunable parameters for retrying provider calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each failure.
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Load from environment variables, falling back to defaults.
    ///
    /// | Env var                  | Default |
    /// |--------------------------|---------|
    /// | `PROVIDER_MAX_RETRIES`   | `2`     |
    /// | `PROVIDER_RETRY_BASE_MS` | `500`   |
    pub fn from_env() -> Self {
        let max_retries: u32 = std::env::var("PROVIDER_MAX_RETRIES")
            .unwrap_or_else(|_| DEFAULT_MAX_RETRIES.to_string())
            .parse()
            .expect("PROVIDER_MAX_RETRIES must be a valid u32");

        let base_ms: u64 = std::env::var("PROVIDER_RETRY_BASE_MS")
            .unwrap_or_else(|_| DEFAULT_BASE_DELAY.as_millis().to_string())
            .parse()
            .expect("PROVIDER_RETRY_BASE_MS must be a valid u64");

        Self {
            max_retries,
            base_delay: Duration::from_millis(base_ms),
            max_delay: DEFAULT_MAX_DELAY,
        }
    }

    /// Whether a failure on the 1-based `attempt` should be retried.
    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        attempt <= self.max_retries && error.is_transient()
    }

    /// Delay to wait after the 1-based `attempt` failed, clamped to
    /// [`Self::max_delay`].
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Longest one call can take across all attempts when each attempt runs
    /// to `call_timeout`, backoff included.
    pub fn worst_case(&self, call_timeout: Duration) -> Duration {
        let backoff: Duration = (1..=self.max_retries).map(|a| self.delay_after(a)).sum();
        call_timeout * (self.max_retries + 1) + backoff
    }
}
