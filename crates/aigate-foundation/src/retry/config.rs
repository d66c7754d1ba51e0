//! Retry policy and backoff delay computation

use aigate_kernel::ErrorCode;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Share of the capped delay that jitter may add on top.
pub const JITTER_FACTOR: f64 = 0.25;

/// Retry policy for a unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    #[serde(deserialize_with = "crate::at_least_one::deserialize")]
    pub max_attempts: u32,
    /// Delay before the first retry
    #[serde(rename = "base_delay_ms", with = "crate::duration_ms")]
    pub base_delay: Duration,
    /// Upper bound on the exponential term (jitter is added after the cap)
    #[serde(rename = "max_delay_ms", with = "crate::duration_ms")]
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_enabled: bool,
    /// Error codes retried regardless of status or message
    pub retryable_codes: HashSet<String>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_multiplier: 2.0,
            jitter_enabled: true,
            retryable_codes: [
                ErrorCode::Timeout,
                ErrorCode::NetworkError,
                ErrorCode::ExternalServiceError,
                ErrorCode::RateLimited,
            ]
            .iter()
            .map(|code| code.as_str().to_string())
            .collect(),
        }
    }
}

impl RetryConfig {
    /// A policy that runs the work exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.jitter_enabled = enabled;
        self
    }

    pub fn with_retryable_code(mut self, code: impl Into<String>) -> Self {
        self.retryable_codes.insert(code.into());
        self
    }

    /// Capped delay after the failed `attempt` (1-based), before jitter.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let base_ms = self.base_delay.as_millis() as f64;
        let raw = base_ms * self.backoff_multiplier.powi(exponent);
        let capped = raw.min(self.max_delay.as_millis() as f64);
        if capped.is_finite() && capped > 0.0 {
            Duration::from_millis(capped as u64)
        } else {
            Duration::ZERO
        }
    }

    /// Effective delay after the failed `attempt`, with jitter drawn from `rng`.
    ///
    /// With jitter on, the result lies in `[d, 1.25 * d]` where `d` is
    /// [`base_delay_for`](Self::base_delay_for); it may exceed `max_delay`.
    pub fn delay_for<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.base_delay_for(attempt);
        if !self.jitter_enabled || delay.is_zero() {
            return delay;
        }
        let delay_ms = delay.as_millis() as f64;
        let jitter = delay_ms * JITTER_FACTOR * rng.gen_range(0.0..=1.0);
        Duration::from_millis((delay_ms + jitter).floor() as u64)
    }

    pub(crate) fn next_delay(&self, attempt: u32) -> Duration {
        self.delay_for(attempt, &mut rand::thread_rng())
    }
}
