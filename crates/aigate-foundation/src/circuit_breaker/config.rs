//! Circuit Breaker Configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    #[serde(deserialize_with = "crate::at_least_one::deserialize")]
    pub failure_threshold: u32,
    /// Number of consecutive successes in half-open needed to close the circuit
    #[serde(deserialize_with = "crate::at_least_one::deserialize")]
    pub success_threshold: u32,
    /// How long the circuit stays open before a probe is allowed
    #[serde(rename = "open_timeout_ms", with = "crate::duration_ms")]
    pub open_timeout: Duration,
    /// A failure arriving this long after the previous one starts a new streak
    #[serde(rename = "monitoring_period_ms", with = "crate::duration_ms")]
    pub monitoring_period: Duration,
    /// Maximum number of concurrent in-flight probes while half-open
    #[serde(deserialize_with = "crate::at_least_one::deserialize")]
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(120),
            half_open_max_requests: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the success threshold
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold.max(1);
        self
    }

    /// Set the open timeout
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Set the monitoring period
    pub fn with_monitoring_period(mut self, period: Duration) -> Self {
        self.monitoring_period = period;
        self
    }

    /// Set the half-open max concurrent probes
    pub fn with_half_open_max_requests(mut self, max: u32) -> Self {
        self.half_open_max_requests = max.max(1);
        self
    }

    /// Counts of zero would wedge the breaker; treat them as one.
    pub(crate) fn clamped(mut self) -> Self {
        self.failure_threshold = self.failure_threshold.max(1);
        self.success_threshold = self.success_threshold.max(1);
        self.half_open_max_requests = self.half_open_max_requests.max(1);
        self
    }

    /// Opens quickly and probes early.
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 2,
            open_timeout: Duration::from_secs(10),
            monitoring_period: Duration::from_secs(60),
            half_open_max_requests: 1,
        }
    }

    /// Tolerates long failure streaks.
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 5,
            open_timeout: Duration::from_secs(60),
            monitoring_period: Duration::from_secs(300),
            half_open_max_requests: 3,
        }
    }
}
