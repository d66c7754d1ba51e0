//! Process-wide retry statistics, accumulated across calls for health reporting.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters updated once per retried operation.
#[derive(Debug, Default)]
pub struct RetryStats {
    operations: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    total_attempts: AtomicU64,
    total_retries: AtomicU64,
    total_elapsed_ms: AtomicU64,
}

/// Point-in-time copy of [`RetryStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryStatsSnapshot {
    pub operations: u64,
    pub successes: u64,
    pub failures: u64,
    pub total_attempts: u64,
    pub total_retries: u64,
    pub total_elapsed_ms: u64,
    pub average_attempts: f64,
}

impl RetryStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished operation that took `attempts` attempts.
    pub fn record(&self, attempts: u32, succeeded: bool, elapsed: Duration) {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.total_attempts.fetch_add(attempts as u64, Ordering::Relaxed);
        self.total_retries
            .fetch_add(attempts.saturating_sub(1) as u64, Ordering::Relaxed);
        self.total_elapsed_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RetryStatsSnapshot {
        let operations = self.operations.load(Ordering::Relaxed);
        let total_attempts = self.total_attempts.load(Ordering::Relaxed);
        RetryStatsSnapshot {
            operations,
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_attempts,
            total_retries: self.total_retries.load(Ordering::Relaxed),
            total_elapsed_ms: self.total_elapsed_ms.load(Ordering::Relaxed),
            average_attempts: if operations == 0 {
                0.0
            } else {
                total_attempts as f64 / operations as f64
            },
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.operations,
            &self.successes,
            &self.failures,
            &self.total_attempts,
            &self.total_retries,
            &self.total_elapsed_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
