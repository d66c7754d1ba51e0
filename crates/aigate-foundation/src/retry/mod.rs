//! Retry Executor
//!
//! Runs a unit of work up to `max_attempts` times. Between attempts it waits
//! `min(base_delay * multiplier^(attempt-1), max_delay)`, plus up to 25% jitter
//! when enabled. Only failures the [classifier](classifier::classify) marks as
//! retryable are attempted again, and the caller always sees the last error
//! unchanged.
//!
//! The inter-attempt wait is a `tokio::time::sleep`, so other calls keep
//! running and tests can drive it with paused time.

pub mod classifier;
pub mod config;
pub mod executor;
pub mod stats;

pub use classifier::{Classification, classify, is_retryable};
pub use config::RetryConfig;
pub use executor::{AttemptError, RetryExecutor, RetryOutcome, create_retry_wrapper, retry_with_backoff};
pub use stats::{RetryStats, RetryStatsSnapshot};
