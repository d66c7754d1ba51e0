//! Retry loop with exponential backoff and jitter.

use aigate_kernel::{Clock, EventSink, GatewayEvent, GatewayResult, NoopEventSink, NormalizedError, SystemClock};
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{Instrument, debug, info, warn};

use super::classifier::classify;
use super::config::RetryConfig;
use super::stats::RetryStats;

/// A failed attempt that was followed by another one.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptError {
    pub attempt: u32,
    pub error: NormalizedError,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
}

/// Result of a successful retried operation plus how it got there.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub result: T,
    /// Attempts used, in `1..=max_attempts`
    pub attempts: u32,
    pub total_elapsed: Duration,
    /// One entry per failed attempt, so `errors.len() == attempts - 1`
    pub errors: Vec<AttemptError>,
}

/// Retry executor bound to a policy, a statistics collector and an event sink.
///
/// When the attempts run out, or a failure is not retryable, the most recent
/// error is returned exactly as `work` produced it.
pub struct RetryExecutor {
    config: RetryConfig,
    stats: Arc<RetryStats>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            stats: Arc::new(RetryStats::new()),
            events: Arc::new(NoopEventSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_stats(mut self, stats: Arc<RetryStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn stats(&self) -> &Arc<RetryStats> {
        &self.stats
    }

    /// Run `work` until it succeeds, fails with a non-retryable error, or
    /// `max_attempts` is reached.
    pub async fn run<T, F, Fut>(&self, label: Option<&str>, mut work: F) -> GatewayResult<RetryOutcome<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let label = label.unwrap_or("operation");
        let started = Instant::now();
        let mut errors = Vec::new();
        let mut attempt = 1;

        loop {
            let attempt_span = tracing::info_span!("aigate.retry_attempt", label, attempt, max_attempts);
            let error = match work().instrument(attempt_span).await {
                Ok(result) => {
                    let total_elapsed = started.elapsed();
                    self.stats.record(attempt, true, total_elapsed);
                    if attempt > 1 {
                        info!(label, attempt, "Request succeeded after retry");
                    }
                    return Ok(RetryOutcome {
                        result,
                        attempts: attempt,
                        total_elapsed,
                        errors,
                    });
                }
                Err(error) => error,
            };

            let classification = classify(&error, &self.config.retryable_codes);
            let next_delay = (attempt < max_attempts && classification.retryable)
                .then(|| self.config.next_delay(attempt));

            self.events.emit(&GatewayEvent::RetryAttemptFailed {
                label: label.to_string(),
                attempt,
                max_attempts,
                code: classification.code.to_string(),
                retryable: classification.retryable,
                next_delay_ms: next_delay.map(|d| d.as_millis() as u64),
            });

            let Some(delay) = next_delay else {
                self.stats.record(attempt, false, started.elapsed());
                if attempt > 1 || classification.retryable {
                    warn!(label, attempts = attempt, error = %error, "Retries exhausted");
                } else {
                    debug!(label, error = %error, "Non-retryable failure, not retrying");
                }
                return Err(error);
            };

            debug!(
                label,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed, backing off"
            );
            errors.push(AttemptError {
                attempt,
                error,
                timestamp_ms: self.clock.now_millis(),
            });
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Run `work` under `config` without a shared statistics collector.
pub async fn retry_with_backoff<T, F, Fut>(
    work: F,
    config: &RetryConfig,
    label: Option<&str>,
) -> GatewayResult<RetryOutcome<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = GatewayResult<T>>,
{
    RetryExecutor::new(config.clone()).run(label, work).await
}

/// Adapt `f` into a function with the same argument that retries internally and
/// yields only the final result.
pub fn create_retry_wrapper<A, T, F, Fut>(
    f: F,
    config: RetryConfig,
    label: impl Into<String>,
) -> impl Fn(A) -> BoxFuture<'static, GatewayResult<T>>
where
    A: Clone + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = GatewayResult<T>> + Send + 'static,
{
    let f = Arc::new(f);
    let executor = Arc::new(RetryExecutor::new(config));
    let label: Arc<str> = Arc::from(label.into());

    move |arg: A| {
        let f = Arc::clone(&f);
        let executor = Arc::clone(&executor);
        let label = Arc::clone(&label);
        async move {
            executor
                .run(Some(&*label), || (*f)(arg.clone()))
                .await
                .map(|outcome| outcome.result)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigate_kernel::{ErrorCode, ManualClock};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CollectingSink(Mutex<Vec<GatewayEvent>>);

    impl EventSink for CollectingSink {
        fn emit(&self, event: &GatewayEvent) {
            self.0.lock().push(event.clone());
        }
    }

    fn fast_config() -> RetryConfig {
        RetryConfig::default()
            .with_max_attempts(3)
            .with_base_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0)
            .with_jitter(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let config = fast_config();

        let outcome = retry_with_backoff(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(NormalizedError::new(ErrorCode::Timeout, format!("timeout {n}")))
                } else {
                    Ok("done")
                }
            },
            &config,
            Some("test"),
        )
        .await
        .unwrap();

        assert_eq!(outcome.result, "done");
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.errors.len(), 2);
        assert_eq!(outcome.errors[0].attempt, 1);
        assert_eq!(outcome.errors[1].error.message(), "timeout 2");
        assert!(outcome.total_elapsed >= Duration::from_millis(100 + 200));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_runs_once() {
        let calls = AtomicU32::new(0);
        let config = fast_config().with_max_attempts(5);

        let err = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NormalizedError::new("BAD_REQUEST", "malformed prompt"))
            },
            &config,
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.code().as_str(), "BAD_REQUEST");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let sink = Arc::new(CollectingSink::default());
        let stats = Arc::new(RetryStats::new());
        let executor = RetryExecutor::new(fast_config())
            .with_events(sink.clone())
            .with_stats(stats.clone())
            .with_clock(Arc::new(ManualClock::new(0)));

        let err = executor
            .run(Some("corr-1"), || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err::<(), _>(NormalizedError::new(ErrorCode::NetworkError, format!("reset {n}")))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err, NormalizedError::new(ErrorCode::NetworkError, "reset 3"));

        let events = sink.0.lock();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[2],
            GatewayEvent::RetryAttemptFailed { attempt: 3, next_delay_ms: None, .. }
        ));
        assert!(matches!(
            &events[0],
            GatewayEvent::RetryAttemptFailed { attempt: 1, next_delay_ms: Some(100), .. }
        ));

        let snap = stats.snapshot();
        assert_eq!(snap.failures, 1);
        assert_eq!(snap.total_attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_never_retries() {
        let calls = AtomicU32::new(0);
        let config = fast_config().with_max_attempts(1);

        let result = retry_with_backoff(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(NormalizedError::new(ErrorCode::Timeout, "timeout"))
            },
            &config,
            None,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_wrapper_returns_plain_result() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let double = create_retry_wrapper(
            move |n: u32| {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(NormalizedError::new(ErrorCode::Timeout, "first call times out"))
                    } else {
                        Ok(n * 2)
                    }
                }
            },
            fast_config(),
            "double",
        );

        assert_eq!(double(21).await.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
