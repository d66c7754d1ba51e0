//! Circuit Breaker State Machine
//!
//! Implements the core circuit breaker state machine with three states:
//! - Closed: Normal operation, requests are allowed
//! - Open: Requests are rejected until `next_attempt_at`
//! - Half-Open: A bounded number of probes test whether the dependency recovered
//!
//! All counters and the state live behind one mutex so that a success or
//! failure and any transition it causes are applied as a single step. The
//! lock is never held across an `.await`.

use aigate_kernel::{Clock, EventSink, GatewayEvent, GatewayResult, NoopEventSink, NormalizedError, SystemClock};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::config::CircuitBreakerConfig;
use super::metrics::{CircuitBreakerStats, StateTransition, TransitionLog};

/// Circuit breaker states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    /// Normal operation - requests are allowed
    #[default]
    Closed,
    /// Circuit is open - requests are rejected
    Open,
    /// Testing recovery - limited probes allowed
    HalfOpen,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
            State::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: State,
    consecutive_failures: u32,
    consecutive_successes: u32,
    total_failures: u64,
    total_successes: u64,
    total_requests: u64,
    rejected_requests: u64,
    last_failure_at: Option<u64>,
    last_success_at: Option<u64>,
    next_attempt_at: Option<u64>,
    open_count: u64,
    /// Probes currently running in half-open.
    half_open_in_flight: u32,
    /// Bumped on every entry into half-open so stale probe permits are ignored.
    half_open_epoch: u64,
    transitions: TransitionLog,
}

/// Circuit Breaker implementation
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

/// Admission ticket for one call; releases a half-open probe slot on drop,
/// including when the calling future is cancelled.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    probe_epoch: Option<u64>,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if let Some(epoch) = self.probe_epoch {
            let mut inner = self.breaker.inner.lock();
            if inner.state == State::HalfOpen && inner.half_open_epoch == epoch {
                inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
            }
        }
    }
}

impl CircuitBreaker {
    /// Create a new circuit breaker using the system clock
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(SystemClock), Arc::new(NoopEventSink))
    }

    /// Create a circuit breaker with an injected clock and event sink
    pub fn with_clock(
        name: impl Into<String>,
        config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            name: name.into(),
            config: config.clamped(),
            clock,
            events,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Current state, without applying any timeout-driven transition.
    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// `true` unless the circuit is open and its cooldown has not elapsed.
    pub fn is_available(&self) -> bool {
        let inner = self.inner.lock();
        match (inner.state, inner.next_attempt_at) {
            (State::Open, Some(next)) => self.clock.now_millis() >= next,
            _ => true,
        }
    }

    /// Run `work` under the breaker.
    ///
    /// Rejected calls fail with `SERVICE_UNAVAILABLE` without invoking `work`.
    /// Otherwise the outcome of `work` is recorded and returned unchanged.
    pub async fn execute<T, F, Fut>(&self, work: F) -> GatewayResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let permit = self.acquire()?;
        let result = work().await;
        match &result {
            Ok(_) => self.on_success(),
            Err(err) => self.on_failure(err),
        }
        drop(permit);
        result
    }

    fn acquire(&self) -> GatewayResult<Permit<'_>> {
        let now = self.clock.now_millis();
        let mut transition = None;

        let outcome = {
            let mut inner = self.inner.lock();
            inner.total_requests += 1;

            if inner.state == State::Open {
                let next = inner.next_attempt_at.unwrap_or(now);
                if now < next {
                    inner.rejected_requests += 1;
                    let retry_after = Duration::from_millis(next - now);
                    Err(NormalizedError::service_unavailable(
                        format!("circuit '{}' is open", self.name),
                        Some(retry_after),
                    ))
                } else {
                    transition = self.transition(&mut inner, State::HalfOpen, now);
                    self.admit(&mut inner)
                }
            } else {
                self.admit(&mut inner)
            }
        };

        self.publish(transition);
        if outcome.is_err() {
            debug!(breaker = %self.name, "circuit breaker rejected request");
        }
        outcome.map(|probe_epoch| Permit {
            breaker: self,
            probe_epoch,
        })
    }

    fn admit(&self, inner: &mut Inner) -> GatewayResult<Option<u64>> {
        match inner.state {
            State::HalfOpen => {
                if inner.half_open_in_flight >= self.config.half_open_max_requests {
                    inner.rejected_requests += 1;
                    return Err(NormalizedError::service_unavailable(
                        format!("circuit '{}' is half-open and already probing", self.name),
                        None,
                    ));
                }
                inner.half_open_in_flight += 1;
                Ok(Some(inner.half_open_epoch))
            }
            _ => Ok(None),
        }
    }

    /// Count a call turned away by an availability check made outside
    /// [`execute`](Self::execute).
    pub fn record_rejection(&self) {
        let mut inner = self.inner.lock();
        inner.total_requests += 1;
        inner.rejected_requests += 1;
    }

    /// Record a successful call.
    pub fn on_success(&self) {
        let now = self.clock.now_millis();
        let mut transition = None;
        {
            let mut inner = self.inner.lock();
            inner.consecutive_successes = inner.consecutive_successes.saturating_add(1);
            inner.consecutive_failures = 0;
            inner.total_successes += 1;
            inner.last_success_at = Some(now);

            if inner.state == State::HalfOpen
                && inner.consecutive_successes >= self.config.success_threshold
            {
                transition = self.transition(&mut inner, State::Closed, now);
            }
        }
        self.publish(transition);
    }

    /// Record a failed call.
    pub fn on_failure(&self, error: &NormalizedError) {
        let now = self.clock.now_millis();
        let mut transition = None;
        {
            let mut inner = self.inner.lock();
            let period = self.config.monitoring_period.as_millis() as u64;
            if let Some(last) = inner.last_failure_at {
                if now.saturating_sub(last) > period {
                    inner.consecutive_failures = 0;
                }
            }

            inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
            inner.consecutive_successes = 0;
            inner.total_failures += 1;
            inner.last_failure_at = Some(now);

            let trips = inner.state == State::HalfOpen
                || inner.consecutive_failures >= self.config.failure_threshold;
            if trips && inner.state != State::Open {
                warn!(
                    breaker = %self.name,
                    consecutive_failures = inner.consecutive_failures,
                    threshold = self.config.failure_threshold,
                    code = %error.code(),
                    "Circuit breaker opening"
                );
                transition = self.transition(&mut inner, State::Open, now);
            }
        }
        self.publish(transition);
    }

    /// Force the breaker closed and forget all history.
    pub fn reset(&self) {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = inner.state;
            *inner = Inner::default();
            previous
        };
        if previous != State::Closed {
            self.publish(Some(StateTransition::new(
                previous,
                State::Closed,
                self.clock.now_millis(),
            )));
        }
    }

    pub fn stats(&self) -> CircuitBreakerStats {
        let inner = self.inner.lock();
        CircuitBreakerStats {
            name: self.name.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
            total_failures: inner.total_failures,
            total_successes: inner.total_successes,
            total_requests: inner.total_requests,
            rejected_requests: inner.rejected_requests,
            last_failure_at: inner.last_failure_at,
            last_success_at: inner.last_success_at,
            next_attempt_at: inner.next_attempt_at,
            open_count: inner.open_count,
            transitions: inner.transitions.to_vec(),
        }
    }

    fn transition(&self, inner: &mut Inner, to: State, now: u64) -> Option<StateTransition> {
        let from = inner.state;
        if from == to {
            return None;
        }
        inner.state = to;
        match to {
            State::Open => {
                inner.next_attempt_at = Some(now + self.config.open_timeout.as_millis() as u64);
                inner.open_count += 1;
                inner.half_open_in_flight = 0;
            }
            State::HalfOpen => {
                inner.consecutive_successes = 0;
                inner.half_open_in_flight = 0;
                inner.half_open_epoch += 1;
            }
            State::Closed => {
                inner.consecutive_failures = 0;
                inner.consecutive_successes = 0;
                inner.half_open_in_flight = 0;
                inner.next_attempt_at = None;
            }
        }
        let transition = StateTransition::new(from, to, now);
        inner.transitions.push(transition.clone());
        Some(transition)
    }

    fn publish(&self, transition: Option<StateTransition>) {
        if let Some(t) = transition {
            debug!(breaker = %self.name, from = %t.from_state, to = %t.to_state, "circuit state changed");
            self.events.emit(&GatewayEvent::CircuitStateChanged {
                breaker: self.name.clone(),
                from: t.from_state.to_string(),
                to: t.to_state.to_string(),
            });
        }
    }
}
