//! Circuit Breaker Metrics
//!
//! Snapshots of breaker counters and the recent history of state transitions.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::state::State;

/// How many transitions a breaker remembers.
pub const TRANSITION_HISTORY_LIMIT: usize = 100;

/// State transition event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state
    pub from_state: State,
    /// New state
    pub to_state: State,
    /// Timestamp of transition (milliseconds since Unix epoch)
    pub timestamp_ms: u64,
}

impl StateTransition {
    pub fn new(from_state: State, to_state: State, timestamp_ms: u64) -> Self {
        Self {
            from_state,
            to_state,
            timestamp_ms,
        }
    }
}

/// Bounded transition history; the oldest entry is dropped first.
#[derive(Debug, Default, Clone)]
pub(crate) struct TransitionLog {
    entries: VecDeque<StateTransition>,
}

impl TransitionLog {
    pub(crate) fn push(&mut self, transition: StateTransition) {
        if self.entries.len() >= TRANSITION_HISTORY_LIMIT {
            self.entries.pop_front();
        }
        self.entries.push_back(transition);
    }

    pub(crate) fn to_vec(&self) -> Vec<StateTransition> {
        self.entries.iter().cloned().collect()
    }
}

/// Point-in-time view of one circuit breaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitBreakerStats {
    pub name: String,
    pub state: State,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub total_failures: u64,
    pub total_successes: u64,
    pub total_requests: u64,
    pub rejected_requests: u64,
    pub last_failure_at: Option<u64>,
    pub last_success_at: Option<u64>,
    pub next_attempt_at: Option<u64>,
    /// How many times the circuit has opened.
    pub open_count: u64,
    pub transitions: Vec<StateTransition>,
}

impl CircuitBreakerStats {
    /// Failure rate over all completed calls, as a percentage (0-100).
    pub fn failure_rate(&self) -> f64 {
        let completed = self.total_failures + self.total_successes;
        if completed == 0 {
            return 0.0;
        }
        (self.total_failures as f64 / completed as f64) * 100.0
    }
}
