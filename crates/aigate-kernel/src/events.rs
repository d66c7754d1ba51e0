//! Semantic log events emitted by the gateway.
//!
//! The logger collaborator is an [`EventSink`]. Sinks cannot fail, which keeps
//! logging from ever influencing control flow.

use serde::{Deserialize, Serialize};

/// Where a successful result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSource {
    Primary,
    Fallback,
}

/// One observable step of a gateway call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GatewayEvent {
    RequestStarted {
        correlation_id: String,
        task: String,
        vendor: String,
    },
    CircuitOpenRejected {
        correlation_id: String,
        task: String,
        breaker: String,
        retry_after_ms: Option<u64>,
    },
    RetryAttemptFailed {
        label: String,
        attempt: u32,
        max_attempts: u32,
        code: String,
        retryable: bool,
        /// Delay before the next attempt, absent when the loop gives up.
        next_delay_ms: Option<u64>,
    },
    FallbackInvoked {
        correlation_id: String,
        task: String,
        strategy: String,
        cause: String,
    },
    FallbackFailed {
        correlation_id: String,
        task: String,
        primary_error: String,
        fallback_error: String,
    },
    RequestCompleted {
        correlation_id: String,
        task: String,
        source: ResultSource,
        elapsed_ms: u64,
    },
    RequestFailed {
        correlation_id: String,
        task: String,
        code: String,
        message: String,
    },
    CircuitStateChanged {
        breaker: String,
        from: String,
        to: String,
    },
}

/// Severity hint for sinks that map events onto log levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl GatewayEvent {
    /// The semantic event name, e.g. `request_started`.
    pub fn name(&self) -> &'static str {
        match self {
            GatewayEvent::RequestStarted { .. } => "request_started",
            GatewayEvent::CircuitOpenRejected { .. } => "circuit_open_rejected",
            GatewayEvent::RetryAttemptFailed { .. } => "retry_attempt_failed",
            GatewayEvent::FallbackInvoked { .. } => "fallback_invoked",
            GatewayEvent::FallbackFailed { .. } => "fallback_failed",
            GatewayEvent::RequestCompleted { .. } => "request_completed",
            GatewayEvent::RequestFailed { .. } => "request_failed",
            GatewayEvent::CircuitStateChanged { .. } => "circuit_state_changed",
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            GatewayEvent::RequestStarted { .. } | GatewayEvent::RequestCompleted { .. } => {
                EventLevel::Info
            }
            GatewayEvent::RetryAttemptFailed { .. }
            | GatewayEvent::CircuitOpenRejected { .. }
            | GatewayEvent::FallbackInvoked { .. }
            | GatewayEvent::CircuitStateChanged { .. } => EventLevel::Warn,
            GatewayEvent::FallbackFailed { .. } | GatewayEvent::RequestFailed { .. } => {
                EventLevel::Error
            }
        }
    }

    /// Correlation ID, when the event belongs to a single request.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            GatewayEvent::RequestStarted { correlation_id, .. }
            | GatewayEvent::CircuitOpenRejected { correlation_id, .. }
            | GatewayEvent::FallbackInvoked { correlation_id, .. }
            | GatewayEvent::FallbackFailed { correlation_id, .. }
            | GatewayEvent::RequestCompleted { correlation_id, .. }
            | GatewayEvent::RequestFailed { correlation_id, .. } => Some(correlation_id),
            GatewayEvent::RetryAttemptFailed { label, .. } => Some(label),
            GatewayEvent::CircuitStateChanged { .. } => None,
        }
    }
}

/// Receives semantic events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &GatewayEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: &GatewayEvent) {}
}
