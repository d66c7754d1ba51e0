//! Structured logging for gateway events.

use aigate_kernel::{EventLevel, EventSink, GatewayEvent};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Event sink that forwards every [`GatewayEvent`] to `tracing`.
///
/// Each record carries `event` (the semantic name), `correlation_id` when the
/// event belongs to one request, and `detail` holding the event as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &GatewayEvent) {
        let name = event.name();
        let correlation_id = event.correlation_id().unwrap_or("-");
        let detail = serde_json::to_string(event).unwrap_or_default();
        match event.level() {
            EventLevel::Debug => debug!(target: "aigate", event = name, correlation_id, %detail, "{name}"),
            EventLevel::Info => info!(target: "aigate", event = name, correlation_id, %detail, "{name}"),
            EventLevel::Warn => warn!(target: "aigate", event = name, correlation_id, %detail, "{name}"),
            EventLevel::Error => error!(target: "aigate", event = name, correlation_id, %detail, "{name}"),
        }
    }
}

/// Install a global fmt subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when `RUST_LOG` is unset.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
    }
}
