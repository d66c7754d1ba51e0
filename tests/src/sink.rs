use aigate_kernel::{EventSink, GatewayEvent};
use parking_lot::Mutex;

/// Event sink that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<GatewayEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events.lock().clone()
    }

    /// Event names in emission order.
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(GatewayEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }

    /// Events that belong to one request.
    pub fn for_correlation_id(&self, correlation_id: &str) -> Vec<GatewayEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.correlation_id() == Some(correlation_id))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &GatewayEvent) {
        self.events.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_filters() {
        let sink = RecordingSink::new();
        sink.emit(&GatewayEvent::RequestStarted {
            correlation_id: "a".to_string(),
            task: "score".to_string(),
            vendor: "openai".to_string(),
        });
        sink.emit(&GatewayEvent::CircuitStateChanged {
            breaker: "ai-openai".to_string(),
            from: "closed".to_string(),
            to: "open".to_string(),
        });

        assert_eq!(sink.names(), vec!["request_started", "circuit_state_changed"]);
        assert_eq!(sink.count("request_started"), 1);
        assert_eq!(sink.for_correlation_id("a").len(), 1);

        sink.clear();
        assert!(sink.events().is_empty());
    }
}
