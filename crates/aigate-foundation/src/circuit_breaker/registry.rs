//! Breakers keyed by downstream name, created lazily on first use.

use aigate_kernel::{Clock, EventSink, NoopEventSink, SystemClock};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use super::config::CircuitBreakerConfig;
use super::metrics::CircuitBreakerStats;
use super::state::CircuitBreaker;

/// Registry of circuit breakers.
///
/// `get_or_create` goes through the map's entry API, so concurrent first
/// access for one key always yields the same breaker instance.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
    overrides: HashMap<String, CircuitBreakerConfig>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl CircuitBreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self::with_clock(default_config, Arc::new(SystemClock), Arc::new(NoopEventSink))
    }

    pub fn with_clock(
        default_config: CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config,
            overrides: HashMap::new(),
            clock,
            events,
        }
    }

    /// Use `config` instead of the default for breakers named `name`.
    pub fn with_override(mut self, name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        self.overrides.insert(name.into(), config);
        self
    }

    /// The configuration a breaker named `name` is (or would be) created with.
    pub fn effective_config(&self, name: &str) -> CircuitBreakerConfig {
        self.overrides
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.default_config.clone())
    }

    pub fn get_or_create(&self, name: &str) -> Arc<CircuitBreaker> {
        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            Arc::new(CircuitBreaker::with_clock(
                name,
                self.effective_config(name),
                Arc::clone(&self.clock),
                Arc::clone(&self.events),
            ))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|b| Arc::clone(b.value()))
    }

    /// Snapshots of every breaker, sorted by name.
    pub fn stats(&self) -> Vec<CircuitBreakerStats> {
        let mut stats: Vec<_> = self.breakers.iter().map(|b| b.value().stats()).collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }

    /// Reset one breaker. Returns `false` if no breaker has that name.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        let breakers: Vec<_> = self.breakers.iter().map(|b| Arc::clone(b.value())).collect();
        for breaker in breakers {
            breaker.reset();
        }
    }

    /// Drop every breaker; the next reference recreates it fresh.
    pub fn clear(&self) {
        self.breakers.clear();
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
