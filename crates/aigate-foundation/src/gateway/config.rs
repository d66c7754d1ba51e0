//! Runtime feature toggles of the gateway.

use serde::{Deserialize, Serialize};

/// Process-wide gateway configuration.
///
/// Read by every `ask()` as one snapshot taken when the call starts, so a
/// concurrent `configure()` never changes the behavior of a call in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct GatewayConfig {
    /// Name of the active vendor adapter
    pub vendor: String,
    pub enable_circuit_breaker: bool,
    pub enable_retry: bool,
    pub enable_fallback: bool,
    pub enable_caching: bool,
    pub enable_validation: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            vendor: "openai".to_string(),
            enable_circuit_breaker: true,
            enable_retry: true,
            enable_fallback: true,
            enable_caching: true,
            enable_validation: true,
        }
    }
}

impl GatewayConfig {
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Breaker key for the active vendor.
    pub fn breaker_key(&self) -> String {
        format!("ai-{}", self.vendor)
    }
}
