//! Admin and observability snapshot.

use serde::{Deserialize, Serialize};

use super::config::GatewayConfig;
use crate::circuit_breaker::CircuitBreakerStats;
use crate::fallback::CacheStats;
use crate::retry::RetryStatsSnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// Whether a call to the active vendor would currently be attempted
    pub available: bool,
    pub vendors: Vec<String>,
    pub circuit_breakers: Vec<CircuitBreakerStats>,
    pub retry: RetryStatsSnapshot,
    pub cache: CacheStats,
    pub config: GatewayConfig,
}
