//! Fallback Resolver
//!
//! Produces a usable result after the primary path failed. A cache hit always
//! wins; otherwise the configured strategy decides.

use aigate_kernel::{GatewayResult, NormalizedError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::cache::{DEFAULT_TTL, ResultCache};
use crate::tasks::TaskRegistry;

/// Fallback strategy types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FallbackStrategy {
    /// Deterministic mock result from the task's mock producer
    Mock,
    /// Previously cached result only; a miss is an error
    Cached,
    /// Conservative neutral placeholder
    #[default]
    Degraded,
    /// Surface the causing error unchanged
    None,
}

impl std::fmt::Display for FallbackStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FallbackStrategy::Mock => "MOCK",
            FallbackStrategy::Cached => "CACHED",
            FallbackStrategy::Degraded => "DEGRADED",
            FallbackStrategy::None => "NONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub strategy: FallbackStrategy,
    /// Consult the result cache before applying the strategy
    pub enable_caching: bool,
    #[serde(rename = "cache_ttl_ms", with = "crate::duration_ms")]
    pub cache_ttl: Duration,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            strategy: FallbackStrategy::Degraded,
            enable_caching: true,
            cache_ttl: DEFAULT_TTL,
        }
    }
}

impl FallbackConfig {
    pub fn with_strategy(mut self, strategy: FallbackStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FallbackResolver {
    config: FallbackConfig,
    cache: Arc<ResultCache>,
    tasks: Arc<TaskRegistry>,
}

impl FallbackResolver {
    pub fn new(config: FallbackConfig, cache: Arc<ResultCache>, tasks: Arc<TaskRegistry>) -> Self {
        Self { config, cache, tasks }
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// Resolve a result for `task` after `causing_error`.
    ///
    /// Errors from a mock or degraded producer are returned as-is; there is no
    /// further fallback.
    pub fn handle(&self, task: &str, payload: &Value, causing_error: NormalizedError) -> GatewayResult<Value> {
        if self.config.enable_caching {
            if let Some(hit) = self.cache.get(task, payload) {
                debug!(task, "Fallback served from cache");
                return Ok(hit);
            }
        }

        match self.config.strategy {
            FallbackStrategy::Mock => {
                let definition = self.definition(task)?;
                definition.mock.produce(task, payload)
            }
            FallbackStrategy::Degraded => {
                let definition = self.definition(task)?;
                definition.degraded.produce(task, payload)
            }
            FallbackStrategy::Cached => Err(NormalizedError::ai_service_error(format!(
                "no cached result available for task '{task}'"
            ))),
            FallbackStrategy::None => Err(causing_error),
        }
    }

    /// Write-through used on primary-path success. A no-op when caching is
    /// disabled.
    pub fn cache_result(&self, task: &str, payload: &Value, result: &Value, correlation_id: Option<&str>) {
        if !self.config.enable_caching {
            return;
        }
        self.cache.set(task, payload, result.clone(), correlation_id);
    }

    fn definition(&self, task: &str) -> GatewayResult<&crate::tasks::TaskDefinition> {
        self.tasks
            .get(task)
            .ok_or_else(|| NormalizedError::ai_service_error(format!("no fallback registered for task '{task}'")))
    }
}
