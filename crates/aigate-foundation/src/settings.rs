//! Settings file for a gateway deployment.
//!
//! ```toml
//! [gateway]
//! vendor = "openai"
//! enable_retry = true
//!
//! [circuit_breaker]
//! failure_threshold = 5
//! open_timeout_ms = 60000
//!
//! [circuit_breaker_overrides.ai-anthropic]
//! failure_threshold = 3
//!
//! [retry]
//! max_attempts = 3
//! base_delay_ms = 1000
//! retryable_codes = ["TIMEOUT", "NETWORK_ERROR"]
//!
//! [fallback]
//! strategy = "DEGRADED"
//! ```
//!
//! Every value can be overridden from the environment with the `AIGATE_`
//! prefix and `__` between nesting levels, e.g.
//! `AIGATE_GATEWAY__ENABLE_RETRY=false`.

use aigate_kernel::config::{Format, from_str_with_env, load_config_with_env};
use aigate_kernel::{IntoKernelReport, KernelResult};
use error_stack::ResultExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::fallback::FallbackConfig;
use crate::fallback::cache::DEFAULT_MAX_SIZE;
use crate::gateway::{Gateway, GatewayBuilder, GatewayConfig};
use crate::logging::init_tracing;
use crate::retry::RetryConfig;

pub const ENV_PREFIX: &str = "AIGATE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_size: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub directive: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directive: "aigate=info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub gateway: GatewayConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    /// Per-breaker configuration, keyed by breaker name (`ai-<vendor>`)
    pub circuit_breaker_overrides: HashMap<String, CircuitBreakerConfig>,
    pub retry: RetryConfig,
    pub fallback: FallbackConfig,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

impl GatewaySettings {
    /// Load from a file in any supported format, then apply `AIGATE_*`
    /// environment overrides.
    pub fn load(path: &str) -> KernelResult<Self> {
        load_config_with_env(path, ENV_PREFIX)
            .into_report()
            .attach(format!("loading gateway settings from {path}"))
    }

    pub fn from_toml(content: &str) -> KernelResult<Self> {
        from_str_with_env(content, Format::Toml, ENV_PREFIX)
            .into_report()
            .attach("parsing gateway settings")
    }

    /// A gateway builder preconfigured from these settings. Vendors still have
    /// to be registered on it.
    pub fn gateway_builder(&self) -> GatewayBuilder {
        let builder = Gateway::builder()
            .config(self.gateway.clone())
            .circuit_breaker(self.circuit_breaker.clone())
            .retry(self.retry.clone())
            .fallback(self.fallback.clone())
            .cache_max_size(self.cache.max_size);
        self.circuit_breaker_overrides
            .iter()
            .fold(builder, |builder, (name, config)| {
                builder.breaker_override(name.clone(), config.clone())
            })
    }

    /// Install the global tracing subscriber described by `[logging]`.
    pub fn init_logging(&self) -> bool {
        init_tracing(&self.logging.directive, self.logging.json)
    }
}
