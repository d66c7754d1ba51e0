//! AIGate foundation: the resilient outbound-call gateway.
//!
//! Layers, leaf first:
//!
//! - [`retry::classifier`]: decides whether a failure is transient
//! - [`circuit_breaker`]: fails fast while a dependency is unhealthy
//! - [`retry`]: bounded retries with exponential backoff and jitter
//! - [`fallback`]: cache-first fallback strategies and the result cache
//! - [`gateway`]: the orchestrator composing all of the above
//!
//! Contracts and error types come from `aigate-kernel`.

pub(crate) mod at_least_one;
pub(crate) mod duration_ms;

// circuit breaker module
pub mod circuit_breaker;

// retry module
pub mod retry;

// fallback resolver and result cache
pub mod fallback;

// task registration table
pub mod tasks;

// JSON Schema validation
pub mod validation;

// gateway orchestrator
pub mod gateway;

// structured logging
pub mod logging;

// settings file
pub mod settings;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitBreakerStats, State,
};
pub use fallback::{CacheStats, FallbackConfig, FallbackResolver, FallbackStrategy, ResultCache};
pub use gateway::{Gateway, GatewayBuilder, GatewayConfig, HealthReport};
pub use logging::{TracingEventSink, init_tracing};
pub use retry::{
    RetryConfig, RetryExecutor, RetryOutcome, RetryStats, RetryStatsSnapshot, classify,
    create_retry_wrapper, retry_with_backoff,
};
pub use settings::GatewaySettings;
pub use tasks::{TaskDefinition, TaskRegistry};
pub use validation::JsonSchemaValidator;
