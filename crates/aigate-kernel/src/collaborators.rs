//! Contracts for the gateway's external collaborators.
//!
//! Per the microkernel rule, only the traits live here; concrete schema
//! validation, built-in producers and the orchestrator live in
//! `aigate-foundation`, while vendor adapters are supplied by the embedding
//! application.

use crate::error::{GatewayResult, ValidationError, VendorError};
use async_trait::async_trait;
use serde_json::Value;

/// A concrete upstream AI vendor.
///
/// Calls must be safe to repeat: the retry executor gives at-least-once
/// semantics, so a retried task may execute more than once upstream.
/// Adapters are expected to enforce their own per-call timeout.
#[async_trait]
pub trait VendorAdapter: Send + Sync {
    /// Vendor name; the circuit breaker key is `"ai-" + name`.
    fn name(&self) -> &str;

    /// Perform `task` with `payload`, returning the vendor's raw result.
    async fn call(&self, task: &str, payload: &Value) -> Result<Value, VendorError>;
}

/// Pure producer of a result for a task, used for mock and degraded
/// fallbacks.
///
/// Must be deterministic and must not fail for well-formed payloads. An error
/// returned anyway is propagated by the fallback resolver as-is.
pub trait ResultProducer: Send + Sync {
    fn produce(&self, task: &str, payload: &Value) -> GatewayResult<Value>;
}

impl<F> ResultProducer for F
where
    F: Fn(&str, &Value) -> GatewayResult<Value> + Send + Sync,
{
    fn produce(&self, task: &str, payload: &Value) -> GatewayResult<Value> {
        self(task, payload)
    }
}

/// Validates a value against a schema registered under `schema_id`.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, schema_id: &str, value: &Value) -> Result<(), ValidationError>;
}

/// Validator that accepts everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllValidator;

impl SchemaValidator for AcceptAllValidator {
    fn validate(&self, _schema_id: &str, _value: &Value) -> Result<(), ValidationError> {
        Ok(())
    }
}
