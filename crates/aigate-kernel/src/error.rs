//! Error taxonomy for the gateway.
//!
//! Every layer (circuit breaker, retry executor, fallback resolver,
//! orchestrator) speaks a single error currency, [`NormalizedError`], threaded
//! explicitly through [`GatewayResult`]. Errors raised by collaborators enter
//! the system as a [`RawError`] and are turned into a [`NormalizedError`] by
//! [`normalize_error`].
//!
//! Configuration loading uses [`KernelError`] wrapped in an
//! [`error_stack::Report`] so that context can be attached as it propagates.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias for every fallible gateway operation.
pub type GatewayResult<T> = Result<T, NormalizedError>;

/// Machine-readable error code.
///
/// Serializes as its SCREAMING_SNAKE_CASE string so that retryable-code sets
/// can be configured as plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The inbound request did not match the task's input schema.
    ValidationFailed,
    /// A payload (usually the vendor response) did not match its schema.
    SchemaValidationFailed,
    /// Circuit open or fallback exhausted.
    ServiceUnavailable,
    Timeout,
    NetworkError,
    ExternalServiceError,
    RateLimited,
    /// Synthetic error raised by the cached fallback strategy on a miss.
    AiServiceError,
    UnknownError,
    /// Vendor specific or otherwise unrecognised code.
    Other(String),
}

impl ErrorCode {
    /// The canonical string form of this code.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::SchemaValidationFailed => "SCHEMA_VALIDATION_FAILED",
            ErrorCode::ServiceUnavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::AiServiceError => "AI_SERVICE_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::Other(code) => code,
        }
    }

    /// Parse a code string, mapping unknown codes to [`ErrorCode::Other`].
    pub fn parse(code: &str) -> Self {
        match code {
            "VALIDATION_FAILED" => ErrorCode::ValidationFailed,
            "SCHEMA_VALIDATION_FAILED" => ErrorCode::SchemaValidationFailed,
            "SERVICE_UNAVAILABLE" => ErrorCode::ServiceUnavailable,
            "TIMEOUT" => ErrorCode::Timeout,
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "EXTERNAL_SERVICE_ERROR" => ErrorCode::ExternalServiceError,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "AI_SERVICE_ERROR" => ErrorCode::AiServiceError,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// Caller or contract bugs: never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed | ErrorCode::SchemaValidationFailed
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        ErrorCode::parse(code)
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(ErrorCode::parse(&code))
    }
}

/// The one error shape callers of the gateway ever observe.
///
/// Immutable once built: the `with_*` methods consume `self` and return a new
/// value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct NormalizedError {
    code: ErrorCode,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl NormalizedError {
    pub fn new(code: impl Into<ErrorCode>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            correlation_id: None,
            retryable: None,
            status_code: None,
            retry_after_ms: None,
            details: Vec::new(),
        }
    }

    /// Inbound payload rejected by the task's input schema.
    pub fn validation_failed(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
            .with_retryable(false)
            .with_details(details)
    }

    /// A value rejected by a schema after the request was accepted.
    pub fn schema_validation_failed(message: impl Into<String>, details: Vec<String>) -> Self {
        Self::new(ErrorCode::SchemaValidationFailed, message)
            .with_retryable(false)
            .with_details(details)
    }

    /// Fast-fail rejection; `retry_after` tells the caller when to come back.
    pub fn service_unavailable(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let mut err = Self::new(ErrorCode::ServiceUnavailable, message).with_retryable(false);
        err.retry_after_ms = retry_after.map(|d| d.as_millis() as u64);
        err
    }

    pub fn ai_service_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AiServiceError, message).with_retryable(false)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnknownError, message)
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Explicit retryability, if the producer of the error decided it.
    pub fn retryable(&self) -> Option<bool> {
        self.retryable
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }
}

/// Error raised by a vendor adapter.
///
/// Mirrors the `{code?, message, statusCode?}` shape upstream SDKs produce.
#[derive(Debug, Error)]
pub enum VendorError {
    #[error("{message}")]
    Api {
        code: Option<String>,
        message: String,
        status: Option<u16>,
    },

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl VendorError {
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        VendorError::Api {
            code: Some(code.into()),
            message: message.into(),
            status: None,
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        VendorError::Api {
            code: None,
            message: message.into(),
            status: Some(status),
        }
    }
}

impl From<VendorError> for NormalizedError {
    fn from(err: VendorError) -> Self {
        match err {
            VendorError::Api {
                code,
                message,
                status,
            } => {
                let code = match (code, status) {
                    (Some(code), _) => ErrorCode::parse(&code),
                    (None, Some(429)) => ErrorCode::RateLimited,
                    (None, Some(s)) if (500..600).contains(&s) => ErrorCode::ExternalServiceError,
                    (None, Some(s)) => ErrorCode::Other(format!("HTTP_{s}")),
                    (None, None) => ErrorCode::ExternalServiceError,
                };
                let err = NormalizedError::new(code, message);
                match status {
                    Some(s) => err.with_status_code(s),
                    None => err,
                }
            }
            VendorError::Timeout(message) => NormalizedError::new(ErrorCode::Timeout, message),
            VendorError::Network(message) => NormalizedError::new(ErrorCode::NetworkError, message),
            VendorError::RateLimited(message) => {
                NormalizedError::new(ErrorCode::RateLimited, message).with_status_code(429)
            }
            VendorError::Other(source) => {
                NormalizedError::new(ErrorCode::ExternalServiceError, source.to_string())
            }
        }
    }
}

/// Structured schema validation failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("validation against '{schema_id}' failed: {}", .details.join("; "))]
pub struct ValidationError {
    pub schema_id: String,
    pub details: Vec<String>,
}

impl ValidationError {
    pub fn new(schema_id: impl Into<String>, details: Vec<String>) -> Self {
        Self {
            schema_id: schema_id.into(),
            details,
        }
    }
}

impl From<ValidationError> for NormalizedError {
    fn from(err: ValidationError) -> Self {
        let message = err.to_string();
        NormalizedError::schema_validation_failed(message, err.details)
    }
}

/// Anything a collaborator may fail with before it has been normalized.
#[derive(Debug)]
pub enum RawError {
    Normalized(NormalizedError),
    Vendor(VendorError),
    Validation(ValidationError),
    /// A generic error together with the name of its concrete type.
    Exception {
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// An untyped value, e.g. a JSON error body.
    Value(serde_json::Value),
}

impl RawError {
    /// Wrap a concrete error, recording its type name.
    pub fn exception<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let full = std::any::type_name::<E>();
        let name = full.rsplit("::").next().unwrap_or(full).to_string();
        RawError::Exception {
            name,
            source: Box::new(err),
        }
    }
}

impl From<NormalizedError> for RawError {
    fn from(err: NormalizedError) -> Self {
        RawError::Normalized(err)
    }
}

impl From<VendorError> for RawError {
    fn from(err: VendorError) -> Self {
        RawError::Vendor(err)
    }
}

impl From<ValidationError> for RawError {
    fn from(err: ValidationError) -> Self {
        RawError::Validation(err)
    }
}

impl From<serde_json::Value> for RawError {
    fn from(value: serde_json::Value) -> Self {
        RawError::Value(value)
    }
}

/// Map any raised value into a [`NormalizedError`].
///
/// Preference order: an existing `{code, message}` shape, then structured
/// validation errors (`SCHEMA_VALIDATION_FAILED`), then generic errors
/// (`{code: type name, retryable: false}`), then `UNKNOWN_ERROR` carrying the
/// stringified value.
pub fn normalize_error(raw: impl Into<RawError>) -> NormalizedError {
    match raw.into() {
        RawError::Normalized(err) => err,
        RawError::Vendor(err) => err.into(),
        RawError::Validation(err) => err.into(),
        RawError::Exception { name, source } => {
            NormalizedError::new(ErrorCode::Other(name), source.to_string()).with_retryable(false)
        }
        RawError::Value(value) => normalize_value(value),
    }
}

fn normalize_value(value: serde_json::Value) -> NormalizedError {
    if let serde_json::Value::Object(map) = &value {
        if let (Some(code), Some(message)) = (
            map.get("code").and_then(|c| c.as_str()),
            map.get("message").and_then(|m| m.as_str()),
        ) {
            let mut err = NormalizedError::new(ErrorCode::parse(code), message);
            let status = map
                .get("statusCode")
                .or_else(|| map.get("status_code"))
                .and_then(|s| s.as_u64())
                .and_then(|s| u16::try_from(s).ok());
            if let Some(status) = status {
                err = err.with_status_code(status);
            }
            if let Some(retryable) = map.get("retryable").and_then(|r| r.as_bool()) {
                err = err.with_retryable(retryable);
            }
            if let Some(id) = map.get("correlationId").and_then(|c| c.as_str()) {
                err = err.with_correlation_id(id);
            }
            return err;
        }
    }

    let message = match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    NormalizedError::unknown(message)
}

/// Crate-level error for loading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    #[cfg(feature = "config")]
    #[error("Config error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

/// Result alias using [`error_stack::Report`].
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;

/// Extension trait to convert `Result<T, E>` into [`KernelResult<T>`].
pub trait IntoKernelReport<T> {
    /// Wrap the error in an `error_stack::Report`.
    fn into_report(self) -> KernelResult<T>;
}

impl<T, E> IntoKernelReport<T> for Result<T, E>
where
    E: Into<KernelError>,
{
    #[inline]
    fn into_report(self) -> KernelResult<T> {
        self.map_err(|e| error_stack::Report::new(e.into()))
    }
}
