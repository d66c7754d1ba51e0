//! AIGate kernel: the contracts shared by every layer of the resilient
//! outbound-call gateway.
//!
//! Concrete implementations (circuit breaker, retry executor, cache, fallback
//! resolver, orchestrator) live in `aigate-foundation`. The kernel must never
//! depend on foundation.

// error module
pub mod error;
pub use error::{
    ErrorCode, GatewayResult, IntoKernelReport, KernelError, KernelResult, NormalizedError, RawError,
    ValidationError, VendorError, normalize_error,
};

// clock module
pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

// collaborator contracts
pub mod collaborators;
pub use collaborators::{AcceptAllValidator, ResultProducer, SchemaValidator, VendorAdapter};

// semantic events
pub mod events;
pub use events::{EventLevel, EventSink, GatewayEvent, NoopEventSink, ResultSource};

// config loader
#[cfg(feature = "config")]
pub mod config;
