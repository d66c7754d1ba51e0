//! The gateway: one entry point composing validation, circuit breaking, retry,
//! caching and fallback.

pub mod config;
pub mod health;
pub mod orchestrator;

pub use config::GatewayConfig;
pub use health::HealthReport;
pub use orchestrator::{Gateway, GatewayBuilder};
