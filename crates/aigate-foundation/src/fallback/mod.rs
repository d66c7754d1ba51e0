//! Fallback resolution and the result cache behind it.
//!
//! The cache is shared: the orchestrator writes primary-path successes through
//! [`FallbackResolver::cache_result`], and the resolver reads them back when the
//! primary path fails.

pub mod cache;
pub mod resolver;

pub use cache::{CacheStats, ResultCache};
pub use resolver::{FallbackConfig, FallbackResolver, FallbackStrategy};
