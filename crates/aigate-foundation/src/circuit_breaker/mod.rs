//! Circuit Breaker Pattern Implementation
//!
//! Guards calls to a named downstream dependency, failing fast while the
//! dependency is known to be unhealthy.
//!
//! - [`CircuitBreaker`]: the per-key state machine
//! - [`CircuitBreakerRegistry`]: atomic get-or-create of breakers by key
//! - [`CircuitBreakerStats`]: serializable snapshots with transition history
//!
//! # Architecture
//!
//! ```text
//!     +---------+   consecutive failures >= threshold   +--------+
//!     | CLOSED  | ------------------------------------> |  OPEN  |
//!     +---------+                                       +--------+
//!          ^                                             |    ^
//!          | consecutive successes >= threshold          |    | probe fails
//!          |                               now >= next_  |    |
//!          |                               attempt_at    v    |
//!          |                                        +-------------+
//!          +--------------------------------------- |  HALF-OPEN  |
//!                                                   +-------------+
//! ```
//!
//! The breaker never retries and never swallows the underlying failure: it
//! only decides whether the call is attempted at all.

pub mod config;
pub mod metrics;
pub mod registry;
pub mod state;

pub use config::CircuitBreakerConfig;
pub use metrics::{CircuitBreakerStats, StateTransition};
pub use registry::CircuitBreakerRegistry;
pub use state::{CircuitBreaker, State};
