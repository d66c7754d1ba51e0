//! Testing utilities for AIGate.
//!
//! Provides a scriptable [`VendorAdapter`](aigate_kernel::VendorAdapter) and
//! an [`EventSink`](aigate_kernel::EventSink) that records everything it
//! receives, for driving the gateway end to end without a real upstream.

pub mod sink;
pub mod vendor;

pub use sink::RecordingSink;
pub use vendor::{ScriptedReply, ScriptedVendor};
