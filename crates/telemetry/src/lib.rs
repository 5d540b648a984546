//! Telemetry for the feedback funnel.
//!
//! Structured logging through `tracing`, process-local counters that the
//! health endpoint and logs expose, and a health registry for the store
//! and queue backends.

pub mod health;
pub mod metrics;
pub mod tracing_setup;

pub use health::*;
pub use metrics::*;
pub use tracing_setup::*;
