//! Prometheus metrics and structured logging for bitdash.
//!
//! - Structured logging with tracing (pretty for development, JSON in production)
//! - Prometheus counters and gauges for REST polls, streams and dashboard clients

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
