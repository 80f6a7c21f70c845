//! Telemetry module for logging and metrics.
//!
//! Provides:
//! - Logging initialization driven by the config file's `[logging]` section
//! - Metrics collection for FIB control-plane statistics

mod logging;
mod metrics;

pub use logging::init_logging;
pub use metrics::{Counter, FibMetrics};
