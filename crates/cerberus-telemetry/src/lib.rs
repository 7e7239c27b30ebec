//! Observability for the Cerberus stack.
//!
//! This crate provides the two ambient concerns every Cerberus service
//! carries:
//!
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//! - **Logging**: Structured JSON logging via `tracing-subscriber`, with a
//!   plain human-readable toggle for local development
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `cerberus_requests_total` | Counter | `method`, `status` | Total request count |
//! | `cerberus_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `cerberus_in_flight_requests` | Gauge | - | Currently processing requests |
//! | `cerberus_auth_rejections_total` | Counter | `mechanism` | Rejected requests |
//! | `cerberus_log_events_total` | Counter | `level` | Emitted log lines |
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = TelemetryConfig::default();
//!     init_telemetry(&config)?;
//!
//!     // Telemetry is now active...
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};
pub use metrics::{init_metrics, InFlightGuard, MetricsConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Combined telemetry configuration.
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

/// Initializes all telemetry subsystems.
///
/// Logging is initialized first so that metrics setup failures are logged
/// through the configured subscriber.
///
/// # Errors
///
/// Returns `TelemetryError` if any subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;
    Ok(())
}
