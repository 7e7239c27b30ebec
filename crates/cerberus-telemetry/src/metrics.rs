//! Prometheus metrics for Cerberus.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `cerberus_requests_total` | Counter | `method`, `status` | Total requests |
//! | `cerberus_request_duration_seconds` | Histogram | `method` | Request latency |
//! | `cerberus_in_flight_requests` | Gauge | - | In-flight requests |
//! | `cerberus_auth_rejections_total` | Counter | `mechanism` | Rejected requests |
//! | `cerberus_log_events_total` | Counter | `level` | Emitted log lines |
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_telemetry::metrics::record_request;
//!
//! // Record a completed request
//! record_request("GET", 200, Duration::from_millis(45));
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics handle for rendering.
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Address to expose metrics on (e.g., "0.0.0.0:9090").
    pub addr: String,

    /// Service name for metric labels.
    pub service_name: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            service_name: "cerberus".to_string(),
        }
    }
}

/// Initializes the metrics subsystem.
///
/// Installing the recorder twice in one process is a configuration mistake
/// that would otherwise abort the second service stack; a repeated call is
/// therefore a no-op once a handle exists.
///
/// # Errors
///
/// Returns `TelemetryError::MetricsInit` if the exporter fails to install.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let builder = PrometheusBuilder::new();

    let handle = builder
        .with_http_listener(addr)
        .install_recorder()
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let _ = METRICS_HANDLE.set(handle);

    describe_stack_metrics();

    Ok(())
}

/// Renders metrics in Prometheus format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for all standard stack metrics.
///
/// Called once per process by the stack assembler; a second assembly skips
/// it when duplicate setup is flagged.
pub fn describe_stack_metrics() {
    describe_counter!(
        "cerberus_requests_total",
        "Total number of HTTP requests processed"
    );

    describe_histogram!(
        "cerberus_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    describe_gauge!(
        "cerberus_in_flight_requests",
        "Number of HTTP requests currently being processed"
    );

    describe_counter!(
        "cerberus_auth_rejections_total",
        "Total requests rejected by the authentication stack"
    );

    describe_counter!(
        "cerberus_log_events_total",
        "Total log events emitted by the request log, by level"
    );
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Records a completed request.
///
/// Updates the following metrics:
/// - `cerberus_requests_total` (incremented)
/// - `cerberus_request_duration_seconds` (histogram observation)
///
/// # Arguments
///
/// * `method` - The HTTP method (e.g., "GET")
/// * `status_code` - HTTP status code
/// * `duration` - Request duration
pub fn record_request(method: &str, status_code: u16, duration: Duration) {
    counter!(
        "cerberus_requests_total",
        "method" => method.to_string(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(
        "cerberus_request_duration_seconds",
        "method" => method.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Increments the in-flight requests gauge.
pub fn increment_in_flight() {
    gauge!("cerberus_in_flight_requests").increment(1.0);
}

/// Decrements the in-flight requests gauge.
pub fn decrement_in_flight() {
    gauge!("cerberus_in_flight_requests").decrement(1.0);
}

/// Records a rejected request.
///
/// # Arguments
///
/// * `mechanism` - Which check rejected it (e.g., "bearer", "unauthenticated")
pub fn record_auth_rejection(mechanism: &str) {
    counter!(
        "cerberus_auth_rejections_total",
        "mechanism" => mechanism.to_string()
    )
    .increment(1);
}

/// Records an emitted log event.
///
/// # Arguments
///
/// * `level` - Log level of the event (e.g., "info", "warn")
pub fn record_log_event(level: &str) {
    counter!(
        "cerberus_log_events_total",
        "level" => level.to_string()
    )
    .increment(1);
}

/// Guard that decrements in-flight requests on drop.
///
/// Use this to ensure the in-flight counter is always decremented, even on
/// panic.
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Creates a new guard and increments the in-flight counter.
    #[must_use]
    pub fn new() -> Self {
        increment_in_flight();
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        decrement_in_flight();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.addr, "0.0.0.0:9090");
    }

    #[test]
    fn test_in_flight_guard() {
        // Can't observe the global counter without init, but the guard must not panic
        let _guard = InFlightGuard::new();
        drop(_guard);
    }

    #[test]
    fn test_record_functions_dont_panic() {
        // These should not panic even without init (metrics crate handles gracefully)
        record_request("GET", 200, Duration::from_millis(10));
        record_auth_rejection("bearer");
        record_log_event("info");
        describe_stack_metrics();
    }

    #[test]
    fn test_disabled_metrics_init() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_invalid_address() {
        let config = MetricsConfig {
            addr: "not-an-addr".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }
}
