//! Structured logging for Cerberus.
//!
//! This module initializes the tracing-subscriber stack. Production services
//! log JSON; setting [`LogConfig::plain_format`] switches to a human-readable
//! pretty format for local development (the equivalent of a `LOG_STYLE=plain`
//! toggle).
//!
//! # Example
//!
//! ```rust,ignore
//! use cerberus_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::default();
//! init_logging(&config)?;
//!
//! tracing::info!(request_id = %id, http.method = "GET", "Request started");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log level (e.g., "info", "debug", "warn").
    pub level: String,

    /// Whether to use the human-readable format instead of JSON.
    pub plain_format: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Service name for log fields.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            plain_format: false, // JSON by default for production
            include_target: true,
            service_name: "cerberus".to_string(),
        }
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            plain_format: true,
            ..Self::default()
        }
    }
}

/// Layer that counts every emitted log event in
/// `cerberus_log_events_total`, keyed by level.
///
/// Installed alongside the format layer so log volume is observable for
/// all stages and modules, not just the request log.
#[derive(Debug, Clone, Default)]
pub struct LogEventCounter;

impl<S: Subscriber> Layer<S> for LogEventCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        crate::metrics::record_log_event(level_label(event.metadata().level()));
    }
}

fn level_label(level: &Level) -> &'static str {
    if *level == Level::ERROR {
        "error"
    } else if *level == Level::WARN {
        "warn"
    } else if *level == Level::INFO {
        "info"
    } else if *level == Level::DEBUG {
        "debug"
    } else {
        "trace"
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level filter is invalid or
/// a global subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))?;

    // The counter sees the same lines the format layer emits
    let counter_filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("Invalid log level: {e}")))?;
    if config.plain_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(LogEventCounter.with_filter(counter_filter))
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(config.include_target)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(LogEventCounter.with_filter(counter_filter))
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    Ok(())
}

/// Standard log fields for Cerberus.
///
/// Use these field names for consistency across logs.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// Trace ID field name.
    pub const TRACE_ID: &str = "trace_id";

    /// Span ID field name.
    pub const SPAN_ID: &str = "span_id";

    /// HTTP method field name.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code field name.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Subject field name for authenticated callers.
    pub const SUBJECT: &str = "subject";

    /// Service name field name.
    pub const SERVICE_NAME: &str = "service.name";
}
