//! Stack stage implementations.
//!
//! The assembler in [`crate::stack`] installs these in a fixed order:
//!
//! 1. [`cancellation`] - Diagnostic boundary, logs abandoned requests
//! 2. [`request_id`] - Generate/propagate request ID (UUID v7)
//! 3. [`tracing`] - Establish trace correlation IDs
//! 4. [`request_log`] - One structured completion line per request
//! 5. [`recovery`] - Convert downstream panics to 500
//! 6. [`response_headers`] - Stamp `X-Request-ID` / `traceparent`
//! 7. [`cors`] - Preflight handling and CORS headers (optional)
//! 8. [`metrics`] - Request counters, latency, in-flight gauge
//! 9. [`jwt`] - Bearer token validation (optional)
//! 10. [`basic_auth`] - Basic credential validation (optional)
//! 11. [`auth_required`] - The gate (unless enforcement is disabled)
//! 12. [`timeout`] - Per-request deadline (optional, innermost)

pub mod auth_required;
pub mod basic_auth;
pub mod cancellation;
pub mod cors;
pub mod jwt;
pub mod metrics;
pub mod recovery;
pub mod request_id;
pub mod request_log;
pub mod response_headers;
pub mod timeout;
pub mod tracing;

// Re-export main types
pub use auth_required::{AuthRequiredStage, GateDecision};
pub use basic_auth::BasicAuthStage;
pub use cancellation::CancellationProbe;
pub use cors::CorsStage;
pub use jwt::JwtValidatorStage;
pub use metrics::MetricsStage;
pub use recovery::RecoveryStage;
pub use request_id::RequestIdStage;
pub use request_log::RequestLogStage;
pub use response_headers::ResponseHeadersStage;
pub use timeout::TimeoutStage;
pub use tracing::TracingStage;
