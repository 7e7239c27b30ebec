//! Request log stage.
//!
//! Emits one structured completion line per request with the standard
//! fields (request ID, method, path, status, duration). Lines are counted
//! in `cerberus_log_events_total` by the telemetry logging layer along
//! with every other emitted event.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};

/// Stage that logs request completion.
#[derive(Debug, Clone, Default)]
pub struct RequestLogStage;

impl RequestLogStage {
    /// Creates a new request log stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for RequestLogStage {
    fn name(&self) -> &'static str {
        "request_log"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let method = request.method().to_string();
            let path = request.uri().path().to_string();

            let response = next.run(state, request).await;

            let status = response.status().as_u16();
            let duration_ms = state.elapsed().as_secs_f64() * 1000.0;

            if response.status().is_server_error() {
                tracing::error!(
                    request_id = %state.request_id(),
                    trace_id = state.trace_id(),
                    http.method = %method,
                    http.path = %path,
                    http.status_code = status,
                    duration_ms,
                    "Request completed"
                );
            } else {
                tracing::info!(
                    request_id = %state.request_id(),
                    trace_id = state.trace_id(),
                    http.method = %method,
                    http.path = %path,
                    http.status_code = status,
                    duration_ms,
                    "Request completed"
                );
            }

            response
        })
    }
}
