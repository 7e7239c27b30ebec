//! Metrics emission stage.
//!
//! Records the standard request metrics for every request:
//!
//! - `cerberus_requests_total` - counter by method and status
//! - `cerberus_request_duration_seconds` - latency histogram by method
//! - `cerberus_in_flight_requests` - gauge, guarded so panics still decrement

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use cerberus_telemetry::metrics::{record_request, InFlightGuard};
use std::time::Instant;

/// Stage that emits request metrics.
#[derive(Debug, Clone, Default)]
pub struct MetricsStage;

impl MetricsStage {
    /// Creates a new metrics stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for MetricsStage {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let _guard = InFlightGuard::new();
            let start = Instant::now();
            let method = request.method().to_string();

            let response = next.run(state, request).await;

            record_request(&method, response.status().as_u16(), start.elapsed());

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    fn create_test_request() -> Request {
        HttpRequest::builder()
            .method("GET")
            .uri("/users/123")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_passes_response_through() {
        let stage = MetricsStage::new();
        let mut state = RequestState::new();

        let next = Next::handler(|_state, _req| {
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap()
            })
        });

        let response = stage
            .process(&mut state, create_test_request(), next)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_records_error_responses() {
        let stage = MetricsStage::new();
        let mut state = RequestState::new();

        let next = Next::handler(|_state, _req| {
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::NOT_FOUND)
                    .body(Full::new(Bytes::new()))
                    .unwrap()
            })
        });

        let response = stage
            .process(&mut state, create_test_request(), next)
            .await;

        // Recording must not alter the response
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_middleware_name() {
        assert_eq!(MetricsStage::new().name(), "metrics");
    }
}
