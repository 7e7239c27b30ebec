//! Response headers stage.
//!
//! Stamps correlation headers on every outgoing response:
//!
//! - `X-Request-ID` - the request ID assigned by the request-ID stage
//! - `traceparent` - the trace context established by the tracing stage
//!
//! Clients use these to correlate their requests with server logs and
//! distributed traces.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::request_id::REQUEST_ID_HEADER;
use crate::stages::tracing::TRACEPARENT_HEADER;
use crate::state::RequestState;
use crate::types::{Request, Response};
use http::HeaderValue;

/// Stage that stamps correlation headers on responses.
#[derive(Debug, Clone, Default)]
pub struct ResponseHeadersStage;

impl ResponseHeadersStage {
    /// Creates a new response headers stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Writes `X-Request-ID` and `traceparent` from the request state onto a
/// response.
///
/// Also used by the recovery stage: a panic unwinds past this stage's
/// post-pass, so the recovered 500 stamps its own headers.
pub(crate) fn stamp_correlation_headers(state: &RequestState, response: &mut Response) {
    if let Ok(value) = HeaderValue::from_str(&state.request_id().to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    if let (Some(trace_id), Some(span_id)) = (state.trace_id(), state.span_id()) {
        let traceparent = format!("00-{trace_id}-{span_id}-01");
        if let Ok(value) = HeaderValue::from_str(&traceparent) {
            response.headers_mut().insert(TRACEPARENT_HEADER, value);
        }
    }
}

impl Middleware for ResponseHeadersStage {
    fn name(&self) -> &'static str {
        "response_headers"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let mut response = next.run(state, request).await;
            stamp_correlation_headers(state, &mut response);
            response
        })
    }
}
