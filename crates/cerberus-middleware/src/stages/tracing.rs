//! Tracing stage.
//!
//! This stage establishes trace correlation for each request. It parses
//! incoming [W3C Trace Context](https://www.w3.org/TR/trace-context/)
//! headers and generates fresh IDs when none are propagated:
//!
//! - `traceparent` - Contains trace ID, span ID, and trace flags
//!
//! The trace and span IDs land in [`RequestState`] so the request log can
//! correlate lines and the response headers stage can echo a `traceparent`
//! back to the caller. The rest of the chain runs inside a `tracing` span
//! carrying the correlation fields, so every downstream log line inherits
//! them.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use tracing::Instrument;
use uuid::Uuid;

/// The W3C Trace Context header for trace propagation.
pub const TRACEPARENT_HEADER: &str = "traceparent";

/// Stage that establishes trace correlation IDs.
///
/// # Behavior
///
/// 1. Extract trace context from `traceparent` header if present
/// 2. Generate new trace ID if not propagated
/// 3. Create new span ID for this request
/// 4. Store trace context in [`RequestState`]
#[derive(Debug, Clone)]
pub struct TracingStage {
    /// The service name for span fields.
    service_name: String,
}

impl TracingStage {
    /// Creates a new tracing stage.
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// Extracts trace context from the `traceparent` header.
    fn extract_trace_context(&self, request: &Request) -> Option<TraceContext> {
        let header = request.headers().get(TRACEPARENT_HEADER)?;
        let value = header.to_str().ok()?;
        TraceContext::parse(value)
    }

    /// Generates a new trace ID (128-bit, 32 hex chars).
    fn generate_trace_id() -> String {
        Uuid::now_v7().simple().to_string()
    }

    /// Generates a new span ID (64-bit, 16 hex chars).
    fn generate_span_id() -> String {
        Uuid::now_v7().simple().to_string()[..16].to_string()
    }
}

impl Default for TracingStage {
    fn default() -> Self {
        Self::new("unknown")
    }
}

impl Middleware for TracingStage {
    fn name(&self) -> &'static str {
        "tracing"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let trace_context = self
                .extract_trace_context(&request)
                .unwrap_or_else(|| TraceContext {
                    trace_id: Self::generate_trace_id(),
                    parent_span_id: None,
                    flags: TraceFlags::SAMPLED,
                });

            let span_id = Self::generate_span_id();

            state.set_trace_id(trace_context.trace_id.clone());
            state.set_span_id(span_id.clone());

            let span = tracing::info_span!(
                "request",
                request_id = %state.request_id(),
                trace_id = %trace_context.trace_id,
                span_id = %span_id,
                parent_span_id = trace_context.parent_span_id.as_deref(),
                service.name = %self.service_name,
                http.method = %request.method(),
                http.path = %request.uri().path(),
            );

            next.run(state, request).instrument(span).await
        })
    }
}

/// Parsed trace context from W3C Trace Context headers.
#[derive(Debug, Clone)]
pub struct TraceContext {
    /// The 128-bit trace ID as a hex string.
    pub trace_id: String,
    /// The parent span ID (if propagated from upstream).
    pub parent_span_id: Option<String>,
    /// Trace flags (sampling, etc.).
    pub flags: TraceFlags,
}

impl TraceContext {
    /// Parses a `traceparent` header value.
    ///
    /// Format: `{version}-{trace-id}-{parent-span-id}-{flags}`
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<&str> = value.split('-').collect();
        if parts.len() != 4 {
            return None;
        }

        // Version must be "00"
        if parts[0] != "00" {
            return None;
        }

        let trace_id = parts[1];
        if trace_id.len() != 32 || !trace_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let parent_span_id = parts[2];
        if parent_span_id.len() != 16 || !parent_span_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let flags = parts[3];
        if flags.len() != 2 || !flags.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        let flags_byte = u8::from_str_radix(flags, 16).ok()?;

        Some(Self {
            trace_id: trace_id.to_string(),
            parent_span_id: Some(parent_span_id.to_string()),
            flags: TraceFlags(flags_byte),
        })
    }
}

/// Trace flags from the W3C Trace Context spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceFlags(u8);

impl TraceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0x00);
    /// The trace is sampled.
    pub const SAMPLED: Self = Self(0x01);

    /// Returns true if the sampled flag is set.
    #[must_use]
    pub const fn is_sampled(self) -> bool {
        self.0 & 0x01 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;
    use std::sync::{Arc, Mutex};
    use tracing::instrument::WithSubscriber;

    /// Subscriber that records the names of spans it is asked to create.
    #[derive(Clone)]
    struct SpanRecorder {
        spans: Arc<Mutex<Vec<String>>>,
    }

    impl tracing::Subscriber for SpanRecorder {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, span: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            let mut spans = self.spans.lock().unwrap();
            spans.push(span.metadata().name().to_string());
            tracing::span::Id::from_u64(spans.len() as u64)
        }

        fn record(&self, _span: &tracing::span::Id, _values: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _span: &tracing::span::Id, _follows: &tracing::span::Id) {}

        fn event(&self, _event: &tracing::Event<'_>) {}

        fn enter(&self, _span: &tracing::span::Id) {}

        fn exit(&self, _span: &tracing::span::Id) {}
    }

    fn create_test_request() -> Request {
        HttpRequest::builder()
            .method("GET")
            .uri("/users/123")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_request_with_traceparent(traceparent: &str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri("/api/data")
            .header(TRACEPARENT_HEADER, traceparent)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    fn create_handler() -> impl FnOnce(&mut RequestState, Request) -> BoxFuture<'static, Response> {
        |_state, _req| {
            Box::pin(async {
                HttpResponse::builder()
                    .status(StatusCode::OK)
                    .body(Full::new(Bytes::from("OK")))
                    .unwrap()
            })
        }
    }

    #[tokio::test]
    async fn test_generates_trace_context_when_missing() {
        let stage = TracingStage::new("test-service");
        let mut state = RequestState::new();
        let request = create_test_request();

        let next = Next::handler(create_handler());
        let _response = stage.process(&mut state, request, next).await;

        assert!(state.trace_id().is_some());
        assert!(state.span_id().is_some());
        assert_eq!(state.trace_id().unwrap().len(), 32);
        assert_eq!(state.span_id().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_propagates_trace_context() {
        let stage = TracingStage::new("test-service");
        let mut state = RequestState::new();
        let traceparent = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        let request = create_request_with_traceparent(traceparent);

        let next = Next::handler(create_handler());
        let _response = stage.process(&mut state, request, next).await;

        // Propagated trace ID, fresh span ID
        assert_eq!(state.trace_id(), Some("0af7651916cd43dd8448eb211c80319c"));
        assert!(state.span_id().is_some());
        assert_ne!(state.span_id(), Some("b7ad6b7169203331"));
    }

    #[tokio::test]
    async fn test_opens_request_span_around_downstream() {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let recorder = SpanRecorder {
            spans: spans.clone(),
        };

        let stage = TracingStage::new("test-service");
        let mut state = RequestState::new();
        let next = Next::handler(create_handler());

        stage
            .process(&mut state, create_test_request(), next)
            .with_subscriber(recorder)
            .await;

        assert!(spans.lock().unwrap().iter().any(|name| name == "request"));
    }

    #[tokio::test]
    async fn test_ignores_invalid_traceparent() {
        let stage = TracingStage::new("test-service");
        let mut state = RequestState::new();
        let request = create_request_with_traceparent("invalid-traceparent");

        let next = Next::handler(create_handler());
        let _response = stage.process(&mut state, request, next).await;

        assert!(state.trace_id().is_some());
        assert_eq!(state.trace_id().unwrap().len(), 32);
    }

    #[test]
    fn test_parse_traceparent() {
        let traceparent = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        let context = TraceContext::parse(traceparent).unwrap();

        assert_eq!(context.trace_id, "0af7651916cd43dd8448eb211c80319c");
        assert_eq!(context.parent_span_id, Some("b7ad6b7169203331".to_string()));
        assert!(context.flags.is_sampled());
    }

    #[test]
    fn test_parse_traceparent_invalid_version() {
        let traceparent = "01-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";
        assert!(TraceContext::parse(traceparent).is_none());
    }

    #[test]
    fn test_parse_traceparent_invalid_format() {
        assert!(TraceContext::parse("invalid").is_none());
        assert!(TraceContext::parse("00-abc-def-01").is_none());
        assert!(TraceContext::parse("").is_none());
    }

    #[test]
    fn test_trace_flags() {
        assert!(!TraceFlags::NONE.is_sampled());
        assert!(TraceFlags::SAMPLED.is_sampled());
        assert!(TraceFlags(0x03).is_sampled());
    }

    #[test]
    fn test_middleware_name() {
        let stage = TracingStage::new("test");
        assert_eq!(stage.name(), "tracing");
    }
}
