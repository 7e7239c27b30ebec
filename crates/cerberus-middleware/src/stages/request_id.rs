//! Request ID stage.
//!
//! This stage is responsible for generating or extracting a unique request
//! ID for each incoming request. The request ID is used for:
//!
//! - Log correlation across services
//! - Trace correlation
//! - Support ticket references
//!
//! ## Request ID Sources
//!
//! 1. **X-Request-ID header**: If present and trusted, the existing ID is used
//! 2. **Generated UUID v7**: Otherwise a new ID is generated
//!
//! UUID v7 is used because it is:
//! - Time-ordered (naturally sortable)
//! - Contains embedded timestamp
//! - Globally unique without coordination

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use cerberus_core::RequestId;
use uuid::Uuid;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stage that generates or extracts request IDs.
///
/// # Behavior
///
/// 1. Check for `X-Request-ID` header
/// 2. If present and trusted, use existing ID (with validation)
/// 3. If absent, generate new UUID v7
/// 4. Store ID in [`RequestState`]
/// 5. The response headers stage echoes the ID back to the caller
#[derive(Debug, Clone, Default)]
pub struct RequestIdStage {
    /// Whether to trust incoming request ID headers.
    ///
    /// In production, this should typically be `false` for external traffic
    /// and `true` for internal service-to-service calls.
    trust_incoming: bool,
}

impl RequestIdStage {
    /// Creates a new request-ID stage.
    ///
    /// By default, incoming request IDs are not trusted and new IDs
    /// are always generated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stage that trusts incoming `X-Request-ID` headers.
    ///
    /// Use this for internal services that receive requests from other
    /// trusted services that have already assigned request IDs.
    #[must_use]
    pub fn trust_incoming() -> Self {
        Self {
            trust_incoming: true,
        }
    }

    /// Extracts the request ID from headers if present and valid.
    fn extract_request_id(&self, request: &Request) -> Option<RequestId> {
        if !self.trust_incoming {
            return None;
        }

        request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(RequestId::from_uuid)
    }
}

impl Middleware for RequestIdStage {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = self
                .extract_request_id(&request)
                .unwrap_or_else(RequestId::new);

            state.set_request_id(request_id);

            next.run(state, request).await
        })
    }
}
