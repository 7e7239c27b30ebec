//! Panic recovery stage.
//!
//! Converts panics from downstream stages or the handler into a 500
//! response instead of tearing down the connection task. The panic payload
//! is logged with the request ID; the response body never includes it.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::stages::response_headers::stamp_correlation_headers;
use crate::state::RequestState;
use crate::types::{Request, Response, ResponseExt};
use futures_util::FutureExt;
use http::StatusCode;
use std::panic::AssertUnwindSafe;

/// Stage that recovers from panics in downstream processing.
#[derive(Debug, Clone, Default)]
pub struct RecoveryStage;

impl RecoveryStage {
    /// Creates a new recovery stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extracts a printable message from a panic payload.
    fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
        if let Some(s) = payload.downcast_ref::<&str>() {
            s
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.as_str()
        } else {
            "unknown panic"
        }
    }
}

impl Middleware for RecoveryStage {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let result = AssertUnwindSafe(next.run(state, request))
                .catch_unwind()
                .await;

            match result {
                Ok(response) => response,
                Err(payload) => {
                    tracing::error!(
                        request_id = %state.request_id(),
                        panic = Self::panic_message(payload.as_ref()),
                        "Recovered from panic while handling request"
                    );
                    let mut response = Response::json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL",
                        "Internal server error",
                    );
                    // A panic unwound past the response-headers stage below
                    // us, so the recovered response stamps its own
                    // correlation headers.
                    stamp_correlation_headers(state, &mut response);
                    response
                }
            }
        })
    }
}
