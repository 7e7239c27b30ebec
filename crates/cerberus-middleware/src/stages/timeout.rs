//! Request timeout stage.
//!
//! The innermost stage of the stack. It races the rest of the chain (the
//! handler, at this point) against a deadline; when the deadline fires the
//! in-flight work is dropped, the state is marked cancelled for the
//! probe at the top of the chain, and a 504 is returned.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response, ResponseExt};
use http::StatusCode;
use std::time::Duration;

/// Stage that enforces a per-request deadline.
#[derive(Debug, Clone)]
pub struct TimeoutStage {
    deadline: Duration,
}

impl TimeoutStage {
    /// Creates a timeout stage with the given deadline.
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self { deadline }
    }

    /// Creates a timeout stage from whole seconds.
    #[must_use]
    pub fn from_secs(seconds: u64) -> Self {
        Self::new(Duration::from_secs(seconds))
    }

    /// Returns the configured deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl Middleware for TimeoutStage {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // Bind first so the raced future is dropped before the state is
            // touched again
            let result = tokio::time::timeout(self.deadline, next.run(state, request)).await;

            match result {
                Ok(response) => response,
                Err(_elapsed) => {
                    state.mark_cancelled();
                    tracing::warn!(
                        request_id = %state.request_id(),
                        deadline_secs = self.deadline.as_secs(),
                        "Request deadline exceeded"
                    );
                    Response::json_error(
                        StatusCode::GATEWAY_TIMEOUT,
                        "TIMEOUT",
                        "Request timed out",
                    )
                }
            }
        })
    }
}
