//! Cancellation probe stage.
//!
//! A probe sits at the top of the stack and after every other stage. Each
//! probe observes the cancellation flag on the way back out: when the
//! timeout stage abandons a request, the flag is set, and the probes emit
//! diagnostic lines so operators can tell deadline kills apart from
//! ordinary error responses and see how far back out the response made it.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};

/// Diagnostic boundary stage that logs abandoned requests.
///
/// The label names the stage boundary the probe sits at.
#[derive(Debug, Clone)]
pub struct CancellationProbe {
    label: &'static str,
}

impl CancellationProbe {
    /// Creates the probe for the top of the stack.
    #[must_use]
    pub fn new() -> Self {
        Self::labeled("top")
    }

    /// Creates a probe for the boundary after the named stage.
    #[must_use]
    pub fn labeled(label: &'static str) -> Self {
        Self { label }
    }

    /// Returns the boundary label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Default for CancellationProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for CancellationProbe {
    fn name(&self) -> &'static str {
        "cancellation_probe"
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

            if state.is_cancelled() {
                tracing::warn!(
                    request_id = %state.request_id(),
                    stage = self.label,
                    http.method = %method,
                    http.path = %path,
                    duration_ms = state.elapsed().as_secs_f64() * 1000.0,
                    "Request abandoned after deadline"
                );
            }

            response
        })
    }
}
