//! Authentication gate stage.
//!
//! The gate runs after every credential validator and enforces the single
//! rule of the stack: a request proceeds only if some validator attached
//! identity claims, or the route is on the unauthenticated allow-list.
//!
//! The gate never inspects credentials itself. It looks only at the
//! request state, which keeps the decision independent of how many
//! validators are configured.

use crate::allowlist::AllowList;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response, ResponseExt};
use cerberus_core::CerberusError;

/// Why the gate let a request through.
///
/// Stored as a state extension for handlers and tests that want to audit
/// the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Identity claims were attached by a validator.
    Authenticated,
    /// The route is on the unauthenticated allow-list.
    AllowListExempt,
}

/// Stage that rejects unauthenticated requests.
#[derive(Debug)]
pub struct AuthRequiredStage {
    allow_list: AllowList,
}

impl AuthRequiredStage {
    /// Creates the gate with the given allow-list patterns.
    ///
    /// # Errors
    ///
    /// Returns `CerberusError::Configuration` if a pattern fails to
    /// compile.
    pub fn new<S: AsRef<str>>(allow_patterns: &[S]) -> Result<Self, CerberusError> {
        Ok(Self {
            allow_list: AllowList::compile(allow_patterns)?,
        })
    }
}

impl Middleware for AuthRequiredStage {
    fn name(&self) -> &'static str {
        "auth_required"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if self.allow_list.matches(request.method(), request.uri().path()) {
                state.set_extension(GateDecision::AllowListExempt);
                return next.run(state, request).await;
            }

            if state.is_authenticated() {
                state.set_extension(GateDecision::Authenticated);
                return next.run(state, request).await;
            }

            tracing::warn!(
                request_id = %state.request_id(),
                http.method = %request.method(),
                http.path = %request.uri().path(),
                "Unauthenticated request rejected"
            );
            cerberus_telemetry::metrics::record_auth_rejection("unauthenticated");
            Response::unauthorized()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cerberus_core::AuthClaims;
    use http::{Method, Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    fn create_request(method: Method, path: &str) -> Request {
        HttpRequest::builder()
            .method(method)
            .uri(path)
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
    async fn test_authenticated_request_passes() {
        let gate = AuthRequiredStage::new::<&str>(&[]).unwrap();
        let mut state = RequestState::new();
        state.set_claims(AuthClaims::for_subject("alice"));

        let next = Next::handler(create_handler());
        let response = gate
            .process(&mut state, create_request(Method::GET, "/api/data"), next)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.get_extension::<GateDecision>(),
            Some(&GateDecision::Authenticated)
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_request_rejected() {
        let gate = AuthRequiredStage::new::<&str>(&[]).unwrap();
        let mut state = RequestState::new();

        let next = Next::handler(create_handler());
        let response = gate
            .process(&mut state, create_request(Method::GET, "/api/data"), next)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.get_extension::<GateDecision>().is_none());
    }

    #[tokio::test]
    async fn test_allow_listed_route_passes_without_claims() {
        let gate = AuthRequiredStage::new(&["GET /health"]).unwrap();
        let mut state = RequestState::new();

        let next = Next::handler(create_handler());
        let response = gate
            .process(&mut state, create_request(Method::GET, "/health"), next)
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.get_extension::<GateDecision>(),
            Some(&GateDecision::AllowListExempt)
        );
    }

    #[tokio::test]
    async fn test_allow_list_is_method_sensitive() {
        let gate = AuthRequiredStage::new(&["GET /health"]).unwrap();
        let mut state = RequestState::new();

        let next = Next::handler(create_handler());
        let response = gate
            .process(&mut state, create_request(Method::POST, "/health"), next)
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bad_pattern_fails_construction() {
        let err = AuthRequiredStage::new(&["GET /([bad"]).unwrap_err();
        assert!(matches!(err, CerberusError::Configuration { .. }));
    }

    #[test]
    fn test_middleware_name() {
        let gate = AuthRequiredStage::new::<&str>(&[]).unwrap();
        assert_eq!(gate.name(), "auth_required");
    }
}
