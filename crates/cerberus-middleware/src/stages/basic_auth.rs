//! Basic auth validation stage.
//!
//! Validates `Authorization: Basic <base64>` credentials against a single
//! configured username/password pair. On success a pre-configured claims
//! record is attached to the request state, overwriting anything an earlier
//! validator set; the configured identity is authoritative for this
//! credential.
//!
//! Comparison of both username and password uses constant-time equality so
//! timing does not reveal how much of a guess matched. A malformed or
//! mismatched Basic credential passes through unauthenticated; the gate
//! produces the uniform 401 so callers cannot distinguish wrong-password
//! from no-credential.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use cerberus_core::AuthClaims;
use subtle::ConstantTimeEq;

/// Stage that validates basic-auth credentials.
pub struct BasicAuthStage {
    username: String,
    password: String,
    /// Claims attached when the credential matches.
    claims: AuthClaims,
}

impl BasicAuthStage {
    /// Creates a basic-auth validator.
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        claims: AuthClaims,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            claims,
        }
    }

    /// Decodes the `Authorization: Basic` header into a username/password
    /// pair.
    ///
    /// Returns `None` for a missing header, a non-Basic scheme, or a
    /// payload that is not base64-encoded `user:pass`.
    fn extract_credentials(request: &Request) -> Option<(String, String)> {
        let header = request
            .headers()
            .get(http::header::AUTHORIZATION)?
            .to_str()
            .ok()?;
        let encoded = header.strip_prefix("Basic ")?;
        let decoded = BASE64.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, pass) = decoded.split_once(':')?;
        Some((user.to_string(), pass.to_string()))
    }

    /// Compares the presented credentials in constant time.
    fn credentials_match(&self, user: &str, pass: &str) -> bool {
        // Slice ct_eq is length-aware; combine with & so both halves are
        // always evaluated
        let user_ok = user.as_bytes().ct_eq(self.username.as_bytes());
        let pass_ok = pass.as_bytes().ct_eq(self.password.as_bytes());
        bool::from(user_ok & pass_ok)
    }
}

impl Middleware for BasicAuthStage {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if let Some((user, pass)) = Self::extract_credentials(&request) {
                if self.credentials_match(&user, &pass) {
                    tracing::debug!(
                        request_id = %state.request_id(),
                        subject = self.claims.log_id(),
                        "Basic credential verified"
                    );
                    state.set_claims(self.claims.clone());
                } else {
                    tracing::warn!(
                        request_id = %state.request_id(),
                        http.path = %request.uri().path(),
                        "Basic credential mismatch"
                    );
                    cerberus_telemetry::metrics::record_auth_rejection("basic");
                }
            }

            next.run(state, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{Request as HttpRequest, Response as HttpResponse, StatusCode};
    use http_body_util::Full;

    fn stage() -> BasicAuthStage {
        BasicAuthStage::new("svc-user", "hunter2", AuthClaims::for_subject("svc-user"))
    }

    fn request_with_basic(user: &str, pass: &str) -> Request {
        let encoded = BASE64.encode(format!("{user}:{pass}"));
        HttpRequest::builder()
            .uri("/api/data")
            .header(http::header::AUTHORIZATION, format!("Basic {encoded}"))
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
    async fn test_matching_credentials_attach_claims() {
        let stage = stage();
        let mut state = RequestState::new();
        let request = request_with_basic("svc-user", "hunter2");

        let next = Next::handler(create_handler());
        let response = stage.process(&mut state, request, next).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            state.claims().and_then(|c| c.sub.as_deref()),
            Some("svc-user")
        );
    }

    #[tokio::test]
    async fn test_wrong_password_continues_unauthenticated() {
        let stage = stage();
        let mut state = RequestState::new();
        let request = request_with_basic("svc-user", "wrong");

        let next = Next::handler(create_handler());
        let response = stage.process(&mut state, request, next).await;

        // The gate downstream is responsible for rejection
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.claims().is_none());
    }

    #[tokio::test]
    async fn test_success_overwrites_earlier_claims() {
        let stage = stage();
        let mut state = RequestState::new();
        state.set_claims(AuthClaims::for_subject("bearer-user"));
        let request = request_with_basic("svc-user", "hunter2");

        let next = Next::handler(create_handler());
        let _response = stage.process(&mut state, request, next).await;

        assert_eq!(
            state.claims().and_then(|c| c.sub.as_deref()),
            Some("svc-user")
        );
    }

    #[tokio::test]
    async fn test_mismatch_preserves_earlier_claims() {
        let stage = stage();
        let mut state = RequestState::new();
        state.set_claims(AuthClaims::for_subject("bearer-user"));
        let request = request_with_basic("svc-user", "wrong");

        let next = Next::handler(create_handler());
        let _response = stage.process(&mut state, request, next).await;

        assert_eq!(
            state.claims().and_then(|c| c.sub.as_deref()),
            Some("bearer-user")
        );
    }

    #[tokio::test]
    async fn test_malformed_header_continues_unauthenticated() {
        let stage = stage();
        let mut state = RequestState::new();
        let request: Request = HttpRequest::builder()
            .uri("/api/data")
            .header(http::header::AUTHORIZATION, "Basic !!!not-base64!!!")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let next = Next::handler(create_handler());
        let response = stage.process(&mut state, request, next).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.claims().is_none());
    }

    #[tokio::test]
    async fn test_bearer_scheme_ignored() {
        let stage = stage();
        let mut state = RequestState::new();
        let request: Request = HttpRequest::builder()
            .uri("/api/data")
            .header(http::header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let next = Next::handler(create_handler());
        let response = stage.process(&mut state, request, next).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.claims().is_none());
    }

    #[test]
    fn test_extract_credentials() {
        let request = request_with_basic("alice", "s3cret:with:colons");
        let (user, pass) = BasicAuthStage::extract_credentials(&request).unwrap();
        // Only the first colon separates user from password
        assert_eq!(user, "alice");
        assert_eq!(pass, "s3cret:with:colons");
    }

    #[test]
    fn test_credentials_match_is_exact() {
        let stage = stage();
        assert!(stage.credentials_match("svc-user", "hunter2"));
        assert!(!stage.credentials_match("svc-user", "hunter"));
        assert!(!stage.credentials_match("svc-use", "hunter2"));
        assert!(!stage.credentials_match("", ""));
    }

    #[test]
    fn test_middleware_name() {
        assert_eq!(stage().name(), "basic_auth");
    }
}
