//! CORS (Cross-Origin Resource Sharing) stage.
//!
//! This stage handles CORS preflight requests and adds CORS headers to
//! responses. It is configured with a single allowed origin (or `*`),
//! matching how the stack options expose CORS.
//!
//! ## Preflight Requests
//!
//! A preflight is an OPTIONS request carrying `Origin` and
//! `Access-Control-Request-Method` headers. Preflights are answered with
//! 204 directly from this stage, **before** any credential validation:
//! browsers do not attach credentials to preflights, so requiring them
//! would break every cross-origin client.
//!
//! ## Regular Requests
//!
//! For non-preflight requests the stage continues down the chain and adds
//! `Access-Control-Allow-Origin` and `Access-Control-Expose-Headers` to the
//! response when the origin is allowed.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use bytes::Bytes;
use http::{HeaderValue, Method, StatusCode};
use http_body_util::Full;

/// CORS header names.
pub mod headers {
    /// `Access-Control-Allow-Origin` header.
    pub const ALLOW_ORIGIN: &str = "access-control-allow-origin";
    /// `Access-Control-Allow-Methods` header.
    pub const ALLOW_METHODS: &str = "access-control-allow-methods";
    /// `Access-Control-Allow-Headers` header.
    pub const ALLOW_HEADERS: &str = "access-control-allow-headers";
    /// `Access-Control-Allow-Credentials` header.
    pub const ALLOW_CREDENTIALS: &str = "access-control-allow-credentials";
    /// `Access-Control-Max-Age` header.
    pub const MAX_AGE: &str = "access-control-max-age";
    /// `Access-Control-Expose-Headers` header.
    pub const EXPOSE_HEADERS: &str = "access-control-expose-headers";
    /// `Access-Control-Request-Method` header (preflight).
    pub const REQUEST_METHOD: &str = "access-control-request-method";
    /// `Origin` header.
    pub const ORIGIN: &str = "origin";
    /// `Vary` header.
    pub const VARY: &str = "vary";
}

/// Methods advertised on preflight responses.
const ALLOWED_METHODS: &str = "GET, HEAD, POST, PUT, PATCH, DELETE";

/// Request headers advertised on preflight responses.
const ALLOWED_HEADERS: &str = "accept, authorization, content-type, x-request-id";

/// Headers exposed to browser JavaScript.
const EXPOSED_HEADERS: &str = "x-request-id";

/// Preflight cache duration in seconds.
const MAX_AGE_SECS: u64 = 3600;

/// Stage that answers preflights and stamps CORS headers.
#[derive(Debug, Clone)]
pub struct CorsStage {
    /// The single allowed origin, or `*` for any.
    allow_origin: String,
}

impl CorsStage {
    /// Creates a CORS stage allowing the given origin.
    ///
    /// Pass `"*"` to allow any origin. Credentials are only advertised for
    /// a concrete origin; browsers reject `*` combined with credentials.
    #[must_use]
    pub fn new(allow_origin: impl Into<String>) -> Self {
        Self {
            allow_origin: allow_origin.into(),
        }
    }

    /// Returns whether any origin is allowed.
    fn allows_any(&self) -> bool {
        self.allow_origin == "*"
    }

    /// Returns whether the given origin is allowed.
    fn is_allowed(&self, origin: &str) -> bool {
        self.allows_any() || self.allow_origin == origin
    }

    /// Checks if a request is a CORS preflight.
    fn is_preflight(request: &Request) -> bool {
        request.method() == Method::OPTIONS
            && request.headers().contains_key(headers::ORIGIN)
            && request.headers().contains_key(headers::REQUEST_METHOD)
    }

    /// Gets the origin from a request.
    fn get_origin(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(headers::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }

    /// The `Access-Control-Allow-Origin` value for an allowed origin.
    fn origin_header_value(&self, origin: &str) -> Option<HeaderValue> {
        if self.allows_any() {
            Some(HeaderValue::from_static("*"))
        } else if self.allow_origin == origin {
            HeaderValue::from_str(origin).ok()
        } else {
            None
        }
    }

    /// Builds the 204 preflight response.
    fn preflight_response(&self, origin: &str) -> Response {
        let mut builder = http::Response::builder().status(StatusCode::NO_CONTENT);

        if let Some(value) = self.origin_header_value(origin) {
            builder = builder.header(headers::ALLOW_ORIGIN, value);
        }
        builder = builder
            .header(headers::ALLOW_METHODS, ALLOWED_METHODS)
            .header(headers::ALLOW_HEADERS, ALLOWED_HEADERS)
            .header(headers::MAX_AGE, MAX_AGE_SECS.to_string())
            .header(
                headers::VARY,
                "Origin, Access-Control-Request-Method, Access-Control-Request-Headers",
            );

        if !self.allows_any() {
            builder = builder.header(headers::ALLOW_CREDENTIALS, "true");
        }

        builder
            .body(Full::new(Bytes::new()))
            .expect("valid response")
    }

    /// Adds CORS headers to a response for non-preflight requests.
    fn add_cors_headers(&self, response: &mut Response, origin: &str) {
        let headers_mut = response.headers_mut();

        if let Some(value) = self.origin_header_value(origin) {
            headers_mut.insert(headers::ALLOW_ORIGIN, value);
        }

        if !self.allows_any() {
            headers_mut.insert(headers::ALLOW_CREDENTIALS, HeaderValue::from_static("true"));
        }

        headers_mut.insert(
            headers::EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSED_HEADERS),
        );
        headers_mut.insert(headers::VARY, HeaderValue::from_static("Origin"));
    }
}

impl Middleware for CorsStage {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            // Preflights are answered before any credential check
            if Self::is_preflight(&request) {
                let origin = Self::get_origin(&request).unwrap_or_default().to_string();
                if !self.is_allowed(&origin) {
                    tracing::debug!(
                        request_id = %state.request_id(),
                        origin = %origin,
                        "Preflight from disallowed origin"
                    );
                    return http::Response::builder()
                        .status(StatusCode::FORBIDDEN)
                        .body(Full::new(Bytes::new()))
                        .expect("valid response");
                }
                return self.preflight_response(&origin);
            }

            let origin = Self::get_origin(&request).map(String::from);

            let mut response = next.run(state, request).await;

            if let Some(ref origin) = origin {
                if self.is_allowed(origin) {
                    self.add_cors_headers(&mut response, origin);
                }
            }

            response
        })
    }
}
