//! Common types used throughout the middleware stack.
//!
//! This module re-exports HTTP request and response types used by stages.

use bytes::Bytes;
use http_body_util::Full;

/// The HTTP request type used in the middleware stack.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware stack.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// Extension trait for building error responses.
pub trait ResponseExt {
    /// Creates an error response with the given status code and message.
    fn error(status: http::StatusCode, message: &str) -> Response;

    /// Creates a JSON error response.
    fn json_error(status: http::StatusCode, code: &str, message: &str) -> Response;

    /// Creates the uniform 401 response.
    ///
    /// Every authentication rejection produces this exact response, whether
    /// a token failed signature verification, expired, or was simply absent.
    /// A uniform body avoids leaking which check failed.
    fn unauthorized() -> Response;
}

impl ResponseExt for Response {
    fn error(status: http::StatusCode, message: &str) -> Response {
        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(Full::new(Bytes::from(message.to_string())))
            .expect("failed to build error response")
    }

    fn json_error(status: http::StatusCode, code: &str, message: &str) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": code,
                "message": message
            }
        });

        http::Response::builder()
            .status(status)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .expect("failed to build JSON error response")
    }

    fn unauthorized() -> Response {
        Self::json_error(
            http::StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Authentication required",
        )
    }
}
