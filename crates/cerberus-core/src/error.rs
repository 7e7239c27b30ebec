//! Error types for Cerberus.
//!
//! This module provides the [`CerberusError`] type used throughout the stack,
//! together with [`ErrorCategory`] which maps errors to HTTP status codes.
//!
//! The taxonomy distinguishes startup errors, which abort process startup
//! (running with partial auth capability is worse than not starting), from
//! per-request outcomes, which are surfaced to the caller and never escalate.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`CerberusError`].
pub type CerberusResult<T> = Result<T, CerberusError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Startup configuration errors (malformed keys, patterns, values).
    Configuration,
    /// Authentication errors (missing/invalid credentials).
    Authentication,
    /// Request deadline exceeded.
    Timeout,
    /// Internal errors, including recovered panics.
    Internal,
}

impl ErrorCategory {
    /// Returns the default HTTP status code for this error category.
    ///
    /// [`Configuration`](Self::Configuration) errors never reach a caller;
    /// they map to 500 only for completeness.
    #[must_use]
    pub const fn default_status_code(&self) -> StatusCode {
        match self {
            Self::Configuration | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Authentication => StatusCode::UNAUTHORIZED,
            Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

/// Standard error type for Cerberus.
///
/// # Example
///
/// ```
/// use cerberus_core::{CerberusError, ErrorCategory};
///
/// fn parse_patterns(raw: &[String]) -> Result<(), CerberusError> {
///     if raw.is_empty() {
///         return Err(CerberusError::configuration("no patterns supplied"));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum CerberusError {
    /// Startup configuration is invalid. Aborts startup.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Human-readable error message.
        message: String,
    },

    /// Authentication failed for a request.
    #[error("Authentication error: {message}")]
    Authentication {
        /// Human-readable error message.
        message: String,
    },

    /// The request deadline was exceeded.
    #[error("Request timed out after {seconds}s")]
    Timeout {
        /// The configured deadline in seconds.
        seconds: u64,
    },

    /// Internal error, including recovered panics.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl CerberusError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.category().default_status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_status_codes() {
        assert_eq!(
            ErrorCategory::Authentication.default_status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ErrorCategory::Timeout.default_status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ErrorCategory::Internal.default_status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_constructors_map_to_categories() {
        assert_eq!(
            CerberusError::configuration("bad PEM").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            CerberusError::authentication("invalid token").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            CerberusError::Timeout { seconds: 30 }.category(),
            ErrorCategory::Timeout
        );
        assert_eq!(
            CerberusError::internal("panic").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_display_messages() {
        let err = CerberusError::configuration("allow-list pattern failed to compile");
        assert!(err.to_string().contains("allow-list pattern"));

        let err = CerberusError::Timeout { seconds: 5 };
        assert_eq!(err.to_string(), "Request timed out after 5s");
    }

    #[test]
    fn test_status_code_mapping() {
        let err = CerberusError::authentication("no identity");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
