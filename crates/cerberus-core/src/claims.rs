//! Identity claims attached to authenticated requests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured identity claims for an authenticated caller.
///
/// A claims record is attached to the request state by whichever credential
/// validator succeeded (bearer token or basic auth). At most one record is
/// attached per request; a validator that runs later overwrites an earlier
/// record only when it succeeds itself.
///
/// The well-known fields cover the standard identity-token claims; anything
/// else a token carries is preserved in [`extra`](Self::extra) so downstream
/// handlers can read custom claims without this crate knowing about them.
///
/// # Example
///
/// ```
/// use cerberus_core::AuthClaims;
///
/// let claims = AuthClaims::for_subject("alice");
/// assert_eq!(claims.sub.as_deref(), Some("alice"));
/// assert!(claims.groups.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Subject identifier of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Display name of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Email address of the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Group memberships of the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,

    /// Any additional claims carried by the credential.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AuthClaims {
    /// Creates a claims record with only a subject set.
    #[must_use]
    pub fn for_subject(sub: impl Into<String>) -> Self {
        Self {
            sub: Some(sub.into()),
            ..Self::default()
        }
    }

    /// Returns a string identifier suitable for logging.
    ///
    /// This never returns secrets or raw tokens. Falls back to `"unknown"`
    /// when the credential carried no subject.
    #[must_use]
    pub fn log_id(&self) -> &str {
        self.sub.as_deref().unwrap_or("unknown")
    }

    /// Returns whether the caller belongs to the given group.
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
