//! Unauthenticated-route allow-list.
//!
//! The gate consults an [`AllowList`] of regex patterns to decide which
//! routes may be served without credentials (health probes, version
//! endpoints, webhook receivers with their own verification).
//!
//! Each configured pattern is matched against the string
//! `"METHOD /path"` with the method upper-cased, and is anchored on both
//! ends at compile time: a pattern matches the whole method-plus-path
//! string or not at all. `"GET /health"` therefore does not exempt
//! `GET /healthcheck` or `POST /health`.

use cerberus_core::CerberusError;
use http::Method;
use regex::Regex;

/// Compiled allow-list of method-plus-path patterns.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    patterns: Vec<Regex>,
}

impl AllowList {
    /// Compiles the given patterns, anchoring each one.
    ///
    /// # Errors
    ///
    /// Returns `CerberusError::Configuration` naming the offending pattern
    /// if any fails to compile. A typo in an exemption must not silently
    /// widen or narrow the authenticated surface.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Self, CerberusError> {
        let mut compiled = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let anchored = format!("^{pattern}$");
            let regex = Regex::new(&anchored).map_err(|e| {
                CerberusError::configuration(format!(
                    "allow-list pattern {pattern:?} failed to compile: {e}"
                ))
            })?;
            compiled.push(regex);
        }
        Ok(Self { patterns: compiled })
    }

    /// Returns whether the request is exempt from authentication.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        let candidate = format!("{} {}", method.as_str().to_uppercase(), path);
        self.patterns.iter().any(|p| p.is_match(&candidate))
    }

    /// Returns whether the allow-list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
