//! Bearer token validation stage.
//!
//! Validates `Authorization: Bearer <token>` credentials against a set of
//! configured RSA public keys. Verification covers the RS256/RS384/RS512
//! signature and the registered time claims (`exp`, `nbf`).
//!
//! ## Multiple keys
//!
//! Key rotation means more than one public key can be live at once. The
//! token is tried against each configured key in order; any single success
//! authenticates the request.
//!
//! ## Failure behavior
//!
//! A present-but-invalid bearer token is rejected immediately with the
//! uniform 401 response. A missing bearer credential (including a
//! non-Bearer `Authorization` header, which belongs to the basic-auth
//! stage) passes through unauthenticated and leaves the decision to the
//! gate.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response, ResponseExt};
use cerberus_core::{AuthClaims, CerberusError};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

/// Stage that validates bearer tokens.
pub struct JwtValidatorStage {
    /// Public keys currently accepted for signature verification.
    keys: Vec<DecodingKey>,
    /// Shared validation settings (algorithms, time claims).
    validation: Validation,
}

// DecodingKey has no Debug impl; show the key count instead.
impl std::fmt::Debug for JwtValidatorStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidatorStage")
            .field("keys", &self.keys.len())
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtValidatorStage {
    /// Creates a validator from PEM-encoded RSA public keys.
    ///
    /// # Errors
    ///
    /// Returns `CerberusError::Configuration` if no keys are supplied or
    /// any key fails to parse. Key material problems abort stack assembly;
    /// a stack that silently dropped a key would reject rotated tokens in
    /// production.
    pub fn from_pems<S: AsRef<str>>(pems: &[S]) -> Result<Self, CerberusError> {
        if pems.is_empty() {
            return Err(CerberusError::configuration(
                "bearer token validation enabled but no public keys supplied",
            ));
        }

        let mut keys = Vec::with_capacity(pems.len());
        for (i, pem) in pems.iter().enumerate() {
            let key = DecodingKey::from_rsa_pem(pem.as_ref().as_bytes()).map_err(|e| {
                CerberusError::configuration(format!("public key {i} failed to parse: {e}"))
            })?;
            keys.push(key);
        }

        let mut validation = Validation::new(Algorithm::RS256);
        validation.algorithms = vec![Algorithm::RS256, Algorithm::RS384, Algorithm::RS512];
        validation.validate_nbf = true;
        // No audience is configured for the stack
        validation.validate_aud = false;

        Ok(Self { keys, validation })
    }

    /// Extracts the bearer token from the `Authorization` header.
    ///
    /// Returns `None` for a missing header or a non-Bearer scheme.
    fn extract_token(request: &Request) -> Option<&str> {
        request
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Verifies the token against each configured key.
    fn verify(&self, token: &str) -> Option<AuthClaims> {
        for key in &self.keys {
            if let Ok(data) = decode::<AuthClaims>(token, key, &self.validation) {
                return Some(data.claims);
            }
        }
        None
    }
}

impl Middleware for JwtValidatorStage {
    fn name(&self) -> &'static str {
        "jwt_validator"
    }

    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let Some(token) = Self::extract_token(&request) else {
                // No bearer credential; the gate decides later
                return next.run(state, request).await;
            };

            match self.verify(token) {
                Some(claims) => {
                    tracing::debug!(
                        request_id = %state.request_id(),
                        subject = claims.log_id(),
                        "Bearer token verified"
                    );
                    state.set_claims(claims);
                    next.run(state, request).await
                }
                None => {
                    tracing::warn!(
                        request_id = %state.request_id(),
                        http.path = %request.uri().path(),
                        "Bearer token rejected"
                    );
                    cerberus_telemetry::metrics::record_auth_rejection("bearer");
                    Response::unauthorized()
                }
            }
        })
    }
}
