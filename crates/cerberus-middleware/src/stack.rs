//! Stack assembly.
//!
//! [`assemble`] turns a [`StackOptions`] record into the fixed-order
//! [`Pipeline`]. Options decide which optional stages are present; they
//! never change the relative order. Assembly is fail-fast: malformed key
//! material or allow-list patterns abort with a configuration error,
//! because a stack running with partial auth capability is worse than one
//! that refuses to start.
//!
//! ## Stage order
//!
//! ```text
//! cancellation_probe ("top")
//!   request_id
//!     tracing
//!       request_log
//!         recovery
//!           response_headers
//!             cors              (if cors_allow_origin set)
//!               metrics
//!                 jwt_validator (if jwt_auth set)
//!                   basic_auth  (if basic_auth set)
//!                     auth_required (unless enforcement disabled)
//!                       timeout (if request_timeout_seconds set)
//!                         handler
//! ```
//!
//! A cancellation probe labeled with the preceding stage's name follows
//! every installed stage, so an abandoned request logs one line per
//! boundary the response crossed before the deadline fired.
//!
//! ## Process-wide singletons
//!
//! A process can host more than one stack (public API plus internal admin
//! listener). Metric registration and the request timeout are process-wide;
//! [`SharedSetup`] tracks both so a second assembly does not register
//! metrics twice and cannot silently change the shared deadline.

use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::stages::{
    AuthRequiredStage, BasicAuthStage, CancellationProbe, CorsStage, JwtValidatorStage,
    MetricsStage, RecoveryStage, RequestIdStage, RequestLogStage, ResponseHeadersStage,
    TimeoutStage, TracingStage,
};
use cerberus_core::{AuthClaims, CerberusError};
use cerberus_telemetry::LogConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Bearer token validation options.
#[derive(Debug, Clone, Default)]
pub struct JwtAuthOptions {
    /// PEM-encoded RSA public keys accepted for signature verification.
    ///
    /// More than one key may be live during rotation.
    pub public_key_pems: Vec<String>,
}

/// Basic auth validation options.
#[derive(Debug, Clone, Default)]
pub struct BasicAuthOptions {
    /// Expected username.
    pub username: String,
    /// Expected password.
    pub password: String,
    /// Claims attached when the credential matches.
    pub claims: AuthClaims,
}

/// Options controlling which stages an assembled stack contains.
#[derive(Debug, Clone)]
pub struct StackOptions {
    /// Service name used in log and span fields.
    pub service_name: String,

    /// Use human-readable log output instead of JSON.
    pub plain_logging: bool,

    /// Allowed CORS origin (`*` for any). `None` omits the CORS stage.
    pub cors_allow_origin: Option<String>,

    /// Per-request deadline in seconds. `None` omits the timeout stage.
    pub request_timeout_seconds: Option<u64>,

    /// Bearer token validation. `None` omits the stage.
    pub jwt_auth: Option<JwtAuthOptions>,

    /// Basic auth validation. `None` omits the stage.
    pub basic_auth: Option<BasicAuthOptions>,

    /// Omit the authentication gate. Validators still run and attach
    /// claims; nothing is rejected. For local development only.
    pub disable_auth_enforcement: bool,

    /// Allow-list patterns for unauthenticated routes, matched against
    /// `"METHOD /path"` and anchored on both ends.
    pub allow_unauthorized: Vec<String>,

    /// Trust `X-Request-ID` headers from the caller.
    pub trust_incoming_request_id: bool,

    /// Skip process-wide metric registration; set on every stack after
    /// the first in the same process.
    pub skip_duplicate_setup: bool,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            service_name: "cerberus".to_string(),
            plain_logging: false,
            cors_allow_origin: None,
            request_timeout_seconds: None,
            jwt_auth: None,
            basic_auth: None,
            disable_auth_enforcement: false,
            allow_unauthorized: Vec::new(),
            trust_incoming_request_id: false,
            skip_duplicate_setup: false,
        }
    }
}

impl StackOptions {
    /// Derives the logging configuration for this stack.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            plain_format: self.plain_logging,
            service_name: self.service_name.clone(),
            ..LogConfig::default()
        }
    }
}

/// Process-wide setup state shared by all stacks in a process.
///
/// Construct exactly one per process and pass it to every [`assemble`]
/// call.
#[derive(Debug, Default)]
pub struct SharedSetup {
    metrics_registered: AtomicBool,
    first_timeout_seconds: OnceLock<u64>,
}

impl SharedSetup {
    /// Creates fresh shared setup state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks metrics as registered. Returns `true` on the first call.
    fn claim_metrics_registration(&self) -> bool {
        !self.metrics_registered.swap(true, Ordering::SeqCst)
    }

    /// Resolves the effective timeout for a stack requesting `requested`
    /// seconds.
    ///
    /// The first configured timeout wins for the whole process; a stack
    /// requesting a different value keeps the first and a warning is
    /// logged.
    fn effective_timeout(&self, requested: u64) -> u64 {
        let first = *self.first_timeout_seconds.get_or_init(|| requested);
        if first != requested {
            tracing::warn!(
                requested_secs = requested,
                effective_secs = first,
                "Request timeout differs from the first configured stack; keeping the first"
            );
        }
        first
    }
}

/// Assembles the fixed-order stack described by `options`.
///
/// # Errors
///
/// Returns `CerberusError::Configuration` if bearer keys or allow-list
/// patterns are malformed. Callers should treat this as fatal.
pub fn assemble(options: &StackOptions, shared: &SharedSetup) -> Result<Pipeline, CerberusError> {
    if !options.skip_duplicate_setup {
        if shared.claim_metrics_registration() {
            cerberus_telemetry::metrics::describe_stack_metrics();
        } else {
            tracing::warn!(
                service.name = %options.service_name,
                "Stack metrics already registered in this process; skipping"
            );
        }
    }

    let mut builder = PipelineBuilder::new()
        .add_stage(CancellationProbe::new())
        .add_stage(if options.trust_incoming_request_id {
            RequestIdStage::trust_incoming()
        } else {
            RequestIdStage::new()
        })
        .add_stage(CancellationProbe::labeled("request_id"))
        .add_stage(TracingStage::new(options.service_name.clone()))
        .add_stage(CancellationProbe::labeled("tracing"))
        .add_stage(RequestLogStage::new())
        .add_stage(CancellationProbe::labeled("request_log"))
        .add_stage(RecoveryStage::new())
        .add_stage(CancellationProbe::labeled("recovery"))
        .add_stage(ResponseHeadersStage::new())
        .add_stage(CancellationProbe::labeled("response_headers"));

    if let Some(origin) = &options.cors_allow_origin {
        builder = builder
            .add_stage(CorsStage::new(origin.clone()))
            .add_stage(CancellationProbe::labeled("cors"));
    }

    builder = builder
        .add_stage(MetricsStage::new())
        .add_stage(CancellationProbe::labeled("metrics"));

    if let Some(jwt) = &options.jwt_auth {
        let stage = JwtValidatorStage::from_pems(&jwt.public_key_pems).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse bearer token public keys; bailing out");
            e
        })?;
        builder = builder
            .add_stage(stage)
            .add_stage(CancellationProbe::labeled("jwt_validator"));
    }

    if let Some(basic) = &options.basic_auth {
        builder = builder
            .add_stage(BasicAuthStage::new(
                basic.username.clone(),
                basic.password.clone(),
                basic.claims.clone(),
            ))
            .add_stage(CancellationProbe::labeled("basic_auth"));
    }

    if options.disable_auth_enforcement {
        tracing::warn!(
            service.name = %options.service_name,
            "Auth enforcement disabled; every route is reachable without credentials"
        );
    } else {
        builder = builder
            .add_stage(AuthRequiredStage::new(&options.allow_unauthorized)?)
            .add_stage(CancellationProbe::labeled("auth_required"));
    }

    if let Some(requested) = options.request_timeout_seconds {
        let effective = shared.effective_timeout(requested);
        builder = builder
            .add_stage(TimeoutStage::from_secs(effective))
            .add_stage(CancellationProbe::labeled("timeout"));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn full_options() -> StackOptions {
        StackOptions {
            service_name: "test-service".to_string(),
            cors_allow_origin: Some("*".to_string()),
            request_timeout_seconds: Some(30),
            jwt_auth: Some(JwtAuthOptions {
                public_key_pems: vec![fixtures::TRUSTED_PUBLIC_KEY_PEM.to_string()],
            }),
            basic_auth: Some(BasicAuthOptions {
                username: "svc".to_string(),
                password: "secret".to_string(),
                claims: AuthClaims::for_subject("svc"),
            }),
            allow_unauthorized: vec!["GET /health".to_string()],
            ..StackOptions::default()
        }
    }

    /// Stage names with the interleaved probes removed.
    fn stage_names_without_probes(pipeline: &Pipeline) -> Vec<&'static str> {
        pipeline
            .stage_names()
            .into_iter()
            .filter(|n| *n != "cancellation_probe")
            .collect()
    }

    #[test]
    fn test_full_stack_order() {
        let shared = SharedSetup::new();
        let pipeline = assemble(&full_options(), &shared).unwrap();

        assert_eq!(
            stage_names_without_probes(&pipeline),
            vec![
                "request_id",
                "tracing",
                "request_log",
                "recovery",
                "response_headers",
                "cors",
                "metrics",
                "jwt_validator",
                "basic_auth",
                "auth_required",
                "timeout",
            ]
        );
    }

    #[test]
    fn test_minimal_stack_order() {
        let shared = SharedSetup::new();
        let pipeline = assemble(&StackOptions::default(), &shared).unwrap();

        assert_eq!(
            stage_names_without_probes(&pipeline),
            vec![
                "request_id",
                "tracing",
                "request_log",
                "recovery",
                "response_headers",
                "metrics",
                "auth_required",
            ]
        );
    }

    #[test]
    fn test_probe_follows_every_stage() {
        let shared = SharedSetup::new();
        let pipeline = assemble(&full_options(), &shared).unwrap();
        let names = pipeline.stage_names();

        // Probe at the top, then stages and probes alternate all the way in
        assert_eq!(names.first(), Some(&"cancellation_probe"));
        for pair in names[1..].chunks(2) {
            assert_ne!(pair[0], "cancellation_probe");
            assert_eq!(pair.get(1), Some(&"cancellation_probe"));
        }
        assert_eq!(names.last(), Some(&"cancellation_probe"));
    }

    #[test]
    fn test_optional_stages_never_reorder() {
        let shared = SharedSetup::new();
        let options = StackOptions {
            request_timeout_seconds: Some(10),
            jwt_auth: Some(JwtAuthOptions {
                public_key_pems: vec![fixtures::TRUSTED_PUBLIC_KEY_PEM.to_string()],
            }),
            ..StackOptions::default()
        };
        let pipeline = assemble(&options, &shared).unwrap();
        let names = pipeline.stage_names();

        let jwt_pos = names.iter().position(|n| *n == "jwt_validator").unwrap();
        let gate_pos = names.iter().position(|n| *n == "auth_required").unwrap();
        let timeout_pos = names.iter().position(|n| *n == "timeout").unwrap();
        assert!(jwt_pos < gate_pos);
        assert!(gate_pos < timeout_pos);
    }

    #[test]
    fn test_disable_enforcement_omits_gate() {
        let shared = SharedSetup::new();
        let options = StackOptions {
            disable_auth_enforcement: true,
            ..StackOptions::default()
        };
        let pipeline = assemble(&options, &shared).unwrap();
        assert!(!pipeline.stage_names().contains(&"auth_required"));
    }

    #[test]
    fn test_bad_public_key_fails_assembly() {
        let shared = SharedSetup::new();
        let options = StackOptions {
            jwt_auth: Some(JwtAuthOptions {
                public_key_pems: vec!["not a pem".to_string()],
            }),
            ..StackOptions::default()
        };
        let err = assemble(&options, &shared).unwrap_err();
        assert!(matches!(err, CerberusError::Configuration { .. }));
    }

    #[test]
    fn test_bad_allow_pattern_fails_assembly() {
        let shared = SharedSetup::new();
        let options = StackOptions {
            allow_unauthorized: vec!["GET /([bad".to_string()],
            ..StackOptions::default()
        };
        let err = assemble(&options, &shared).unwrap_err();
        assert!(matches!(err, CerberusError::Configuration { .. }));
    }

    #[test]
    fn test_second_stack_keeps_first_timeout() {
        let shared = SharedSetup::new();
        let first = StackOptions {
            request_timeout_seconds: Some(30),
            ..StackOptions::default()
        };
        let second = StackOptions {
            request_timeout_seconds: Some(60),
            skip_duplicate_setup: true,
            ..StackOptions::default()
        };

        let _ = assemble(&first, &shared).unwrap();
        let _ = assemble(&second, &shared).unwrap();

        assert_eq!(shared.first_timeout_seconds.get(), Some(&30));
    }

    #[test]
    fn test_metrics_registration_claimed_once() {
        let shared = SharedSetup::new();
        assert!(shared.claim_metrics_registration());
        assert!(!shared.claim_metrics_registration());
    }

    #[test]
    fn test_log_config_reflects_options() {
        let options = StackOptions {
            service_name: "edge".to_string(),
            plain_logging: true,
            ..StackOptions::default()
        };
        let config = options.log_config();
        assert!(config.plain_format);
        assert_eq!(config.service_name, "edge");
    }
}
