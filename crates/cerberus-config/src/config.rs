//! Typed configuration structures.

use crate::ConfigError;
use cerberus_core::AuthClaims;
use cerberus_middleware::stack::{BasicAuthOptions, JwtAuthOptions, StackOptions};
use cerberus_telemetry::logging::LogConfig;
use cerberus_telemetry::metrics::MetricsConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Top-level Cerberus configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CerberusConfig {
    /// Stack assembly settings.
    pub stack: StackConfig,

    /// Bearer token validation settings.
    pub jwt: JwtConfig,

    /// Basic auth validation settings.
    pub basic_auth: BasicAuthConfig,

    /// Observability settings.
    pub telemetry: TelemetrySection,
}

/// Stack assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StackConfig {
    /// Service name used in log and span fields.
    pub service_name: String,

    /// Use human-readable log output instead of JSON.
    pub plain_logging: bool,

    /// Allowed CORS origin (`*` for any). Unset omits the CORS stage.
    pub cors_allow_origin: Option<String>,

    /// Per-request deadline in seconds. Unset omits the timeout stage.
    pub request_timeout_seconds: Option<u64>,

    /// Omit the authentication gate. For local development only.
    pub disable_auth_enforcement: bool,

    /// Allow-list patterns for unauthenticated routes.
    pub allow_unauthorized: Vec<String>,

    /// Trust `X-Request-ID` headers from the caller.
    pub trust_incoming_request_id: bool,

    /// Skip process-wide metric registration.
    pub skip_duplicate_setup: bool,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            service_name: "cerberus".to_string(),
            plain_logging: false,
            cors_allow_origin: None,
            request_timeout_seconds: None,
            disable_auth_enforcement: false,
            allow_unauthorized: Vec::new(),
            trust_incoming_request_id: false,
            skip_duplicate_setup: false,
        }
    }
}

/// Bearer token validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JwtConfig {
    /// Whether bearer token validation is enabled.
    pub enabled: bool,

    /// Paths to PEM-encoded RSA public key files.
    pub public_key_files: Vec<PathBuf>,
}

/// Basic auth validation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BasicAuthConfig {
    /// Whether basic auth validation is enabled.
    pub enabled: bool,

    /// Expected username.
    pub username: String,

    /// Expected password.
    pub password: String,

    /// Subject attached as identity claims on a credential match.
    pub subject: String,
}

/// Observability settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetrySection {
    /// Metrics settings.
    pub metrics: MetricsSection,

    /// Logging settings.
    pub logging: LoggingSection,
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsSection {
    /// Whether the Prometheus exporter is enabled.
    pub enabled: bool,

    /// Address to expose metrics on.
    pub addr: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSection {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Log level filter (e.g., "info", "debug").
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

impl CerberusConfig {
    /// Creates a development preset: plain logs at debug level, no
    /// enforcement surprises.
    #[must_use]
    pub fn development() -> Self {
        Self {
            stack: StackConfig {
                plain_logging: true,
                disable_auth_enforcement: true,
                ..StackConfig::default()
            },
            telemetry: TelemetrySection {
                logging: LoggingSection {
                    level: "debug".to_string(),
                    ..LoggingSection::default()
                },
                ..TelemetrySection::default()
            },
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` describing the first problem
    /// found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stack.service_name.is_empty() {
            return Err(ConfigError::validation_error(
                "stack.service_name must not be empty",
            ));
        }

        if self.stack.request_timeout_seconds == Some(0) {
            return Err(ConfigError::validation_error(
                "stack.request_timeout_seconds must be greater than zero",
            ));
        }

        if self.jwt.enabled && self.jwt.public_key_files.is_empty() {
            return Err(ConfigError::validation_error(
                "jwt.enabled requires at least one entry in jwt.public_key_files",
            ));
        }

        if self.basic_auth.enabled {
            if self.basic_auth.username.is_empty() {
                return Err(ConfigError::validation_error(
                    "basic_auth.enabled requires basic_auth.username",
                ));
            }
            if self.basic_auth.password.is_empty() {
                return Err(ConfigError::validation_error(
                    "basic_auth.enabled requires basic_auth.password",
                ));
            }
        }

        // A stack with the gate enabled but no way to attach claims and no
        // exempted routes would reject every request.
        if !self.stack.disable_auth_enforcement
            && !self.jwt.enabled
            && !self.basic_auth.enabled
            && self.stack.allow_unauthorized.is_empty()
        {
            return Err(ConfigError::validation_error(
                "auth enforcement is enabled but no validator is configured and \
                 stack.allow_unauthorized is empty; every request would be rejected",
            ));
        }

        Ok(())
    }

    /// Builds the stack options described by this configuration.
    ///
    /// Bearer public key files are read here, at startup, so a missing or
    /// unreadable file fails before the stack is assembled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if a public key file cannot be read.
    pub fn stack_options(&self) -> Result<StackOptions, ConfigError> {
        let jwt_auth = if self.jwt.enabled {
            let mut pems = Vec::with_capacity(self.jwt.public_key_files.len());
            for path in &self.jwt.public_key_files {
                let pem =
                    fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
                pems.push(pem);
            }
            Some(JwtAuthOptions {
                public_key_pems: pems,
            })
        } else {
            None
        };

        let basic_auth = if self.basic_auth.enabled {
            let subject = if self.basic_auth.subject.is_empty() {
                self.basic_auth.username.as_str()
            } else {
                self.basic_auth.subject.as_str()
            };
            Some(BasicAuthOptions {
                username: self.basic_auth.username.clone(),
                password: self.basic_auth.password.clone(),
                claims: AuthClaims::for_subject(subject),
            })
        } else {
            None
        };

        Ok(StackOptions {
            service_name: self.stack.service_name.clone(),
            plain_logging: self.stack.plain_logging,
            cors_allow_origin: self.stack.cors_allow_origin.clone(),
            request_timeout_seconds: self.stack.request_timeout_seconds,
            jwt_auth,
            basic_auth,
            disable_auth_enforcement: self.stack.disable_auth_enforcement,
            allow_unauthorized: self.stack.allow_unauthorized.clone(),
            trust_incoming_request_id: self.stack.trust_incoming_request_id,
            skip_duplicate_setup: self.stack.skip_duplicate_setup,
        })
    }

    /// Builds the logging configuration described by this configuration.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.telemetry.logging.enabled,
            level: self.telemetry.logging.level.clone(),
            plain_format: self.stack.plain_logging,
            service_name: self.stack.service_name.clone(),
            ..LogConfig::default()
        }
    }

    /// Builds the metrics configuration described by this configuration.
    #[must_use]
    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig {
            enabled: self.telemetry.metrics.enabled,
            addr: self.telemetry.metrics.addr.clone(),
            service_name: self.stack.service_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_rejects_everything_and_fails_validation() {
        let config = CerberusConfig::default();
        assert!(!config.jwt.enabled);
        assert!(!config.basic_auth.enabled);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_allow_list_alone_satisfies_validation() {
        let mut config = CerberusConfig::default();
        config.stack.allow_unauthorized = vec!["GET /health".to_string()];
        config.validate().unwrap();
    }

    #[test]
    fn test_development_preset() {
        let config = CerberusConfig::development();
        assert!(config.stack.plain_logging);
        assert!(config.stack.disable_auth_enforcement);
        assert_eq!(config.telemetry.logging.level, "debug");
        config.validate().unwrap();
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = CerberusConfig::default();
        config.stack.request_timeout_seconds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_jwt_enabled_requires_key_files() {
        let mut config = CerberusConfig::default();
        config.jwt.enabled = true;
        assert!(config.validate().is_err());

        config.jwt.public_key_files.push(PathBuf::from("key.pem"));
        config.validate().unwrap();
    }

    #[test]
    fn test_basic_auth_requires_credentials() {
        let mut config = CerberusConfig::default();
        config.basic_auth.enabled = true;
        assert!(config.validate().is_err());

        config.basic_auth.username = "svc".to_string();
        assert!(config.validate().is_err());

        config.basic_auth.password = "secret".to_string();
        config.validate().unwrap();
    }

    #[test]
    fn test_stack_options_maps_fields() {
        let mut config = CerberusConfig::default();
        config.stack.cors_allow_origin = Some("https://app.example.com".to_string());
        config.stack.request_timeout_seconds = Some(30);
        config.stack.allow_unauthorized = vec!["GET /health".to_string()];

        let options = config.stack_options().unwrap();
        assert_eq!(
            options.cors_allow_origin.as_deref(),
            Some("https://app.example.com")
        );
        assert_eq!(options.request_timeout_seconds, Some(30));
        assert_eq!(options.allow_unauthorized, vec!["GET /health"]);
        assert!(options.jwt_auth.is_none());
        assert!(options.basic_auth.is_none());
    }

    #[test]
    fn test_stack_options_reads_key_files() {
        let mut key_file = tempfile::NamedTempFile::new().unwrap();
        key_file.write_all(b"-----BEGIN PUBLIC KEY-----\n").unwrap();

        let mut config = CerberusConfig::default();
        config.jwt.enabled = true;
        config.jwt.public_key_files.push(key_file.path().to_path_buf());

        let options = config.stack_options().unwrap();
        let jwt = options.jwt_auth.unwrap();
        assert_eq!(jwt.public_key_pems.len(), 1);
        assert!(jwt.public_key_pems[0].starts_with("-----BEGIN PUBLIC KEY-----"));
    }

    #[test]
    fn test_stack_options_missing_key_file() {
        let mut config = CerberusConfig::default();
        config.jwt.enabled = true;
        config
            .jwt
            .public_key_files
            .push(PathBuf::from("/nonexistent/key.pem"));

        let err = config.stack_options().unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn test_basic_auth_subject_falls_back_to_username() {
        let mut config = CerberusConfig::default();
        config.basic_auth.enabled = true;
        config.basic_auth.username = "svc".to_string();
        config.basic_auth.password = "secret".to_string();

        let options = config.stack_options().unwrap();
        let basic = options.basic_auth.unwrap();
        assert_eq!(basic.claims.sub.as_deref(), Some("svc"));
    }

    #[test]
    fn test_log_config_inherits_stack_settings() {
        let mut config = CerberusConfig::default();
        config.stack.service_name = "edge".to_string();
        config.stack.plain_logging = true;

        let log = config.log_config();
        assert_eq!(log.service_name, "edge");
        assert!(log.plain_format);
    }
}
