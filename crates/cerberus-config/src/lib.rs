//! Typed configuration for the Cerberus stack.
//!
//! This crate provides a strongly-typed configuration system for services
//! embedding the Cerberus request authentication stack, with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! # Overview
//!
//! The configuration system is built around the [`CerberusConfig`] struct:
//!
//! - [`StackConfig`] - stack assembly settings (service name, CORS origin,
//!   timeout, allow-list)
//! - [`JwtConfig`] - bearer token validation (public key files)
//! - [`BasicAuthConfig`] - basic credential validation
//! - [`TelemetrySection`] - metrics and logging settings
//!
//! # Example
//!
//! ```no_run
//! use cerberus_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("cerberus.toml")?
//!     .with_env_prefix("CERBERUS")
//!     .load()?;
//!
//! let options = config.stack_options()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [stack]
//! service_name = "edge-api"
//! cors_allow_origin = "https://app.example.com"
//! request_timeout_seconds = 30
//! allow_unauthorized = ["GET /health", "GET /version"]
//!
//! [jwt]
//! enabled = true
//! public_key_files = ["/etc/cerberus/jwt.pub"]
//!
//! [basic_auth]
//! enabled = true
//! username = "svc"
//! password = "secret"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! enabled = true
//! level = "info"
//! ```
//!
//! # Environment Variable Overrides
//!
//! All configuration values can be overridden via environment variables
//! using the format `PREFIX__SECTION__KEY`. For example:
//!
//! - `CERBERUS__STACK__SERVICE_NAME=edge-api`
//! - `CERBERUS__STACK__ALLOW_UNAUTHORIZED="GET /health, GET /version"`
//! - `CERBERUS__JWT__PUBLIC_KEY_FILES=/etc/cerberus/jwt.pub`

#![warn(missing_docs)]

mod config;
mod error;
mod loader;

pub use config::{
    BasicAuthConfig, CerberusConfig, JwtConfig, LoggingSection, MetricsSection, StackConfig,
    TelemetrySection,
};
pub use error::ConfigError;
pub use loader::ConfigLoader;
