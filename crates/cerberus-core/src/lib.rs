//! # Cerberus Core
//!
//! Core types for the Cerberus request authentication/authorization stack.
//!
//! This crate provides the foundational types shared by the middleware
//! pipeline and its collaborators:
//!
//! - [`RequestId`] - UUID v7 request identifier
//! - [`AuthClaims`] - structured identity claims attached to a request
//! - [`CerberusError`] - standard error types with status-code mapping

#![doc(html_root_url = "https://docs.rs/cerberus-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod claims;
mod error;
mod request_id;

pub use claims::AuthClaims;
pub use error::{CerberusError, CerberusResult, ErrorCategory};
pub use request_id::RequestId;
