//! # Cerberus Middleware
//!
//! Fixed-order request authentication stack for Cerberus services.
//!
//! This crate provides the middleware chain that every request to a
//! Cerberus-fronted service flows through. The stage order is immutable
//! and cannot be changed by users; options only decide which optional
//! stages are present.
//!
//! ## Stack Stages
//!
//! | Stage | Middleware           | Purpose                                   |
//! |-------|----------------------|-------------------------------------------|
//! | 1     | Cancellation Probe   | Log requests abandoned after the deadline |
//! | 2     | Request ID           | Generate/propagate request ID (UUID v7)   |
//! | 3     | Tracing              | Establish trace correlation IDs           |
//! | 4     | Request Log          | One structured completion line            |
//! | 5     | Recovery             | Convert downstream panics to 500          |
//! | 6     | Response Headers     | Stamp `X-Request-ID` / `traceparent`      |
//! | 7     | CORS                 | Preflight and CORS headers (optional)     |
//! | 8     | Metrics              | Counters, latency, in-flight gauge        |
//! | 9     | JWT Validator        | Bearer token validation (optional)        |
//! | 10    | Basic Auth           | Basic credential validation (optional)    |
//! | 11    | Auth Required        | Reject unauthenticated requests           |
//! | 12    | Timeout              | Per-request deadline (optional)           |
//!
//! A cancellation probe labeled with the preceding stage's name follows
//! every installed stage (2-12), so an abandoned request is visible at
//! each boundary its response crossed.
//!
//! ## Design
//!
//! Credential validators (9, 10) never reject a request on their own for
//! a missing credential; they attach identity claims when a credential
//! checks out and otherwise pass the request along. The gate (11) is the
//! single point that rejects, with one uniform 401 body, so a caller
//! cannot distinguish a wrong password from no credential at all.
//!
//! ## Example
//!
//! ```ignore
//! use cerberus_middleware::stack::{assemble, SharedSetup, StackOptions};
//!
//! let shared = SharedSetup::new();
//! let options = StackOptions {
//!     allow_unauthorized: vec!["GET /health".to_string()],
//!     ..StackOptions::default()
//! };
//! let pipeline = assemble(&options, &shared)?;
//! let response = pipeline.process(state, request, handler).await;
//! ```

#![doc(html_root_url = "https://docs.rs/cerberus-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod allowlist;
pub mod fixtures;
pub mod middleware;
pub mod pipeline;
pub mod stack;
pub mod stages;
pub mod state;
pub mod types;

// Re-export main types at crate root
pub use allowlist::AllowList;
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use stack::{assemble, BasicAuthOptions, JwtAuthOptions, SharedSetup, StackOptions};
pub use state::RequestState;
pub use types::{Request, Response, ResponseExt};
