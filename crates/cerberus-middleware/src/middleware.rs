//! Core middleware trait and chain types.
//!
//! This module defines the [`Middleware`] trait that all stack stages
//! implement. Stages process requests before they reach handlers and
//! responses after handlers complete.
//!
//! # Design Philosophy
//!
//! Cerberus uses a fixed-order middleware stack. Unlike general-purpose
//! frameworks, stages cannot be reordered, disabled individually, or inserted
//! between core stages. The assembler decides which optional stages are
//! present; their relative order never changes. This ensures that credential
//! validation always runs before the authentication gate and that every
//! service built on the stack behaves the same way.
//!
//! # Example
//!
//! ```ignore
//! use cerberus_middleware::{Middleware, Next, Request, Response, BoxFuture};
//! use cerberus_middleware::state::RequestState;
//!
//! struct TimingStage;
//!
//! impl Middleware for TimingStage {
//!     fn name(&self) -> &'static str {
//!         "timing"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         state: &'a mut RequestState,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let response = next.run(state, request).await;
//!             println!("Request took {:?}", state.elapsed());
//!             response
//!         })
//!     }
//! }
//! ```

use crate::state::RequestState;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;

/// A boxed future that returns a response.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// All stack stages implement this trait. A stage receives the mutable
/// request state, the incoming request, and a [`Next`] continuation that
/// invokes the rest of the chain.
///
/// # Invariants
///
/// - Stages MUST call `next.run()` exactly once (unless short-circuiting)
/// - Stages MUST NOT suppress error responses from downstream stages
/// - Stages MUST NOT reorder the chain
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this stage.
    ///
    /// This name is used for logging, metrics, and debugging.
    fn name(&self) -> &'static str;

    /// Process the request through this stage.
    ///
    /// # Arguments
    ///
    /// * `state` - The mutable per-request state
    /// * `request` - The incoming HTTP request
    /// * `next` - Continuation invoking the rest of the chain
    ///
    /// # Returns
    ///
    /// The HTTP response (either from downstream or generated here)
    fn process<'a>(
        &'a self,
        state: &'a mut RequestState,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response>;
}

/// Continuation invoking the rest of the middleware chain.
///
/// This type is passed to each stage and must be called (exactly once)
/// to continue processing. If not called, the stage short-circuits the
/// stack and returns its own response.
pub struct Next<'a> {
    /// The remaining chain
    inner: NextInner<'a>,
}

/// Internal representation of the remaining chain.
enum NextInner<'a> {
    /// More stages to process
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain - invoke the handler
    Handler(Box<dyn FnOnce(&mut RequestState, Request) -> BoxFuture<'static, Response> + Send + 'a>),
}

impl<'a> Next<'a> {
    /// Creates a new `Next` that will invoke the given stage.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut RequestState, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next stage or handler in the chain.
    ///
    /// This consumes `self` to ensure it can only be called once.
    pub async fn run(self, state: &mut RequestState, request: Request) -> Response {
        match self.inner {
            NextInner::Chain { middleware, next } => {
                middleware.process(state, request, *next).await
            }
            NextInner::Handler(handler) => handler(state, request).await,
        }
    }
}
