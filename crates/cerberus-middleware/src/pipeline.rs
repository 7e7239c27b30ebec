//! Fixed-order middleware stack.
//!
//! This module implements the immutable stage chain that all requests flow
//! through. The chain is a single ordered list of stages; each stage wraps
//! the ones after it, so the first stage added is the outermost and the last
//! stage added runs immediately before the handler.
//!
//! The chain cannot be modified after construction. Which optional stages
//! are present is decided by the assembler in [`crate::stack`]; their
//! relative order never changes.

use crate::middleware::{BoxFuture, Middleware, Next};
use crate::state::RequestState;
use crate::types::{Request, Response};
use std::sync::Arc;

/// A type-erased stage that can be stored in the chain.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The assembled middleware stack.
///
/// # Example
///
/// ```ignore
/// use cerberus_middleware::pipeline::Pipeline;
/// use cerberus_middleware::state::RequestState;
///
/// let pipeline = Pipeline::builder()
///     .add_stage(RequestIdStage::new())
///     .add_stage(TimeoutStage::new(Duration::from_secs(30)))
///     .build();
///
/// let response = pipeline.process(RequestState::new(), request, handler).await;
/// ```
pub struct Pipeline {
    /// Stages in outermost-to-innermost order.
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through the entire stack.
    ///
    /// This is the main entry point for request processing. The request
    /// flows through all stages in order, then to the handler; the response
    /// flows back out through the same stages in reverse.
    pub async fn process<H>(&self, mut state: RequestState, request: Request, handler: H) -> Response
    where
        H: FnOnce(&mut RequestState, Request) -> BoxFuture<'static, Response> + Send + 'static,
    {
        // Build the chain from back to front
        let next = self.build_chain(handler);
        next.run(&mut state, request).await
    }

    /// Builds the stage chain for a request.
    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut RequestState, Request) -> BoxFuture<'static, Response> + Send + 'a,
    {
        // Start with the handler as the terminal point, then wrap with
        // stages in reverse so the first stage ends up outermost.
        let mut next = Next::handler(handler);

        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }

        next
    }

    /// Returns the names of all stages in outermost-to-innermost order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

// Stages are type-erased trait objects; the names are the useful part.
impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
///
/// Only the assembler should use this directly; application code goes
/// through [`crate::stack::assemble`] so the fixed order is enforced.
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty pipeline builder.
    #[must_use]
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage to the chain.
    ///
    /// Stages run in the order they are added; the first stage added wraps
    /// all the others.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    ///
    /// The resulting stack has a fixed stage order that cannot be modified
    /// after construction.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
