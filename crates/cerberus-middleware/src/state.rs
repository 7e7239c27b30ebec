//! Per-request state.
//!
//! The [`RequestState`] carries mutable state through the middleware stack:
//! the request ID, the identity claims attached by whichever credential
//! validator succeeded, trace correlation IDs, and a cancellation flag set
//! when the request deadline fires.

use cerberus_core::{AuthClaims, RequestId};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// State that flows through the middleware stack.
///
/// The state is mutable during stack processing, allowing each stage to
/// enrich it with extracted information (identity claims, trace IDs, etc.).
/// The handler at the end of the chain receives the fully-enriched state.
///
/// # Example
///
/// ```
/// use cerberus_middleware::state::RequestState;
/// use cerberus_core::AuthClaims;
///
/// let mut state = RequestState::new();
/// assert!(state.claims().is_none());
///
/// state.set_claims(AuthClaims::for_subject("alice"));
/// assert_eq!(state.claims().and_then(|c| c.sub.as_deref()), Some("alice"));
/// ```
#[derive(Debug)]
pub struct RequestState {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// Identity claims attached by a successful credential validator.
    claims: Option<AuthClaims>,

    /// Trace ID (hex string).
    trace_id: Option<String>,

    /// Span ID (hex string).
    span_id: Option<String>,

    /// When the request started processing.
    started_at: Instant,

    /// Whether the request deadline fired while the chain was running.
    cancelled: bool,

    /// Type-erased extension data.
    ///
    /// Stages can store arbitrary data here using type-safe keys.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl RequestState {
    /// Creates new request state with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates request state with a specific request ID.
    ///
    /// Useful when the request ID was provided by a trusted upstream service.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            claims: None,
            trace_id: None,
            span_id: None,
            started_at: Instant::now(),
            cancelled: false,
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Sets the request ID.
    ///
    /// This should only be called by the request-ID stage.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Returns the identity claims, if any validator attached them.
    #[must_use]
    pub fn claims(&self) -> Option<&AuthClaims> {
        self.claims.as_ref()
    }

    /// Attaches identity claims.
    ///
    /// Called by a credential validator after it verified a credential.
    /// A later validator that succeeds overwrites an earlier record; a
    /// later validator that fails leaves the earlier record in place.
    pub fn set_claims(&mut self, claims: AuthClaims) {
        self.claims = Some(claims);
    }

    /// Returns whether any identity claims are attached.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.claims.is_some()
    }

    /// Returns the trace ID, if set.
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }

    /// Sets the trace ID.
    ///
    /// This should only be called by the tracing stage.
    pub fn set_trace_id(&mut self, trace_id: String) {
        self.trace_id = Some(trace_id);
    }

    /// Returns the span ID, if set.
    #[must_use]
    pub fn span_id(&self) -> Option<&str> {
        self.span_id.as_deref()
    }

    /// Sets the span ID.
    ///
    /// This should only be called by the tracing stage.
    pub fn set_span_id(&mut self, span_id: String) {
        self.span_id = Some(span_id);
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Marks the request as cancelled.
    ///
    /// Set by the timeout stage when the deadline fires; observed by the
    /// cancellation probe at the top of the chain.
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// Returns whether the request deadline fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Stores a typed extension value.
    ///
    /// Extensions allow stages to store arbitrary data that can be
    /// retrieved by later stages or handlers.
    ///
    /// # Example
    ///
    /// ```
    /// use cerberus_middleware::state::RequestState;
    ///
    /// #[derive(Clone)]
    /// struct RateLimitInfo {
    ///     remaining: u32,
    /// }
    ///
    /// let mut state = RequestState::new();
    /// state.set_extension(RateLimitInfo { remaining: 100 });
    ///
    /// let info = state.get_extension::<RateLimitInfo>().unwrap();
    /// assert_eq!(info.remaining, 100);
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    ///
    /// Returns `None` if no extension of the given type was stored.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for RequestState {
    fn default() -> Self {
        Self::new()
    }
}
