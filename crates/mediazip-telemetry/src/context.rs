//! Request context shared between the HTTP layer and the export pipeline logs.
//!
//! # Design
//! - One [`RequestContext`] per request, held in task-local storage so failure
//!   logs deep in a handler can name the request and route without threading
//!   them through every call.
//! - An application-level span guard carries the build identifier.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the application-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the application-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        let service = service.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("app", service = %service, build_sha = %build_sha()),
        ));
        Self {
            _guard: span.enter(),
        }
    }
}

/// Identifiers of the request currently being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Arc<str>,
    route: Arc<str>,
}

impl RequestContext {
    /// Context for a request carrying `request_id`, matched on `route`.
    #[must_use]
    pub fn new(request_id: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            route: Arc::from(route.into()),
        }
    }

    /// Value of the `x-request-id` header; empty when none was assigned.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Matched route template, or the raw path when no route matched.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Record the identifiers on `span`, which must declare `request_id` and `route`.
    pub fn record_on(&self, span: &Span) {
        span.record("request_id", self.request_id());
        span.record("route", self.route());
    }
}

tokio::task_local! {
    static ACTIVE_REQUEST: RequestContext;
}

/// Context of the request served by the current task, if any.
#[must_use]
pub fn current_request_context() -> Option<RequestContext> {
    ACTIVE_REQUEST.try_with(Clone::clone).ok()
}

/// Run `fut` with `context` available through [`current_request_context`].
pub async fn with_request_context<Fut, T>(context: RequestContext, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    ACTIVE_REQUEST.scope(context, fut).await
}
