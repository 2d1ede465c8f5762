//! Per-request accounting for the admin surface.
use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use mediazip_telemetry::{RequestContext, with_request_context};
use tracing::{debug, warn};

use crate::http::constants::{HEADER_REQUEST_ID, HEADER_SKIPPED_ENTRIES};
use crate::state::ApiState;

/// Identify a request by its `x-request-id` header and matched route template.
pub(crate) fn request_context<B>(request: &axum::http::Request<B>) -> RequestContext {
    let request_id = request
        .headers()
        .get(HEADER_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);
    RequestContext::new(request_id, route)
}

/// Run the handler inside its request context and count the response per route and status.
pub(crate) async fn track_request(
    State(state): State<Arc<ApiState>>,
    request: Request,
    next: Next,
) -> Response {
    let context = request_context(&request);
    let route = context.route().to_string();
    let response = with_request_context(context, next.run(request)).await;

    let status = response.status();
    state.telemetry.inc_http_request(&route, status.as_u16());
    if let Some(skipped) = response
        .headers()
        .get(HEADER_SKIPPED_ENTRIES)
        .and_then(|value| value.to_str().ok())
    {
        debug!(route = %route, skipped, "archive served without some entries");
    }
    if status.is_server_error() {
        warn!(route = %route, status = status.as_u16(), "request failed");
    }
    response
}
