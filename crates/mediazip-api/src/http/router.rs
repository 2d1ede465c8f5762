//! Router construction and server host for the API.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{HeaderName, Method, Request, header::CONTENT_TYPE},
    middleware,
    routing::{get, post},
};
use mediazip_core::BulkExporter;
use mediazip_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::auth::{CallerDirectory, resolve_caller};
use crate::http::bulk::{bulk_action, list_bulk_actions};
use crate::http::constants::HEADER_API_KEY;
use crate::http::health::{health, metrics};
use crate::http::notices::media_page;
use crate::http::telemetry::{request_context, track_request};
use crate::i18n::with_locale;
use crate::state::ApiState;

/// Axum router wrapper that hosts the mediazip HTTP surface.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct the server with its shared dependencies wired through application state.
    ///
    /// No compression layer is mounted; archives leave the server byte for byte.
    #[must_use]
    pub fn new(exporter: BulkExporter, callers: CallerDirectory, telemetry: Metrics) -> Self {
        let state = Arc::new(ApiState::new(exporter, callers, telemetry));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE, HeaderName::from_static(HEADER_API_KEY)]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let span = tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = tracing::field::Empty,
                    request_id = tracing::field::Empty,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                );
                request_context(request).record_on(&span);
                span
            })
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(mediazip_telemetry::propagate_request_id_layer())
            .layer(mediazip_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(state.clone(), track_request));

        let router = Self::public_routes()
            .merge(Self::admin_routes(&state))
            .layer(middleware::from_fn(with_locale))
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    fn admin_routes(state: &Arc<ApiState>) -> Router<Arc<ApiState>> {
        let callers = middleware::from_fn_with_state(state.clone(), resolve_caller);

        Router::new()
            .route("/admin/media", get(media_page))
            .route(
                "/admin/media/bulk",
                post(bulk_action).route_layer(callers.clone()),
            )
            .route(
                "/admin/media/bulk-actions",
                get(list_bulk_actions).route_layer(callers),
            )
    }

    /// Consume the server and hand back the configured router.
    #[must_use]
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Serve the API using the configured router on the supplied address.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve(self, addr: SocketAddr) -> ApiServerResult<()> {
        tracing::info!(%addr, "starting API");
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        axum::serve(listener, self.router.into_make_service())
            .await
            .map_err(|source| ApiServerError::Serve { source })
    }
}
