//! HTTP boundary for the metrics service.

use axum::{
    extract::{Query, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{debug, info};
use valpulse_common::{PulseError, PulseResult, ResponseEnvelope};

use crate::service::MetricsService;
use crate::telemetry::Telemetry;

/// Shared state for all HTTP handlers
#[derive(Clone)]
struct ApiState {
    service: Arc<MetricsService>,
    telemetry: Arc<Telemetry>,
}

/// Cache-defeating query parameters sent by clients. Accepted and ignored.
#[derive(Debug, Deserialize)]
struct CacheBuster {
    t: Option<String>,
    r: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: i64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Response headers that keep every cache between origin and browser from
/// storing a response.
pub fn no_cache_headers() -> Vec<(HeaderName, HeaderValue)> {
    vec![
        (
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0"),
        ),
        (header::PRAGMA, HeaderValue::from_static("no-cache")),
        (header::EXPIRES, HeaderValue::from_static("0")),
        (
            HeaderName::from_static("cdn-cache-control"),
            HeaderValue::from_static("no-store"),
        ),
        (
            HeaderName::from_static("cloudflare-cdn-cache-control"),
            HeaderValue::from_static("no-store"),
        ),
        (
            HeaderName::from_static("surrogate-control"),
            HeaderValue::from_static("no-store"),
        ),
    ]
}

pub fn create_router(
    service: Arc<MetricsService>,
    telemetry: Arc<Telemetry>,
    concurrency_limit: usize,
) -> Router {
    let mut router = Router::new()
        .route("/metrics", get(handle_metrics))
        .route("/health", get(handle_health))
        .route("/internal/prometheus", get(handle_prometheus))
        .with_state(ApiState { service, telemetry });

    for (name, value) in no_cache_headers() {
        router = router.layer(SetResponseHeaderLayer::overriding(name, value));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
}

/// Bind and serve until `shutdown_signal` completes
pub async fn serve(
    bind_address: SocketAddr,
    router: Router,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> PulseResult<()> {
    let listener = TcpListener::bind(bind_address).await?;
    info!("Metrics API listening on http://{}", bind_address);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown_signal.await;
            info!("Metrics API received shutdown signal, stopping...");
        })
        .await
        .map_err(PulseError::from)?;

    info!("Metrics API stopped");
    Ok(())
}

async fn handle_metrics(
    State(state): State<ApiState>,
    Query(buster): Query<CacheBuster>,
) -> Json<ResponseEnvelope> {
    debug!(t = ?buster.t, r = ?buster.r, "Metrics requested");
    Json(state.service.get_metrics().await)
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

async fn handle_prometheus(State(state): State<ApiState>) -> Response {
    match state.telemetry.encode() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
