//! HTTP display endpoint.
//!
//! Serves the summary of the most recently completed interval as JSON so
//! dashboards and scripts can poll the in-memory sink.

use crate::core::config::HttpConfig;
use crate::core::{Result, StrataError};
use crate::metrics::InmemSink;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// API server state.
#[derive(Clone)]
struct ApiState {
    sink: Arc<InmemSink>,
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    intervals: usize,
    max_intervals: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    code: u16,
}

/// Build the router serving `sink`
pub fn router(sink: Arc<InmemSink>, enable_cors: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/metrics", get(metrics_handler))
        .with_state(ApiState { sink })
        .layer(TraceLayer::new_for_http());

    if enable_cors {
        app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
    } else {
        app
    }
}

/// Serve the display endpoint until `shutdown` resolves.
pub async fn start_server<F>(sink: Arc<InmemSink>, config: &HttpConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = SocketAddr::new(config.bind_address, config.port);
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| StrataError::network(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!("Serving metrics on http://{}/v1/metrics", addr);

    axum::serve(listener, router(sink, config.enable_cors))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| StrataError::network(format!("API server error: {e}")))
}

/// GET /health
async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        intervals: state.sink.interval_count(),
        max_intervals: state.sink.max_intervals(),
    })
}

/// GET /v1/metrics
async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.sink.display_metrics() {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            let status = match e {
                StrataError::NoIntervals => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: status.as_u16(),
                }),
            )
                .into_response()
        }
    }
}
