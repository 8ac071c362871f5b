//! Health, readiness and metrics endpoints

use crate::error::ControllerError;
use crate::metrics::Metrics;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// State shared by the probe handlers
#[derive(Debug, Clone)]
pub struct ProbeState {
    /// Set once the controller stream is running
    pub ready: Arc<AtomicBool>,
    /// Exported on `/metrics`
    pub metrics: Arc<Metrics>,
}

impl ProbeState {
    /// Starts out not ready
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            metrics,
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<ProbeState>) -> Response {
    if state.ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics(State(state): State<ProbeState>) -> Response {
    match state.metrics.export() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `/healthz`, `/readyz` and `/metrics`
pub fn router(state: ProbeState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the probe router on `addr` until the process exits
pub async fn serve(addr: SocketAddr, state: ProbeState) -> Result<(), ControllerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ControllerError::InvalidConfig(format!("Failed to bind probe listener on {}: {}", addr, e)))?;
    info!("Probe server listening on {}", addr);

    axum::serve(listener, router(state))
        .await
        .map_err(|e| ControllerError::Watch(format!("Probe server error: {}", e)))
}
