//! Health check and metrics endpoints
//!
//! Provides liveness and readiness probes plus the Prometheus scrape target.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::http::AppState;
use crate::observability::gather_metrics;

/// Readiness payload
#[derive(Debug, Serialize)]
pub struct ReadyStatus {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/metrics", get(metrics))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadyStatus> {
    Json(ReadyStatus {
        status: "ready",
        connections: state.hub.connection_count(),
        rooms: state.hub.room_count(),
    })
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_metrics(),
    )
}
