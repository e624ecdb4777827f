// Module: http
// WebSocket endpoint plus the health and metrics probes

pub mod health;
pub mod websocket;

use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::impls::LiveHub;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<LiveHub>,
    /// Largest inbound frame a socket accepts
    pub max_message_bytes: usize,
    /// Flips to `true` when the server starts shutting down
    pub shutdown: Option<watch::Receiver<bool>>,
}

impl AppState {
    #[must_use]
    pub const fn new(hub: Arc<LiveHub>, max_message_bytes: usize) -> Self {
        Self {
            hub,
            max_message_bytes,
            shutdown: None,
        }
    }

    /// Close open sockets once `shutdown` turns `true`
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/ws", get(websocket::websocket_handler))
        .merge(health::create_health_router());

    // Apply layers before state
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Apply state to all routes (must be last)
    router.with_state(state)
}
