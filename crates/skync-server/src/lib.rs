//! skync relay server
//!
//! Holds the authoritative drawable list of every room in memory and
//! relays room events between the WebSocket connections that joined it.
//!
//! ## Routes
//!
//! - `GET /` banner
//! - `GET /health` liveness probe
//! - `GET /ws` WebSocket upgrade

pub mod config;
pub mod error;
pub mod room;
pub mod router;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::router::EventRouter;

/// Shared application state, injected into handlers via the `State` extractor.
#[derive(Clone, Default)]
pub struct AppState {
    pub router: Arc<EventRouter>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Build the HTTP application.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "skync relay server - connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}
