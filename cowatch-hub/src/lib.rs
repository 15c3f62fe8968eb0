//! cowatch-hub library - relay hub for synchronized playback
//!
//! Holds the single session snapshot in a one-row SQLite store, relays
//! `update_state` submissions to every other connected client, and serves the
//! cold-read `GET /api/state` with live-mode extrapolation.

use axum::Router;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod hub;
pub mod settings;
pub mod shutdown;

pub use error::{Error, Result};
pub use hub::RelayHub;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub hub: RelayHub,
}

impl AppState {
    pub fn new(hub: RelayHub) -> Self {
        Self { hub }
    }
}

/// Build application router
///
/// `static_dir`, when given, serves the browser UI at `/` and `/static`.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    use axum::routing::get;

    let mut router = Router::new()
        .route("/api/state", get(api::get_state).post(api::post_state))
        .route("/api/events", get(api::event_stream))
        .route("/ws", get(api::ws_handler))
        .merge(api::health_routes());

    if let Some(dir) = static_dir {
        router = router.merge(api::static_routes(dir));
    }

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
