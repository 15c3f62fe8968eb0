//! Static UI serving
//!
//! The browser UI is not part of the hub; when a directory is configured its
//! `index.html` is served at `/` and everything else under `/static`.

use axum::Router;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};

use crate::AppState;

/// Routes serving `dir`
pub fn static_routes(dir: &Path) -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new(dir.join("index.html")))
        .nest_service("/static", ServeDir::new(dir.join("static")))
}
