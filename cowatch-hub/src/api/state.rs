//! Snapshot read/write endpoints
//!
//! `GET /api/state` is the cold-read path used on page load; `POST /api/state`
//! saves without notifying peers.

use axum::{extract::State, Json};
use cowatch_common::PlaybackSnapshot;
use serde::Serialize;
use tracing::{debug, error};

use crate::error::Result;
use crate::AppState;

/// Response of a successful save
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub status: &'static str,
}

/// GET /api/state
///
/// Returns the current snapshot (live-mode positions extrapolated to now) or `null`.
pub async fn get_state(State(state): State<AppState>) -> Result<Json<Option<PlaybackSnapshot>>> {
    match state.hub.get_snapshot().await {
        Ok(snapshot) => {
            debug!("GET /api/state -> {}", if snapshot.is_some() { "snapshot" } else { "null" });
            Ok(Json(snapshot))
        }
        Err(e) => {
            error!("Failed to load state: {}", e);
            Err(e)
        }
    }
}

/// POST /api/state
pub async fn post_state(
    State(state): State<AppState>,
    Json(snapshot): Json<PlaybackSnapshot>,
) -> Result<Json<SaveResponse>> {
    state.hub.save(snapshot).await?;
    Ok(Json(SaveResponse { status: "saved" }))
}
