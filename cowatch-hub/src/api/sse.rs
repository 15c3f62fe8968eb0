//! Server-Sent Events observer feed
//!
//! Streams every relayed snapshot as a `sync_event`. Observers never submit,
//! so nothing is filtered out. The stream ends when the hub shuts down.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};

use crate::AppState;

/// GET /api/events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("New SSE observer connected");

    let closed = state.hub.closed();
    let stream = BroadcastStream::new(state.hub.subscribe()).filter_map(|result| async move {
        match result {
            Ok(relayed) => match Event::default()
                .event(cowatch_common::events::SYNC_EVENT)
                .json_data(&relayed.snapshot)
            {
                Ok(event) => Some(Ok::<_, Infallible>(event)),
                Err(e) => {
                    warn!("Failed to serialize snapshot for SSE: {}", e);
                    None
                }
            },
            Err(e) => {
                // Lagged observer: skip what was missed
                warn!("SSE stream error: {:?}", e);
                None
            }
        }
    });
    let stream = stream.take_until(closed);

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
