//! Real-time channel
//!
//! One WebSocket per client. Inbound `update_state` frames are submitted to the
//! relay; every relayed snapshot not submitted by this connection is sent
//! back out as a `sync_event` frame. Delivery is at most once: a connection
//! that lags behind the fan-out buffer skips the missed snapshots.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use cowatch_common::{ClientEvent, HubEvent};
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::hub::{ClientId, RelayHub};
use crate::AppState;

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.hub))
}

async fn handle_socket(socket: WebSocket, hub: RelayHub) {
    let guard = hub.connect();
    let client = guard.id();
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before reading so nothing submitted by peers after connect is missed
    let mut relayed = hub.subscribe();
    let closed = hub.closed();

    let mut forward = tokio::spawn(async move {
        loop {
            match relayed.recv().await {
                Ok(item) => {
                    if item.is_echo_for(client) {
                        continue;
                    }
                    let frame = match serde_json::to_string(&HubEvent::SyncEvent(item.snapshot.clone())) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Failed to serialize sync_event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Client {} lagged, skipped {} snapshots", client, skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut read = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            match message {
                Message::Text(text) => handle_frame(&hub, client, &text).await,
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward => read.abort(),
        _ = &mut read => forward.abort(),
        _ = closed => {
            debug!("Hub shutting down, closing client {}", client);
            read.abort();
            forward.abort();
        }
    }

    drop(guard);
}

async fn handle_frame(hub: &RelayHub, client: ClientId, text: &str) {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!("Ignoring malformed frame from {}: {}", client, e);
            return;
        }
    };

    match event {
        ClientEvent::UpdateState(snapshot) => {
            debug!(
                "update_state from {}: {} @ {:.1}s",
                client, snapshot.source.media_id, snapshot.position_seconds
            );
            if let Err(e) = hub.submit(client, snapshot).await {
                warn!("Rejected update_state from {}: {}", client, e);
            }
        }
    }
}
