//! Real-time channel event types
//!
//! Every frame on the duplex channel between a client and the hub is one JSON
//! text message of the form `{"event": "<name>", "data": <snapshot>}`.

use serde::{Deserialize, Serialize};

use crate::snapshot::PlaybackSnapshot;

/// Event name a client uses to submit its local state
pub const UPDATE_STATE: &str = "update_state";

/// Event name the hub uses to deliver a peer's state
pub const SYNC_EVENT: &str = "sync_event";

/// Client → hub messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// A locally observed playback change
    UpdateState(PlaybackSnapshot),
}

/// Hub → client messages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HubEvent {
    /// Another client's submission, stamped with the hub's receipt time
    SyncEvent(PlaybackSnapshot),
}

impl HubEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            HubEvent::SyncEvent(_) => SYNC_EVENT,
        }
    }

    pub fn into_snapshot(self) -> PlaybackSnapshot {
        match self {
            HubEvent::SyncEvent(snapshot) => snapshot,
        }
    }
}
