//! Startup: pick the session a new client joins
//!
//! The hub's cold read wins. Without one (empty hub, or hub unreachable) the
//! client falls back to its own offline copy, if any.

use cowatch_common::PlaybackSnapshot;
use tracing::{info, warn};

use crate::link::HubClient;
use crate::store::SessionStore;
use crate::synchronizer::Command;

/// Decide the first command from what the hub and the offline store hold
pub fn choose_startup(hub_state: Option<PlaybackSnapshot>, has_saved: bool) -> Option<Command> {
    match hub_state {
        Some(snapshot) => Some(Command::Restore(snapshot)),
        None if has_saved => Some(Command::ResumeSaved),
        None => None,
    }
}

/// Query the hub, then the store
pub async fn bootstrap(hub: &HubClient, store: Option<&dyn SessionStore>) -> Option<Command> {
    let hub_state = match hub.fetch_state().await {
        Ok(state) => state,
        Err(e) => {
            warn!("Could not read session from hub: {}", e);
            None
        }
    };
    if hub_state.is_some() {
        info!("Restoring session from hub");
    }

    let has_saved = match (hub_state.is_none(), store) {
        (true, Some(store)) => match store.load().await {
            Ok(saved) => saved.is_some(),
            Err(e) => {
                warn!("Could not read saved session: {}", e);
                false
            }
        },
        _ => false,
    };
    if has_saved {
        info!("No hub session, resuming saved session");
    }

    choose_startup(hub_state, has_saved)
}
