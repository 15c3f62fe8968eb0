//! Client error types

use thiserror::Error;

use crate::player::PlayerError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Common(#[from] cowatch_common::Error),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Hub returned {status} for {url}")]
    HubStatus { status: u16, url: String },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Real-time channel is down; the emission is dropped
    #[error("Not connected to hub")]
    Disconnected,

    #[error("Synchronizer stopped")]
    Stopped,
}
