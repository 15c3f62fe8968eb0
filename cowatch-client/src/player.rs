//! Player capability interface
//!
//! The video widget is an external collaborator. A [`PlayerFactory`] hands out
//! a [`Player`] only once the widget is ready, so call sites never deal with a
//! half-initialized handle. Lifecycle callbacks flow back through
//! [`PlayerEvents`], tagged with the player-session epoch they belong to.

use async_trait::async_trait;
use cowatch_common::{PlayState, PlaybackSnapshot, SourceDescriptor};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::synchronizer::SyncInput;

/// Player call failures
///
/// None of these are fatal; callers log and let the next tick retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// Getter called before the widget finished loading, or after teardown
    #[error("player not ready")]
    NotReady,

    /// Operation not available for this source (e.g. next track on a single video)
    #[error("unsupported for this source: {0}")]
    Unsupported(&'static str),

    #[error("player call failed: {0}")]
    Failed(String),
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;

/// Remote-controlled video widget
#[async_trait]
pub trait Player: Send + Sync {
    async fn play(&self) -> PlayerResult<()>;
    async fn pause(&self) -> PlayerResult<()>;
    async fn seek_to(&self, seconds: f64) -> PlayerResult<()>;
    async fn set_volume(&self, percent: u8) -> PlayerResult<()>;
    async fn mute(&self) -> PlayerResult<()>;
    async fn unmute(&self) -> PlayerResult<()>;
    async fn set_quality(&self, quality: &str) -> PlayerResult<()>;

    async fn current_time(&self) -> PlayerResult<f64>;
    async fn duration(&self) -> PlayerResult<f64>;
    async fn state(&self) -> PlayerResult<PlayState>;
    async fn volume(&self) -> PlayerResult<u8>;
    async fn is_muted(&self) -> PlayerResult<bool>;

    /// Current playlist position; `None` while the widget cannot report a valid index
    async fn playlist_index(&self) -> PlayerResult<Option<u32>>;
    /// Media ids of the loaded playlist, empty when unknown
    async fn playlist(&self) -> PlayerResult<Vec<String>>;
    async fn play_track_at(&self, index: u32) -> PlayerResult<()>;
    async fn next_track(&self) -> PlayerResult<()>;
    async fn previous_track(&self) -> PlayerResult<()>;

    /// Release the widget; later calls fail with [`PlayerError::NotReady`]
    async fn destroy(&self) -> PlayerResult<()>;
}

/// What to load into a new player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRequest {
    pub source: SourceDescriptor,
    pub start_seconds: f64,
    pub track_index: u32,
}

impl PlayerRequest {
    /// Start of a user-selected source
    pub fn fresh(source: SourceDescriptor) -> Self {
        Self {
            source,
            start_seconds: 0.0,
            track_index: 0,
        }
    }

    /// Resume at the position and track a snapshot describes
    pub fn resume_from(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            source: snapshot.source.clone(),
            start_seconds: snapshot.position_seconds.max(0.0),
            track_index: if snapshot.source.is_playlist() {
                snapshot.track_index
            } else {
                0
            },
        }
    }
}

/// Widget lifecycle callbacks
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    StateChanged(PlayState),
    /// Widget error code
    Error(i32),
}

/// Event sink handed to a player at creation
///
/// Events carry the epoch of the player session that created the sink, so a
/// torn-down player's late callbacks are recognized and ignored.
#[derive(Debug, Clone)]
pub struct PlayerEvents {
    epoch: u64,
    tx: mpsc::UnboundedSender<SyncInput>,
}

impl PlayerEvents {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<SyncInput>) -> Self {
        Self { epoch, tx }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state_changed(&self, state: PlayState) {
        self.send(PlayerEvent::StateChanged(state));
    }

    pub fn error(&self, code: i32) {
        self.send(PlayerEvent::Error(code));
    }

    fn send(&self, event: PlayerEvent) {
        if self
            .tx
            .send(SyncInput::Player {
                epoch: self.epoch,
                event,
            })
            .is_err()
        {
            debug!("Synchronizer gone, dropping player event");
        }
    }
}

/// Creates ready players
#[async_trait]
pub trait PlayerFactory: Send + Sync {
    /// Load `request` and resolve once the widget is ready
    async fn create(
        &self,
        request: PlayerRequest,
        events: PlayerEvents,
    ) -> PlayerResult<Arc<dyn Player>>;
}
