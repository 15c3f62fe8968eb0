//! Playback snapshot model
//!
//! A [`PlaybackSnapshot`] is the unit of synchronization and persistence: one
//! complete description of what is playing and where. Snapshots are always
//! replaced wholesale, never merged field by field.
//!
//! JSON uses camelCase field names so browser clients and Rust clients share
//! one wire shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Quality value meaning "let the player decide"
pub const AUTO_QUALITY: &str = "auto";

/// What kind of media a source identifies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// One video
    Single,
    /// An ordered list of videos addressed by track index
    Playlist,
}

/// How the saved position should be interpreted on resume
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    /// Resume at the saved offset
    #[default]
    Resume,
    /// Track real elapsed time since the snapshot was captured (simulated broadcast)
    Live,
}

impl std::fmt::Display for PlayMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayMode::Resume => write!(f, "resume"),
            PlayMode::Live => write!(f, "live"),
        }
    }
}

fn default_quality() -> String {
    AUTO_QUALITY.to_string()
}

/// Identifies what is playing
///
/// Immutable for the lifetime of a player; a different media identity always
/// means the player is torn down and recreated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub media_id: String,
    #[serde(default = "default_quality")]
    pub requested_quality: String,
    #[serde(default)]
    pub mode: PlayMode,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, media_id: impl Into<String>) -> Self {
        Self {
            kind,
            media_id: media_id.into(),
            requested_quality: default_quality(),
            mode: PlayMode::Resume,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.requested_quality = quality.into();
        self
    }

    pub fn with_mode(mut self, mode: PlayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn is_playlist(&self) -> bool {
        self.kind == SourceKind::Playlist
    }

    /// Explicit quality request, `None` when the player should pick
    pub fn quality_override(&self) -> Option<&str> {
        if self.requested_quality.is_empty() || self.requested_quality == AUTO_QUALITY {
            None
        } else {
            Some(&self.requested_quality)
        }
    }

    /// Media identity: kind plus media id. Quality and mode do not count.
    pub fn same_media(&self, other: &SourceDescriptor) -> bool {
        self.kind == other.kind && self.media_id == other.media_id
    }
}

/// Player state as seen by the synchronization layer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayState {
    Playing,
    Paused,
    Buffering,
    Ended,
    Unstarted,
}

impl PlayState {
    /// Map the embedded widget's numeric state codes.
    ///
    /// `5` (cued) is treated as not yet started.
    pub fn from_player_code(code: i32) -> Self {
        match code {
            0 => PlayState::Ended,
            1 => PlayState::Playing,
            2 => PlayState::Paused,
            3 => PlayState::Buffering,
            _ => PlayState::Unstarted,
        }
    }

    pub fn player_code(self) -> i32 {
        match self {
            PlayState::Unstarted => -1,
            PlayState::Ended => 0,
            PlayState::Playing => 1,
            PlayState::Paused => 2,
            PlayState::Buffering => 3,
        }
    }
}

impl std::fmt::Display for PlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlayState::Playing => write!(f, "PLAYING"),
            PlayState::Paused => write!(f, "PAUSED"),
            PlayState::Buffering => write!(f, "BUFFERING"),
            PlayState::Ended => write!(f, "ENDED"),
            PlayState::Unstarted => write!(f, "UNSTARTED"),
        }
    }
}

/// One complete description of playback state at an instant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub source: SourceDescriptor,
    pub position_seconds: f64,
    #[serde(default)]
    pub duration_seconds: f64,
    pub play_state: PlayState,
    #[serde(default)]
    pub track_index: u32,
    #[serde(default = "default_volume")]
    pub volume_percent: u8,
    #[serde(default)]
    pub muted: bool,
    /// Assigned by whoever receives the snapshot (the hub, or the local store)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at_wall_clock: Option<DateTime<Utc>>,
}

fn default_volume() -> u8 {
    100
}

impl PlaybackSnapshot {
    /// Snapshot at the start of a source, paused, full volume
    pub fn new(source: SourceDescriptor) -> Self {
        Self {
            source,
            position_seconds: 0.0,
            duration_seconds: 0.0,
            play_state: PlayState::Unstarted,
            track_index: 0,
            volume_percent: default_volume(),
            muted: false,
            captured_at_wall_clock: None,
        }
    }

    /// Reject values no player could have produced
    pub fn validate(&self) -> Result<()> {
        if self.source.media_id.trim().is_empty() {
            return Err(Error::InvalidInput("source.mediaId is empty".to_string()));
        }
        if !self.position_seconds.is_finite() || self.position_seconds < 0.0 {
            return Err(Error::InvalidInput(format!(
                "positionSeconds must be a finite value >= 0, got {}",
                self.position_seconds
            )));
        }
        if !self.duration_seconds.is_finite() || self.duration_seconds < 0.0 {
            return Err(Error::InvalidInput(format!(
                "durationSeconds must be a finite value >= 0, got {}",
                self.duration_seconds
            )));
        }
        Ok(())
    }

    /// Enforce the model invariants on a validated snapshot
    ///
    /// - position never exceeds a known duration
    /// - track index is 0 for single sources
    /// - volume is at most 100
    pub fn normalized(mut self) -> Self {
        if self.duration_seconds > 0.0 && self.position_seconds > self.duration_seconds {
            self.position_seconds = self.duration_seconds;
        }
        if self.source.kind == SourceKind::Single {
            self.track_index = 0;
        }
        self.volume_percent = self.volume_percent.min(100);
        self
    }

    pub fn same_media(&self, other: &PlaybackSnapshot) -> bool {
        self.source.same_media(&other.source)
    }

    /// Copy stamped with a receipt time
    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.captured_at_wall_clock = Some(at);
        self
    }

    /// Presentation view at `now`
    ///
    /// Live-mode snapshots are extrapolated forward by the time elapsed since
    /// capture and reported as playing. Resume-mode snapshots are returned as-is.
    pub fn live_view(&self, now: DateTime<Utc>) -> PlaybackSnapshot {
        let mut view = self.clone();
        if self.source.mode == PlayMode::Live {
            let elapsed = self
                .captured_at_wall_clock
                .map(|captured| crate::time::elapsed_seconds(captured, now))
                .unwrap_or(0.0);
            view.position_seconds =
                extrapolate_position(self.position_seconds, self.duration_seconds, elapsed);
            view.play_state = PlayState::Playing;
        }
        view
    }
}

/// Advance `position` by `elapsed_seconds`, wrapping at `duration` when known
pub fn extrapolate_position(position: f64, duration: f64, elapsed_seconds: f64) -> f64 {
    let advanced = position + elapsed_seconds.max(0.0);
    if duration > 0.0 {
        advanced.rem_euclid(duration)
    } else {
        advanced
    }
}
