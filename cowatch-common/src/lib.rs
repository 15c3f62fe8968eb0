//! # cowatch common library
//!
//! Shared code for the relay hub and its clients:
//! - Playback snapshot model and live-time extrapolation
//! - Real-time channel event types
//! - Media URL resolution
//! - Configuration loading
//! - Error type

pub mod config;
pub mod error;
pub mod events;
pub mod media;
pub mod snapshot;
pub mod time;

pub use error::{Error, Result};
pub use events::{ClientEvent, HubEvent};
pub use media::resolve_media_url;
pub use snapshot::{PlayMode, PlayState, PlaybackSnapshot, SourceDescriptor, SourceKind};
