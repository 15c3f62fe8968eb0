//! Simulated player
//!
//! A clock-driven stand-in for the video widget: position advances with
//! `tokio::time` while playing, so it follows a paused test clock exactly.
//! Every control call is appended to a shared journal.
//!
//! State callbacks mirror the widget: creation with autoplay reports
//! BUFFERING then PLAYING, play/pause report their new state, a track change
//! reports PLAYING. Seeks report nothing.

use async_trait::async_trait;
use cowatch_common::{PlayState, SourceDescriptor};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::player::{Player, PlayerError, PlayerEvents, PlayerFactory, PlayerRequest, PlayerResult};

/// Behaviour of players made by a [`SimulatedFactory`]
#[derive(Debug, Clone)]
pub struct SimOptions {
    /// Reported duration of every video
    pub duration_seconds: f64,
    /// Start playing as soon as the player is created
    pub autoplay: bool,
    /// Tracks in every playlist
    pub playlist_len: u32,
    /// Position the player actually starts at, regardless of the request
    pub start_override: Option<f64>,
    /// Track the player actually starts on, regardless of the request
    pub track_override: Option<u32>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            duration_seconds: 600.0,
            autoplay: true,
            playlist_len: 10,
            start_override: None,
            track_override: None,
        }
    }
}

/// One control call, as recorded in the journal
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Create(PlayerRequest),
    Play,
    Pause,
    Seek(f64),
    SetVolume(u8),
    Mute,
    Unmute,
    SetQuality(String),
    PlayTrack(u32),
    Next,
    Previous,
    Destroy,
}

type Journal = Arc<Mutex<Vec<PlayerCall>>>;

#[derive(Debug)]
struct SimState {
    source: SourceDescriptor,
    state: PlayState,
    /// Position at `anchor`
    base_position: f64,
    anchor: Instant,
    volume: u8,
    muted: bool,
    track: u32,
    destroyed: bool,
}

impl SimState {
    fn position(&self, duration: f64) -> f64 {
        let position = if self.state == PlayState::Playing {
            self.base_position + self.anchor.elapsed().as_secs_f64()
        } else {
            self.base_position
        };
        position.min(duration)
    }

    fn rebase(&mut self, position: f64) {
        self.base_position = position;
        self.anchor = Instant::now();
    }
}

pub struct SimulatedPlayer {
    options: SimOptions,
    state: Mutex<SimState>,
    events: PlayerEvents,
    journal: Journal,
}

impl SimulatedPlayer {
    /// Move the playhead without reporting anything, as if the local
    /// player had drifted
    pub async fn drift_to(&self, position: f64) {
        let mut state = self.state.lock().await;
        state.rebase(position.max(0.0));
    }

    pub fn epoch(&self) -> u64 {
        self.events.epoch()
    }

    async fn live(&self) -> PlayerResult<tokio::sync::MutexGuard<'_, SimState>> {
        let state = self.state.lock().await;
        if state.destroyed {
            return Err(PlayerError::NotReady);
        }
        Ok(state)
    }

    async fn record(&self, call: PlayerCall) {
        self.journal.lock().await.push(call);
    }

    async fn load_track(&self, index: u32) -> PlayerResult<()> {
        let mut state = self.live().await?;
        if !state.source.is_playlist() {
            return Err(PlayerError::Unsupported("track change"));
        }
        if index >= self.options.playlist_len {
            return Err(PlayerError::Failed(format!("no track {}", index)));
        }
        state.track = index;
        state.state = PlayState::Playing;
        state.rebase(0.0);
        drop(state);
        self.events.state_changed(PlayState::Playing);
        Ok(())
    }
}

#[async_trait]
impl Player for SimulatedPlayer {
    async fn play(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Play).await;
        let mut state = self.live().await?;
        if state.state != PlayState::Playing {
            let position = state.position(self.options.duration_seconds);
            state.state = PlayState::Playing;
            state.rebase(position);
            drop(state);
            self.events.state_changed(PlayState::Playing);
        }
        Ok(())
    }

    async fn pause(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Pause).await;
        let mut state = self.live().await?;
        if state.state == PlayState::Playing {
            let position = state.position(self.options.duration_seconds);
            state.state = PlayState::Paused;
            state.rebase(position);
            drop(state);
            self.events.state_changed(PlayState::Paused);
        }
        Ok(())
    }

    async fn seek_to(&self, seconds: f64) -> PlayerResult<()> {
        self.record(PlayerCall::Seek(seconds)).await;
        let mut state = self.live().await?;
        state.rebase(seconds.clamp(0.0, self.options.duration_seconds));
        Ok(())
    }

    async fn set_volume(&self, percent: u8) -> PlayerResult<()> {
        self.record(PlayerCall::SetVolume(percent)).await;
        self.live().await?.volume = percent.min(100);
        Ok(())
    }

    async fn mute(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Mute).await;
        self.live().await?.muted = true;
        Ok(())
    }

    async fn unmute(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Unmute).await;
        self.live().await?.muted = false;
        Ok(())
    }

    async fn set_quality(&self, quality: &str) -> PlayerResult<()> {
        self.record(PlayerCall::SetQuality(quality.to_string())).await;
        let _state = self.live().await?;
        Ok(())
    }

    async fn current_time(&self) -> PlayerResult<f64> {
        Ok(self.live().await?.position(self.options.duration_seconds))
    }

    async fn duration(&self) -> PlayerResult<f64> {
        let _state = self.live().await?;
        Ok(self.options.duration_seconds)
    }

    async fn state(&self) -> PlayerResult<PlayState> {
        Ok(self.live().await?.state)
    }

    async fn volume(&self) -> PlayerResult<u8> {
        Ok(self.live().await?.volume)
    }

    async fn is_muted(&self) -> PlayerResult<bool> {
        Ok(self.live().await?.muted)
    }

    async fn playlist_index(&self) -> PlayerResult<Option<u32>> {
        let state = self.live().await?;
        Ok(state.source.is_playlist().then_some(state.track))
    }

    async fn playlist(&self) -> PlayerResult<Vec<String>> {
        let state = self.live().await?;
        if !state.source.is_playlist() {
            return Ok(Vec::new());
        }
        Ok((0..self.options.playlist_len)
            .map(|i| format!("{}-{}", state.source.media_id, i))
            .collect())
    }

    async fn play_track_at(&self, index: u32) -> PlayerResult<()> {
        self.record(PlayerCall::PlayTrack(index)).await;
        self.load_track(index).await
    }

    async fn next_track(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Next).await;
        let next = self.live().await?.track + 1;
        self.load_track(next).await
    }

    async fn previous_track(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Previous).await;
        let previous = self.live().await?.track.saturating_sub(1);
        self.load_track(previous).await
    }

    async fn destroy(&self) -> PlayerResult<()> {
        self.record(PlayerCall::Destroy).await;
        self.state.lock().await.destroyed = true;
        Ok(())
    }
}

/// Makes [`SimulatedPlayer`]s and keeps the journal and the latest player for inspection
#[derive(Clone, Default)]
pub struct SimulatedFactory {
    options: SimOptions,
    journal: Journal,
    current: Arc<Mutex<Option<Arc<SimulatedPlayer>>>>,
}

impl SimulatedFactory {
    pub fn new(options: SimOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub async fn journal(&self) -> Vec<PlayerCall> {
        self.journal.lock().await.clone()
    }

    /// Journal entries matching `filter`
    pub async fn calls<F>(&self, filter: F) -> Vec<PlayerCall>
    where
        F: Fn(&PlayerCall) -> bool,
    {
        self.journal
            .lock()
            .await
            .iter()
            .filter(|call| filter(call))
            .cloned()
            .collect()
    }

    pub async fn current(&self) -> Option<Arc<SimulatedPlayer>> {
        self.current.lock().await.clone()
    }
}

#[async_trait]
impl PlayerFactory for SimulatedFactory {
    async fn create(
        &self,
        request: PlayerRequest,
        events: PlayerEvents,
    ) -> PlayerResult<Arc<dyn Player>> {
        self.journal
            .lock()
            .await
            .push(PlayerCall::Create(request.clone()));

        let start = self
            .options
            .start_override
            .unwrap_or(request.start_seconds)
            .clamp(0.0, self.options.duration_seconds);
        let track = if request.source.is_playlist() {
            self.options.track_override.unwrap_or(request.track_index)
        } else {
            0
        };
        let state = if self.options.autoplay {
            PlayState::Playing
        } else {
            PlayState::Unstarted
        };
        debug!(
            "Simulated player for {} at {:.1}s, track {} (epoch {})",
            request.source.media_id,
            start,
            track,
            events.epoch()
        );

        let player = Arc::new(SimulatedPlayer {
            options: self.options.clone(),
            state: Mutex::new(SimState {
                source: request.source,
                state,
                base_position: start,
                anchor: Instant::now(),
                volume: 100,
                muted: false,
                track,
                destroyed: false,
            }),
            events: events.clone(),
            journal: Arc::clone(&self.journal),
        });
        *self.current.lock().await = Some(Arc::clone(&player));

        if self.options.autoplay {
            events.state_changed(PlayState::Buffering);
            events.state_changed(PlayState::Playing);
        }
        Ok(player)
    }
}
