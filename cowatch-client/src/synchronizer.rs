//! Client synchronizer
//!
//! One task per viewer. Peer snapshots, player callbacks, user commands and
//! the synchronizer's own timers all arrive through a single queue and are
//! handled one at a time, so no two handlers ever interleave. Their relative
//! order is not controlled, which is what the [`SessionContext`] flags and
//! generation counters are for.
//!
//! Timers tied to a player (resume settle, heartbeat, progress, playlist
//! fetch, first broadcast) are dropped together when that player is torn
//! down. Late callbacks from a torn-down player are recognized by epoch.

use cowatch_common::{resolve_media_url, PlayMode, PlayState, PlaybackSnapshot, SourceDescriptor};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::time::delay_queue::{Expired, Key};
use tokio_util::time::DelayQueue;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::link::HubLink;
use crate::player::{Player, PlayerEvent, PlayerEvents, PlayerFactory, PlayerRequest, PlayerResult};
use crate::session::{EmitBlock, ResumeTarget, SessionContext, VolumePreference};
use crate::store::SessionStore;
use crate::timing::SyncTimings;

const NOTICE_CAPACITY: usize = 64;

/// Everything the synchronizer reacts to
#[derive(Debug)]
pub enum SyncInput {
    /// `sync_event` from the hub
    Remote(PlaybackSnapshot),
    /// Callback from the player created in session `epoch`
    Player { epoch: u64, event: PlayerEvent },
    Command(Command),
}

/// User intents
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadUrl {
        url: String,
        quality: String,
        mode: PlayMode,
    },
    /// Resume from a hub snapshot (already live-extrapolated by the hub)
    Restore(PlaybackSnapshot),
    /// Resume from the offline session store
    ResumeSaved,
    TogglePlay,
    SeekRelative(f64),
    SeekToFraction(f64),
    NextTrack,
    PreviousTrack,
    PlayTrack(u32),
    SetVolume(u8),
    ToggleMute,
    /// Final emission, then stop
    Leave,
}

/// Presentation-level events for whatever UI sits on top
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Toast(String),
    ModeIndicator(PlayMode),
    PlayIndicator { playing: bool },
    Progress {
        current_seconds: f64,
        duration_seconds: f64,
    },
    ActiveTrack(u32),
    Playlist(Vec<String>),
    /// URL did not resolve to a media source
    Rejected(String),
}

/// Sending side of a synchronizer's input queue
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::UnboundedSender<SyncInput>,
}

impl SyncHandle {
    pub fn send(&self, input: SyncInput) -> Result<()> {
        self.tx.send(input).map_err(|_| Error::Stopped)
    }

    pub fn remote(&self, snapshot: PlaybackSnapshot) -> Result<()> {
        self.send(SyncInput::Remote(snapshot))
    }

    pub fn command(&self, command: Command) -> Result<()> {
        self.send(SyncInput::Command(command))
    }
}

/// Receiving side of a synchronizer's input queue
pub struct SyncInbox {
    tx: mpsc::UnboundedSender<SyncInput>,
    rx: mpsc::UnboundedReceiver<SyncInput>,
}

impl SyncInbox {
    #[cfg(test)]
    pub(crate) fn try_recv(&mut self) -> Option<SyncInput> {
        self.rx.try_recv().ok()
    }
}

/// Create the input queue before the synchronizer so transports can hold a handle
pub fn channel() -> (SyncHandle, SyncInbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SyncHandle { tx: tx.clone() }, SyncInbox { tx, rx })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    RemoteEcho { generation: u64 },
    ResumeSettle,
    InitialBroadcast,
    PlaylistFetch,
    Heartbeat,
    Progress,
}

impl TimerKind {
    fn player_scoped(self) -> bool {
        !matches!(self, TimerKind::RemoteEcho { .. })
    }
}

#[derive(Debug, Clone, Copy)]
enum Startup {
    /// User-loaded source; emits once after the initial broadcast delay
    Fresh,
    /// Created from a snapshot; `volume` is applied when restoring a session
    Resume { volume: Option<VolumePreference> },
}

pub struct Synchronizer {
    ctx: SessionContext,
    timings: SyncTimings,
    factory: Arc<dyn PlayerFactory>,
    link: Arc<dyn HubLink>,
    store: Option<Arc<dyn SessionStore>>,
    notices: broadcast::Sender<Notice>,

    player: Option<Arc<dyn Player>>,
    epoch: u64,

    inputs: mpsc::UnboundedReceiver<SyncInput>,
    inputs_tx: mpsc::UnboundedSender<SyncInput>,
    timers: DelayQueue<TimerKind>,
    player_timers: Vec<Key>,
    stopped: bool,
}

impl Synchronizer {
    pub fn new(inbox: SyncInbox, factory: Arc<dyn PlayerFactory>, link: Arc<dyn HubLink>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            ctx: SessionContext::new(),
            timings: SyncTimings::default(),
            factory,
            link,
            store: None,
            notices,
            player: None,
            epoch: 0,
            inputs: inbox.rx,
            inputs_tx: inbox.tx,
            timers: DelayQueue::new(),
            player_timers: Vec::new(),
            stopped: false,
        }
    }

    pub fn with_timings(mut self, timings: SyncTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Process inputs and timers until [`Command::Leave`]
    pub async fn run(mut self) {
        info!("Synchronizer started");
        while !self.stopped {
            tokio::select! {
                biased;
                input = self.inputs.recv() => match input {
                    Some(input) => self.dispatch(input).await,
                    None => break,
                },
                Some(expired) = self.timers.next(), if !self.timers.is_empty() => {
                    self.on_timer(expired).await;
                }
            }
        }
        self.teardown().await;
        info!("Synchronizer stopped");
    }

    pub async fn dispatch(&mut self, input: SyncInput) {
        match input {
            SyncInput::Remote(snapshot) => self.apply_remote(snapshot).await,
            SyncInput::Player { epoch, event } => self.on_player_event(epoch, event).await,
            SyncInput::Command(command) => self.on_command(command).await,
        }
    }

    // ---- outbound ----

    /// Send the local player's state to the hub, unless a guard says not to
    pub async fn emit_local_state(&mut self) {
        if let Some(block) = self.ctx.emit_block(self.player.is_some()) {
            debug!("Emission suppressed: {:?}", block);
            return;
        }
        let (player, source) = match (self.player.clone(), self.ctx.active_source.clone()) {
            (Some(player), Some(source)) => (player, source),
            _ => return,
        };

        let snapshot = match capture(player.as_ref(), source).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No valid track index yet, skipping emission");
                return;
            }
            Err(e) => {
                debug!("Player not answering, skipping emission: {}", e);
                return;
            }
        };

        debug!(
            "Emitting {} @ {:.1}s ({})",
            snapshot.source.media_id, snapshot.position_seconds, snapshot.play_state
        );
        if let Err(e) = self.link.publish(&snapshot).await {
            debug!("Emission dropped: {}", e);
        }
        self.save_offline(&snapshot).await;
    }

    async fn save_offline(&self, snapshot: &PlaybackSnapshot) {
        let store = match &self.store {
            Some(store) => Arc::clone(store),
            None => return,
        };
        let stamped = snapshot.clone().stamped(cowatch_common::time::now());
        if let Err(e) = store.save(&stamped).await {
            warn!("Failed to save session: {}", e);
        }
    }

    // ---- inbound ----

    /// Reconcile the local player with a peer's snapshot
    pub async fn apply_remote(&mut self, snapshot: PlaybackSnapshot) {
        if let Err(e) = snapshot.validate() {
            warn!("Ignoring invalid peer snapshot: {}", e);
            return;
        }
        let generation = self.ctx.begin_remote_apply();
        debug!(
            "Applying peer snapshot {} @ {:.1}s ({}), generation {}",
            snapshot.source.media_id, snapshot.position_seconds, snapshot.play_state, generation
        );
        self.notify(Notice::ModeIndicator(snapshot.source.mode));

        let same_media = self.player.is_some()
            && self
                .ctx
                .active_source
                .as_ref()
                .map(|active| active.same_media(&snapshot.source))
                .unwrap_or(false);

        if !same_media {
            self.notify(Notice::Toast("Remote changed video...".to_string()));
            self.create_player(
                PlayerRequest::resume_from(&snapshot),
                Startup::Resume { volume: None },
            )
            .await;
            self.schedule(
                TimerKind::RemoteEcho { generation },
                self.timings.remote_reload_echo,
            );
            return;
        }

        let player = match self.player.clone() {
            Some(player) => player,
            None => return,
        };

        let peer_target = ResumeTarget {
            position_seconds: snapshot.position_seconds,
            track_index: if snapshot.source.is_playlist() {
                snapshot.track_index
            } else {
                0
            },
        };
        if self.ctx.retarget_resume(peer_target) {
            debug!(
                "Resume target moved to peer position {:.1}s, track {}",
                peer_target.position_seconds, peer_target.track_index
            );
        }

        let mut jumped = false;
        if snapshot.source.is_playlist() {
            if let Ok(Some(local)) = player.playlist_index().await {
                if local != snapshot.track_index {
                    info!("Peer moved to track {} (local {})", snapshot.track_index, local);
                    match player.play_track_at(snapshot.track_index).await {
                        Ok(()) => {
                            self.ctx.last_observed_track = snapshot.track_index;
                            self.ctx.target_track = snapshot.track_index;
                            self.notify(Notice::ActiveTrack(snapshot.track_index));
                            jumped = true;
                        }
                        Err(e) => debug!("Track jump failed: {}", e),
                    }
                }
            }
        }

        // A jumped track starts from zero, position is left alone
        if !jumped {
            match player.current_time().await {
                Ok(local)
                    if self
                        .timings
                        .needs_drift_correction(local, snapshot.position_seconds) =>
                {
                    if report(player.seek_to(snapshot.position_seconds).await, "seek") {
                        self.notify(Notice::Toast("Synced Time".to_string()));
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Position unavailable, drift not checked: {}", e),
            }
        }

        match player.state().await {
            Ok(local) => {
                if snapshot.play_state == PlayState::Playing && local != PlayState::Playing {
                    report(player.play().await, "play");
                } else if snapshot.play_state == PlayState::Paused && local != PlayState::Paused {
                    report(player.pause().await, "pause");
                }
            }
            Err(e) => debug!("State unavailable, play/pause not reconciled: {}", e),
        }

        self.schedule(TimerKind::RemoteEcho { generation }, self.timings.remote_echo);
    }

    // ---- player lifecycle ----

    async fn create_player(&mut self, request: PlayerRequest, startup: Startup) {
        self.teardown().await;

        match startup {
            Startup::Fresh => self.ctx.begin_fresh(request.source.clone()),
            Startup::Resume { .. } => self.ctx.begin_resume(
                request.source.clone(),
                ResumeTarget {
                    position_seconds: request.start_seconds,
                    track_index: request.track_index,
                },
            ),
        }
        self.notify(Notice::ModeIndicator(request.source.mode));
        info!(
            "Loading {} {} at {:.1}s, track {} ({})",
            if request.source.is_playlist() { "playlist" } else { "video" },
            request.source.media_id,
            request.start_seconds,
            request.track_index,
            request.source.mode
        );

        let events = PlayerEvents::new(self.epoch, self.inputs_tx.clone());
        match self.factory.create(request, events).await {
            Ok(player) => {
                self.player = Some(player);
                self.ctx.player_ready = true;
                self.on_ready(startup).await;
            }
            Err(e) => {
                warn!("Player creation failed: {}", e);
                self.notify(Notice::Toast(format!("Error: {}", e)));
            }
        }
    }

    async fn on_ready(&mut self, startup: Startup) {
        let player = match self.player.clone() {
            Some(player) => player,
            None => return,
        };

        let volume = match startup {
            Startup::Resume { volume: Some(volume) } => {
                self.ctx.volume = volume;
                volume
            }
            _ => self.ctx.volume,
        };
        report(player.set_volume(volume.percent).await, "set volume");
        if volume.muted {
            report(player.mute().await, "mute");
        } else {
            report(player.unmute().await, "unmute");
        }

        let quality = self
            .ctx
            .active_source
            .as_ref()
            .and_then(SourceDescriptor::quality_override)
            .map(str::to_string);
        if let Some(quality) = quality {
            report(player.set_quality(&quality).await, "set quality");
        }

        self.schedule(TimerKind::Progress, self.timings.progress);
        self.schedule(TimerKind::Heartbeat, self.timings.heartbeat);
        if self.ctx.is_playlist() {
            self.schedule(TimerKind::PlaylistFetch, self.timings.playlist_fetch);
        }
        if let Startup::Fresh = startup {
            self.schedule(TimerKind::InitialBroadcast, self.timings.initial_broadcast);
        }
    }

    /// Destroy the current player and drop every timer tied to it
    async fn teardown(&mut self) {
        for key in self.player_timers.drain(..) {
            self.timers.remove(&key);
        }
        self.epoch += 1;
        self.ctx.player_ready = false;
        if let Some(player) = self.player.take() {
            debug!("Tearing down player (new epoch {})", self.epoch);
            report(player.destroy().await, "destroy");
        }
    }

    async fn on_player_event(&mut self, epoch: u64, event: PlayerEvent) {
        if epoch != self.epoch {
            debug!("Ignoring {:?} from retired player (epoch {})", event, epoch);
            return;
        }
        match event {
            PlayerEvent::Error(code) => {
                warn!("Player reported error {}", code);
                self.notify(Notice::Toast(format!("Error: {}", code)));
            }
            PlayerEvent::StateChanged(state) => self.on_state_changed(state).await,
        }
    }

    async fn on_state_changed(&mut self, state: PlayState) {
        match state {
            PlayState::Playing => self.notify(Notice::PlayIndicator { playing: true }),
            PlayState::Buffering => {}
            _ => self.notify(Notice::PlayIndicator { playing: false }),
        }

        if state == PlayState::Playing && self.ctx.awaiting_first_play() {
            self.advance_resume().await;
            return;
        }
        if self.ctx.applying_remote_update {
            debug!("{} caused by peer snapshot, not emitting", state);
            return;
        }

        match state {
            PlayState::Playing => {
                self.announce_track().await;
                self.emit_local_state().await;
            }
            PlayState::Paused | PlayState::Buffering => self.emit_local_state().await,
            _ => {}
        }
    }

    // ---- resume sequencer ----

    /// First PLAYING of a resumed player
    async fn advance_resume(&mut self) {
        let player = match self.player.clone() {
            Some(player) => player,
            None => return,
        };
        let target = self.ctx.resume_target.unwrap_or(ResumeTarget {
            position_seconds: 0.0,
            track_index: 0,
        });

        if self.ctx.is_playlist() {
            match player.playlist_index().await {
                Ok(Some(index)) if index != target.track_index => {
                    info!("Fixing track index {} -> {}", index, target.track_index);
                    match player.play_track_at(target.track_index).await {
                        // The reload reports PLAYING again and re-enters this check
                        Ok(()) => return,
                        Err(e) => warn!("Track jump failed, resuming on track {}: {}", index, e),
                    }
                }
                Ok(_) => {}
                Err(e) => debug!("Track index unavailable during resume: {}", e),
            }
        }

        let mut corrected = false;
        match player.current_time().await {
            Ok(reported)
                if self
                    .timings
                    .needs_resume_correction(reported, target.position_seconds) =>
            {
                info!(
                    "Correcting resume position {:.1}s -> {:.1}s",
                    reported, target.position_seconds
                );
                corrected = report(player.seek_to(target.position_seconds).await, "seek");
            }
            Ok(_) => {}
            Err(e) => debug!("Position unavailable during resume: {}", e),
        }

        self.ctx.mark_initial_seek(corrected);
        self.schedule(TimerKind::ResumeSettle, self.timings.resume_settle);
    }

    async fn settle_resume(&mut self) {
        if self.ctx.correction_issued {
            if let (Some(player), Some(target)) = (self.player.clone(), self.ctx.resume_target) {
                if let Ok(reported) = player.current_time().await {
                    // One attempt only; a second seek risks oscillation
                    if self
                        .timings
                        .needs_resume_correction(reported, target.position_seconds)
                    {
                        warn!(
                            "Resume position still off after correction ({:.1}s vs {:.1}s), accepting",
                            reported, target.position_seconds
                        );
                    }
                }
            }
        }
        self.ctx.settle();
        info!("Resume settled");
        self.emit_local_state().await;
    }

    // ---- timers ----

    fn schedule(&mut self, kind: TimerKind, after: Duration) {
        let key = self.timers.insert(kind, after);
        if kind.player_scoped() {
            self.player_timers.push(key);
        }
    }

    async fn on_timer(&mut self, expired: Expired<TimerKind>) {
        let key = expired.key();
        self.player_timers.retain(|pending| *pending != key);

        match expired.into_inner() {
            TimerKind::RemoteEcho { generation } => {
                if self.ctx.end_remote_apply(generation) {
                    debug!("Echo window {} closed", generation);
                }
            }
            TimerKind::ResumeSettle => self.settle_resume().await,
            TimerKind::InitialBroadcast => self.emit_local_state().await,
            TimerKind::PlaylistFetch => self.fetch_playlist().await,
            TimerKind::Heartbeat => {
                self.heartbeat().await;
                self.schedule(TimerKind::Heartbeat, self.timings.heartbeat);
            }
            TimerKind::Progress => {
                self.publish_progress().await;
                self.schedule(TimerKind::Progress, self.timings.progress);
            }
        }
    }

    async fn heartbeat(&mut self) {
        let player = match self.player.clone() {
            Some(player) => player,
            None => return,
        };

        if self.ctx.is_playlist() {
            if let Ok(Some(index)) = player.playlist_index().await {
                if index != self.ctx.last_observed_track {
                    debug!("Track changed {} -> {}", self.ctx.last_observed_track, index);
                    self.ctx.last_observed_track = index;
                    self.notify(Notice::ActiveTrack(index));
                    self.emit_local_state().await;
                    return;
                }
            }
        }

        if self.ctx.emit_block(true) == Some(EmitBlock::ApplyingRemote)
            && !self.ctx.in_resume_sequence
        {
            // Peer-driven state is not echoed to the hub but is still kept offline
            self.save_current_offline(player.as_ref()).await;
            return;
        }

        if let Ok(PlayState::Playing) = player.state().await {
            self.emit_local_state().await;
        }
    }

    async fn save_current_offline(&self, player: &dyn Player) {
        let source = match (&self.store, &self.ctx.active_source) {
            (Some(_), Some(source)) => source.clone(),
            _ => return,
        };
        if let Ok(Some(snapshot)) = capture(player, source).await {
            self.save_offline(&snapshot).await;
        }
    }

    async fn publish_progress(&self) {
        let player = match &self.player {
            Some(player) => player,
            None => return,
        };
        if !matches!(player.state().await, Ok(PlayState::Playing)) {
            return;
        }
        if let (Ok(current), Ok(duration)) = (player.current_time().await, player.duration().await) {
            if duration > 0.0 {
                self.notify(Notice::Progress {
                    current_seconds: current,
                    duration_seconds: duration,
                });
            }
        }
    }

    async fn fetch_playlist(&self) {
        let player = match &self.player {
            Some(player) => player,
            None => return,
        };
        match player.playlist().await {
            Ok(ids) => {
                if ids.is_empty() {
                    self.notify(Notice::Toast("Playlist info unavailable".to_string()));
                }
                self.notify(Notice::Playlist(ids));
                self.announce_track().await;
            }
            Err(e) => debug!("Playlist unavailable: {}", e),
        }
    }

    async fn announce_track(&self) {
        if !self.ctx.is_playlist() {
            return;
        }
        if let Some(player) = &self.player {
            if let Ok(Some(index)) = player.playlist_index().await {
                self.notify(Notice::ActiveTrack(index));
            }
        }
    }

    // ---- commands ----

    async fn on_command(&mut self, command: Command) {
        debug!("Command: {:?}", command);
        match command {
            Command::LoadUrl { url, quality, mode } => self.load_url(&url, &quality, mode).await,
            Command::Restore(snapshot) => self.restore(snapshot, "Session Restored".to_string()).await,
            Command::ResumeSaved => self.resume_saved().await,
            Command::Leave => {
                self.emit_local_state().await;
                self.teardown().await;
                self.stopped = true;
            }
            other => {
                let player = match self.player.clone() {
                    Some(player) => player,
                    None => {
                        debug!("No player, ignoring {:?}", other);
                        return;
                    }
                };
                self.control(player, other).await;
            }
        }
    }

    async fn load_url(&mut self, url: &str, quality: &str, mode: PlayMode) {
        match resolve_media_url(url, quality, mode) {
            Ok(source) => {
                self.create_player(PlayerRequest::fresh(source), Startup::Fresh)
                    .await
            }
            Err(e) => {
                info!("Rejected URL {:?}: {}", url, e);
                self.notify(Notice::Rejected(e.to_string()));
            }
        }
    }

    async fn restore(&mut self, snapshot: PlaybackSnapshot, message: String) {
        let volume = VolumePreference::from_snapshot(&snapshot);
        self.create_player(
            PlayerRequest::resume_from(&snapshot),
            Startup::Resume {
                volume: Some(volume),
            },
        )
        .await;
        self.notify(Notice::Toast(message));
    }

    /// Resume from the offline copy; live sources advance by the wall-clock
    /// time since it was saved
    async fn resume_saved(&mut self) {
        let store = match &self.store {
            Some(store) => Arc::clone(store),
            None => {
                self.notify(Notice::Toast("No saved session".to_string()));
                return;
            }
        };
        match store.load().await {
            Ok(Some(saved)) => {
                let target = saved.live_view(cowatch_common::time::now());
                let message = format!("Resuming Track #{}", target.track_index + 1);
                self.restore(target, message).await;
            }
            Ok(None) => self.notify(Notice::Toast("No saved session".to_string())),
            Err(e) => {
                warn!("Failed to read saved session: {}", e);
                self.notify(Notice::Toast("No saved session".to_string()));
            }
        }
    }

    async fn control(&mut self, player: Arc<dyn Player>, command: Command) {
        match command {
            Command::TogglePlay => {
                // The resulting state change drives the emission
                match player.state().await {
                    Ok(PlayState::Playing) => report(player.pause().await, "pause"),
                    _ => report(player.play().await, "play"),
                };
                return;
            }
            Command::SeekRelative(delta) => {
                if let Ok(current) = player.current_time().await {
                    report(player.seek_to((current + delta).max(0.0)).await, "seek");
                    self.notify(Notice::Toast(format!("{:+}s", delta)));
                }
            }
            Command::SeekToFraction(fraction) => {
                if let Ok(duration) = player.duration().await {
                    if duration > 0.0 {
                        report(player.seek_to(duration * fraction.clamp(0.0, 1.0)).await, "seek");
                    }
                }
            }
            Command::NextTrack => {
                report(player.next_track().await, "next track");
            }
            Command::PreviousTrack => {
                if player.previous_track().await.is_err() {
                    report(player.seek_to(0.0).await, "seek");
                }
            }
            Command::PlayTrack(index) => {
                if report(player.play_track_at(index).await, "play track") {
                    self.notify(Notice::ActiveTrack(index));
                }
            }
            Command::SetVolume(percent) => {
                let percent = percent.min(100);
                report(player.set_volume(percent).await, "set volume");
                let mut muted = player.is_muted().await.unwrap_or(self.ctx.volume.muted);
                if percent > 0 && muted && report(player.unmute().await, "unmute") {
                    muted = false;
                }
                self.ctx.volume = VolumePreference { percent, muted };
            }
            Command::ToggleMute => {
                let muted = player.is_muted().await.unwrap_or(self.ctx.volume.muted);
                if muted {
                    report(player.unmute().await, "unmute");
                    self.notify(Notice::Toast("Unmuted".to_string()));
                } else {
                    report(player.mute().await, "mute");
                    self.notify(Notice::Toast("Muted".to_string()));
                }
                self.ctx.volume.muted = !muted;
            }
            Command::LoadUrl { .. }
            | Command::Restore(_)
            | Command::ResumeSaved
            | Command::Leave => return,
        }
        self.emit_local_state().await;
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine
        self.notices.send(notice).ok();
    }
}

/// Read the full local state; `None` when a playlist cannot report its track
async fn capture(
    player: &dyn Player,
    source: SourceDescriptor,
) -> PlayerResult<Option<PlaybackSnapshot>> {
    let track_index = if source.is_playlist() {
        match player.playlist_index().await? {
            Some(index) => index,
            None => return Ok(None),
        }
    } else {
        0
    };

    let mut snapshot = PlaybackSnapshot::new(source);
    snapshot.position_seconds = player.current_time().await?.max(0.0);
    snapshot.duration_seconds = player.duration().await?.max(0.0);
    snapshot.play_state = player.state().await?;
    snapshot.track_index = track_index;
    snapshot.volume_percent = player.volume().await?.min(100);
    snapshot.muted = player.is_muted().await?;
    Ok(Some(snapshot))
}

/// Log a failed player call; true on success
fn report(result: PlayerResult<()>, action: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Player {} failed: {}", action, e);
            false
        }
    }
}
