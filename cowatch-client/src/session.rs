//! Per-client synchronization context
//!
//! Everything the synchronizer needs to avoid feedback loops lives here, owned
//! by one [`crate::Synchronizer`]. Nothing in it is persisted.
//!
//! Resume state machine:
//!
//! ```text
//! IDLE ──player created from snapshot──▶ RESTORING
//! RESTORING ──first PLAYING, track mismatch──▶ RESTORING (jump issued)
//! RESTORING ──first PLAYING──▶ SEEK_CORRECTING (at most one corrective seek)
//! SEEK_CORRECTING ──settle delay──▶ SETTLED (emit once)
//! ```

use cowatch_common::{PlaybackSnapshot, SourceDescriptor};

/// Resume sequencer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePhase {
    /// No player created from a snapshot yet, or a fresh user load
    #[default]
    Idle,
    /// Waiting for the first PLAYING of the resumed player
    Restoring,
    /// Correction (if any) issued; waiting out the settle delay
    SeekCorrecting,
    /// Player stable; normal emission
    Settled,
}

/// Where a resumed player should end up
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResumeTarget {
    pub position_seconds: f64,
    pub track_index: u32,
}

/// Local volume preference; never overwritten by peers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumePreference {
    pub percent: u8,
    pub muted: bool,
}

impl Default for VolumePreference {
    fn default() -> Self {
        Self {
            percent: 100,
            muted: false,
        }
    }
}

impl VolumePreference {
    pub fn from_snapshot(snapshot: &PlaybackSnapshot) -> Self {
        Self {
            percent: snapshot.volume_percent.min(100),
            muted: snapshot.muted,
        }
    }
}

/// Why an emission was suppressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitBlock {
    NoPlayer,
    ApplyingRemote,
    Resuming,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    pub active_source: Option<SourceDescriptor>,
    pub player_ready: bool,

    pub applying_remote_update: bool,
    remote_generation: u64,

    pub in_resume_sequence: bool,
    pub initial_seek_done: bool,
    pub resume_phase: ResumePhase,
    pub resume_target: Option<ResumeTarget>,
    pub correction_issued: bool,

    pub last_observed_track: u32,
    pub target_track: u32,

    pub volume: VolumePreference,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// New player loaded from a user-supplied URL: no resume sequence
    pub fn begin_fresh(&mut self, source: SourceDescriptor) {
        self.active_source = Some(source);
        self.player_ready = false;
        self.in_resume_sequence = false;
        self.initial_seek_done = true;
        self.resume_phase = ResumePhase::Idle;
        self.resume_target = None;
        self.correction_issued = false;
        self.last_observed_track = 0;
        self.target_track = 0;
    }

    /// New player created from a snapshot: emission is off until settled
    pub fn begin_resume(&mut self, source: SourceDescriptor, target: ResumeTarget) {
        self.active_source = Some(source);
        self.player_ready = false;
        self.in_resume_sequence = true;
        self.initial_seek_done = false;
        self.resume_phase = ResumePhase::Restoring;
        self.resume_target = Some(target);
        self.correction_issued = false;
        self.last_observed_track = target.track_index;
        self.target_track = target.track_index;
    }

    /// First PLAYING handled; the settle delay starts now
    pub fn mark_initial_seek(&mut self, correction_issued: bool) {
        self.initial_seek_done = true;
        self.correction_issued = correction_issued;
        self.resume_phase = ResumePhase::SeekCorrecting;
    }

    pub fn settle(&mut self) {
        self.in_resume_sequence = false;
        self.initial_seek_done = true;
        self.resume_phase = ResumePhase::Settled;
    }

    pub fn awaiting_first_play(&self) -> bool {
        self.resume_phase == ResumePhase::Restoring
    }

    /// Start applying a peer snapshot; returns the generation whose window
    /// may clear the flag
    pub fn begin_remote_apply(&mut self) -> u64 {
        self.applying_remote_update = true;
        self.remote_generation += 1;
        self.remote_generation
    }

    /// Close the echo window of `generation`. Windows of superseded
    /// applications leave the flag set.
    pub fn end_remote_apply(&mut self, generation: u64) -> bool {
        if generation == self.remote_generation {
            self.applying_remote_update = false;
            true
        } else {
            false
        }
    }

    pub fn emit_block(&self, has_player: bool) -> Option<EmitBlock> {
        if !has_player || !self.player_ready || self.active_source.is_none() {
            Some(EmitBlock::NoPlayer)
        } else if self.applying_remote_update {
            Some(EmitBlock::ApplyingRemote)
        } else if self.in_resume_sequence || !self.initial_seek_done {
            Some(EmitBlock::Resuming)
        } else {
            None
        }
    }

    /// Point an unsettled resume at a peer's position. Returns false once
    /// the resume has settled or was never started.
    pub fn retarget_resume(&mut self, target: ResumeTarget) -> bool {
        if !matches!(
            self.resume_phase,
            ResumePhase::Restoring | ResumePhase::SeekCorrecting
        ) {
            return false;
        }
        self.resume_target = Some(target);
        self.target_track = target.track_index;
        true
    }

    pub fn is_playlist(&self) -> bool {
        self.active_source
            .as_ref()
            .map(SourceDescriptor::is_playlist)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cowatch_common::SourceKind;

    fn source() -> SourceDescriptor {
        SourceDescriptor::new(SourceKind::Playlist, "PL1")
    }

    fn ready(ctx: &mut SessionContext) {
        ctx.player_ready = true;
    }

    #[test]
    fn test_resume_blocks_until_settled() {
        let mut ctx = SessionContext::new();
        ctx.begin_resume(
            source(),
            ResumeTarget {
                position_seconds: 120.0,
                track_index: 3,
            },
        );
        ready(&mut ctx);
        assert_eq!(ctx.resume_phase, ResumePhase::Restoring);
        assert_eq!(ctx.target_track, 3);
        assert_eq!(ctx.emit_block(true), Some(EmitBlock::Resuming));

        ctx.mark_initial_seek(true);
        assert_eq!(ctx.resume_phase, ResumePhase::SeekCorrecting);
        assert_eq!(ctx.emit_block(true), Some(EmitBlock::Resuming));

        ctx.settle();
        assert_eq!(ctx.emit_block(true), None);
    }

    #[test]
    fn test_only_latest_remote_window_clears_flag() {
        let mut ctx = SessionContext::new();
        ctx.begin_fresh(source());
        ready(&mut ctx);

        let first = ctx.begin_remote_apply();
        let second = ctx.begin_remote_apply();
        assert!(!ctx.end_remote_apply(first));
        assert_eq!(ctx.emit_block(true), Some(EmitBlock::ApplyingRemote));
        assert!(ctx.end_remote_apply(second));
        assert_eq!(ctx.emit_block(true), None);
    }

    #[test]
    fn test_no_player_blocks_emission() {
        let mut ctx = SessionContext::new();
        assert_eq!(ctx.emit_block(false), Some(EmitBlock::NoPlayer));
        ctx.begin_fresh(source());
        assert_eq!(ctx.emit_block(true), Some(EmitBlock::NoPlayer));
        ready(&mut ctx);
        assert_eq!(ctx.emit_block(false), Some(EmitBlock::NoPlayer));
    }

    #[test]
    fn test_retarget_only_while_resuming() {
        let mut ctx = SessionContext::new();
        let peer = ResumeTarget {
            position_seconds: 300.0,
            track_index: 4,
        };
        assert!(!ctx.retarget_resume(peer));
        assert_eq!(ctx.resume_target, None);

        ctx.begin_resume(
            source(),
            ResumeTarget {
                position_seconds: 50.0,
                track_index: 2,
            },
        );
        assert!(ctx.retarget_resume(peer));
        assert_eq!(ctx.resume_target, Some(peer));
        assert_eq!(ctx.target_track, 4);

        ctx.mark_initial_seek(false);
        assert!(ctx.retarget_resume(ResumeTarget {
            position_seconds: 310.0,
            track_index: 4,
        }));
        ctx.settle();
        assert!(!ctx.retarget_resume(peer));
        assert_eq!(ctx.resume_target.map(|t| t.position_seconds), Some(310.0));
    }
}
