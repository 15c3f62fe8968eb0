//! Synchronization timing windows
//!
//! All suppression in the client is time based: a remote application holds
//! outbound emission off for a settling window, and a resumed player is left
//! alone for a settling window before it reports its position.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncTimings {
    /// Echo-absorption window after applying a peer snapshot to the same media
    pub remote_echo: Duration,
    /// Echo-absorption window after a peer snapshot recreated the player
    pub remote_reload_echo: Duration,
    /// Delay between the resume correction and the settled emission
    pub resume_settle: Duration,
    /// Delay between a user-initiated load and its first emission
    pub initial_broadcast: Duration,
    /// Delay before playlist contents are requested from a ready player
    pub playlist_fetch: Duration,
    /// Heartbeat period: emit while playing, detect track changes
    pub heartbeat: Duration,
    /// Progress notice period
    pub progress: Duration,
    /// Peer positions closer than this are not corrected
    pub drift_tolerance_seconds: f64,
    /// A resumed player further than this from its target gets one corrective seek
    pub resume_tolerance_seconds: f64,
}

impl Default for SyncTimings {
    fn default() -> Self {
        Self {
            remote_echo: Duration::from_millis(500),
            remote_reload_echo: Duration::from_secs(1),
            resume_settle: Duration::from_secs(2),
            initial_broadcast: Duration::from_secs(2),
            playlist_fetch: Duration::from_secs(2),
            heartbeat: Duration::from_secs(1),
            progress: Duration::from_millis(500),
            drift_tolerance_seconds: 2.0,
            resume_tolerance_seconds: 5.0,
        }
    }
}

impl SyncTimings {
    /// Whether a local position is far enough from a peer's to seek
    pub fn needs_drift_correction(&self, local: f64, remote: f64) -> bool {
        (local - remote).abs() > self.drift_tolerance_seconds
    }

    /// Whether a freshly resumed position is far enough off to correct
    pub fn needs_resume_correction(&self, reported: f64, target: f64) -> bool {
        target > 0.0 && (reported - target).abs() > self.resume_tolerance_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drift_boundary_is_exclusive() {
        let t = SyncTimings::default();
        assert!(!t.needs_drift_correction(100.0, 102.0));
        assert!(!t.needs_drift_correction(102.0, 100.0));
        assert!(t.needs_drift_correction(100.0, 102.01));
    }

    #[test]
    fn test_resume_correction_needs_positive_target() {
        let t = SyncTimings::default();
        assert!(t.needs_resume_correction(40.0, 120.0));
        assert!(!t.needs_resume_correction(118.0, 120.0));
        assert!(!t.needs_resume_correction(40.0, 0.0));
    }
}
