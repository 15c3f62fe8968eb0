//! Synchronizer behavior on a paused clock
//!
//! - Resume: one corrective seek, one settled emission
//! - Drift tolerance and idempotent peer application
//! - Echo windows, including superseded ones
//! - Teardown dropping the previous player's timers
//! - Volume preference across peer-driven reloads
//! - Playlist resume and track changes
//! - Offline store: live resume and saves, including peer-driven state

mod helpers;

use cowatch_client::sim::{PlayerCall, SimOptions};
use cowatch_client::store::{FileSessionStore, SessionStore};
use cowatch_client::synchronizer::{Command, Notice};
use cowatch_client::SyncTimings;
use cowatch_common::{PlayMode, PlayState, PlaybackSnapshot, SourceDescriptor, SourceKind};
use helpers::{advance, snapshot, Harness};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const VIDEO_URL: &str = "https://youtu.be/dQw4w9WgXcQ";
const VIDEO_ID: &str = "dQw4w9WgXcQ";

/// Heartbeat off the resume-settle tick so the settled emission stands alone
fn resume_timings() -> SyncTimings {
    SyncTimings {
        heartbeat: Duration::from_millis(1500),
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_resume_corrects_once_then_emits_once() {
    let options = SimOptions {
        start_override: Some(40.0),
        ..Default::default()
    };
    let h = Harness::start(options, resume_timings());
    let start = Instant::now();

    h.command(Command::Restore(snapshot(VIDEO_ID, 120.0, PlayState::Playing)));
    advance(1900).await;
    assert_eq!(h.seeks().await, vec![120.0]);
    assert!(h.sent().is_empty(), "No emission before the resume settles");

    advance(600).await;
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let (at, emitted) = &sent[0];
    let settled_after = at.duration_since(start);
    assert!(settled_after >= Duration::from_secs(2) && settled_after < Duration::from_millis(2100));
    assert!((emitted.position_seconds - 120.0).abs() < 3.0);
    assert_eq!(emitted.play_state, PlayState::Playing);
    assert_eq!(h.seeks().await, vec![120.0], "Exactly one corrective seek");
}

#[tokio::test(start_paused = true)]
async fn test_resume_within_tolerance_does_not_seek() {
    let options = SimOptions {
        start_override: Some(117.0),
        ..Default::default()
    };
    let h = Harness::start(options, resume_timings());

    h.command(Command::Restore(snapshot(VIDEO_ID, 120.0, PlayState::Playing)));
    advance(2500).await;
    assert!(h.seeks().await.is_empty());
    assert_eq!(h.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_peer_snapshot_during_restore_moves_resume_target() {
    let options = SimOptions {
        autoplay: false,
        ..Default::default()
    };
    let h = Harness::start(options, resume_timings());

    h.command(Command::Restore(snapshot(VIDEO_ID, 120.0, PlayState::Playing)));
    advance(100).await;
    assert!(h.seeks().await.is_empty());

    // Still waiting for the first PLAYING when the peer moves on
    h.remote(snapshot(VIDEO_ID, 300.0, PlayState::Playing));
    advance(2500).await;

    assert_eq!(h.seeks().await, vec![300.0], "No seek back to the stale target");
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    let (_, emitted) = &sent[0];
    assert!((emitted.position_seconds - 300.0).abs() < 3.0);
    assert_eq!(emitted.play_state, PlayState::Playing);
}

#[tokio::test(start_paused = true)]
async fn test_drift_tolerance() {
    let h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load(VIDEO_URL);
    advance(100).await;

    h.remote(snapshot(VIDEO_ID, 50.0, PlayState::Paused));
    advance(100).await;
    assert_eq!(h.seeks().await, vec![50.0]);

    // Paused at 50: within tolerance, then exactly at it
    h.remote(snapshot(VIDEO_ID, 51.5, PlayState::Paused));
    advance(100).await;
    h.remote(snapshot(VIDEO_ID, 52.0, PlayState::Paused));
    advance(100).await;
    assert_eq!(h.seeks().await, vec![50.0]);

    h.remote(snapshot(VIDEO_ID, 52.5, PlayState::Paused));
    advance(100).await;
    assert_eq!(h.seeks().await, vec![50.0, 52.5]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_peer_snapshot_is_idempotent() {
    let h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load(VIDEO_URL);
    // Between heartbeats
    advance(2900).await;
    let t0 = Instant::now();

    let peer = snapshot(VIDEO_ID, 200.0, PlayState::Paused);
    h.remote(peer.clone());
    advance(100).await;
    h.remote(peer);
    advance(2000).await;

    assert_eq!(h.seeks().await, vec![200.0]);
    assert_eq!(h.count(PlayerCall::Pause).await, 1);
    assert!(h.sent_since(t0).is_empty(), "Peer-driven changes are not echoed");
}

#[tokio::test(start_paused = true)]
async fn test_superseded_echo_window_keeps_suppression() {
    let h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load(VIDEO_URL);
    // Between heartbeats
    advance(2900).await;
    let t0 = Instant::now();

    h.remote(snapshot(VIDEO_ID, 100.0, PlayState::Paused));
    advance(300).await;
    h.remote(snapshot(VIDEO_ID, 100.0, PlayState::Paused));
    advance(300).await;

    // First window has closed, second is still open
    h.command(Command::SeekRelative(10.0));
    advance(100).await;
    assert!(h.sent_since(t0).is_empty());

    advance(200).await;
    h.command(Command::SeekRelative(10.0));
    advance(50).await;
    let sent = h.sent_since(t0);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].position_seconds, 120.0);
    assert_eq!(sent[0].play_state, PlayState::Paused);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_previous_player_timers() {
    let timings = SyncTimings {
        heartbeat: Duration::from_secs(60),
        ..Default::default()
    };
    let h = Harness::start(SimOptions::default(), timings);
    h.load("https://youtu.be/aaaaaaaaaaa");
    advance(1000).await;

    let reload = Instant::now();
    h.load("https://youtu.be/bbbbbbbbbbb");
    advance(1500).await;

    let after_reload = |media: &str| {
        h.sent()
            .into_iter()
            .filter(|(at, s)| *at > reload && s.source.media_id == media)
            .count()
    };
    assert_eq!(after_reload("aaaaaaaaaaa"), 0, "Old initial broadcast must not fire");
    assert_eq!(after_reload("bbbbbbbbbbb"), 0);

    advance(1000).await;
    assert_eq!(after_reload("aaaaaaaaaaa"), 0);
    assert_eq!(after_reload("bbbbbbbbbbb"), 1);
    assert_eq!(h.count(PlayerCall::Destroy).await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_peer_media_change_keeps_local_volume() {
    let h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load(VIDEO_URL);
    advance(500).await;
    h.command(Command::SetVolume(30));
    advance(100).await;

    let mut peer = snapshot("zzzzzzzzzzz", 50.0, PlayState::Playing);
    peer.volume_percent = 90;
    h.remote(peer);
    advance(100).await;

    let creates = h.creates().await;
    assert_eq!(creates.len(), 2);
    assert_eq!(creates[1].source.media_id, "zzzzzzzzzzz");
    assert_eq!(creates[1].start_seconds, 50.0);

    let journal = h.factory.journal().await;
    let reload = journal
        .iter()
        .rposition(|c| matches!(c, PlayerCall::Create(_)))
        .unwrap();
    let volume = journal[reload..]
        .iter()
        .find(|c| matches!(c, PlayerCall::SetVolume(_)));
    assert_eq!(volume, Some(&PlayerCall::SetVolume(30)));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_url_is_rejected() {
    let mut h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load("https://example.com/watch/nothing");
    advance(3000).await;

    let rejected = h
        .drain_notices()
        .into_iter()
        .find_map(|n| match n {
            Notice::Rejected(message) => Some(message),
            _ => None,
        })
        .expect("Rejection notice");
    assert!(rejected.starts_with("Invalid Link"), "got {:?}", rejected);
    assert!(h.creates().await.is_empty());
    assert!(h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_playlist_resume_fixes_track_then_position() {
    let options = SimOptions {
        track_override: Some(0),
        ..Default::default()
    };
    let h = Harness::start(options, resume_timings());

    let mut target = PlaybackSnapshot::new(SourceDescriptor::new(SourceKind::Playlist, "PLmix"));
    target.position_seconds = 60.0;
    target.duration_seconds = 600.0;
    target.track_index = 3;
    target.play_state = PlayState::Playing;
    h.command(Command::Restore(target));
    advance(2500).await;

    assert_eq!(h.count(PlayerCall::PlayTrack(3)).await, 1);
    assert_eq!(h.seeks().await, vec![60.0]);
    let sent = h.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1.track_index, 3);
    assert!((sent[0].1.position_seconds - 60.0).abs() < 3.0);
}

#[tokio::test(start_paused = true)]
async fn test_next_track_emits_new_index() {
    let mut h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load("https://www.youtube.com/playlist?list=PLmix");
    advance(2900).await;
    h.drain_notices();
    let t0 = Instant::now();

    h.command(Command::NextTrack);
    advance(50).await;

    let sent = h.sent_since(t0);
    assert!(!sent.is_empty());
    assert!(sent.iter().all(|s| s.track_index == 1));
    assert!(h.drain_notices().contains(&Notice::ActiveTrack(1)));
}

#[tokio::test(start_paused = true)]
async fn test_resume_saved_live_session_advances() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::in_data_folder(dir.path()));

    let mut saved = PlaybackSnapshot::new(
        SourceDescriptor::new(SourceKind::Single, VIDEO_ID).with_mode(PlayMode::Live),
    );
    saved.position_seconds = 100.0;
    saved.duration_seconds = 200.0;
    saved.play_state = PlayState::Paused;
    let saved = saved.stamped(chrono::Utc::now() - chrono::Duration::seconds(50));
    store.save(&saved).await.unwrap();

    let mut h = Harness::start_with_store(SimOptions::default(), SyncTimings::default(), store);
    h.command(Command::ResumeSaved);
    advance(100).await;

    let creates = h.creates().await;
    assert_eq!(creates.len(), 1);
    assert!((creates[0].start_seconds - 150.0).abs() < 1.0);
    assert!(h
        .drain_notices()
        .contains(&Notice::Toast("Resuming Track #1".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_resume_saved_without_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::in_data_folder(dir.path()));
    let mut h = Harness::start_with_store(SimOptions::default(), SyncTimings::default(), store);

    h.command(Command::ResumeSaved);
    advance(100).await;
    assert!(h.creates().await.is_empty());
    assert!(h
        .drain_notices()
        .contains(&Notice::Toast("No saved session".to_string())));
}

#[tokio::test(start_paused = true)]
async fn test_emissions_are_saved_offline() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::in_data_folder(dir.path()));
    let h = Harness::start_with_store(
        SimOptions::default(),
        SyncTimings::default(),
        Arc::clone(&store) as Arc<dyn SessionStore>,
    );

    h.load(VIDEO_URL);
    advance(2500).await;

    let saved = store.load().await.unwrap().expect("Saved session");
    assert_eq!(saved.source.media_id, VIDEO_ID);
    assert!(saved.captured_at_wall_clock.is_some());
    assert!(!h.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_offline_copy_skips_resume_but_keeps_peer_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileSessionStore::in_data_folder(dir.path()));
    let options = SimOptions {
        start_override: Some(40.0),
        ..Default::default()
    };
    let timings = SyncTimings {
        remote_echo: Duration::from_secs(5),
        ..resume_timings()
    };
    let h = Harness::start_with_store(options, timings, Arc::clone(&store) as Arc<dyn SessionStore>);

    h.command(Command::Restore(snapshot(VIDEO_ID, 120.0, PlayState::Playing)));
    advance(1900).await;
    assert!(store.load().await.unwrap().is_none(), "Nothing saved while resuming");

    advance(600).await;
    let saved = store.load().await.unwrap().expect("Settled state saved");
    assert!((saved.position_seconds - 120.0).abs() < 3.0);

    // Applied inside a long echo window, so never emitted
    h.remote(snapshot(VIDEO_ID, 300.0, PlayState::Paused));
    advance(1000).await;

    let saved = store.load().await.unwrap().expect("Saved session");
    assert!((saved.position_seconds - 300.0).abs() < 0.5);
    assert_eq!(saved.play_state, PlayState::Paused);
    assert!(h.sent().iter().all(|(_, s)| s.position_seconds < 200.0));
}

#[tokio::test(start_paused = true)]
async fn test_leave_emits_and_stops() {
    let h = Harness::start(SimOptions::default(), SyncTimings::default());
    h.load(VIDEO_URL);
    advance(2500).await;
    let before = h.sent().len();

    h.command(Command::Leave);
    advance(100).await;
    assert_eq!(h.sent().len(), before + 1);
    assert_eq!(h.count(PlayerCall::Destroy).await, 1);
    assert!(h.handle.command(Command::TogglePlay).is_err());
}
