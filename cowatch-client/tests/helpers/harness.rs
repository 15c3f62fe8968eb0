//! Running synchronizer with everything observable
//!
//! Intended for `#[tokio::test(start_paused = true)]`: the simulated player
//! and every synchronizer timer follow the paused clock, and [`advance`]
//! moves it forward once the synchronizer has gone idle.

#![allow(dead_code)]

use async_trait::async_trait;
use cowatch_client::link::HubLink;
use cowatch_client::sim::{PlayerCall, SimOptions, SimulatedFactory};
use cowatch_client::store::SessionStore;
use cowatch_client::synchronizer::{channel, Command, Notice, SyncHandle, Synchronizer};
use cowatch_client::SyncTimings;
use cowatch_common::{PlayState, PlaybackSnapshot, SourceDescriptor, SourceKind};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Hub link that records every publication with the (test) time it happened
#[derive(Clone, Default)]
pub struct RecordingLink {
    sent: Arc<Mutex<Vec<(Instant, PlaybackSnapshot)>>>,
}

#[async_trait]
impl HubLink for RecordingLink {
    async fn publish(&self, snapshot: &PlaybackSnapshot) -> cowatch_client::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((Instant::now(), snapshot.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub handle: SyncHandle,
    pub factory: SimulatedFactory,
    pub link: RecordingLink,
    pub notices: broadcast::Receiver<Notice>,
}

impl Harness {
    pub fn start(options: SimOptions, timings: SyncTimings) -> Self {
        Self::build(options, timings, None)
    }

    pub fn start_with_store(
        options: SimOptions,
        timings: SyncTimings,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self::build(options, timings, Some(store))
    }

    fn build(options: SimOptions, timings: SyncTimings, store: Option<Arc<dyn SessionStore>>) -> Self {
        let factory = SimulatedFactory::new(options);
        let link = RecordingLink::default();
        let (handle, inbox) = channel();

        let mut synchronizer =
            Synchronizer::new(inbox, Arc::new(factory.clone()), Arc::new(link.clone()))
                .with_timings(timings);
        if let Some(store) = store {
            synchronizer = synchronizer.with_store(store);
        }
        let notices = synchronizer.subscribe_notices();
        tokio::spawn(synchronizer.run());

        Self {
            handle,
            factory,
            link,
            notices,
        }
    }

    pub fn command(&self, command: Command) {
        self.handle.command(command).expect("synchronizer running");
    }

    pub fn remote(&self, snapshot: PlaybackSnapshot) {
        self.handle.remote(snapshot).expect("synchronizer running");
    }

    pub fn load(&self, url: &str) {
        self.command(Command::LoadUrl {
            url: url.to_string(),
            quality: "auto".to_string(),
            mode: cowatch_common::PlayMode::Resume,
        });
    }

    pub fn sent(&self) -> Vec<(Instant, PlaybackSnapshot)> {
        self.link.sent.lock().unwrap().clone()
    }

    pub fn sent_since(&self, since: Instant) -> Vec<PlaybackSnapshot> {
        self.sent()
            .into_iter()
            .filter(|(at, _)| *at >= since)
            .map(|(_, snapshot)| snapshot)
            .collect()
    }

    pub async fn seeks(&self) -> Vec<f64> {
        self.factory
            .calls(|c| matches!(c, PlayerCall::Seek(_)))
            .await
            .into_iter()
            .filter_map(|c| match c {
                PlayerCall::Seek(position) => Some(position),
                _ => None,
            })
            .collect()
    }

    pub async fn count(&self, call: PlayerCall) -> usize {
        self.factory.calls(|c| *c == call).await.len()
    }

    pub async fn creates(&self) -> Vec<cowatch_client::PlayerRequest> {
        self.factory
            .calls(|c| matches!(c, PlayerCall::Create(_)))
            .await
            .into_iter()
            .filter_map(|c| match c {
                PlayerCall::Create(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    /// Notices received so far
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        loop {
            match self.notices.try_recv() {
                Ok(notice) => notices.push(notice),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return notices,
            }
        }
    }
}

pub async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Single-video snapshot
pub fn snapshot(media_id: &str, position: f64, state: PlayState) -> PlaybackSnapshot {
    let mut snapshot = PlaybackSnapshot::new(SourceDescriptor::new(SourceKind::Single, media_id));
    snapshot.position_seconds = position;
    snapshot.duration_seconds = 600.0;
    snapshot.play_state = state;
    snapshot
}
