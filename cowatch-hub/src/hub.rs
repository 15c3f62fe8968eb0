//! Relay hub
//!
//! Store-and-forward core. All submissions go through one relay task fed by a
//! FIFO queue, so the order rows are written and the order peers observe
//! `sync_event`s are both the order submissions arrived in. There is no lock
//! and no versioning: the last submission wins.
//!
//! Fan-out uses a `tokio::sync::broadcast` channel carrying the submitter's
//! id; each connection's forwarder drops its own submissions. Long-lived
//! connections end when [`RelayHub::shutdown`] cancels the hub's token.

use chrono::{DateTime, Utc};
use cowatch_common::PlaybackSnapshot;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::SnapshotStore;
use crate::error::{Error, Result};

/// Buffered fan-out events per receiver before a slow one starts lagging
pub const DEFAULT_FANOUT_CAPACITY: usize = 100;

/// Pending submissions before submitters wait for the relay task
const RELAY_QUEUE_DEPTH: usize = 256;

/// Identifies one real-time connection
pub type ClientId = Uuid;

/// Who submitted a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A real-time channel connection
    Client(ClientId),
    /// `POST /api/state`
    Http,
}

/// A snapshot as delivered to connected clients
#[derive(Debug, Clone)]
pub struct Relayed {
    pub origin: Origin,
    pub snapshot: PlaybackSnapshot,
}

impl Relayed {
    /// Whether this delivery should be skipped for `client`
    pub fn is_echo_for(&self, client: ClientId) -> bool {
        self.origin == Origin::Client(client)
    }
}

/// Outcome of one processed submission
#[derive(Debug)]
pub struct Submitted {
    /// The snapshot as stored, with its receipt stamp
    pub snapshot: PlaybackSnapshot,
    /// Persistence result; failures are already logged
    pub persisted: Result<()>,
    /// Fan-out receivers at send time (includes observers and the submitter's own forwarder)
    pub receivers: usize,
}

enum RelayJob {
    Submit {
        origin: Origin,
        snapshot: PlaybackSnapshot,
        broadcast: bool,
        ack: oneshot::Sender<Submitted>,
    },
    Wipe {
        ack: oneshot::Sender<Result<()>>,
    },
}

/// Handle to the relay hub; cheap to clone
#[derive(Clone)]
pub struct RelayHub {
    store: SnapshotStore,
    jobs: mpsc::Sender<RelayJob>,
    fanout: broadcast::Sender<Arc<Relayed>>,
    clients: Arc<AtomicUsize>,
    closing: CancellationToken,
}

impl RelayHub {
    /// Start the relay task over `store`
    pub fn start(store: SnapshotStore) -> Self {
        Self::with_capacity(store, DEFAULT_FANOUT_CAPACITY)
    }

    pub fn with_capacity(store: SnapshotStore, capacity: usize) -> Self {
        let (fanout, _) = broadcast::channel(capacity);
        let (jobs, rx) = mpsc::channel(RELAY_QUEUE_DEPTH);
        tokio::spawn(relay_loop(store.clone(), rx, fanout.clone()));
        info!("Relay hub started (fan-out capacity {})", capacity);

        Self {
            store,
            jobs,
            fanout,
            clients: Arc::new(AtomicUsize::new(0)),
            closing: CancellationToken::new(),
        }
    }

    /// Current snapshot as a client should see it right now
    pub async fn get_snapshot(&self) -> Result<Option<PlaybackSnapshot>> {
        self.get_snapshot_at(cowatch_common::time::now()).await
    }

    /// Current snapshot as seen at `now`; live-mode positions are extrapolated
    pub async fn get_snapshot_at(&self, now: DateTime<Utc>) -> Result<Option<PlaybackSnapshot>> {
        let stored = self.store.load().await?;
        Ok(stored.map(|snapshot| snapshot.live_view(now)))
    }

    /// Real-time submission: persist, then deliver to every client except `client`
    ///
    /// Persistence failures are logged and reported in [`Submitted::persisted`]
    /// but never prevent the broadcast.
    pub async fn submit(&self, client: ClientId, snapshot: PlaybackSnapshot) -> Result<Submitted> {
        self.enqueue(Origin::Client(client), snapshot, true).await
    }

    /// HTTP submission: persist without broadcasting; a failed write is an error
    pub async fn save(&self, snapshot: PlaybackSnapshot) -> Result<PlaybackSnapshot> {
        let submitted = self.enqueue(Origin::Http, snapshot, false).await?;
        submitted.persisted?;
        Ok(submitted.snapshot)
    }

    async fn enqueue(
        &self,
        origin: Origin,
        snapshot: PlaybackSnapshot,
        broadcast: bool,
    ) -> Result<Submitted> {
        snapshot.validate()?;

        let (ack, done) = oneshot::channel();
        self.jobs
            .send(RelayJob::Submit {
                origin,
                snapshot,
                broadcast,
                ack,
            })
            .await
            .map_err(|_| Error::RelayClosed("relay task stopped".to_string()))?;

        done.await
            .map_err(|_| Error::RelayClosed("submission dropped".to_string()))
    }

    /// Receive every relayed snapshot from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<Relayed>> {
        self.fanout.subscribe()
    }

    /// Register a real-time connection; the guard unregisters on drop
    pub fn connect(&self) -> ClientGuard {
        let id = Uuid::new_v4();
        let total = self.clients.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Client {} connected ({} connected)", id, total);
        ClientGuard {
            id,
            clients: Arc::clone(&self.clients),
        }
    }

    /// Number of connected real-time clients
    pub fn client_count(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Resolves once [`RelayHub::shutdown`] has started
    pub fn closed(&self) -> WaitForCancellationFutureOwned {
        self.closing.clone().cancelled_owned()
    }

    pub fn is_closing(&self) -> bool {
        self.closing.is_cancelled()
    }

    /// End every real-time and SSE stream, delete the session row after every
    /// queued submission, then stop the relay.
    ///
    /// Submissions arriving afterwards fail with [`Error::RelayClosed`].
    pub async fn shutdown(&self) -> Result<()> {
        self.closing.cancel();
        let (ack, done) = oneshot::channel();
        self.jobs
            .send(RelayJob::Wipe { ack })
            .await
            .map_err(|_| Error::RelayClosed("relay task already stopped".to_string()))?;
        let result = done
            .await
            .map_err(|_| Error::RelayClosed("wipe dropped".to_string()))?;
        self.store.close().await;
        result
    }
}

/// Registration of one real-time connection
pub struct ClientGuard {
    id: ClientId,
    clients: Arc<AtomicUsize>,
}

impl ClientGuard {
    pub fn id(&self) -> ClientId {
        self.id
    }
}

impl Drop for ClientGuard {
    fn drop(&mut self) {
        let remaining = self.clients.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        info!("Client {} disconnected ({} connected)", self.id, remaining);
    }
}

async fn relay_loop(
    store: SnapshotStore,
    mut jobs: mpsc::Receiver<RelayJob>,
    fanout: broadcast::Sender<Arc<Relayed>>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            RelayJob::Submit {
                origin,
                snapshot,
                broadcast,
                ack,
            } => {
                let snapshot = snapshot.normalized().stamped(cowatch_common::time::now());

                let persisted = store.save(&snapshot).await;
                if let Err(e) = &persisted {
                    error!("Failed to persist snapshot from {:?}: {}", origin, e);
                }

                let receivers = if broadcast {
                    let relayed = Arc::new(Relayed {
                        origin,
                        snapshot: snapshot.clone(),
                    });
                    // No receivers is fine: nobody else is watching
                    fanout.send(relayed).unwrap_or(0)
                } else {
                    0
                };
                debug!(
                    "Relayed {} @ {:.1}s ({}) from {:?} to {} receivers",
                    snapshot.source.media_id,
                    snapshot.position_seconds,
                    snapshot.play_state,
                    origin,
                    receivers
                );

                if ack
                    .send(Submitted {
                        snapshot,
                        persisted,
                        receivers,
                    })
                    .is_err()
                {
                    debug!("Submitter went away before acknowledgement");
                }
            }
            RelayJob::Wipe { ack } => {
                let result = store.wipe().await;
                match &result {
                    Ok(()) => info!("Session data wiped"),
                    Err(e) => warn!("Error cleaning session: {}", e),
                }
                let _ = ack.send(result);
                break;
            }
        }
    }
    debug!("Relay task stopped");
}
