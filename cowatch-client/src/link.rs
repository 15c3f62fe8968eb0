//! Transports to the relay hub
//!
//! [`WsHubLink`] carries `update_state` out and `sync_event` in over one
//! WebSocket, reconnecting with a fixed back-off. Emissions made while the
//! socket is down are dropped; peers resync on the next submission from any
//! client. [`HubClient`] covers the HTTP read/write endpoints.

use async_trait::async_trait;
use cowatch_common::{ClientEvent, HubEvent, PlaybackSnapshot};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::synchronizer::SyncHandle;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default wait between reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Outbound half of the real-time channel
#[async_trait]
pub trait HubLink: Send + Sync {
    /// Submit a local snapshot; fails when it cannot be sent right now
    async fn publish(&self, snapshot: &PlaybackSnapshot) -> Result<()>;
}

/// WebSocket connection to the hub's `/ws` endpoint
pub struct WsHubLink {
    outbound: mpsc::UnboundedSender<String>,
    connected: Arc<AtomicBool>,
}

impl WsHubLink {
    /// Start the connection task; peer snapshots are delivered to `inbound`
    pub fn spawn(
        url: impl Into<String>,
        inbound: SyncHandle,
        reconnect_delay: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(connection_loop(
            url.into(),
            inbound,
            outbound_rx,
            Arc::clone(&connected),
            reconnect_delay,
        ));
        (Self { outbound, connected }, task)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HubLink for WsHubLink {
    async fn publish(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Disconnected);
        }
        let frame = serde_json::to_string(&ClientEvent::UpdateState(snapshot.clone()))?;
        self.outbound.send(frame).map_err(|_| Error::Disconnected)
    }
}

enum ConnectionEnd {
    /// Socket failed or the hub closed it; reconnect
    Lost,
    /// Link or synchronizer went away; stop for good
    Stopped,
}

async fn connection_loop(
    url: String,
    inbound: SyncHandle,
    mut outbound: mpsc::UnboundedReceiver<String>,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
) {
    loop {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("Connected to hub at {}", url);
                // Emissions queued while offline are stale
                while outbound.try_recv().is_ok() {}
                connected.store(true, Ordering::SeqCst);
                let end = run_connection(stream, &inbound, &mut outbound).await;
                connected.store(false, Ordering::SeqCst);
                match end {
                    ConnectionEnd::Stopped => {
                        debug!("Hub link stopped");
                        return;
                    }
                    ConnectionEnd::Lost => warn!("Lost connection to hub"),
                }
            }
            Err(e) => warn!("Failed to connect to hub at {}: {}", url, e),
        }
        tokio::time::sleep(reconnect_delay).await;
    }
}

async fn run_connection(
    stream: WsStream,
    inbound: &SyncHandle,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> ConnectionEnd {
    let (mut write, mut read) = stream.split();
    loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write.send(Message::Text(frame)).await {
                        warn!("Failed to send update: {}", e);
                        return ConnectionEnd::Lost;
                    }
                }
                None => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Close frame not sent: {}", e);
                    }
                    return ConnectionEnd::Stopped;
                }
            },
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !forward_frame(&text, inbound) {
                        return ConnectionEnd::Stopped;
                    }
                }
                Some(Ok(Message::Close(_))) | None => return ConnectionEnd::Lost,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket error: {}", e);
                    return ConnectionEnd::Lost;
                }
            },
        }
    }
}

/// Hand a hub frame to the synchronizer; false once the synchronizer is gone
fn forward_frame(text: &str, inbound: &SyncHandle) -> bool {
    match serde_json::from_str::<HubEvent>(text) {
        Ok(event) => {
            debug!("Received {}", event.event_name());
            inbound.remote(event.into_snapshot()).is_ok()
        }
        Err(e) => {
            warn!("Ignoring malformed hub frame: {}", e);
            true
        }
    }
}

/// HTTP client for `/api/state`
#[derive(Debug, Clone)]
pub struct HubClient {
    http: reqwest::Client,
    base_url: String,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn state_url(&self) -> String {
        format!("{}/api/state", self.base_url)
    }

    /// Real-time endpoint on the same host
    pub fn ws_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            self.base_url.clone()
        };
        format!("{}/ws", ws_base)
    }

    /// Current session, already live-extrapolated by the hub
    pub async fn fetch_state(&self) -> Result<Option<PlaybackSnapshot>> {
        let url = self.state_url();
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::HubStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json::<Option<PlaybackSnapshot>>().await?)
    }

    /// Persist a snapshot without broadcasting it
    pub async fn save_state(&self, snapshot: &PlaybackSnapshot) -> Result<()> {
        let url = self.state_url();
        let response = self.http.post(&url).json(snapshot).send().await?;
        if !response.status().is_success() {
            return Err(Error::HubStatus {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(())
    }
}
