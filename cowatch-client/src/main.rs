//! cowatch-follow - headless session follower
//!
//! Joins a hub session with a simulated player, following peers and
//! optionally loading a URL. Useful for exercising a hub without a browser.

use anyhow::{Context, Result};
use clap::Parser;
use cowatch_client::bootstrap::bootstrap;
use cowatch_client::link::{HubClient, WsHubLink};
use cowatch_client::sim::{SimOptions, SimulatedFactory};
use cowatch_client::store::{FileSessionStore, SessionStore};
use cowatch_client::synchronizer::{channel, Command, Notice, Synchronizer};
use cowatch_common::config::default_data_folder;
use cowatch_common::PlayMode;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "cowatch-follow")]
#[command(about = "Follow a synchronized playback session without a browser")]
#[command(version)]
struct Args {
    /// Hub base URL
    #[arg(long, env = "COWATCH_HUB", default_value = "http://127.0.0.1:3100")]
    hub: String,

    /// Offline session file (defaults to the data folder)
    #[arg(long, env = "COWATCH_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// URL to load after joining
    #[arg(long)]
    load: Option<String>,

    /// Quality requested with --load
    #[arg(long, default_value = "auto")]
    quality: String,

    /// Load in live mode instead of resume mode
    #[arg(long)]
    live: bool,

    /// Seconds between reconnect attempts
    #[arg(long, default_value_t = 2)]
    reconnect_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cowatch_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cowatch-follow v{}", env!("CARGO_PKG_VERSION"));
    let args = Args::parse();

    let hub = HubClient::new(&args.hub);
    let store = Arc::new(match &args.session_file {
        Some(path) => FileSessionStore::new(path.clone()),
        None => FileSessionStore::in_data_folder(&default_data_folder()),
    });
    info!("Session file: {}", store.path().display());

    let (handle, inbox) = channel();
    let (link, link_task) = WsHubLink::spawn(
        hub.ws_url(),
        handle.clone(),
        Duration::from_secs(args.reconnect_secs),
    );

    let factory = Arc::new(SimulatedFactory::new(SimOptions::default()));
    let synchronizer = Synchronizer::new(inbox, factory, Arc::new(link)).with_store(store.clone());

    let mut notices = synchronizer.subscribe_notices();
    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(Notice::Progress { .. }) => {}
                Ok(notice) => info!("{:?}", notice),
                Err(broadcast::error::RecvError::Lagged(n)) => debug!("Skipped {} notices", n),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let sync_task = tokio::spawn(synchronizer.run());

    if let Some(command) = bootstrap(&hub, Some(store.as_ref() as &dyn SessionStore)).await {
        handle.command(command).context("Synchronizer stopped during startup")?;
    }
    if let Some(url) = args.load {
        let mode = if args.live { PlayMode::Live } else { PlayMode::Resume };
        handle
            .command(Command::LoadUrl {
                url,
                quality: args.quality,
                mode,
            })
            .context("Synchronizer stopped during startup")?;
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to install Ctrl+C handler")?;
    info!("Leaving session");
    handle.command(Command::Leave).context("Synchronizer already stopped")?;
    sync_task.await.context("Synchronizer task failed")?;

    // The link closes the socket once the synchronizer has dropped it
    if tokio::time::timeout(Duration::from_secs(2), link_task).await.is_err() {
        info!("Hub link did not close in time");
    }
    Ok(())
}
