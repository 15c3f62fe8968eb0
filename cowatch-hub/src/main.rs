//! cowatch-hub - relay hub entry point
//!
//! Resolves settings, opens the session store (fatal on failure), serves the
//! API until SIGINT/SIGTERM. The session row is wiped as soon as the signal
//! arrives, before the remaining connections drain.

use anyhow::{Context, Result};
use clap::Parser;
use cowatch_hub::db::{database_path, SnapshotStore};
use cowatch_hub::settings::{CliArgs, HubSettings};
use cowatch_hub::shutdown::{shutdown_signal, wipe_on};
use cowatch_hub::{build_router, AppState, RelayHub};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cowatch_hub=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cowatch-hub v{}", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();
    let settings = HubSettings::load(&args).context("Failed to load settings")?;

    let db_path = database_path(&settings.data_folder);
    info!("Database path: {}", db_path.display());

    let store = SnapshotStore::open(&db_path)
        .await
        .context("Failed to initialize session store")?;
    let hub = RelayHub::start(store);

    let app = build_router(AppState::new(hub.clone()), settings.static_dir.as_deref());

    let addr = settings.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("cowatch-hub listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(wipe_on(hub, shutdown_signal()))
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}
