//! Graceful shutdown
//!
//! The session is ephemeral across restarts. When the signal arrives the
//! persisted row is deleted and every open stream is ended, then the server
//! drains whatever requests remain.

use std::future::Future;
use tokio::signal;
use tracing::{error, info};

use crate::hub::RelayHub;

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

/// Future for `with_graceful_shutdown`: waits for `signal`, then wipes
///
/// The wipe runs before connections drain, so open SSE and WebSocket streams
/// neither delay it nor keep the server alive.
pub async fn wipe_on<F>(hub: RelayHub, signal: F)
where
    F: Future<Output = ()>,
{
    signal.await;
    wipe_session(&hub).await;
}

/// Wipe the session row and close the store
pub async fn wipe_session(hub: &RelayHub) {
    info!("Stopping server, cleaning up session data");
    match hub.shutdown().await {
        Ok(()) => info!("Database closed"),
        Err(e) => error!("Error cleaning session: {}", e),
    }
}
