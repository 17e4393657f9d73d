//! Migration signal and graceful shutdown handling.

use log::{info, warn};
use tokio_util::sync::CancellationToken;

/// Cancels `migration` on Ctrl-C (and SIGTERM on Unix).
///
/// Workers observe the token cooperatively: they finish the request in hand,
/// stop pulling new ones, and the crawl state is flushed.
pub fn spawn_migration_listener(migration: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("Interrupt received, migrating"),
                        _ = terminate.recv() => info!("SIGTERM received, migrating"),
                    }
                }
                Err(e) => {
                    warn!("Cannot listen for SIGTERM: {}", e);
                    if tokio::signal::ctrl_c().await.is_ok() {
                        info!("Interrupt received, migrating");
                    }
                }
            }
        }
        #[cfg(not(unix))]
        {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, migrating");
            }
        }
        migration.cancel();
    })
}

/// Shuts down all background tasks gracefully.
///
/// Stops the progress logger and awaits it, then drops the signal listener.
pub async fn shutdown_gracefully(
    cancel: CancellationToken,
    logging_task: Option<tokio::task::JoinHandle<()>>,
    signal_listener: Option<tokio::task::JoinHandle<()>>,
) {
    // Signal logging task to stop and await it
    cancel.cancel();
    if let Some(logging_task) = logging_task {
        let _ = logging_task.await;
    }

    if let Some(listener) = signal_listener {
        listener.abort();
    }
}
