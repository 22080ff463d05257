//! OS signal handling.
//!
//! SIGTERM and SIGINT trigger graceful shutdown. SIGHUP reloads the config
//! cache in place, which is how operators apply edits made with `panelctl`.

use std::sync::Arc;

use crate::cache::ConfigReloader;
use crate::lifecycle::Shutdown;

/// Run until a termination signal arrives or shutdown is triggered elsewhere.
#[cfg(unix)]
pub async fn handle_signals(
    shutdown: Arc<Shutdown>,
    reloader: Arc<ConfigReloader>,
) -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut stopped = shutdown.subscribe();

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("SIGTERM received");
                break;
            }
            _ = sigint.recv() => {
                tracing::info!("SIGINT received");
                break;
            }
            _ = sighup.recv() => {
                tracing::info!("SIGHUP received, reloading configuration");
                if let Err(e) = reloader.reload_now().await {
                    tracing::error!(error = %e, "Configuration reload on SIGHUP failed");
                }
            }
            _ = stopped.recv() => return Ok(()),
        }
    }

    shutdown.trigger();
    Ok(())
}

#[cfg(not(unix))]
pub async fn handle_signals(
    shutdown: Arc<Shutdown>,
    _reloader: Arc<ConfigReloader>,
) -> std::io::Result<()> {
    let mut stopped = shutdown.subscribe();
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Ctrl+C received");
            shutdown.trigger();
        }
        _ = stopped.recv() => {}
    }
    Ok(())
}
