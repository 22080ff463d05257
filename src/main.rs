//! Panel gate server.
//!
//! ```text
//!   panel.toml ──▶ config ──▶ settings store (JSON file)
//!                                  │
//!                                  ▼
//!                 ┌──────────── config cache ◀──── reloader (timer, SIGHUP,
//!                 │               │   ▲                    file watcher,
//!                 ▼               ▼   │                    POST /config/reload)
//!          entrance gate     sessions │
//!                 │               │   │
//!   request ──▶ http server ──▶ /api/v1 handlers
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use panel_gate::config::{load_config_or_default, SettingsWatcher};
use panel_gate::http::HttpServer;
use panel_gate::lifecycle::{bootstrap, handle_signals, startup::bind_address, Shutdown};
use panel_gate::observability::{logging, metrics};
use panel_gate::settings::JsonFileSettingsStore;

/// File events this soon after one of our own writes are not reloaded.
const SELF_WRITE_WINDOW: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "panel-gate")]
#[command(about = "Server panel with a secret entrance and versioned sessions", long_about = None)]
struct Cli {
    /// Bootstrap configuration file; defaults apply when it does not exist.
    #[arg(short, long, env = "PANEL_CONFIG", default_value = "panel.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config_or_default(&cli.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "panel-gate starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = Arc::new(JsonFileSettingsStore::new(&config.store.path));
    let state = bootstrap(&config, store.clone()).await?;
    let shutdown = Arc::new(Shutdown::new());

    state.reloader.on_reload(|version| {
        tracing::debug!(version = %version, "Outstanding sessions now require a fresh login");
        Ok(())
    });
    state.reloader.start();

    // Dropping the watcher stops it, so it lives until main returns.
    let _watcher = if config.store.watch {
        let (watcher, mut changes) = SettingsWatcher::new(store.path());
        let watcher = watcher.run()?;
        let reloader = state.reloader.clone();
        let watched = store.clone();
        let mut stopped = shutdown.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.recv() => break,
                    change = changes.recv() => {
                        if change.is_none() {
                            break;
                        }
                        // Coalesce the burst a single write produces.
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        while changes.try_recv().is_ok() {}
                        // Our own writes already updated the cache.
                        if watched.written_within(SELF_WRITE_WINDOW) {
                            tracing::debug!("Ignoring settings file change made by this process");
                            continue;
                        }
                        if let Err(e) = reloader.reload_now().await {
                            tracing::error!(error = %e, "Reload after settings file change failed");
                        }
                    }
                }
            }
        });
        Some(watcher)
    } else {
        None
    };

    let addr = bind_address(&config, &state.cache);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        mode = %state.cache.server_mode(),
        "Listening for connections"
    );

    let signals = tokio::spawn(handle_signals(shutdown.clone(), state.reloader.clone()));
    let reloader = state.reloader.clone();
    let server = HttpServer::new(state, Duration::from_secs(config.timeouts.request_secs));
    let served = server.run(listener, shutdown.subscribe()).await;

    shutdown.trigger();
    reloader.stop().await;
    match signals.await {
        Ok(Err(e)) => tracing::error!(error = %e, "Signal handling failed"),
        Err(e) => tracing::error!(error = %e, "Signal task ended abnormally"),
        Ok(Ok(())) => {}
    }
    served?;

    tracing::info!("Shutdown complete");
    Ok(())
}
