//! Settings file watcher.
//!
//! Operators and `panelctl` may edit the settings file behind the server's
//! back. The watcher turns those edits into reload requests; the reload itself
//! happens on the async side so it shares the reloader's single code path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

/// A watcher that monitors the settings file for changes.
pub struct SettingsWatcher {
    path: PathBuf,
    change_tx: mpsc::UnboundedSender<()>,
}

impl SettingsWatcher {
    /// Create a new watcher.
    ///
    /// Returns the watcher and a receiver yielding one message per change.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (change_tx, change_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                change_tx,
            },
            change_rx,
        )
    }

    /// Start watching. The file's directory is watched so atomic
    /// rename-into-place writes are seen. Keep the returned watcher alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.change_tx;
        let target = self.path.clone();
        let file_name = self.path.file_name().map(|n| n.to_os_string());

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if !(event.kind.is_modify() || event.kind.is_create()) {
                        return;
                    }
                    let touches_target = event
                        .paths
                        .iter()
                        .any(|p| p == &target || p.file_name().map(|n| n.to_os_string()) == file_name);
                    if touches_target {
                        tracing::debug!(path = ?target, "Settings file change detected");
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Settings watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Settings watcher started");
        Ok(watcher)
    }
}
