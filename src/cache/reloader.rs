//! Background and on-demand config reloading.
//!
//! A single task waits on either the periodic timer, an explicit reload-now
//! request or a stop signal. Both trigger kinds go through the same
//! `reload_and_notify` path. With a zero interval no task is spawned and
//! `reload_now` runs inline.

use std::error::Error;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{ConfigCache, ConfigVersion};
use crate::settings::StoreError;

/// Subscriber notified after every successful reload.
pub type ReloadCallback =
    Arc<dyn Fn(ConfigVersion) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync>;

type ReloadReply = oneshot::Sender<Result<ConfigVersion, StoreError>>;

struct Running {
    requests: mpsc::Sender<ReloadReply>,
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

pub struct ConfigReloader {
    cache: Arc<ConfigCache>,
    interval: Duration,
    callbacks: Arc<RwLock<Vec<ReloadCallback>>>,
    running: Mutex<Option<Running>>,
}

impl ConfigReloader {
    /// `interval` of zero disables periodic reloading.
    pub fn new(cache: Arc<ConfigCache>, interval: Duration) -> Self {
        Self {
            cache,
            interval,
            callbacks: Arc::new(RwLock::new(Vec::new())),
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Register a callback run after each successful reload.
    pub fn on_reload<F>(&self, callback: F)
    where
        F: Fn(ConfigVersion) -> Result<(), Box<dyn Error + Send + Sync>> + Send + Sync + 'static,
    {
        self.callbacks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Spawn the periodic task. No-op when already running or when the
    /// interval is zero. Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.interval.is_zero() {
            tracing::info!("Periodic config reload disabled, manual reload only");
            return;
        }

        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return;
        }

        let (requests_tx, requests_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(run_loop(
            self.cache.clone(),
            self.callbacks.clone(),
            self.interval,
            requests_rx,
            stop_rx,
        ));

        *running = Some(Running {
            requests: requests_tx,
            stop: stop_tx,
            handle,
        });
        tracing::info!(interval = ?self.interval, "Config reloader started");
    }

    /// Stop the periodic task and wait for it to exit. A reload already in
    /// flight completes first; none starts after this returns. No-op when not
    /// running.
    pub async fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(running) = running else {
            return;
        };

        let _ = running.stop.send(());
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Config reloader task ended abnormally");
        }
        tracing::info!("Config reloader stopped");
    }

    /// Reload immediately and notify subscribers.
    ///
    /// Routed through the background task when it runs, inline otherwise.
    pub async fn reload_now(&self) -> Result<ConfigVersion, StoreError> {
        let requests = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|r| r.requests.clone());

        if let Some(requests) = requests {
            let (reply_tx, reply_rx) = oneshot::channel();
            if requests.send(reply_tx).await.is_ok() {
                if let Ok(result) = reply_rx.await {
                    return result;
                }
            }
            tracing::debug!("Config reloader went away, reloading inline");
        }

        reload_and_notify(&self.cache, &self.callbacks).await
    }
}

async fn run_loop(
    cache: Arc<ConfigCache>,
    callbacks: Arc<RwLock<Vec<ReloadCallback>>>,
    period: Duration,
    mut requests: mpsc::Receiver<ReloadReply>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {
                // Failure is already logged; the next tick tries again.
                let _ = reload_and_notify(&cache, &callbacks).await;
            }
            Some(reply) = requests.recv() => {
                let result = reload_and_notify(&cache, &callbacks).await;
                let _ = reply.send(result);
            }
        }
    }

    tracing::debug!("Config reloader loop exited");
}

async fn reload_and_notify(
    cache: &ConfigCache,
    callbacks: &RwLock<Vec<ReloadCallback>>,
) -> Result<ConfigVersion, StoreError> {
    let version = cache.reload().await?;

    let subscribers: Vec<ReloadCallback> = callbacks
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();

    for (index, callback) in subscribers.iter().enumerate() {
        match catch_unwind(AssertUnwindSafe(|| callback(version))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(callback = index, error = %e, "Reload callback failed");
            }
            Err(_) => {
                tracing::error!(callback = index, "Reload callback panicked");
            }
        }
    }

    Ok(version)
}
