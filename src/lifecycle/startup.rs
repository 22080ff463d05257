//! Startup orchestration.
//!
//! # Responsibilities
//! - Seed first-run defaults and load the config cache
//! - Build the reloader, session manager and entrance gate on that cache
//! - Work out the listen address from bootstrap config and cached settings

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

use crate::cache::{ConfigCache, ConfigReloader};
use crate::config::{resolve_secret, ConfigError, PanelConfig};
use crate::http::AppState;
use crate::security::EntranceGate;
use crate::session::SessionManager;
use crate::settings::{SettingsService, SettingsSource, StoreError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("settings store: {0}")]
    Store(#[from] StoreError),
}

/// Wire every runtime component on top of `store`. The reloader is returned
/// inside the state but not started.
pub async fn bootstrap(
    config: &PanelConfig,
    store: Arc<dyn SettingsSource>,
) -> Result<AppState, StartupError> {
    let settings = SettingsService::new(store.clone());
    if config.store.seed_defaults {
        settings.initialize_defaults().await?;
    }

    let cache = Arc::new(ConfigCache::load(store).await?);
    tracing::info!(
        settings = cache.snapshot().len(),
        version = %cache.version(),
        "Config cache loaded"
    );

    let reloader = Arc::new(ConfigReloader::new(
        cache.clone(),
        Duration::from_secs(config.reload.interval_secs),
    ));
    let secret = session_secret(config)?;

    Ok(AppState {
        settings,
        sessions: Arc::new(SessionManager::new(cache.clone(), &secret)),
        reloader,
        gate: Arc::new(EntranceGate::new(cache.clone())),
        cache,
        ui_dir: config.ui.dir.as_ref().map(PathBuf::from),
    })
}

fn session_secret(config: &PanelConfig) -> Result<Vec<u8>, StartupError> {
    match resolve_secret(config.auth.jwt_secret.as_deref())? {
        Some(secret) => Ok(secret.into_bytes()),
        None => {
            tracing::warn!("No auth.jwt_secret configured, sessions will not survive a restart");
            let mut secret = vec![0u8; 32];
            OsRng.fill_bytes(&mut secret);
            Ok(secret)
        }
    }
}

/// Explicit `listener.bind_address`, else `ListenAddress:ServerPort`.
pub fn bind_address(config: &PanelConfig, cache: &ConfigCache) -> String {
    if let Some(addr) = &config.listener.bind_address {
        return addr.clone();
    }

    let host = cache.listen_address();
    let port = cache.server_port();
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{keys, MemorySettingsStore};

    #[tokio::test]
    async fn test_bootstrap_seeds_and_loads() {
        let store = Arc::new(MemorySettingsStore::new());
        let state = bootstrap(&PanelConfig::default(), store.clone()).await.unwrap();

        assert!(state.cache.is_initialized());
        assert_eq!(state.cache.server_port(), "8080");
        let entrance = state.cache.security_entrance();
        assert_eq!(entrance.len(), 9);
        assert!(entrance.starts_with('/'));
        assert!(!state.reloader.is_running());
        assert_eq!(
            store.get_by_key(keys::SECURITY_ENTRANCE).await.unwrap().value,
            entrance
        );
    }

    #[tokio::test]
    async fn test_bootstrap_without_seeding() {
        let mut config = PanelConfig::default();
        config.store.seed_defaults = false;
        let state = bootstrap(&config, Arc::new(MemorySettingsStore::new()))
            .await
            .unwrap();

        assert!(!state.cache.is_initialized());
        assert_eq!(state.cache.security_entrance(), "/");
    }

    #[tokio::test]
    async fn test_bootstrap_fails_on_unreadable_store() {
        let store = Arc::new(MemorySettingsStore::new());
        store.set_unavailable(true);
        let Err(err) = bootstrap(&PanelConfig::default(), store).await else {
            panic!("bootstrap succeeded on an unreadable store");
        };
        assert!(matches!(err, StartupError::Store(_)));
    }

    #[tokio::test]
    async fn test_bootstrap_rejects_empty_env_secret() {
        std::env::set_var("PANEL_GATE_BOOTSTRAP_EMPTY_SECRET", "");
        let mut config = PanelConfig::default();
        config.auth.jwt_secret = Some("env:PANEL_GATE_BOOTSTRAP_EMPTY_SECRET".into());

        let Err(err) = bootstrap(&config, Arc::new(MemorySettingsStore::new())).await else {
            panic!("bootstrap accepted an empty session secret");
        };
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::Validation(ref e))
                if e == &[crate::config::validation::ValidationError::SecretTooShort]
        ));
    }

    #[tokio::test]
    async fn test_bind_address() {
        let store = Arc::new(MemorySettingsStore::with_values([
            (keys::LISTEN_ADDRESS, "127.0.0.1"),
            (keys::SERVER_PORT, "9000"),
        ]));
        let cache = ConfigCache::load(store).await.unwrap();
        let mut config = PanelConfig::default();
        assert_eq!(bind_address(&config, &cache), "127.0.0.1:9000");

        cache.set(keys::LISTEN_ADDRESS, "::");
        assert_eq!(bind_address(&config, &cache), "[::]:9000");

        config.listener.bind_address = Some("0.0.0.0:7000".into());
        assert_eq!(bind_address(&config, &cache), "0.0.0.0:7000");
    }
}
