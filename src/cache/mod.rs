//! Versioned in-memory mirror of the settings store.
//!
//! # Data Flow
//! ```text
//! SettingsSource::list()
//!     → ConfigSnapshot { settings, version }
//!     → ArcSwap (atomic swap of the whole pair)
//!     → readers: get / get_all / version (lock-free load)
//!
//! update_and_persist(k, v):
//!     SettingsSource::update()   (no snapshot held)
//!     → rcu swap: settings[k] = v, version += 1
//!
//! ConfigReloader (reloader.rs):
//!     timer tick | reload-now request
//!     → ConfigCache::reload()
//!     → on_reload callbacks
//! ```
//!
//! # Design Decisions
//! - Map and version live in one immutable snapshot, so a reader can never
//!   observe a version that belongs to a different map
//! - Store I/O always happens outside the swap; readers never wait on it
//! - Every reload and every individual key write bumps the version; session
//!   tokens carry the version they were minted under (see `session`)
//! - Versions are seeded from wall-clock milliseconds so tokens minted by a
//!   previous process never match a fresh one

pub mod reloader;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::settings::{keys, Setting, SettingsSource, StoreError};

pub use reloader::{ConfigReloader, ReloadCallback};

/// Monotonically increasing reload generation of the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConfigVersion(u64);

impl ConfigVersion {
    pub fn as_u64(self) -> u64 {
        self.0
    }

    fn initial() -> Self {
        Self(now_millis())
    }

    fn next(self) -> Self {
        Self(now_millis().max(self.0 + 1))
    }
}

impl fmt::Display for ConfigVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// One complete, immutable image of the configuration.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    settings: HashMap<String, String>,
    version: ConfigVersion,
    /// Count of individual key writes applied to this lineage.
    writes: u64,
    /// `writes` value observed by the reload that produced `settings`.
    listed_at: u64,
    /// Keys written after `listed_at`, with the sequence of their last write.
    recent: HashMap<String, u64>,
}

impl ConfigSnapshot {
    fn from_rows(rows: Vec<Setting>, version: ConfigVersion) -> Self {
        Self {
            settings: rows.into_iter().map(|s| (s.key, s.value)).collect(),
            version,
            writes: 0,
            listed_at: 0,
            recent: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.settings.get(key).map(String::as_str)
    }

    pub fn version(&self) -> ConfigVersion {
        self.version
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.settings.iter()
    }
}

/// In-memory, versioned configuration cache.
///
/// Constructed once by the composition root and shared by `Arc`.
pub struct ConfigCache {
    source: Arc<dyn SettingsSource>,
    state: ArcSwap<ConfigSnapshot>,
}

impl ConfigCache {
    /// Create an empty cache. Every accessor answers with its fallback until
    /// the first `reload()`.
    pub fn empty(source: Arc<dyn SettingsSource>) -> Self {
        Self {
            source,
            state: ArcSwap::from_pointee(ConfigSnapshot::from_rows(
                Vec::new(),
                ConfigVersion::initial(),
            )),
        }
    }

    /// Create a cache primed with the current store content.
    pub async fn load(source: Arc<dyn SettingsSource>) -> Result<Self, StoreError> {
        let rows = source.list().await?;
        let snapshot = ConfigSnapshot::from_rows(rows, ConfigVersion::initial());

        tracing::info!(
            settings = snapshot.len(),
            version = %snapshot.version,
            "Config cache initialized"
        );
        metrics::record_config_version(snapshot.version);

        Ok(Self {
            source,
            state: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Consistent view of the settings and the version they belong to.
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        self.state.load_full()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.state.load().settings.get(key).cloned()
    }

    /// Copy of every cached setting.
    pub fn get_all(&self) -> HashMap<String, String> {
        self.state.load().settings.clone()
    }

    pub fn version(&self) -> ConfigVersion {
        self.state.load().version
    }

    /// Write a value into memory only and bump the version.
    ///
    /// For callers that already persisted the change themselves.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();

        self.state.rcu(|cur| {
            let mut next = ConfigSnapshot::clone(cur);
            next.writes += 1;
            next.settings.insert(key.clone(), value.clone());
            next.recent.insert(key.clone(), next.writes);
            next.version = cur.version.next();
            next
        });

        let version = self.version();
        tracing::debug!(key = %key, version = %version, "Config value updated");
        metrics::record_config_version(version);
    }

    /// Persist through the store, then update memory.
    ///
    /// When the store rejects the write the cache is left untouched, so it
    /// never shows a value the store does not hold.
    pub async fn update_and_persist(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if let Err(e) = self.source.update(key, value).await {
            tracing::warn!(key = %key, error = %e, "Failed to persist setting, cache unchanged");
            return Err(e);
        }
        self.set(key, value);
        Ok(())
    }

    /// Replace the whole map with the store's current content and bump the
    /// version. On a store error the previous snapshot stays in place.
    ///
    /// Individual writes that complete while the listing is in flight are
    /// re-applied on top of it, so a slow reload can never roll back a write
    /// that already returned to its caller.
    pub async fn reload(&self) -> Result<ConfigVersion, StoreError> {
        let baseline = self.state.load().writes;

        let rows = match self.source.list().await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config cache, keeping previous snapshot");
                metrics::record_config_reload(false);
                return Err(e);
            }
        };
        let listed: HashMap<String, String> = rows.into_iter().map(|s| (s.key, s.value)).collect();

        let prev = self.state.rcu(|cur| {
            let mut next = if cur.listed_at > baseline {
                // A reload that started later already landed; its listing wins.
                ConfigSnapshot::clone(cur)
            } else {
                let recent: HashMap<String, u64> = cur
                    .recent
                    .iter()
                    .filter(|(_, seq)| **seq > baseline)
                    .map(|(k, seq)| (k.clone(), *seq))
                    .collect();

                let mut settings = listed.clone();
                for key in recent.keys() {
                    if let Some(value) = cur.settings.get(key) {
                        settings.insert(key.clone(), value.clone());
                    }
                }

                ConfigSnapshot {
                    settings,
                    version: cur.version,
                    writes: cur.writes,
                    listed_at: baseline,
                    recent,
                }
            };
            next.version = cur.version.next();
            next
        });

        let current = self.state.load();
        tracing::info!(
            settings = current.settings.len(),
            previous_version = %prev.version,
            version = %current.version,
            "Config cache reloaded"
        );
        metrics::record_config_reload(true);
        metrics::record_config_version(current.version);

        Ok(current.version)
    }

    fn get_or(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or_else(|| fallback.to_string())
    }

    pub fn server_port(&self) -> String {
        self.get_or(keys::SERVER_PORT, keys::DEFAULT_SERVER_PORT)
    }

    pub fn server_mode(&self) -> String {
        self.get_or(keys::SERVER_MODE, keys::DEFAULT_SERVER_MODE)
    }

    pub fn server_address(&self) -> String {
        self.get_or(keys::SERVER_ADDRESS, keys::DEFAULT_SERVER_ADDRESS)
    }

    pub fn listen_address(&self) -> String {
        self.get_or(keys::LISTEN_ADDRESS, keys::DEFAULT_LISTEN_ADDRESS)
    }

    /// Configured secret entrance, as stored (not normalized).
    pub fn security_entrance(&self) -> String {
        self.get_or(keys::SECURITY_ENTRANCE, keys::DEFAULT_SECURITY_ENTRANCE)
    }

    pub fn language(&self) -> String {
        self.get_or(keys::LANGUAGE, keys::DEFAULT_LANGUAGE)
    }

    pub fn timezone(&self) -> String {
        self.get_or(keys::TIMEZONE, keys::DEFAULT_TIMEZONE)
    }

    pub fn is_initialized(&self) -> bool {
        self.get(keys::INITIALIZED).as_deref() == Some("true")
    }

    pub fn panel_user(&self) -> String {
        self.get_or(keys::PANEL_USER, keys::DEFAULT_PANEL_USER)
    }

    pub fn panel_password(&self) -> String {
        self.get_or(keys::PANEL_PASSWORD, keys::DEFAULT_PANEL_PASSWORD)
    }

    pub fn password_complexity_check(&self) -> bool {
        self.get(keys::PASSWORD_COMPLEXITY_CHECK).as_deref() == Some("true")
    }

    /// Session lifetime. Missing, empty, unparseable and zero values all fall
    /// back to 24 hours.
    pub fn session_timeout(&self) -> Duration {
        let secs = self
            .get(keys::SESSION_TIMEOUT)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(keys::DEFAULT_SESSION_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    async fn cache_with(values: &[(&str, &str)]) -> (Arc<MemorySettingsStore>, ConfigCache) {
        let store = Arc::new(MemorySettingsStore::with_values(values.iter().copied()));
        let cache = ConfigCache::load(store.clone()).await.unwrap();
        (store, cache)
    }

    #[tokio::test]
    async fn test_server_port_update_scenario() {
        let (store, cache) = cache_with(&[("ServerPort", "9090")]).await;
        assert_eq!(cache.get("ServerPort").as_deref(), Some("9090"));

        let before = cache.version();
        cache.update_and_persist("ServerPort", "9091").await.unwrap();

        assert_eq!(cache.get("ServerPort").as_deref(), Some("9091"));
        assert_ne!(cache.version(), before);
        assert_eq!(store.get_by_key("ServerPort").await.unwrap().value, "9091");
    }

    #[tokio::test]
    async fn test_read_your_writes() {
        let (_store, cache) = cache_with(&[("Language", "zh-CN")]).await;
        for value in ["en-US", "de-DE", "fr-FR"] {
            cache.update_and_persist("Language", value).await.unwrap();
            assert_eq!(cache.get("Language").as_deref(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_cache_untouched() {
        let (store, cache) = cache_with(&[("ServerPort", "9090")]).await;
        let before = cache.version();

        store.set_unavailable(true);
        assert!(cache.update_and_persist("ServerPort", "1").await.is_err());
        assert_eq!(cache.get("ServerPort").as_deref(), Some("9090"));
        assert_eq!(cache.version(), before);

        store.set_unavailable(false);
        // Unknown keys are rejected by the store, so they never appear.
        assert!(cache.update_and_persist("Missing", "1").await.is_err());
        assert_eq!(cache.get("Missing"), None);
    }

    #[tokio::test]
    async fn test_set_is_memory_only_and_bumps_version() {
        let (store, cache) = cache_with(&[]).await;
        let before = cache.version();

        cache.set("Timezone", "UTC");
        assert_eq!(cache.get("Timezone").as_deref(), Some("UTC"));
        assert!(cache.version() > before);
        assert!(store.get_by_key("Timezone").await.is_err());
    }

    #[tokio::test]
    async fn test_get_all_is_a_copy() {
        let (_store, cache) = cache_with(&[("a", "1")]).await;
        let mut all = cache.get_all();
        all.insert("b".into(), "2".into());
        all.insert("a".into(), "changed".into());

        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.get("b"), None);
    }

    #[tokio::test]
    async fn test_reload_reflects_external_changes_and_shrinks() {
        let (store, cache) = cache_with(&[("a", "1"), ("b", "2")]).await;

        store.update("a", "10").await.unwrap();
        store.delete("b").await.unwrap();
        assert_eq!(cache.get("a").as_deref(), Some("1"));

        let before = cache.version();
        let after = cache.reload().await.unwrap();
        assert!(after > before);
        assert_eq!(cache.version(), after);
        assert_eq!(cache.get("a").as_deref(), Some("10"));
        assert_eq!(cache.get("b"), None);
    }

    #[tokio::test]
    async fn test_reload_is_idempotent_on_content() {
        let (_store, cache) = cache_with(&[("a", "1"), ("b", "2")]).await;
        cache.reload().await.unwrap();
        let first = cache.get_all();
        let v1 = cache.version();
        cache.reload().await.unwrap();

        assert_eq!(cache.get_all(), first);
        assert!(cache.version() > v1);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_stale_snapshot() {
        let (store, cache) = cache_with(&[("a", "1")]).await;
        let before = cache.version();

        store.set_unavailable(true);
        assert!(cache.reload().await.is_err());
        assert_eq!(cache.get("a").as_deref(), Some("1"));
        assert_eq!(cache.version(), before);
    }

    #[tokio::test]
    async fn test_snapshot_pairs_map_and_version() {
        let (_store, cache) = cache_with(&[("a", "1")]).await;
        let snap = cache.snapshot();
        cache.set("a", "2");

        assert_eq!(snap.get("a"), Some("1"));
        assert_ne!(snap.version(), cache.version());
        assert_eq!(cache.snapshot().get("a"), Some("2"));
    }

    #[tokio::test]
    async fn test_accessor_fallbacks() {
        let cache = ConfigCache::empty(Arc::new(MemorySettingsStore::new()));

        assert_eq!(cache.server_port(), "8080");
        assert_eq!(cache.server_mode(), "debug");
        assert_eq!(cache.security_entrance(), "/");
        assert_eq!(cache.language(), "zh-CN");
        assert_eq!(cache.timezone(), "Asia/Shanghai");
        assert_eq!(cache.panel_user(), "admin");
        assert_eq!(cache.panel_password(), "admin123");
        assert_eq!(cache.listen_address(), "0.0.0.0");
        assert_eq!(cache.server_address(), "");
        assert!(!cache.is_initialized());
        assert!(!cache.password_complexity_check());
        assert_eq!(cache.session_timeout(), Duration::from_secs(86_400));
    }

    #[tokio::test]
    async fn test_session_timeout_parsing() {
        let cache = ConfigCache::empty(Arc::new(MemorySettingsStore::new()));

        cache.set(keys::SESSION_TIMEOUT, "3600");
        assert_eq!(cache.session_timeout(), Duration::from_secs(3600));

        for bad in ["", "abc", "0", "-5"] {
            cache.set(keys::SESSION_TIMEOUT, bad);
            assert_eq!(cache.session_timeout(), Duration::from_secs(86_400), "value {bad:?}");
        }

        cache.set(keys::INITIALIZED, "true");
        assert!(cache.is_initialized());
        cache.set(keys::INITIALIZED, "yes");
        assert!(!cache.is_initialized());
    }

    /// Store whose `list` pauses after reading, until released.
    struct GatedStore {
        inner: MemorySettingsStore,
        listed: Notify,
        release: Notify,
    }

    #[async_trait]
    impl SettingsSource for GatedStore {
        async fn list(&self) -> Result<Vec<Setting>, StoreError> {
            let rows = self.inner.list().await?;
            self.listed.notify_one();
            self.release.notified().await;
            Ok(rows)
        }
        async fn get_by_key(&self, key: &str) -> Result<Setting, StoreError> {
            self.inner.get_by_key(key).await
        }
        async fn create(&self, key: &str, value: &str, about: &str) -> Result<(), StoreError> {
            self.inner.create(key, value, about).await
        }
        async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.update(key, value).await
        }
        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_slow_reload_does_not_roll_back_completed_write() {
        let store = Arc::new(GatedStore {
            inner: MemorySettingsStore::with_values([("ServerPort", "9090")]),
            listed: Notify::new(),
            release: Notify::new(),
        });
        let cache = Arc::new(ConfigCache::empty(store.clone()));

        let reloading = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.reload().await })
        };

        // The reload has read the old value and is parked.
        store.listed.notified().await;
        cache.update_and_persist("ServerPort", "9091").await.unwrap();
        assert_eq!(cache.get("ServerPort").as_deref(), Some("9091"));

        store.release.notify_one();
        reloading.await.unwrap().unwrap();

        assert_eq!(cache.get("ServerPort").as_deref(), Some("9091"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_and_reloads() {
        let keys: Vec<String> = (0..8).map(|i| format!("key{i}")).collect();
        let store = Arc::new(MemorySettingsStore::new());
        for k in &keys {
            store.create(k, "0", "").await.unwrap();
        }
        let cache = Arc::new(ConfigCache::load(store.clone()).await.unwrap());

        let mut tasks = Vec::new();
        for k in keys.clone() {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for n in 1..=50 {
                    let value = n.to_string();
                    cache.update_and_persist(&k, &value).await.unwrap();
                    let seen: u32 = cache.get(&k).unwrap().parse().unwrap();
                    assert!(seen >= n, "read {seen} after writing {n}");
                }
            }));
        }
        for _ in 0..2 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..50 {
                    cache.reload().await.unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        for k in &keys {
            assert_eq!(cache.get(k).as_deref(), Some("50"));
        }
    }
}
