//! JSON file backed settings store.
//!
//! The whole table lives in one JSON array of `{key, value, about}` objects.
//! Every read goes back to disk so edits made by other processes (the
//! `panelctl` tool, an operator with an editor) are picked up by the next
//! reload. Writes are serialized inside the process and land atomically via
//! a temp file + rename.

use std::path::{Path, PathBuf};
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Setting, SettingsSource, StoreError};

pub struct JsonFileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    last_write: std::sync::Mutex<Option<Instant>>,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            last_write: std::sync::Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this store wrote the file within the last `window`. Lets a
    /// file watcher tell its own process's writes from outside edits.
    pub fn written_within(&self, window: Duration) -> bool {
        self.last_write
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some_and(|at| at.elapsed() < window)
    }

    async fn read_rows(&self) -> Result<Vec<Setting>, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_rows(&self, rows: &[Setting]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        let body = serde_json::to_vec_pretty(rows)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        *self.last_write.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());

        tracing::debug!(path = ?self.path, rows = rows.len(), "Settings file written");
        Ok(())
    }

    /// Read-modify-write under the process-local write lock.
    async fn modify<F>(&self, f: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Vec<Setting>) -> Result<(), StoreError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut rows = self.read_rows().await?;
        f(&mut rows)?;
        self.write_rows(&rows).await
    }
}

#[async_trait]
impl SettingsSource for JsonFileSettingsStore {
    async fn list(&self) -> Result<Vec<Setting>, StoreError> {
        self.read_rows().await
    }

    async fn get_by_key(&self, key: &str) -> Result<Setting, StoreError> {
        self.read_rows()
            .await?
            .into_iter()
            .find(|s| s.key == key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn create(&self, key: &str, value: &str, about: &str) -> Result<(), StoreError> {
        self.modify(|rows| {
            if rows.iter().any(|s| s.key == key) {
                return Err(StoreError::AlreadyExists(key.to_string()));
            }
            rows.push(Setting::new(key, value, about));
            Ok(())
        })
        .await
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.modify(|rows| {
            let row = rows
                .iter_mut()
                .find(|s| s.key == key)
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
            row.value = value.to_string();
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.modify(|rows| {
            let before = rows.len();
            rows.retain(|s| s.key != key);
            if rows.len() == before {
                return Err(StoreError::NotFound(key.to_string()));
            }
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("settings.json"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("settings.json");

        let store = JsonFileSettingsStore::new(&path);
        store.create("ServerPort", "8080", "port").await.unwrap();
        store.create("Language", "zh-CN", "").await.unwrap();
        store.update("ServerPort", "9090").await.unwrap();
        store.delete("Language").await.unwrap();

        let reopened = JsonFileSettingsStore::new(&path);
        let rows = reopened.list().await.unwrap();
        assert_eq!(rows, vec![Setting::new("ServerPort", "9090", "port")]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_duplicate_and_missing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSettingsStore::new(dir.path().join("settings.json"));
        store.create("a", "1", "").await.unwrap();

        assert!(matches!(
            store.create("a", "2", "").await,
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(store.update("b", "1").await.unwrap_err().is_not_found());
        assert!(store.delete("b").await.unwrap_err().is_not_found());
        assert!(store.get_by_key("b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_tracks_own_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = JsonFileSettingsStore::new(&path);
        assert!(!store.written_within(Duration::from_secs(60)));

        store.list().await.unwrap();
        assert!(!store.written_within(Duration::from_secs(60)));

        store.create("a", "1", "").await.unwrap();
        assert!(store.written_within(Duration::from_secs(60)));
        assert!(!store.written_within(Duration::ZERO));

        // A failed write leaves the file untouched and is not recorded.
        let other = JsonFileSettingsStore::new(&path);
        assert!(other.update("missing", "1").await.is_err());
        assert!(!other.written_within(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFileSettingsStore::new(&path);
        assert!(matches!(store.list().await, Err(StoreError::Serialization(_))));
    }
}
