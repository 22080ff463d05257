//! In-memory settings store.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{Setting, SettingsSource, StoreError};

/// A settings store held entirely in process memory.
///
/// Used for ephemeral runs and tests. It can be switched into an
/// "unavailable" state where every call fails, to exercise the error paths
/// of its consumers.
#[derive(Default)]
pub struct MemorySettingsStore {
    rows: DashMap<String, Setting>,
    unavailable: AtomicBool,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, value)` pairs.
    pub fn with_values<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (key, value) in values {
            store
                .rows
                .insert(key.to_string(), Setting::new(key, value, ""));
        }
        store
    }

    /// Toggle simulated unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsSource for MemorySettingsStore {
    async fn list(&self) -> Result<Vec<Setting>, StoreError> {
        self.check_available()?;
        let mut rows: Vec<Setting> = self.rows.iter().map(|r| r.value().clone()).collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    async fn get_by_key(&self, key: &str) -> Result<Setting, StoreError> {
        self.check_available()?;
        self.rows
            .get(key)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn create(&self, key: &str, value: &str, about: &str) -> Result<(), StoreError> {
        self.check_available()?;
        match self.rows.entry(key.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(Setting::new(key, value, about));
                Ok(())
            }
        }
    }

    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut row = self
            .rows
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        row.value = value.to_string();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        self.rows
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = MemorySettingsStore::new();

        store.create("ServerPort", "8080", "port").await.unwrap();
        assert!(matches!(
            store.create("ServerPort", "1", "").await,
            Err(StoreError::AlreadyExists(_))
        ));

        store.update("ServerPort", "9090").await.unwrap();
        assert_eq!(store.get_by_key("ServerPort").await.unwrap().value, "9090");
        assert_eq!(store.get_by_key("ServerPort").await.unwrap().about, "port");

        store.delete("ServerPort").await.unwrap();
        assert!(store.get_by_key("ServerPort").await.unwrap_err().is_not_found());
        assert!(store.update("ServerPort", "1").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_list_is_sorted() {
        let store = MemorySettingsStore::with_values([("b", "2"), ("a", "1"), ("c", "3")]);
        let keys: Vec<_> = store.list().await.unwrap().into_iter().map(|s| s.key).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_unavailable_fails_every_call() {
        let store = MemorySettingsStore::with_values([("a", "1")]);
        store.set_unavailable(true);

        assert!(matches!(store.list().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(store.update("a", "2").await, Err(StoreError::Unavailable(_))));

        store.set_unavailable(false);
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
