//! Settings service: upsert semantics and first-run defaults.

use std::sync::Arc;

use rand::Rng;

use super::keys;
use super::{Setting, SettingsSource, StoreError};

const ENTRANCE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const ENTRANCE_LEN: usize = 8;

/// Generate a random secret entrance path: `/` followed by 8 characters of
/// `[a-z0-9]`.
pub fn generate_entrance() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ENTRANCE_LEN)
        .map(|_| ENTRANCE_CHARSET[rng.gen_range(0..ENTRANCE_CHARSET.len())] as char)
        .collect();
    format!("/{}", suffix)
}

/// Thin layer over a `SettingsSource` used by handlers and startup.
#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsSource>,
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsSource>) -> Self {
        Self { store }
    }

    pub async fn get_all(&self) -> Result<Vec<Setting>, StoreError> {
        self.store.list().await
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Setting, StoreError> {
        self.store.get_by_key(key).await
    }

    /// Update a setting, creating it when it does not exist yet.
    /// Writing the value it already holds is a no-op.
    pub async fn update_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self.store.get_by_key(key).await {
            Ok(existing) if existing.value == value => Ok(()),
            Ok(_) => self.store.update(key, value).await,
            Err(StoreError::NotFound(_)) => self.store.create(key, value, "").await,
            Err(e) => Err(e),
        }
    }

    pub async fn create_setting(&self, key: &str, value: &str, about: &str) -> Result<(), StoreError> {
        self.store.create(key, value, about).await
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await
    }

    /// Seed first-run defaults. Only missing keys are created; an existing
    /// non-root secret entrance is kept, otherwise a random one is generated.
    ///
    /// Returns the number of settings created.
    pub async fn initialize_defaults(&self) -> Result<usize, StoreError> {
        let entrance = match self.store.get_by_key(keys::SECURITY_ENTRANCE).await {
            Ok(existing) if existing.value != "/" => existing.value,
            Ok(_) | Err(StoreError::NotFound(_)) => generate_entrance(),
            Err(e) => return Err(e),
        };

        let defaults = [
            (keys::SERVER_PORT, keys::DEFAULT_SERVER_PORT.to_string(), "Server port"),
            (keys::SERVER_MODE, keys::DEFAULT_SERVER_MODE.to_string(), "Server run mode"),
            (keys::SECURITY_ENTRANCE, entrance, "Secret entrance path"),
            (keys::INITIALIZED, "true".to_string(), "Whether first-run setup has completed"),
            (keys::LANGUAGE, keys::DEFAULT_LANGUAGE.to_string(), "Panel language"),
            (keys::TIMEZONE, keys::DEFAULT_TIMEZONE.to_string(), "Panel timezone"),
        ];

        let mut created = 0;
        for (key, value, about) in defaults {
            match self.store.get_by_key(key).await {
                Ok(_) => continue,
                Err(StoreError::NotFound(_)) => {
                    self.store.create(key, &value, about).await?;
                    created += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if created > 0 {
            tracing::info!(created, "Seeded default settings");
        }
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettingsStore;

    fn service(store: MemorySettingsStore) -> SettingsService {
        SettingsService::new(Arc::new(store))
    }

    #[test]
    fn test_generated_entrance_shape() {
        for _ in 0..32 {
            let e = generate_entrance();
            assert_eq!(e.len(), 1 + ENTRANCE_LEN);
            assert!(e.starts_with('/'));
            assert!(e[1..]
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn test_update_setting_upserts() {
        let svc = service(MemorySettingsStore::new());

        svc.update_setting("Language", "en-US").await.unwrap();
        assert_eq!(svc.get_by_key("Language").await.unwrap().value, "en-US");

        svc.update_setting("Language", "de-DE").await.unwrap();
        assert_eq!(svc.get_by_key("Language").await.unwrap().value, "de-DE");
    }

    #[tokio::test]
    async fn test_initialize_defaults_generates_entrance() {
        let svc = service(MemorySettingsStore::new());

        assert_eq!(svc.initialize_defaults().await.unwrap(), 6);
        let entrance = svc.get_by_key(keys::SECURITY_ENTRANCE).await.unwrap().value;
        assert_ne!(entrance, "/");
        assert_eq!(svc.get_by_key(keys::INITIALIZED).await.unwrap().value, "true");

        // Second run creates nothing and keeps the entrance.
        assert_eq!(svc.initialize_defaults().await.unwrap(), 0);
        assert_eq!(
            svc.get_by_key(keys::SECURITY_ENTRANCE).await.unwrap().value,
            entrance
        );
    }

    #[tokio::test]
    async fn test_initialize_defaults_keeps_existing_values() {
        let svc = service(MemorySettingsStore::with_values([
            (keys::SERVER_PORT, "9090"),
            (keys::SECURITY_ENTRANCE, "/mine"),
        ]));

        assert_eq!(svc.initialize_defaults().await.unwrap(), 4);
        assert_eq!(svc.get_by_key(keys::SERVER_PORT).await.unwrap().value, "9090");
        assert_eq!(svc.get_by_key(keys::SECURITY_ENTRANCE).await.unwrap().value, "/mine");
    }
}
