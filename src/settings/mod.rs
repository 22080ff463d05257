//! Persisted settings subsystem.
//!
//! # Data Flow
//! ```text
//! admin handler / first-run seeding
//!     → service.rs (upsert, defaults)
//!     → SettingsSource (memory.rs | file.rs)
//!     → persisted (key, value, about) rows
//!
//! ConfigCache::reload()
//!     → SettingsSource::list()
//!     → fresh snapshot
//! ```
//!
//! # Design Decisions
//! - The cache depends on the `SettingsSource` trait, never on a concrete store
//! - `key` is the only identity; a store never holds two rows with one key
//! - Stores make no transactional promises across calls

pub mod file;
pub mod keys;
pub mod memory;
pub mod service;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use file::JsonFileSettingsStore;
pub use memory::MemorySettingsStore;
pub use service::SettingsService;

/// A single persisted setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: String,
    /// Human readable description.
    #[serde(default)]
    pub about: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>, about: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            about: about.into(),
        }
    }
}

/// Errors surfaced by a settings store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("setting not found: {0}")]
    NotFound(String),

    #[error("setting already exists: {0}")]
    AlreadyExists(String),

    #[error("settings store unavailable: {0}")]
    Unavailable(String),

    #[error("settings store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings store is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Persisted key/value table backing the runtime configuration.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// All settings currently persisted.
    async fn list(&self) -> Result<Vec<Setting>, StoreError>;

    /// Fetch one setting, `StoreError::NotFound` when absent.
    async fn get_by_key(&self, key: &str) -> Result<Setting, StoreError>;

    /// Insert a new setting. Fails with `AlreadyExists` on a duplicate key.
    async fn create(&self, key: &str, value: &str, about: &str) -> Result<(), StoreError>;

    /// Replace the value of an existing setting.
    async fn update(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a setting.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
