//! Bootstrap configuration schema.
//!
//! This file only covers what the process needs before it can open the
//! settings store. Everything the operator changes at runtime (port, mode,
//! entrance, credentials, session lifetime) lives in the store and is served
//! by the config cache.

use serde::{Deserialize, Serialize};

/// Root bootstrap configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PanelConfig {
    /// Listener overrides.
    pub listener: ListenerConfig,

    /// Settings store location.
    pub store: StoreConfig,

    /// Config cache refresh.
    pub reload: ReloadConfig,

    /// Session signing.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Panel UI files.
    pub ui: UiConfig,

    /// HTTP limits.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
///
/// When `bind_address` is unset the address is built from the
/// `ListenAddress` and `ServerPort` settings.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ListenerConfig {
    /// Explicit bind address (e.g., "127.0.0.1:8080").
    pub bind_address: Option<String>,
}

/// Settings store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path of the JSON settings file.
    pub path: String,

    /// Reload the cache when the file changes on disk. Changes landing within
    /// a second of a write made by this process are skipped, since that write
    /// already updated the cache; an outside edit in that window waits for
    /// the next periodic or manual reload.
    pub watch: bool,

    /// Seed first-run defaults on startup.
    pub seed_defaults: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "data/settings.json".to_string(),
            watch: false,
            seed_defaults: true,
        }
    }
}

/// Periodic reload configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReloadConfig {
    /// Seconds between background reloads; 0 means manual reload only.
    pub interval_secs: u64,
}

/// Session signing configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. `env:VAR_NAME` reads it from the
    /// environment. When unset a random secret is generated per process,
    /// which also logs everybody out on restart.
    pub jwt_secret: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Panel UI configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UiConfig {
    /// Directory with the built UI; a placeholder page is served when unset.
    pub dir: Option<String>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}
