//! Bootstrap configuration subsystem.
//!
//! # Data Flow
//! ```text
//! panel.toml (optional)
//!     → loader.rs (parse & deserialize, resolve env: secrets)
//!     → validation.rs (semantic checks)
//!     → PanelConfig (validated, immutable)
//!     → main wires store, cache, reloader and listener from it
//!
//! Runtime settings are not here: they live in the settings store and are
//! served by the config cache. watcher.rs only reports changes to the
//! settings file so the cache can reload.
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal or missing config files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_config_or_default, resolve_secret, ConfigError};
pub use schema::PanelConfig;
pub use watcher::SettingsWatcher;
