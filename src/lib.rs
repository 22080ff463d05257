//! Panel gate: runtime configuration cache, session issuing and secret
//! entrance gating for a server-administration panel.

pub mod admin;
pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod session;
pub mod settings;

pub use cache::{ConfigCache, ConfigReloader, ConfigVersion};
pub use config::PanelConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
