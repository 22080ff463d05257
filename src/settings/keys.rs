//! Well-known setting keys and their built-in fallbacks.
//!
//! The fallbacks keep the panel operable before first-run initialization
//! has populated the store.

pub const SERVER_PORT: &str = "ServerPort";
pub const SERVER_MODE: &str = "ServerMode";
pub const SERVER_ADDRESS: &str = "ServerAddress";
pub const LISTEN_ADDRESS: &str = "ListenAddress";
pub const SECURITY_ENTRANCE: &str = "SecurityEntrance";
pub const SESSION_TIMEOUT: &str = "SessionTimeout";
pub const LANGUAGE: &str = "Language";
pub const TIMEZONE: &str = "Timezone";
pub const INITIALIZED: &str = "Initialized";
pub const PANEL_USER: &str = "PanelUser";
pub const PANEL_PASSWORD: &str = "PanelPassword";
pub const PASSWORD_COMPLEXITY_CHECK: &str = "PasswordComplexityCheck";

pub const DEFAULT_SERVER_PORT: &str = "8080";
pub const DEFAULT_SERVER_MODE: &str = "debug";
pub const DEFAULT_SERVER_ADDRESS: &str = "";
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_SECURITY_ENTRANCE: &str = "/";
pub const DEFAULT_LANGUAGE: &str = "zh-CN";
pub const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";
pub const DEFAULT_PANEL_USER: &str = "admin";
pub const DEFAULT_PANEL_PASSWORD: &str = "admin123";

/// 24 hours.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 86_400;
