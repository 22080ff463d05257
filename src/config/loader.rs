//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::PanelConfig;
use crate::config::validation::{validate_config, ValidationError, MIN_SECRET_LEN};

const ENV_PREFIX: &str = "env:";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("environment variable {0} referenced by auth.jwt_secret is not set")]
    MissingSecretEnv(String),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PanelConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Load the file when it exists, otherwise run on defaults.
pub fn load_config_or_default(path: &Path) -> Result<PanelConfig, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        let config = PanelConfig::default();
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<PanelConfig, ConfigError> {
    let config: PanelConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the session signing secret, following `env:VAR` references.
///
/// `Ok(None)` means no secret is configured. The resolved value must be at
/// least 32 bytes, whichever way it was supplied.
pub fn resolve_secret(raw: Option<&str>) -> Result<Option<String>, ConfigError> {
    let Some(value) = raw else {
        return Ok(None);
    };

    let secret = match value.strip_prefix(ENV_PREFIX) {
        Some(var) => std::env::var(var)
            .map_err(|_| ConfigError::MissingSecretEnv(var.to_string()))?,
        None => value.to_string(),
    };

    if secret.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Validation(vec![ValidationError::SecretTooShort]));
    }
    Ok(Some(secret))
}
