//! Bootstrap configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: PanelConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::PanelConfig;

pub(crate) const MIN_SECRET_LEN: usize = 32;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    BindAddress(String),

    #[error("store.path must not be empty")]
    EmptyStorePath,

    #[error("auth.jwt_secret must be at least 32 bytes")]
    SecretTooShort,

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    LogLevel(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),

    #[error("timeouts.request_secs must be greater than zero")]
    RequestTimeout,
}

pub fn validate_config(config: &PanelConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Some(addr) = &config.listener.bind_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::BindAddress(addr.clone()));
        }
    }

    if config.store.path.trim().is_empty() {
        errors.push(ValidationError::EmptyStorePath);
    }

    // `env:` references are length-checked by `resolve_secret`.
    if let Some(secret) = &config.auth.jwt_secret {
        if !secret.starts_with("env:") && secret.len() < MIN_SECRET_LEN {
            errors.push(ValidationError::SecretTooShort);
        }
    }

    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
