//! Configuration validation.
//!
//! Returns all validation errors, not just the first, so operators see
//! every problem in one diagnostic.

use std::time::Duration;

use crate::config::loader::{
    ENV_IDLE_TIMEOUT, ENV_READ_HEADER_TIMEOUT, ENV_READ_TIMEOUT,
    ENV_SHUTDOWN_TIMEOUT, ENV_WRITE_TIMEOUT,
};
use crate::config::schema::{Config, Mode};

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("APP_MODE must be one of \"release\", \"debug\", \"test\", got {0:?}")]
    Mode(String),
    #[error("HOST must not be empty")]
    EmptyHost,
    #[error("PORT must not be empty")]
    EmptyPort,
    #[error("PORT must be a valid TCP port (1-65535), got {0:?}")]
    Port(String),
    #[error("{name} must be > 0, got {value:?}")]
    NonPositiveDuration { name: &'static str, value: Duration },
}

/// Error type for configuration handling.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config validation failed: {}", join(.0))]
    Invalid(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Config {
    /// Check every constraint and aggregate the violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let errors = validate_config(self);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

/// Pure check: `Config` → list of violations.
pub fn validate_config(config: &Config) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.mode.parse::<Mode>().is_err() {
        errors.push(ValidationError::Mode(config.mode.clone()));
    }

    if config.host.trim().is_empty() {
        errors.push(ValidationError::EmptyHost);
    }

    let port = config.port.trim();
    if port.is_empty() {
        errors.push(ValidationError::EmptyPort);
    } else if !matches!(port.parse::<u32>(), Ok(1..=65535)) {
        errors.push(ValidationError::Port(config.port.clone()));
    }

    let durations = [
        (ENV_READ_TIMEOUT, config.read_timeout),
        (ENV_WRITE_TIMEOUT, config.write_timeout),
        (ENV_READ_HEADER_TIMEOUT, config.read_header_timeout),
        (ENV_IDLE_TIMEOUT, config.idle_timeout),
        (ENV_SHUTDOWN_TIMEOUT, config.shutdown_timeout),
    ];
    for (name, value) in durations {
        if value.is_zero() {
            errors.push(ValidationError::NonPositiveDuration { name, value });
        }
    }

    errors
}
