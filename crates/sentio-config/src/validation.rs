// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent and within valid ranges.

use crate::{ConfigError, ConfigResult, SentioConfig};

/// Known backend kinds accepted by `backend.kind`
pub const KNOWN_BACKENDS: &[&str] = &["host", "dummy"];

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    UnknownBackend { kind: String },
    InvalidLogLevel { level: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownBackend { kind } => {
                write!(
                    f,
                    "Unknown backend '{}' (known backends: {})",
                    kind,
                    KNOWN_BACKENDS.join(", ")
                )
            }
            Self::InvalidLogLevel { level } => {
                write!(
                    f,
                    "Invalid log level '{}' (expected one of: {})",
                    level,
                    KNOWN_LOG_LEVELS.join(", ")
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &SentioConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    if !KNOWN_BACKENDS.contains(&config.backend.kind.as_str()) {
        errors.push(ConfigValidationError::UnknownBackend {
            kind: config.backend.kind.clone(),
        });
    }

    if !KNOWN_LOG_LEVELS.contains(&config.system.log_level.to_lowercase().as_str()) {
        errors.push(ConfigValidationError::InvalidLogLevel {
            level: config.system.log_level.clone(),
        });
    }

    if config.poll.join_warn_secs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "poll.join_warn_secs".to_string(),
            reason: "must be at least 1 second".to_string(),
        });
    }

    if config.logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must keep at least one run".to_string(),
        });
    }

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SentioConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let mut config = SentioConfig::default();
        config.backend.kind = "telepathy".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let mut config = SentioConfig::default();
        config.system.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_join_warn_rejected() {
        let mut config = SentioConfig::default();
        config.poll.join_warn_secs = 0;
        let result = validate_config(&config);
        assert!(result.is_err());
        // Error text carries the offending field for the operator.
        let message = format!("{}", result.unwrap_err());
        assert!(message.contains("poll.join_warn_secs"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = SentioConfig::default();
        config.backend.kind = "telepathy".to_string();
        config.system.log_level = "loud".to_string();
        let message = format!("{}", validate_config(&config).unwrap_err());
        assert!(message.contains("telepathy"));
        assert!(message.contains("loud"));
    }
}
