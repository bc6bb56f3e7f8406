// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, ConfigError, ConfigResult, SentioConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Find the Sentio configuration file
///
/// Search order:
/// 1. `SENTIO_CONFIG_PATH` environment variable
/// 2. Current working directory: `./sentio.toml`
/// 3. Parent directories (searches up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any
/// location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    // 1. Check environment variable first
    if let Ok(env_path) = env::var("SENTIO_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by SENTIO_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    // 2. Search in common locations
    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join("sentio.toml"));

        // Search up to 5 levels for workspace root
        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join("sentio.toml"));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Sentio configuration file 'sentio.toml' not found in any of these locations:\n{}\n\nSet SENTIO_CONFIG_PATH environment variable to specify custom location.",
        search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search
///   for a config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns an error if the config file is not found, contains invalid TOML,
/// or fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SentioConfig> {
    let config_file = if let Some(path) = config_path {
        path.to_path_buf()
    } else {
        find_config_file()?
    };

    let content = fs::read_to_string(&config_file)?;

    let mut config: SentioConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    // Apply overrides in order
    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    validate_config(&config)?;

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SENTIO_LOG_LEVEL` -> `system.log_level`
/// - `SENTIO_BACKEND` -> `backend.kind`
/// - `SENTIO_LOG_DIR` -> `logging.log_dir`
/// - `SENTIO_POLL_JOIN_WARN_SECS` -> `poll.join_warn_secs`
pub fn apply_environment_overrides(config: &mut SentioConfig) {
    if let Ok(value) = env::var("SENTIO_LOG_LEVEL") {
        config.system.log_level = value;
    }
    if let Ok(value) = env::var("SENTIO_BACKEND") {
        config.backend.kind = value;
    }
    if let Ok(value) = env::var("SENTIO_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("SENTIO_POLL_JOIN_WARN_SECS") {
        if let Ok(secs) = value.parse::<u64>() {
            config.poll.join_warn_secs = secs;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"backend": "dummy",
///   "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut SentioConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("backend") {
        config.backend.kind = value.clone();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = cli_args.get("join_warn_secs") {
        if let Ok(secs) = value.parse::<u64>() {
            config.poll.join_warn_secs = secs;
        }
    }
}
