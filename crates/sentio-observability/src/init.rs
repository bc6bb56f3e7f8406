// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Unified logging initialization for Sentio
//!
//! Console logging is always available; the `file-logging` feature adds
//! per-crate log files with daily rotation and configurable retention.

use std::path::PathBuf;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;
use crate::config::ObservabilityConfig;

#[cfg(feature = "file-logging")]
use {
    anyhow::Context,
    chrono::Utc,
    std::path::Path,
    tracing_appender::rolling,
    tracing_subscriber::layer::SubscriberExt,
    tracing_subscriber::util::SubscriberInitExt,
    tracing_subscriber::{Layer, Registry},
};

/// Logging initialization result
///
/// Keep this alive for the lifetime of the process; dropping it flushes and
/// closes the non-blocking file writers.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Log directory for this run, when file logging is active
    pub fn log_dir(&self) -> Option<&PathBuf> {
        self.log_dir.as_ref()
    }
}

/// Initialize console-only logging
///
/// Builds the `EnvFilter` from the per-crate debug flags and installs a
/// human-readable fmt subscriber. Safe to call when a subscriber is already
/// installed (returns Ok without replacing it), which keeps test binaries
/// happy.
pub fn init_console_logging(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    install_console_subscriber(debug_flags.to_filter_string())
}

/// Initialize console logging with the configured base level
///
/// Crates with a debug flag log at debug; everything else at
/// `config.logging.level`.
pub fn init_with_config(
    config: &ObservabilityConfig,
    debug_flags: &CrateDebugFlags,
) -> Result<LoggingGuard> {
    install_console_subscriber(debug_flags.to_filter_string_with_base(&config.logging.level))
}

fn install_console_subscriber(filter: String) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::new(filter);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    Ok(LoggingGuard {
        #[cfg(feature = "file-logging")]
        _file_guards: Vec::new(),
        log_dir: None,
    })
}

/// Initialize logging with file output and console output
///
/// Creates a timestamped folder structure:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       ├── sentio-registry.log
///       ├── sentio-engine.log
///       ├── sentio-config.log
///       └── sentio.log (combined)
/// ```
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `log_dir` - Base directory for logs (default: `./logs`)
/// * `retention_days` - Keep logs for N days (default: 30)
/// * `retention_runs` - Keep N most recent runs (default: 10)
#[cfg(feature = "file-logging")]
pub fn init_logging(
    debug_flags: &CrateDebugFlags,
    log_dir: Option<PathBuf>,
    retention_days: Option<u64>,
    retention_runs: Option<usize>,
) -> Result<LoggingGuard> {
    let base_log_dir = log_dir.unwrap_or_else(|| PathBuf::from("./logs"));

    // Create timestamped run folder
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;

    // Clean up old logs based on retention policy
    cleanup_old_logs(&base_log_dir, retention_days, retention_runs)?;

    let filter = debug_flags.to_filter_string();
    let env_filter = EnvFilter::new(&filter);

    let mut layers = Vec::new();
    let mut file_guards = Vec::new();

    // Console layer (human-readable)
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(EnvFilter::new(&filter))
        .boxed();
    layers.push(console_layer);

    // File layers - one per crate
    for crate_name in crate::KNOWN_CRATES {
        let file_appender = rolling::daily(&run_folder, format!("{}.log", crate_name));
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guards.push(guard);

        let target = crate_name.replace('-', "_");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            // Filter only this crate's logs
            .with_filter(EnvFilter::new(format!("{}=debug", target)))
            .boxed();
        layers.push(file_layer);
    }

    // Combined log file (all crates)
    let combined_appender = rolling::daily(&run_folder, "sentio.log");
    let (combined_non_blocking, combined_guard) = tracing_appender::non_blocking(combined_appender);
    file_guards.push(combined_guard);

    let combined_layer = tracing_subscriber::fmt::layer()
        .with_writer(combined_non_blocking)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .json()
        .with_filter(env_filter)
        .boxed();
    layers.push(combined_layer);

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        log_dir: Some(run_folder),
    })
}

/// Remove run folders beyond the retention policy
#[cfg(feature = "file-logging")]
fn cleanup_old_logs(
    base_log_dir: &Path,
    retention_days: Option<u64>,
    retention_runs: Option<usize>,
) -> Result<()> {
    use std::time::{Duration, SystemTime};

    let retention_days = retention_days.unwrap_or(30);
    let retention_runs = retention_runs.unwrap_or(10);

    let entries = match std::fs::read_dir(base_log_dir) {
        Ok(entries) => entries,
        Err(_) => return Ok(()), // Nothing to clean yet
    };

    let mut run_folders: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with("run_"))
        })
        .collect();

    // Folder names embed the timestamp, so lexical order is age order.
    run_folders.sort();

    // Keep the N most recent runs
    let excess = run_folders.len().saturating_sub(retention_runs);
    for folder in run_folders.drain(..excess) {
        let _ = std::fs::remove_dir_all(&folder);
    }

    // Drop whatever remains past the age limit
    let cutoff = SystemTime::now() - Duration::from_secs(retention_days * 24 * 60 * 60);
    for folder in run_folders {
        let too_old = std::fs::metadata(&folder)
            .and_then(|meta| meta.modified())
            .map(|modified| modified < cutoff)
            .unwrap_or(false);
        if too_old {
            let _ = std::fs::remove_dir_all(&folder);
        }
    }

    Ok(())
}
