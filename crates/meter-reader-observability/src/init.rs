// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Console logging initialization
//!
//! Installs a `tracing-subscriber` formatter with an `EnvFilter` built from
//! the debug flags. `log` records from the no_std crates are bridged into the
//! same subscriber.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::CrateDebugFlags;

/// Logging initialization failures
#[derive(Debug, thiserror::Error)]
pub enum ObservabilityError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("A global logger is already installed")]
    AlreadyInitialized,
}

/// Build the filter for `debug_flags` on top of `default_level`
///
/// # Errors
/// `InvalidFilter` when `default_level` is not a valid directive.
pub fn build_filter(
    debug_flags: &CrateDebugFlags,
    default_level: &str,
) -> Result<EnvFilter, ObservabilityError> {
    let filter = debug_flags.to_filter_string(&default_level.to_ascii_lowercase());
    EnvFilter::try_new(&filter).map_err(|e| ObservabilityError::InvalidFilter {
        filter,
        reason: e.to_string(),
    })
}

/// Initialize console logging
///
/// # Arguments
/// * `debug_flags` - Per-crate debug flags for filtering
/// * `default_level` - Level for everything not named in `debug_flags`
///
/// # Errors
/// Fails on an invalid level or when a global subscriber already exists.
pub fn init_logging(debug_flags: &CrateDebugFlags, default_level: &str) -> Result<()> {
    let filter = build_filter(debug_flags, default_level).context("Failed to build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug_flags.any_enabled())
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|_| ObservabilityError::AlreadyInitialized)
        .context("Failed to install log subscriber")?;

    for name in debug_flags.unknown_crates() {
        tracing::warn!("Debug flag names unknown crate: {}", name);
    }

    Ok(())
}
