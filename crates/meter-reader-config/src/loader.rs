// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! Three tiers, later ones win:
//! 1. TOML file (base values)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, MeterReaderConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no path is given
pub const CONFIG_FILE_NAME: &str = "meter_reader.toml";

/// Find the configuration file
///
/// Search order:
/// 1. `METER_READER_CONFIG_PATH` environment variable
/// 2. Current working directory
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("METER_READER_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by METER_READER_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(path) = search_paths.iter().find(|p| p.exists()) {
        return Ok(path.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet METER_READER_CONFIG_PATH to specify a custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if the config file is not found or contains invalid TOML.
/// Values are not validated here; see [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<MeterReaderConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: MeterReaderConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `METER_READER_MODEL_PATH` -> `model.path`
/// - `METER_READER_ARENA_SIZE` -> `arena.size_bytes`
/// - `METER_READER_ARENA_PLACEMENT` -> `arena.placement`
/// - `METER_READER_LOG_LEVEL` -> `logging.level`
///
/// Unparseable numbers are ignored and the file value is kept.
pub fn apply_environment_overrides(config: &mut MeterReaderConfig) {
    if let Ok(value) = env::var("METER_READER_MODEL_PATH") {
        config.model.path = PathBuf::from(value);
    }
    if let Ok(value) = env::var("METER_READER_ARENA_SIZE") {
        if let Ok(size) = value.trim().parse::<usize>() {
            config.arena.size_bytes = size;
        }
    }
    if let Ok(value) = env::var("METER_READER_ARENA_PLACEMENT") {
        config.arena.placement = value;
    }
    if let Ok(value) = env::var("METER_READER_LOG_LEVEL") {
        config.logging.level = value;
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - CLI arguments (e.g., `{"arena_size": "102400", "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut MeterReaderConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("model_path") {
        config.model.path = PathBuf::from(value);
    }
    if let Some(value) = cli_args.get("arena_size") {
        if let Ok(size) = value.trim().parse::<usize>() {
            config.arena.size_bytes = size;
        }
    }
    if let Some(value) = cli_args.get("arena_placement") {
        config.arena.placement = value.clone();
    }
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
}
