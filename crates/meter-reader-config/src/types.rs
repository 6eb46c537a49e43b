// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! Each struct maps to a section of `meter_reader.toml`. Every section is
//! optional; missing keys take the defaults below.

use std::path::PathBuf;

use meter_reader_runtime::{ArenaConfig, ArenaPlacement, DEFAULT_ARENA_SIZE};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MeterReaderConfig {
    pub model: ModelConfig,
    pub arena: ArenaSection,
    pub host: HostConfig,
    pub logging: LoggingConfig,
}

impl MeterReaderConfig {
    /// Arena settings in the form the runtime consumes
    ///
    /// # Errors
    /// `InvalidValue` when the placement name is not recognized.
    pub fn arena_config(&self) -> ConfigResult<ArenaConfig> {
        let placement = self.arena.placement.parse::<ArenaPlacement>().map_err(|e| {
            let value = &self.arena.placement;
            ConfigError::InvalidValue(format!("arena.placement = {:?}: {}", value, e))
        })?;
        Ok(ArenaConfig {
            size_bytes: self.arena.size_bytes,
            placement,
        })
    }
}

/// Model asset location
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the `.tflite` file (host tooling only; devices embed the model)
    pub path: PathBuf,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("model.tflite"),
        }
    }
}

/// Tensor arena sizing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ArenaSection {
    /// Bytes requested for the arena
    pub size_bytes: usize,
    /// `heap`, `internal` or `prefer-internal`
    pub placement: String,
}

impl Default for ArenaSection {
    fn default() -> Self {
        Self {
            size_bytes: DEFAULT_ARENA_SIZE,
            placement: ArenaPlacement::default().to_string(),
        }
    }
}

/// Simulated memory budgets for the host platform
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HostConfig {
    /// General-purpose heap (PSRAM included)
    pub heap_bytes: usize,
    /// Internal RAM
    pub internal_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            heap_bytes: 4 * 1024 * 1024,
            internal_bytes: 320 * 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level: trace, debug, info, warn, error or off
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MeterReaderConfig::default();
        assert_eq!(config.arena.size_bytes, DEFAULT_ARENA_SIZE);
        assert_eq!(config.arena.placement, "heap");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.arena_config().unwrap(), ArenaConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: MeterReaderConfig = toml::from_str(
            r#"
            [arena]
            size_bytes = 102400
            placement = "prefer-internal"
            "#,
        )
        .unwrap();
        assert_eq!(config.arena.size_bytes, 102_400);
        assert_eq!(config.model, ModelConfig::default());
        assert_eq!(
            config.arena_config().unwrap().placement,
            ArenaPlacement::PreferInternal
        );
    }

    #[test]
    fn test_unknown_placement() {
        let mut config = MeterReaderConfig::default();
        config.arena.placement = "psram".to_string();
        assert!(matches!(
            config.arena_config(),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_json_round_trip_shape() {
        let json = serde_json::to_value(MeterReaderConfig::default()).unwrap();
        assert_eq!(json["arena"]["placement"], "heap");
        assert_eq!(json["host"]["internal_bytes"], 320 * 1024);
    }
}
