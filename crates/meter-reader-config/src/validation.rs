// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Checks that values are in range and consistent with each other. All
//! problems are collected and reported together.

use meter_reader_runtime::ArenaPlacement;

use crate::{ConfigError, ConfigResult, MeterReaderConfig};

/// Levels accepted by `logging.level`
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - A non-zero arena size and a known placement
/// - A model path
/// - Host budgets able to hold the arena under the chosen placement
/// - A known log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &MeterReaderConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

/// Every validation problem in `config`
pub fn collect_errors(config: &MeterReaderConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    validate_arena(config, &mut errors);
    validate_model(config, &mut errors);
    validate_logging(config, &mut errors);
    errors
}

fn validate_arena(config: &MeterReaderConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.arena.size_bytes == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "arena.size_bytes".to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }

    let placement = match config.arena.placement.parse::<ArenaPlacement>() {
        Ok(placement) => placement,
        Err(e) => {
            errors.push(ConfigValidationError::InvalidValue {
                field: "arena.placement".to_string(),
                reason: format!("{:?}: {}", config.arena.placement, e),
            });
            return;
        }
    };

    let budget = match placement {
        ArenaPlacement::Heap => config.host.heap_bytes,
        ArenaPlacement::InternalOnly => config.host.internal_bytes,
        ArenaPlacement::PreferInternal => config.host.heap_bytes.max(config.host.internal_bytes),
    };
    if config.arena.size_bytes > budget {
        errors.push(ConfigValidationError::InvalidValue {
            field: "arena.size_bytes".to_string(),
            reason: format!(
                "{} bytes exceeds the host {} budget of {} bytes",
                config.arena.size_bytes, placement, budget
            ),
        });
    }
}

fn validate_model(config: &MeterReaderConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.model.path.as_os_str().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "model.path".to_string(),
        });
    }
}

fn validate_logging(config: &MeterReaderConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("{:?} is not one of {}", config.logging.level, LOG_LEVELS.join(", ")),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MeterReaderConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_arena_rejected() {
        let mut config = MeterReaderConfig::default();
        config.arena.size_bytes = 0;
        let errors = collect_errors(&config);
        assert_eq!(
            errors,
            vec![ConfigValidationError::InvalidValue {
                field: "arena.size_bytes".to_string(),
                reason: "must be greater than 0".to_string(),
            }]
        );
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_arena_larger_than_internal_budget() {
        let mut config = MeterReaderConfig::default();
        config.arena.placement = "internal".to_string();
        config.arena.size_bytes = config.host.internal_bytes + 1;
        assert_eq!(collect_errors(&config).len(), 1);

        config.arena.placement = "prefer-internal".to_string();
        assert!(collect_errors(&config).is_empty());
    }

    #[test]
    fn test_all_errors_reported_together() {
        let mut config = MeterReaderConfig::default();
        config.arena.placement = "flash".to_string();
        config.model.path = Default::default();
        config.logging.level = "verbose".to_string();

        let errors = collect_errors(&config);
        assert_eq!(errors.len(), 3);

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("arena.placement"));
        assert!(message.contains("model.path"));
        assert!(message.contains("logging.level"));
    }
}
