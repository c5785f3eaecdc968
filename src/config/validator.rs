//! Configuration validator for memscan
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::loader::{Config, ConfigError, FreezeConfig, LoggingConfig, MemoryConfig, ScannerConfig};

/// Accepted `logging.level` values
pub const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_memory(&config.memory)?;
        Self::validate_freeze(&config.freeze)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.max_threads == 0 {
            return Err(ConfigError::Invalid(
                "Scanner threads must be at least 1".to_string(),
            ));
        }

        if scanner.max_threads > 128 {
            return Err(ConfigError::Invalid(
                "Scanner threads cannot exceed 128".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.address_ceiling == 0 {
            return Err(ConfigError::Invalid(
                "Address ceiling must be greater than 0".to_string(),
            ));
        }

        if memory.string_read_length == 0 {
            return Err(ConfigError::Invalid(
                "String read length must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size == 0 {
            return Err(ConfigError::Invalid(
                "Max read size must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size > 104857600 {
            return Err(ConfigError::Invalid(
                "Max read size cannot exceed 100MB".to_string(),
            ));
        }

        if memory.string_read_length > memory.max_read_size {
            return Err(ConfigError::Invalid(format!(
                "String read length {} exceeds max read size {}",
                memory.string_read_length, memory.max_read_size
            )));
        }

        Ok(())
    }

    fn validate_freeze(freeze: &FreezeConfig) -> Result<(), ConfigError> {
        if !(10..=1000).contains(&freeze.interval_ms) {
            return Err(ConfigError::Invalid(format!(
                "Freeze interval must be between 10 and 1000 ms, got {}",
                freeze.interval_ms
            )));
        }

        Ok(())
    }

    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, LOG_LEVELS
            )));
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
