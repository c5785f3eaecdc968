//! Configuration loader for memscan
//!
//! Handles loading configuration from TOML files and merging with defaults.

use super::defaults::default_config;
use crate::memory::ScanOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name looked up when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "memscan.toml";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_scanner")]
    pub scanner: ScannerConfig,

    #[serde(default = "default_memory")]
    pub memory: MemoryConfig,

    #[serde(default = "default_freeze")]
    pub freeze: FreezeConfig,

    #[serde(default = "default_logging")]
    pub logging: LoggingConfig,
}

/// Scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
}

/// Memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_address_ceiling")]
    pub address_ceiling: usize,
    #[serde(default = "default_string_read_length")]
    pub string_read_length: usize,
    #[serde(default = "default_max_read_size")]
    pub max_read_size: usize,
}

/// Freeze loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Config {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            parallel: self.scanner.parallel,
            max_threads: self.scanner.max_threads,
        }
    }

    pub fn freeze_interval(&self) -> Duration {
        Duration::from_millis(self.freeze.interval_ms)
    }
}

/// Configuration loader
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        ConfigLoader {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Loads configuration from file
    pub fn load(&self) -> Result<Config, ConfigError> {
        if !self.config_path.exists() {
            return Err(ConfigError::FileNotFound(
                self.config_path.display().to_string(),
            ));
        }

        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration, falling back to defaults only when the file is absent
    pub fn load_or_default(&self) -> Result<Config, ConfigError> {
        match self.load() {
            Err(ConfigError::FileNotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Saves configuration to file
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Loads configuration from the default location
pub fn load_config() -> Result<Config, ConfigError> {
    ConfigLoader::new(DEFAULT_CONFIG_FILE).load_or_default()
}

// Default functions for serde
fn default_scanner() -> ScannerConfig {
    let defaults = default_config();
    ScannerConfig {
        parallel: defaults.scanner.parallel,
        max_threads: defaults.scanner.max_threads,
    }
}

fn default_memory() -> MemoryConfig {
    let defaults = default_config();
    MemoryConfig {
        address_ceiling: defaults.memory.address_ceiling,
        string_read_length: defaults.memory.string_read_length,
        max_read_size: defaults.memory.max_read_size,
    }
}

fn default_freeze() -> FreezeConfig {
    FreezeConfig {
        interval_ms: default_config().freeze.interval_ms,
    }
}

fn default_logging() -> LoggingConfig {
    LoggingConfig {
        level: default_config().logging.level,
    }
}

// Individual field defaults
fn default_parallel() -> bool {
    default_config().scanner.parallel
}

fn default_max_threads() -> usize {
    default_config().scanner.max_threads
}

fn default_address_ceiling() -> usize {
    default_config().memory.address_ceiling
}

fn default_string_read_length() -> usize {
    default_config().memory.string_read_length
}

fn default_max_read_size() -> usize {
    default_config().memory.max_read_size
}

fn default_interval_ms() -> u64 {
    default_config().freeze.interval_ms
}

fn default_log_level() -> String {
    default_config().logging.level
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scanner: default_scanner(),
            memory: default_memory(),
            freeze: default_freeze(),
            logging: default_logging(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.scanner.max_threads > 0);
        assert_eq!(config.freeze_interval(), Duration::from_millis(100));
        assert_eq!(config.scan_options().parallel, config.scanner.parallel);
    }

    #[test]
    fn test_load_missing_file() {
        let loader = ConfigLoader::new("nonexistent-memscan.toml");
        assert!(matches!(loader.load(), Err(ConfigError::FileNotFound(_))));
        assert!(loader.load_or_default().is_ok());
    }

    #[test]
    fn test_malformed_file_is_not_defaulted() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[freeze\ninterval_ms = ").unwrap();

        let loader = ConfigLoader::new(&path);
        assert!(matches!(loader.load_or_default(), Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("memscan.toml");

        let mut config = Config::default();
        config.freeze.interval_ms = 250;
        let loader = ConfigLoader::new(&config_path);

        loader.save(&config).unwrap();
        assert!(config_path.exists());

        let loaded = loader.load().unwrap();
        assert_eq!(loaded.freeze.interval_ms, 250);
        assert_eq!(loaded.memory.address_ceiling, config.memory.address_ceiling);
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
            [scanner]
            parallel = false

            [memory]
            string_read_length = 64
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.scanner.parallel);
        assert_eq!(config.memory.string_read_length, 64);
        assert_eq!(config.memory.max_read_size, 10485760);
        // Check defaults are applied
        assert!(config.scanner.max_threads > 0);
        assert_eq!(config.freeze.interval_ms, 100);
        assert_eq!(config.logging.level, "info");
    }
}
