//! Default configuration values for memscan

use serde::{Deserialize, Serialize};

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub memory: MemoryDefaults,
    pub freeze: FreezeDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub parallel: bool,
    pub max_threads: usize,
}

/// Default memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub address_ceiling: usize,
    pub string_read_length: usize,
    pub max_read_size: usize,
}

/// Default freeze loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeDefaults {
    pub interval_ms: u64,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            parallel: true,
            max_threads: num_cpus::get().min(8),
        },
        memory: MemoryDefaults {
            address_ceiling: 0x7FFF_FFFF_0000,
            string_read_length: 256,
            max_read_size: 10485760,
        },
        freeze: FreezeDefaults { interval_ms: 100 },
        logging: LoggingDefaults {
            level: "info".to_string(),
        },
    }
}
