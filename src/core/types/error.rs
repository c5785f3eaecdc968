//! Custom error types for memscan

use std::fmt;
use thiserror::Error;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Access denied to process {pid}: {reason}")]
    AccessDenied { pid: u32, reason: String },

    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Failed to write memory at {address}: {reason}")]
    WriteFailed { address: String, reason: String },

    #[error("Cannot convert '{value}' to {data_type}: {reason}")]
    Conversion {
        value: String,
        data_type: String,
        reason: String,
    },

    #[error("Read of {requested} bytes exceeds the {limit} byte limit")]
    ReadTooLarge { requested: usize, limit: usize },

    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("Unknown filter: {0}")]
    UnknownFilter(String),

    #[error("Filter '{0}' needs a comparison value")]
    MissingFilterValue(String),

    #[error("Failed to load table: {0}")]
    TableLoad(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("No process attached")]
    NotAttached,

    #[error("A scan is already in progress")]
    ScanInProgress,

    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApiError(#[from] windows::core::Error),

    #[error("Platform API: {0}")]
    PlatformApi(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates a new Windows API error with the last error code
    #[cfg(windows)]
    pub fn last_os_error() -> Self {
        MemoryError::WindowsApiError(windows::core::Error::from_win32())
    }

    /// Creates an access denied error for a process
    pub fn access_denied(pid: u32, reason: impl Into<String>) -> Self {
        MemoryError::AccessDenied {
            pid,
            reason: reason.into(),
        }
    }

    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::WriteFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a conversion error for a value that does not fit its declared type
    pub fn conversion(
        value: impl fmt::Display,
        data_type: impl fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        MemoryError::Conversion {
            value: value.to_string(),
            data_type: data_type.to_string(),
            reason: reason.into(),
        }
    }

    /// True when a capability could not be acquired for the target process
    pub fn is_attach_failure(&self) -> bool {
        matches!(
            self,
            MemoryError::ProcessNotFound(_) | MemoryError::AccessDenied { .. }
        )
    }

    /// True when a persisted table document could not be loaded
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            MemoryError::TableLoad(_) | MemoryError::UnknownDataType(_) | MemoryError::JsonError(_)
        )
    }
}
