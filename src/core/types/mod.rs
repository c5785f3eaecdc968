//! Core type definitions for memscan
//!
//! This module contains all fundamental types used throughout the crate,
//! including address wrappers, the data type catalogue, semantic values,
//! scan results, process information, and error types.

mod address;
mod data_type;
mod error;
mod process_info;
mod scan_result;
mod value;

// Re-export all public types
pub use address::Address;
pub use data_type::DataType;
pub use error::{MemoryError, MemoryResult};
pub use process_info::ProcessInfo;
pub use scan_result::{ScanResult, SharedResult};
pub use value::Value;

// Common type aliases
pub type ProcessId = u32;
pub type Size = usize;
