//! Core module containing fundamental types and the value codec
//!
//! This module provides the foundational building blocks used throughout
//! memscan: addresses, the data type catalogue, semantic values, scan
//! results, process descriptors, error types, and byte-exact encoding.

pub mod codec;
pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, DataType, MemoryError, MemoryResult, ProcessId, ProcessInfo, ScanResult,
    SharedResult, Value,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

// Platform verification at compile time
#[cfg(not(any(target_os = "windows", target_os = "linux")))]
compile_error!("memscan supports Windows and Linux targets only");

#[cfg(not(target_pointer_width = "64"))]
compile_error!("memscan requires 64-bit architecture");
