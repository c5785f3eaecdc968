//! memscan library: external process memory scanning, filtering and freezing

pub mod cli;
pub mod config;
pub mod core;
pub mod memory;
pub mod process;
pub mod scripting;
pub mod session;
pub mod table;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use core::types::{
    Address, DataType, MemoryError, MemoryResult, ProcessId, ProcessInfo, ScanResult,
    SharedResult, Value,
};

pub use memory::{FilterKind, MemoryPort, MemoryRegion, MemoryScanner, ScanOptions, TrackedList};
pub use process::{Capability, ProcessMemory, SimulatedProcess};
pub use session::Controller;
