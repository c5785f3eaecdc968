//! Process capability management
//!
//! A capability is anything that can read, write and query the address
//! space of one target process. `ProcessHandle` is the real OS-backed
//! capability; `SimulatedProcess` is an in-memory target with the same
//! surface.

pub mod handle;
pub mod simulated;

pub use handle::{ProcessAccess, ProcessHandle};
pub use simulated::SimulatedProcess;

use crate::core::types::{MemoryResult, ProcessId};
use crate::memory::regions::RegionDescriptor;
use std::fmt;
use std::sync::Arc;

/// OS-level primitives against a single target process.
///
/// Implementations report what the OS reports: `read_memory` and
/// `write_memory` return the number of bytes actually transferred, which
/// may be short. Exact-count semantics are layered on top by
/// [`MemoryPort`](crate::memory::MemoryPort).
pub trait ProcessMemory: Send + Sync + fmt::Debug {
    /// Identifier of the target process
    fn pid(&self) -> ProcessId;

    /// Reads into `buffer`, returning the byte count obtained
    fn read_memory(&self, address: usize, buffer: &mut [u8]) -> MemoryResult<usize>;

    /// Writes `data`, returning the byte count written
    fn write_memory(&self, address: usize, data: &[u8]) -> MemoryResult<usize>;

    /// Describes the region containing `address`.
    ///
    /// Fails once `address` is past the last region the OS knows about.
    fn query_region(&self, address: usize) -> MemoryResult<RegionDescriptor>;
}

/// Shared, type-erased capability
pub type Capability = Arc<dyn ProcessMemory>;

/// Opens a capability for `pid` with the combined session access rights
pub fn open(pid: ProcessId) -> MemoryResult<Capability> {
    let handle = ProcessHandle::open(pid)?;
    Ok(Arc::new(handle))
}
