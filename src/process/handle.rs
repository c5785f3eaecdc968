//! OS process handle with RAII semantics

use super::ProcessMemory;
use crate::core::types::{MemoryResult, ProcessId};
use crate::memory::regions::RegionDescriptor;
use std::fmt;
use tracing::{debug, info};

#[cfg(target_os = "linux")]
use crate::linux::ProcMem as Platform;
#[cfg(windows)]
use crate::windows::WinProcess as Platform;

/// Access rights for process handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessAccess {
    value: u32,
}

impl ProcessAccess {
    /// Query information access
    pub const QUERY_INFORMATION: Self = Self { value: 0x0400 };
    /// Read memory access
    pub const VM_READ: Self = Self { value: 0x0010 };
    /// Write memory access
    pub const VM_WRITE: Self = Self { value: 0x0020 };
    /// Address space operations
    pub const VM_OPERATION: Self = Self { value: 0x0008 };

    /// Everything an attached session needs, requested in one call
    pub const SESSION: Self = Self {
        value: 0x0400 | 0x0010 | 0x0020 | 0x0008,
    };

    /// Combine access rights
    pub fn combine(rights: &[Self]) -> Self {
        let value = rights.iter().fold(0, |acc, right| acc | right.value);
        Self { value }
    }

    /// Get raw value
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn contains(&self, other: Self) -> bool {
        self.value & other.value == other.value
    }
}

/// Capability bound to one live process.
///
/// Acquisition is all-or-nothing: either every right in
/// [`ProcessAccess::SESSION`] is granted or `open` fails. The OS handle is
/// released when the value is closed or dropped, so a handle can only be
/// closed once.
pub struct ProcessHandle {
    inner: Platform,
    pid: ProcessId,
    access: ProcessAccess,
}

impl ProcessHandle {
    /// Opens `pid` with the combined session access rights
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        let access = ProcessAccess::SESSION;
        let inner = open_platform(pid, access)?;
        info!(pid, access = access.value(), "opened process");
        Ok(ProcessHandle { inner, pid, access })
    }

    /// Releases the handle
    pub fn close(self) {
        debug!(pid = self.pid, "closing process handle");
        drop(self);
    }

    pub fn access(&self) -> ProcessAccess {
        self.access
    }
}

#[cfg(windows)]
fn open_platform(pid: ProcessId, access: ProcessAccess) -> MemoryResult<Platform> {
    Platform::open(pid, access.value())
}

// procfs has no access mask; ptrace permission decides everything
#[cfg(target_os = "linux")]
fn open_platform(pid: ProcessId, _access: ProcessAccess) -> MemoryResult<Platform> {
    Platform::open(pid)
}

impl ProcessMemory for ProcessHandle {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_memory(&self, address: usize, buffer: &mut [u8]) -> MemoryResult<usize> {
        self.inner.read_at(address, buffer)
    }

    fn write_memory(&self, address: usize, data: &[u8]) -> MemoryResult<usize> {
        self.inner.write_at(address, data)
    }

    fn query_region(&self, address: usize) -> MemoryResult<RegionDescriptor> {
        self.inner.query(address)
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.pid)
            .field("access", &format!("0x{:X}", self.access.value()))
            .finish()
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessHandle(pid={})", self.pid)
    }
}
