//! Windows backend
//!
//! Memory goes through `ReadProcessMemory`/`WriteProcessMemory` and the
//! region layout through `VirtualQueryEx`, all on one handle opened with
//! the session's combined access mask. Every unsafe call lives in
//! [`kernel32`].

mod kernel32;

use crate::core::types::{MemoryResult, ProcessId};
use crate::memory::regions::RegionDescriptor;
use std::fmt;
use winapi::um::winnt::HANDLE;

/// Open process handle, closed exactly once on drop
pub struct WinProcess {
    handle: HANDLE,
    pid: ProcessId,
}

// A process HANDLE is an index into the kernel handle table; any thread of
// this process may use it concurrently.
unsafe impl Send for WinProcess {}
unsafe impl Sync for WinProcess {}

impl WinProcess {
    /// Opens `pid` requesting every right in `access` at once
    pub fn open(pid: ProcessId, access: u32) -> MemoryResult<Self> {
        let handle = kernel32::open(pid, access)?;
        Ok(WinProcess { handle, pid })
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn read_at(&self, address: usize, buffer: &mut [u8]) -> MemoryResult<usize> {
        unsafe { kernel32::read(self.handle, address, buffer) }
    }

    pub fn write_at(&self, address: usize, data: &[u8]) -> MemoryResult<usize> {
        unsafe { kernel32::write(self.handle, address, data) }
    }

    pub fn query(&self, address: usize) -> MemoryResult<RegionDescriptor> {
        unsafe { kernel32::query(self.handle, address) }
    }
}

impl Drop for WinProcess {
    fn drop(&mut self) {
        if !unsafe { kernel32::close(self.handle) } {
            tracing::debug!(pid = self.pid, "CloseHandle failed");
        }
    }
}

impl fmt::Debug for WinProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WinProcess")
            .field("pid", &self.pid)
            .field("handle", &self.handle)
            .finish()
    }
}
