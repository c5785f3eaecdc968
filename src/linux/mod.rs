//! Linux procfs backend
//!
//! Memory is accessed through `/proc/<pid>/mem` with positioned reads and
//! writes; region layout comes from `/proc/<pid>/maps`. Access is governed
//! by ptrace permissions, so an open that succeeds can still be refused on
//! the first read.

pub mod maps;

use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId};
use crate::memory::regions::RegionDescriptor;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::FileExt;
use std::path::PathBuf;

/// Open `/proc/<pid>/mem` file, closed on drop
#[derive(Debug)]
pub struct ProcMem {
    file: File,
    pid: ProcessId,
}

impl ProcMem {
    /// Opens the memory file of `pid` for reading and writing
    pub fn open(pid: ProcessId) -> MemoryResult<Self> {
        if pid == 0 {
            return Err(MemoryError::ProcessNotFound(format!("PID: {}", pid)));
        }

        let path = proc_path(pid, "mem");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| open_error(pid, e))?;
        Ok(ProcMem { file, pid })
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn read_at(&self, address: usize, buffer: &mut [u8]) -> MemoryResult<usize> {
        self.file
            .read_at(buffer, address as u64)
            .map_err(|e| MemoryError::read_failed(Address::new(address), e.to_string()))
    }

    pub fn write_at(&self, address: usize, data: &[u8]) -> MemoryResult<usize> {
        self.file
            .write_at(data, address as u64)
            .map_err(|e| MemoryError::write_failed(Address::new(address), e.to_string()))
    }

    /// Describes the mapping containing `address`, re-reading the maps file
    pub fn query(&self, address: usize) -> MemoryResult<RegionDescriptor> {
        maps::query(self.pid, address)
    }
}

pub(crate) fn proc_path(pid: ProcessId, entry: &str) -> PathBuf {
    PathBuf::from(format!("/proc/{}/{}", pid, entry))
}

pub(crate) fn open_error(pid: ProcessId, error: std::io::Error) -> MemoryError {
    match error.kind() {
        ErrorKind::NotFound => MemoryError::ProcessNotFound(format!("PID: {}", pid)),
        ErrorKind::PermissionDenied => MemoryError::access_denied(pid, error.to_string()),
        _ => MemoryError::IoError(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_mapping() {
        let not_found = open_error(5, std::io::Error::from(ErrorKind::NotFound));
        assert!(matches!(not_found, MemoryError::ProcessNotFound(_)));

        let denied = open_error(5, std::io::Error::from(ErrorKind::PermissionDenied));
        assert!(matches!(denied, MemoryError::AccessDenied { pid: 5, .. }));
        assert!(denied.is_attach_failure());
    }

    #[test]
    fn test_own_process_is_readable() {
        let own = ProcMem::open(std::process::id());
        // ptrace policy may forbid even self access in locked-down sandboxes
        if let Ok(mem) = own {
            let value: u64 = 0x1122_3344_5566_7788;
            let mut buf = [0u8; 8];
            let addr = &value as *const u64 as usize;
            if let Ok(count) = mem.read_at(addr, &mut buf) {
                assert_eq!(count, 8);
                assert_eq!(u64::from_ne_bytes(buf), value);
            }
        }
    }
}
