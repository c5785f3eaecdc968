//! Raw kernel32 calls used by [`WinProcess`](super::WinProcess)
//!
//! Each function is a single FFI call plus error translation. Callers own
//! the handle and guarantee it stays open for the duration of the call.

use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId};
use crate::memory::regions::RegionDescriptor;
use std::mem;
use winapi::shared::minwindef::{FALSE, LPCVOID, LPVOID};
use winapi::shared::winerror::{ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION};

/// Opens `pid` with exactly `access`; never returns a null handle
pub(super) fn open(pid: ProcessId, access: u32) -> MemoryResult<HANDLE> {
    let handle = unsafe { OpenProcess(access, FALSE, pid) };
    if !handle.is_null() {
        return Ok(handle);
    }

    match unsafe { GetLastError() } {
        ERROR_ACCESS_DENIED => Err(MemoryError::access_denied(pid, "OpenProcess refused access")),
        ERROR_INVALID_PARAMETER => Err(MemoryError::ProcessNotFound(format!("PID: {}", pid))),
        _ => Err(MemoryError::last_os_error()),
    }
}

/// # Safety
/// `handle` must be open and not closed again afterwards
pub(super) unsafe fn close(handle: HANDLE) -> bool {
    CloseHandle(handle) != FALSE
}

/// Copies from the target into `buffer`; a partial copy is not an error.
///
/// # Safety
/// `handle` must be an open process handle
pub(super) unsafe fn read(handle: HANDLE, address: usize, buffer: &mut [u8]) -> MemoryResult<usize> {
    let mut copied = 0;
    let ok = ReadProcessMemory(
        handle,
        address as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut copied,
    );

    if ok == FALSE && copied == 0 {
        return Err(MemoryError::read_failed(
            Address::new(address),
            format!("ReadProcessMemory error {}", GetLastError()),
        ));
    }
    Ok(copied)
}

/// # Safety
/// `handle` must be an open process handle
pub(super) unsafe fn write(handle: HANDLE, address: usize, data: &[u8]) -> MemoryResult<usize> {
    let mut copied = 0;
    let ok = WriteProcessMemory(
        handle,
        address as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut copied,
    );

    if ok == FALSE && copied == 0 {
        return Err(MemoryError::write_failed(
            Address::new(address),
            format!("WriteProcessMemory error {}", GetLastError()),
        ));
    }
    Ok(copied)
}

/// Fails once `address` is past the highest user-mode region.
///
/// # Safety
/// `handle` must be an open process handle
pub(super) unsafe fn query(handle: HANDLE, address: usize) -> MemoryResult<RegionDescriptor> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();
    let written = VirtualQueryEx(
        handle,
        address as LPCVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );
    if written == 0 {
        return Err(MemoryError::PlatformApi(format!(
            "VirtualQueryEx failed at {}",
            Address::new(address)
        )));
    }
    Ok(descriptor(&mbi))
}

fn descriptor(mbi: &MEMORY_BASIC_INFORMATION) -> RegionDescriptor {
    RegionDescriptor {
        base_address: Address::new(mbi.BaseAddress as usize),
        size: mbi.RegionSize,
        state: mbi.State,
        protection: mbi.Protect,
    }
}
