//! In-memory target process
//!
//! Behaves like a small OS address space: committed regions with page
//! protections, gaps that report as free, short reads at region ends, and
//! an external `poke` that models the target writing its own memory.

use super::ProcessMemory;
use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId};
use crate::memory::regions::{ProtectionFlags, RegionDescriptor, MEM_COMMIT, MEM_FREE};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct SimRegion {
    base: usize,
    bytes: Vec<u8>,
    protection: u32,
    state: u32,
}

impl SimRegion {
    fn end(&self) -> usize {
        self.base + self.bytes.len()
    }

    fn accessible(&self) -> bool {
        let flags = ProtectionFlags::new(self.protection);
        self.state == MEM_COMMIT && !flags.is_guard() && flags.base() != ProtectionFlags::PAGE_NOACCESS
    }
}

/// A fake process whose memory lives in this one
#[derive(Debug)]
pub struct SimulatedProcess {
    pid: ProcessId,
    regions: RwLock<Vec<SimRegion>>,
    failing: RwLock<HashSet<usize>>,
    writes: AtomicUsize,
}

impl SimulatedProcess {
    pub fn new(pid: ProcessId) -> Self {
        SimulatedProcess {
            pid,
            regions: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Adds a committed region holding `bytes`
    pub fn with_region(self, base: usize, bytes: Vec<u8>, protection: u32) -> Self {
        self.insert(SimRegion {
            base,
            bytes,
            protection,
            state: MEM_COMMIT,
        });
        self
    }

    /// Adds a zero-filled region with an explicit state
    pub fn with_region_state(self, base: usize, size: usize, protection: u32, state: u32) -> Self {
        self.insert(SimRegion {
            base,
            bytes: vec![0; size],
            protection,
            state,
        });
        self
    }

    /// Reads inside the region at `base` fail even though it reports readable
    pub fn with_failing_reads(self, base: usize) -> Self {
        self.set_read_failure(base, true);
        self
    }

    /// Toggles forced read failure for the region starting at `base`
    pub fn set_read_failure(&self, base: usize, failing: bool) {
        let mut set = self.failing.write().unwrap_or_else(|p| p.into_inner());
        if failing {
            set.insert(base);
        } else {
            set.remove(&base);
        }
    }

    /// Writes as the target itself would, ignoring protection
    pub fn poke(&self, address: usize, data: &[u8]) -> bool {
        let mut regions = self.regions_mut();
        match regions.iter_mut().find(|r| r.base <= address && address < r.end()) {
            Some(region) if address + data.len() <= region.end() => {
                let offset = address - region.base;
                region.bytes[offset..offset + data.len()].copy_from_slice(data);
                true
            }
            _ => false,
        }
    }

    /// Reads as the target itself would, ignoring protection
    pub fn peek(&self, address: usize, len: usize) -> Option<Vec<u8>> {
        let regions = self.regions();
        let region = regions.iter().find(|r| r.base <= address && address < r.end())?;
        if address + len > region.end() {
            return None;
        }
        let offset = address - region.base;
        Some(region.bytes[offset..offset + len].to_vec())
    }

    /// Number of successful `write_memory` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn insert(&self, region: SimRegion) {
        let mut regions = self.regions_mut();
        regions.push(region);
        regions.sort_by_key(|r| r.base);
    }

    fn regions(&self) -> RwLockReadGuard<'_, Vec<SimRegion>> {
        self.regions.read().unwrap_or_else(|p| p.into_inner())
    }

    fn regions_mut(&self) -> RwLockWriteGuard<'_, Vec<SimRegion>> {
        self.regions.write().unwrap_or_else(|p| p.into_inner())
    }

    fn is_failing(&self, base: usize) -> bool {
        self.failing
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&base)
    }
}

impl ProcessMemory for SimulatedProcess {
    fn pid(&self) -> ProcessId {
        self.pid
    }

    fn read_memory(&self, address: usize, buffer: &mut [u8]) -> MemoryResult<usize> {
        let regions = self.regions();
        let region = regions
            .iter()
            .find(|r| r.base <= address && address < r.end())
            .filter(|r| r.accessible() && !self.is_failing(r.base))
            .ok_or_else(|| MemoryError::read_failed(Address::new(address), "page not readable"))?;

        let offset = address - region.base;
        let count = buffer.len().min(region.end() - address);
        buffer[..count].copy_from_slice(&region.bytes[offset..offset + count]);
        Ok(count)
    }

    fn write_memory(&self, address: usize, data: &[u8]) -> MemoryResult<usize> {
        let mut regions = self.regions_mut();
        let region = regions
            .iter_mut()
            .find(|r| r.base <= address && address < r.end())
            .filter(|r| r.accessible() && ProtectionFlags::new(r.protection).is_writable())
            .ok_or_else(|| MemoryError::write_failed(Address::new(address), "page not writable"))?;

        let offset = address - region.base;
        let count = data.len().min(region.end() - address);
        region.bytes[offset..offset + count].copy_from_slice(&data[..count]);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(count)
    }

    fn query_region(&self, address: usize) -> MemoryResult<RegionDescriptor> {
        let regions = self.regions();

        if let Some(region) = regions.iter().find(|r| r.base <= address && address < r.end()) {
            return Ok(RegionDescriptor {
                base_address: Address::new(address),
                size: region.end() - address,
                state: region.state,
                protection: region.protection,
            });
        }

        match regions.iter().find(|r| r.base > address) {
            Some(next) => Ok(RegionDescriptor {
                base_address: Address::new(address),
                size: next.base - address,
                state: MEM_FREE,
                protection: ProtectionFlags::PAGE_NOACCESS,
            }),
            None => Err(MemoryError::InvalidAddress(format!(
                "{} is past the last region",
                Address::new(address)
            ))),
        }
    }
}
