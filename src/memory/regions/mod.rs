//! Memory region discovery for an attached process
//!
//! Regions are discovered by walking the address space from zero with
//! [`ProcessMemory::query_region`](crate::process::ProcessMemory::query_region)
//! and keeping only committed, readable, unguarded ones.

pub mod enumerator;
pub mod protection;

pub use enumerator::{enumerate, RegionEnumerator, DEFAULT_ADDRESS_CEILING};
pub use protection::{qualifies, ProtectionFlags, MEM_COMMIT, MEM_FREE, MEM_RESERVE};

use crate::core::types::Address;
use serde::Serialize;
use std::fmt;

/// Raw answer to "what is at this address", before any qualification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub base_address: Address,
    pub size: usize,
    pub state: u32,
    pub protection: u32,
}

impl RegionDescriptor {
    pub fn qualifies(&self) -> bool {
        qualifies(self.state, self.protection)
    }
}

/// A contiguous range with uniform protection and commit state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub base_address: Address,
    pub size: usize,
    pub protection: u32,
    pub state: u32,
}

impl MemoryRegion {
    pub fn new(base_address: Address, size: usize, protection: u32, state: u32) -> Self {
        MemoryRegion {
            base_address,
            size,
            protection,
            state,
        }
    }

    /// Get the end address of the region
    pub fn end_address(&self) -> Address {
        self.base_address.saturating_add(self.size)
    }

    /// Check if an address is within this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }

    pub fn is_committed(&self) -> bool {
        self.state == MEM_COMMIT
    }

    pub fn is_readable(&self) -> bool {
        ProtectionFlags::new(self.protection).is_readable()
    }

    pub fn is_guarded(&self) -> bool {
        ProtectionFlags::new(self.protection).is_guard()
    }
}

impl From<RegionDescriptor> for MemoryRegion {
    fn from(d: RegionDescriptor) -> Self {
        MemoryRegion::new(d.base_address, d.size, d.protection, d.state)
    }
}

impl fmt::Display for MemoryRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} {:>10} bytes {}",
            self.base_address,
            self.end_address(),
            self.size,
            ProtectionFlags::new(self.protection)
        )
    }
}

/// Sum of region sizes, the denominator of scan progress
pub fn total_size(regions: &[MemoryRegion]) -> u64 {
    regions.iter().map(|r| r.size as u64).sum()
}
