//! Address-space walk

use super::{MemoryRegion, RegionDescriptor};
use crate::core::types::Address;
use crate::process::ProcessMemory;
use tracing::debug;

/// Highest user-mode address walked by default
pub const DEFAULT_ADDRESS_CEILING: usize = 0x7FFF_FFFF_0000;

/// Walks the address space of one process, yielding qualifying regions.
///
/// The cursor starts at zero and advances by each reported region size. The
/// walk ends on a failed query, a zero-size report, cursor overflow, or on
/// reaching the ceiling. Non-qualifying regions still advance the cursor.
pub struct RegionEnumerator<'a> {
    process: &'a dyn ProcessMemory,
    cursor: usize,
    ceiling: usize,
    done: bool,
}

impl<'a> RegionEnumerator<'a> {
    pub fn new(process: &'a dyn ProcessMemory, ceiling: usize) -> Self {
        RegionEnumerator {
            process,
            cursor: 0,
            ceiling,
            done: false,
        }
    }

    /// Queries the next descriptor and moves the cursor past it
    fn step(&mut self) -> Option<RegionDescriptor> {
        if self.done || self.cursor >= self.ceiling {
            return None;
        }

        let descriptor = match self.process.query_region(self.cursor) {
            Ok(d) => d,
            Err(e) => {
                debug!(cursor = %Address::new(self.cursor), error = %e, "region walk ended");
                return None;
            }
        };

        if descriptor.size == 0 {
            debug!(cursor = %Address::new(self.cursor), "zero-size region, stopping walk");
            return None;
        }

        match self.cursor.checked_add(descriptor.size) {
            Some(next) => self.cursor = next,
            None => self.done = true,
        }
        Some(descriptor)
    }
}

impl Iterator for RegionEnumerator<'_> {
    type Item = MemoryRegion;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let descriptor = match self.step() {
                Some(d) => d,
                None => {
                    self.done = true;
                    return None;
                }
            };
            if descriptor.qualifies() {
                return Some(descriptor.into());
            }
        }
    }
}

/// Collects every qualifying region below `ceiling`, ascending by base
pub fn enumerate(process: &dyn ProcessMemory, ceiling: usize) -> Vec<MemoryRegion> {
    let regions: Vec<MemoryRegion> = RegionEnumerator::new(process, ceiling).collect();
    debug!(
        pid = process.pid(),
        count = regions.len(),
        bytes = super::total_size(&regions),
        "enumerated regions"
    );
    regions
}
