//! `/proc/<pid>/maps` parsing

use super::{open_error, proc_path};
use crate::core::types::{Address, MemoryError, MemoryResult, ProcessId};
use crate::memory::regions::{ProtectionFlags, RegionDescriptor, MEM_COMMIT, MEM_FREE};
use std::fs::File;
use std::io::{BufRead, BufReader};

/// One mapping line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub start: usize,
    pub end: usize,
    pub perms: String,
    pub path: Option<String>,
}

impl MapEntry {
    /// Parses `start-end perms offset dev inode [path]`
    pub fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let range = fields.next()?;
        let perms = fields.next()?.to_string();
        let (start, end) = range.split_once('-')?;
        let start = usize::from_str_radix(start, 16).ok()?;
        let end = usize::from_str_radix(end, 16).ok()?;
        if end <= start {
            return None;
        }

        // offset, dev, inode
        let path = fields.nth(3).map(|first| {
            let rest: Vec<&str> = fields.collect();
            if rest.is_empty() {
                first.to_string()
            } else {
                format!("{} {}", first, rest.join(" "))
            }
        });

        Some(MapEntry {
            start,
            end,
            perms,
            path,
        })
    }

    pub fn protection(&self) -> ProtectionFlags {
        ProtectionFlags::from_permissions(&self.perms)
    }
}

/// Answers a region query from mapping lines, in the Windows style:
/// the descriptor starts at `address` and runs to the end of its mapping,
/// or to the next mapping when `address` sits in a gap.
pub fn describe<I>(entries: I, address: usize) -> Option<RegionDescriptor>
where
    I: IntoIterator<Item = MapEntry>,
{
    for entry in entries {
        if entry.end <= address {
            continue;
        }
        if entry.start <= address {
            return Some(RegionDescriptor {
                base_address: Address::new(address),
                size: entry.end - address,
                state: MEM_COMMIT,
                protection: entry.protection().raw(),
            });
        }
        return Some(RegionDescriptor {
            base_address: Address::new(address),
            size: entry.start - address,
            state: MEM_FREE,
            protection: ProtectionFlags::PAGE_NOACCESS,
        });
    }
    None
}

/// Reads all mapping lines of `pid`
pub fn read_maps(pid: ProcessId) -> MemoryResult<Vec<MapEntry>> {
    let file = File::open(proc_path(pid, "maps")).map_err(|e| open_error(pid, e))?;
    let mut entries = Vec::new();
    for line in BufReader::new(file).lines() {
        if let Some(entry) = MapEntry::parse(&line?) {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Describes the region of `pid` containing `address`
pub fn query(pid: ProcessId, address: usize) -> MemoryResult<RegionDescriptor> {
    let file = File::open(proc_path(pid, "maps")).map_err(|e| open_error(pid, e))?;
    let entries = BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .filter_map(|line| MapEntry::parse(&line));

    describe(entries, address).ok_or_else(|| {
        MemoryError::InvalidAddress(format!("{} is past the last mapping", Address::new(address)))
    })
}
