//! Memory operations against an attached process
//!
//! This module provides:
//! - Region discovery (`regions`)
//! - Byte-exact reads and writes (`port`)
//! - Exact-value scanning and the working result set (`scanner`)
//! - Refinement predicates (`filter`)
//! - The tracked list and its freeze loop (`tracked`, `freeze`)

pub mod filter;
pub mod freeze;
pub mod port;
pub mod regions;
pub mod scanner;
pub mod tracked;

pub use filter::{FilterKind, Relation};
pub use freeze::{FreezeHandle, FreezeScheduler, TickReport};
pub use port::MemoryPort;
pub use regions::{MemoryRegion, RegionDescriptor, RegionEnumerator};
pub use scanner::{find_all, MemoryScanner, ProgressFn, ScanOptions};
pub use tracked::{default_description, TrackedEntry, TrackedList};
