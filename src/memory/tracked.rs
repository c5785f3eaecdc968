//! The tracked list: addresses adopted for watching and freezing
//!
//! Independent of the working result set. Entries share their
//! [`ScanResult`] with the working set when adopted from it, so a freeze
//! toggle is visible from both sides.

use crate::core::types::{Address, DataType, ScanResult, SharedResult};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// One tracked address with its label
#[derive(Debug, Clone)]
pub struct TrackedEntry {
    pub result: SharedResult,
    pub description: String,
}

impl TrackedEntry {
    pub fn new(result: SharedResult, description: impl Into<String>) -> Self {
        TrackedEntry {
            result,
            description: description.into(),
        }
    }

    pub fn address(&self) -> Address {
        self.result.address()
    }

    pub fn data_type(&self) -> DataType {
        self.result.data_type()
    }
}

/// Description given to the `ordinal`-th entry tracked without one (1-based)
pub fn default_description(ordinal: usize) -> String {
    format!("Address_{}", ordinal)
}

/// Shared, ordered list of tracked entries
#[derive(Debug, Clone, Default)]
pub struct TrackedList {
    entries: Arc<RwLock<Vec<TrackedEntry>>>,
}

impl TrackedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `result` unless its address is already tracked.
    ///
    /// Returns false for a duplicate, whatever its recorded value.
    pub fn add(&self, result: SharedResult, description: impl Into<String>) -> bool {
        let mut entries = self.write();
        if entries.iter().any(|e| e.result == result) {
            return false;
        }
        entries.push(TrackedEntry::new(result, description));
        true
    }

    /// Adds `result` labelled by its position in the list, as in
    /// [`default_description`]. Returns false for a duplicate.
    pub fn add_numbered(&self, result: SharedResult) -> bool {
        let mut entries = self.write();
        if entries.iter().any(|e| e.result == result) {
            return false;
        }
        let description = default_description(entries.len() + 1);
        entries.push(TrackedEntry::new(result, description));
        true
    }

    /// Adds a latent entry for a bare address
    pub fn add_address(
        &self,
        address: Address,
        data_type: DataType,
        description: impl Into<String>,
    ) -> bool {
        self.add(ScanResult::latent(address, data_type, false).shared(), description)
    }

    pub fn remove(&self, address: Address) -> Option<TrackedEntry> {
        let mut entries = self.write();
        let index = entries.iter().position(|e| e.address() == address)?;
        Some(entries.remove(index))
    }

    pub fn get(&self, address: Address) -> Option<TrackedEntry> {
        self.read().iter().find(|e| e.address() == address).cloned()
    }

    pub fn contains(&self, address: Address) -> bool {
        self.read().iter().any(|e| e.address() == address)
    }

    pub fn rename(&self, address: Address, description: impl Into<String>) -> bool {
        match self.write().iter_mut().find(|e| e.address() == address) {
            Some(entry) => {
                entry.description = description.into();
                true
            }
            None => false,
        }
    }

    /// Copy of every entry, in insertion order
    pub fn entries(&self) -> Vec<TrackedEntry> {
        self.read().clone()
    }

    /// Shared results of every entry, in insertion order
    pub fn results(&self) -> Vec<SharedResult> {
        self.read().iter().map(|e| e.result.clone()).collect()
    }

    /// Sets every entry's frozen flag, returning how many actually changed
    pub fn set_all_frozen(&self, frozen: bool) -> usize {
        let mut changed = 0;
        for entry in self.read().iter() {
            if entry.result.is_frozen() != frozen {
                entry.result.set_frozen(frozen);
                changed += 1;
            }
        }
        changed
    }

    pub fn frozen_count(&self) -> usize {
        self.read().iter().filter(|e| e.result.is_frozen()).count()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn replace(&self, entries: Vec<TrackedEntry>) {
        *self.write() = entries;
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<TrackedEntry>> {
        self.entries.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<TrackedEntry>> {
        self.entries.write().unwrap_or_else(|p| p.into_inner())
    }
}
