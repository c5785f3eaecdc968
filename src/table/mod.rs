//! Persisted table document: tracked addresses and saved scripts
//!
//! ```json
//! {
//!   "entries": [{"address": 4096, "description": "hp", "data_type": "Int32", "frozen": true}],
//!   "scripts": [{"name": "init", "code": "print(1)", "auto_run": true, "enabled": false}]
//! }
//! ```
//!
//! `data_type` is stored by display name and looked up case-insensitively on
//! load; an unknown name fails the whole load.

use crate::core::types::{Address, DataType, MemoryError, MemoryResult, ScanResult};
use crate::memory::{TrackedEntry, TrackedList};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One tracked address as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub address: Address,
    #[serde(default, alias = "label")]
    pub description: String,
    pub data_type: DataType,
    #[serde(default)]
    pub frozen: bool,
}

/// A named automation script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedScript {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub auto_run: bool,
    #[serde(default)]
    pub enabled: bool,
}

impl SavedScript {
    pub fn new(name: impl Into<String>, code: impl Into<String>, auto_run: bool) -> Self {
        SavedScript {
            name: name.into(),
            code: code.into(),
            auto_run,
            enabled: false,
        }
    }
}

/// The whole document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheatTable {
    #[serde(default)]
    pub entries: Vec<TableEntry>,
    #[serde(default)]
    pub scripts: Vec<SavedScript>,
}

impl CheatTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(
        &mut self,
        address: Address,
        description: impl Into<String>,
        data_type: DataType,
        frozen: bool,
    ) {
        self.entries.push(TableEntry {
            address,
            description: description.into(),
            data_type,
            frozen,
        });
    }

    /// Adds a script, replacing any existing one with the same name
    pub fn add_script(&mut self, script: SavedScript) {
        match self.scripts.iter_mut().find(|s| s.name == script.name) {
            Some(existing) => *existing = script,
            None => self.scripts.push(script),
        }
    }

    pub fn script(&self, name: &str) -> Option<&SavedScript> {
        self.scripts.iter().find(|s| s.name == name)
    }

    /// Rebuilds the entry list from the tracked list
    pub fn set_entries_from(&mut self, tracked: &TrackedList) {
        self.entries = tracked
            .entries()
            .into_iter()
            .map(|e| TableEntry {
                address: e.address(),
                description: e.description,
                data_type: e.result.data_type(),
                frozen: e.result.is_frozen(),
            })
            .collect();
    }

    /// Latent tracked entries for every persisted address
    pub fn tracked_entries(&self) -> Vec<TrackedEntry> {
        self.entries
            .iter()
            .map(|e| {
                TrackedEntry::new(
                    ScanResult::latent(e.address, e.data_type, e.frozen).shared(),
                    e.description.clone(),
                )
            })
            .collect()
    }

    pub fn to_json(&self) -> MemoryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> MemoryResult<Self> {
        serde_json::from_str(text).map_err(|e| MemoryError::TableLoad(e.to_string()))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> MemoryResult<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)?;
        info!(
            path = %path.display(),
            entries = self.entries.len(),
            scripts = self.scripts.len(),
            "table saved"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> MemoryResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| MemoryError::TableLoad(format!("{}: {}", path.display(), e)))?;
        let table = Self::from_json(&text)?;
        info!(
            path = %path.display(),
            entries = table.entries.len(),
            scripts = table.scripts.len(),
            "table loaded"
        );
        Ok(table)
    }
}
