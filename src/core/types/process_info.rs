//! Process descriptors supplied by the process-listing collaborator

use super::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A process that can be attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: ProcessId,
    pub name: String,
    pub executable_path: Option<PathBuf>,
}

impl ProcessInfo {
    /// Creates a new ProcessInfo with no executable path
    pub fn new(pid: ProcessId, name: impl Into<String>) -> Self {
        ProcessInfo {
            pid,
            name: name.into(),
            executable_path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Placeholder used when attaching by bare pid
    pub fn unnamed(pid: ProcessId) -> Self {
        ProcessInfo::new(pid, format!("pid-{}", pid))
    }

    /// Drops the idle pseudo-process and orders by name, case-insensitively
    pub fn sort_listing(processes: &mut Vec<ProcessInfo>) {
        processes.retain(|p| p.pid != 0);
        processes.sort_by_key(|p| p.name.to_lowercase());
    }
}

impl fmt::Display for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID: {})", self.name, self.pid)
    }
}
