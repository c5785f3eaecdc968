//! Session statistics

use serde::Serialize;
use std::fmt;

/// Counts describing the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub regions: usize,
    pub readable_bytes: u64,
    pub results: usize,
    pub tracked: usize,
    pub frozen: usize,
    pub unfrozen: usize,
    pub scripts: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Memory regions:    {}", self.regions)?;
        writeln!(
            f,
            "Readable memory:   {:.2} MB",
            self.readable_bytes as f64 / (1024.0 * 1024.0)
        )?;
        writeln!(f, "Scan results:      {}", self.results)?;
        writeln!(f, "Tracked addresses: {}", self.tracked)?;
        writeln!(f, "Frozen:            {}", self.frozen)?;
        writeln!(f, "Unfrozen:          {}", self.unfrozen)?;
        write!(f, "Saved scripts:     {}", self.scripts)
    }
}
