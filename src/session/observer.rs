//! Change notifications for front ends

use crate::core::types::{Address, Value};
use crate::memory::TrackedEntry;
use tracing::debug;

/// Receives controller events.
///
/// Every method has an empty default, so observers implement only what
/// they display.
pub trait SessionObserver: Send + Sync {
    fn freeze_toggled(&self, _address: Address, _frozen: bool) {}

    fn value_edited(&self, _address: Address, _value: &Value) {}

    fn entry_removed(&self, _entry: &TrackedEntry) {}

    /// The working result set now holds `count` results
    fn results_replaced(&self, _count: usize) {}
}

/// Observer that reports every event at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl SessionObserver for LogObserver {
    fn freeze_toggled(&self, address: Address, frozen: bool) {
        debug!(%address, frozen, "freeze toggled");
    }

    fn value_edited(&self, address: Address, value: &Value) {
        debug!(%address, %value, "value edited");
    }

    fn entry_removed(&self, entry: &TrackedEntry) {
        debug!(address = %entry.address(), description = %entry.description, "entry removed");
    }

    fn results_replaced(&self, count: usize) {
        debug!(count, "results replaced");
    }
}
