//! Scan result type shared between the working set, filters and the freeze loop

use super::{Address, DataType, MemoryResult, Value};
use crate::core::codec;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// A result handle that can sit in the working set and the tracked list at once
pub type SharedResult = Arc<ScanResult>;

/// One observation of a typed value at an address.
///
/// Identity is the address alone: two results at the same address compare
/// equal and hash identically even when their snapshots differ. The tracked
/// list relies on this for "already adopted" checks.
///
/// The snapshot sits behind its own lock so that a filter pass and a freeze
/// tick touching the same result are serialized.
pub struct ScanResult {
    address: Address,
    data_type: DataType,
    snapshot: Mutex<Vec<u8>>,
    frozen: AtomicBool,
}

impl ScanResult {
    /// Creates a result with a known byte snapshot
    pub fn new(address: Address, snapshot: Vec<u8>, data_type: DataType) -> Self {
        ScanResult {
            address,
            data_type,
            snapshot: Mutex::new(snapshot),
            frozen: AtomicBool::new(false),
        }
    }

    /// Creates a result with no snapshot yet, e.g. one loaded from a table
    pub fn latent(address: Address, data_type: DataType, frozen: bool) -> Self {
        ScanResult {
            address,
            data_type,
            snapshot: Mutex::new(Vec::new()),
            frozen: AtomicBool::new(frozen),
        }
    }

    pub fn shared(self) -> SharedResult {
        Arc::new(self)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Copy of the last recorded bytes
    pub fn snapshot(&self) -> Vec<u8> {
        self.lock_snapshot().clone()
    }

    /// Replaces the recorded bytes
    pub fn set_snapshot(&self, bytes: Vec<u8>) {
        *self.lock_snapshot() = bytes;
    }

    /// Runs `f` while holding the snapshot lock.
    ///
    /// Every read-modify-write of the snapshot goes through here.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
        let mut guard = self.lock_snapshot();
        f(&mut guard)
    }

    /// True until a snapshot has been recorded
    pub fn is_latent(&self) -> bool {
        self.lock_snapshot().is_empty()
    }

    /// Decodes the current snapshot with the result's declared type
    pub fn value(&self) -> MemoryResult<Value> {
        let bytes = self.lock_snapshot();
        codec::decode(&bytes, self.data_type)
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.store(frozen, Ordering::Release);
    }

    /// Flips the frozen flag and returns the new state
    pub fn toggle_frozen(&self) -> bool {
        !self.frozen.fetch_xor(true, Ordering::AcqRel)
    }

    fn lock_snapshot(&self) -> MutexGuard<'_, Vec<u8>> {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartialEq for ScanResult {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for ScanResult {}

impl Hash for ScanResult {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Clone for ScanResult {
    fn clone(&self) -> Self {
        ScanResult {
            address: self.address,
            data_type: self.data_type,
            snapshot: Mutex::new(self.snapshot()),
            frozen: AtomicBool::new(self.is_frozen()),
        }
    }
}

impl fmt::Debug for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanResult")
            .field("address", &self.address)
            .field("data_type", &self.data_type)
            .field("snapshot", &hex::encode(self.snapshot()))
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value() {
            Ok(value) => write!(f, "{}: {}", self.address, value),
            Err(_) => write!(f, "{}: ??", self.address),
        }
    }
}
