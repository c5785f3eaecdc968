//! Exact-value scanning and the working result set

use crate::core::codec;
use crate::core::types::{
    Address, DataType, MemoryError, MemoryResult, ScanResult, SharedResult, Value,
};
use crate::memory::filter::{self, FilterKind};
use crate::memory::port::MemoryPort;
use crate::memory::regions::{self, MemoryRegion};
use rayon::prelude::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

/// Progress sink, called with a fraction in `[0, 1]`
pub type ProgressFn<'a> = &'a (dyn Fn(f64) + Sync);

/// Options for memory scanning
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Search regions on a rayon pool
    pub parallel: bool,
    /// Pool size when `parallel` is set
    pub max_threads: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            parallel: true,
            max_threads: num_cpus::get().clamp(1, 8),
        }
    }
}

impl ScanOptions {
    pub fn sequential() -> Self {
        ScanOptions {
            parallel: false,
            max_threads: 1,
        }
    }
}

/// Every offset at which `pattern` starts in `haystack`.
///
/// After a hit the search resumes one byte later, so overlapping repeats
/// are all reported.
pub fn find_all(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
    if pattern.is_empty() || haystack.len() < pattern.len() {
        return Vec::new();
    }

    let first = pattern[0];
    let last_start = haystack.len() - pattern.len();
    let mut hits = Vec::new();
    let mut offset = 0;

    while offset <= last_start {
        match haystack[offset..=last_start].iter().position(|&b| b == first) {
            Some(skip) => {
                let start = offset + skip;
                if haystack[start..start + pattern.len()] == *pattern {
                    hits.push(start);
                }
                offset = start + 1;
            }
            None => break,
        }
    }
    hits
}

/// Scanner bound to one attached process.
///
/// Holds the working result set: replaced wholesale by each scan, narrowed
/// in place by filters. Only one scan or filter may run at a time.
pub struct MemoryScanner {
    port: MemoryPort,
    options: ScanOptions,
    pool: Option<Arc<rayon::ThreadPool>>,
    results: RwLock<Vec<SharedResult>>,
    scanning: AtomicBool,
}

impl fmt::Debug for MemoryScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryScanner")
            .field("port", &self.port)
            .field("options", &self.options)
            .field("results", &self.result_count())
            .field("scanning", &self.is_scanning())
            .finish()
    }
}

/// Clears the scanning flag when dropped
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MemoryScanner {
    /// Create a new memory scanner
    pub fn new(port: MemoryPort, options: ScanOptions) -> Self {
        let pool = if options.parallel {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(options.max_threads.max(1))
                .thread_name(|i| format!("memscan-scan-{}", i))
                .build()
            {
                Ok(pool) => Some(Arc::new(pool)),
                Err(e) => {
                    warn!(error = %e, "scan pool unavailable, scanning sequentially");
                    None
                }
            }
        } else {
            None
        };

        MemoryScanner {
            port,
            options,
            pool,
            results: RwLock::new(Vec::new()),
            scanning: AtomicBool::new(false),
        }
    }

    pub fn port(&self) -> &MemoryPort {
        &self.port
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::Acquire)
    }

    /// Claims the working set for one scan or filter
    fn begin(&self) -> MemoryResult<ScanGuard<'_>> {
        self.scanning
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MemoryError::ScanInProgress)?;
        Ok(ScanGuard(&self.scanning))
    }

    /// Searches every region for `value` encoded as `data_type`.
    ///
    /// Each region is read once in bulk; a failed read skips the region but
    /// still counts toward progress. The working set is replaced with the
    /// matches, ascending by address within region order. An operand that
    /// cannot be encoded leaves the working set as it was.
    pub fn scan_exact(
        &self,
        regions: &[MemoryRegion],
        value: &Value,
        data_type: DataType,
        progress: Option<ProgressFn<'_>>,
    ) -> MemoryResult<Vec<SharedResult>> {
        let _guard = self.begin()?;

        let pattern = codec::encode(value, data_type)?;
        if pattern.is_empty() {
            return Err(MemoryError::conversion(value, data_type, "empty search pattern"));
        }

        let total = regions::total_size(regions);
        let scanned = AtomicU64::new(0);
        info!(
            value = %value,
            data_type = %data_type,
            regions = regions.len(),
            bytes = total,
            "starting exact scan"
        );

        let scan_one = |region: &MemoryRegion| -> Vec<SharedResult> {
            let hits = self.scan_region(region, &pattern, data_type);
            let done = scanned.fetch_add(region.size as u64, Ordering::AcqRel) + region.size as u64;
            if let Some(report) = progress {
                if total > 0 {
                    report((done as f64 / total as f64).min(1.0));
                }
            }
            hits
        };

        let per_region: Vec<Vec<SharedResult>> = match &self.pool {
            Some(pool) => pool.install(|| regions.par_iter().map(scan_one).collect()),
            None => regions.iter().map(scan_one).collect(),
        };
        let found: Vec<SharedResult> = per_region.into_iter().flatten().collect();

        info!(matches = found.len(), "exact scan finished");
        self.replace_results(found.clone());
        Ok(found)
    }

    fn scan_region(
        &self,
        region: &MemoryRegion,
        pattern: &[u8],
        data_type: DataType,
    ) -> Vec<SharedResult> {
        if region.size < pattern.len() {
            return Vec::new();
        }

        let data = match self.port.read(region.base_address, region.size) {
            Some(data) => data,
            None => {
                debug!(base = %region.base_address, size = region.size, "region read failed, skipped");
                return Vec::new();
            }
        };

        find_all(&data, pattern)
            .into_iter()
            .map(|offset| {
                ScanResult::new(
                    region.base_address.saturating_add(offset),
                    pattern.to_vec(),
                    data_type,
                )
                .shared()
            })
            .collect()
    }

    /// Narrows the working set in place and returns the survivors.
    ///
    /// Rejected with `ScanInProgress` while a scan is running; a scan
    /// started during a filter is rejected the same way.
    pub fn filter(&self, kind: FilterKind, data_type: DataType) -> MemoryResult<Vec<SharedResult>> {
        let kind = kind.normalized(data_type)?;
        let _guard = self.begin()?;
        let before = self.read_results().clone();
        let kept = filter::apply(&self.port, &before, &kind, data_type, self.pool.is_some());

        info!(filter = %kind, before = before.len(), after = kept.len(), "filter applied");
        let mut results = self.write_results();
        *results = kept.clone();
        Ok(kept)
    }

    /// Snapshot of the working set
    pub fn results(&self) -> Vec<SharedResult> {
        self.read_results().clone()
    }

    pub fn result_count(&self) -> usize {
        self.read_results().len()
    }

    /// Finds the working-set entry at `address`
    pub fn result_at(&self, address: Address) -> Option<SharedResult> {
        self.read_results()
            .iter()
            .find(|r| r.address() == address)
            .cloned()
    }

    pub fn replace_results(&self, results: Vec<SharedResult>) {
        *self.write_results() = results;
    }

    pub fn clear_results(&self) {
        self.write_results().clear();
    }

    fn read_results(&self) -> RwLockReadGuard<'_, Vec<SharedResult>> {
        self.results.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write_results(&self) -> RwLockWriteGuard<'_, Vec<SharedResult>> {
        self.results.write().unwrap_or_else(|p| p.into_inner())
    }
}
