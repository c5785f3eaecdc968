//! Recurring write-back of frozen values
//!
//! Each tick walks the tracked list once. Frozen entries get their locked
//! snapshot written back; the others are re-read so their snapshot follows
//! the target. Failures are counted and otherwise ignored.

use crate::core::types::{MemoryError, MemoryResult, SharedResult};
use crate::memory::port::MemoryPort;
use crate::memory::tracked::TrackedList;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace, warn};

/// Reference tick interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Frozen entries written back
    pub written: usize,
    /// Unfrozen entries whose snapshot was refreshed
    pub refreshed: usize,
    /// Reads or writes that failed
    pub failed: usize,
    /// Entries with nothing to write or no width to read
    pub skipped: usize,
}

/// Enforces frozen values over a tracked list
#[derive(Debug, Clone)]
pub struct FreezeScheduler {
    port: MemoryPort,
    tracked: TrackedList,
    interval: Duration,
}

impl FreezeScheduler {
    pub fn new(port: MemoryPort, tracked: TrackedList, interval: Duration) -> Self {
        FreezeScheduler {
            port,
            tracked,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Runs one pass over the tracked list
    pub fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        for result in self.tracked.results() {
            self.enforce(&result, &mut report);
        }
        if report.failed > 0 {
            trace!(?report, "freeze tick had failures");
        }
        report
    }

    fn enforce(&self, result: &SharedResult, report: &mut TickReport) {
        let address = result.address();
        let width = result.data_type().size();

        result.with_snapshot(|snapshot| {
            if result.is_frozen() {
                // never write more or fewer bytes than the type occupies
                let sized = !snapshot.is_empty() && width.map_or(true, |w| w == snapshot.len());
                if !sized {
                    report.skipped += 1;
                } else if self.port.write(address, snapshot) {
                    report.written += 1;
                } else {
                    report.failed += 1;
                }
                return;
            }

            let length = match width {
                Some(w) => w,
                None if !snapshot.is_empty() => snapshot.len(),
                None => {
                    report.skipped += 1;
                    return;
                }
            };
            match self.port.read(address, length) {
                Some(bytes) => {
                    *snapshot = bytes;
                    report.refreshed += 1;
                }
                None => report.failed += 1,
            }
        });
    }

    /// Starts ticking on the current tokio runtime.
    ///
    /// Each tick runs on the blocking pool so process I/O never stalls the
    /// runtime's worker threads.
    pub fn spawn(&self) -> MemoryResult<FreezeHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| MemoryError::RuntimeUnavailable(e.to_string()))?;
        let (shutdown, mut stopped) = oneshot::channel::<()>();
        let scheduler = self.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(interval_ms = scheduler.interval.as_millis() as u64, "freeze scheduler started");

            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    _ = ticker.tick() => {
                        let pass = scheduler.clone();
                        if let Err(e) = tokio::task::spawn_blocking(move || pass.tick()).await {
                            warn!(error = %e, "freeze tick aborted");
                        }
                    }
                }
            }
            debug!("freeze scheduler stopped");
        });

        Ok(FreezeHandle {
            shutdown: Some(shutdown),
            task: Some(task),
        })
    }
}

/// Running scheduler; stops when dropped
#[derive(Debug)]
pub struct FreezeHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl FreezeHandle {
    /// Signals the loop to stop after the current tick
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }

    /// Stops the loop and waits for it to exit
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |t| !t.is_finished())
    }
}

impl Drop for FreezeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Address, DataType, ScanResult};
    use crate::memory::regions::ProtectionFlags;
    use crate::process::SimulatedProcess;
    use std::sync::Arc;

    fn fixture() -> (Arc<SimulatedProcess>, TrackedList, FreezeScheduler) {
        let process = Arc::new(SimulatedProcess::new(1).with_region(
            0x1000,
            vec![0u8; 64],
            ProtectionFlags::PAGE_READWRITE,
        ));
        let tracked = TrackedList::new();
        let scheduler = FreezeScheduler::new(
            MemoryPort::new(process.clone()),
            tracked.clone(),
            Duration::from_millis(10),
        );
        (process, tracked, scheduler)
    }

    #[test]
    fn test_tick_restores_and_refreshes() {
        let (process, tracked, scheduler) = fixture();
        let frozen = ScanResult::new(Address::new(0x1000), 42i32.to_ne_bytes().to_vec(), DataType::Int32).shared();
        frozen.set_frozen(true);
        let watched = ScanResult::new(Address::new(0x1010), 1i32.to_ne_bytes().to_vec(), DataType::Int32).shared();
        tracked.add(frozen.clone(), "hp");
        tracked.add(watched.clone(), "ammo");

        process.poke(0x1000, &7i32.to_ne_bytes());
        process.poke(0x1010, &99i32.to_ne_bytes());

        let report = scheduler.tick();
        assert_eq!(report.written, 1);
        assert_eq!(report.refreshed, 1);
        assert_eq!(process.peek(0x1000, 4), Some(42i32.to_ne_bytes().to_vec()));
        assert_eq!(watched.snapshot(), 99i32.to_ne_bytes().to_vec());
    }

    #[test]
    fn test_tick_never_writes_mis_sized_snapshot() {
        let (process, tracked, scheduler) = fixture();
        let odd = ScanResult::new(Address::new(0x1000), vec![1, 2, 3, 4, 5, 6], DataType::Int32).shared();
        odd.set_frozen(true);
        let latent = ScanResult::latent(Address::new(0x1020), DataType::Int16, true).shared();
        tracked.add(odd, "odd");
        tracked.add(latent, "latent");

        let report = scheduler.tick();
        assert_eq!(report.skipped, 2);
        assert_eq!(process.write_count(), 0);
    }

    #[test]
    fn test_unfrozen_latent_entry_resolves() {
        let (process, tracked, scheduler) = fixture();
        process.poke(0x1008, &0x1234u16.to_ne_bytes());
        let latent = ScanResult::latent(Address::new(0x1008), DataType::UInt16, false).shared();
        let latent_text = ScanResult::latent(Address::new(0x1030), DataType::String, false).shared();
        tracked.add(latent.clone(), "x");
        tracked.add(latent_text, "t");

        let report = scheduler.tick();
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(latent.value().unwrap(), crate::core::types::Value::UInt(0x1234));
    }

    #[test]
    fn test_failed_read_keeps_stale_snapshot() {
        let (_, tracked, scheduler) = fixture();
        let gone = ScanResult::new(Address::new(0x9000), vec![5], DataType::UInt8).shared();
        tracked.add(gone.clone(), "gone");

        let report = scheduler.tick();
        assert_eq!(report.failed, 1);
        assert_eq!(gone.snapshot(), vec![5]);
    }

    #[tokio::test]
    async fn test_spawned_scheduler_enforces_until_stopped() {
        let (process, tracked, scheduler) = fixture();
        let frozen = ScanResult::new(Address::new(0x1000), vec![0xAB], DataType::UInt8).shared();
        frozen.set_frozen(true);
        tracked.add(frozen, "byte");

        let handle = scheduler.spawn().unwrap();
        assert!(handle.is_running());
        process.poke(0x1000, &[0x00]);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(process.peek(0x1000, 1), Some(vec![0xAB]));

        handle.join().await;
        process.poke(0x1000, &[0x00]);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(process.peek(0x1000, 1), Some(vec![0x00]));
    }

    #[test]
    fn test_spawn_without_runtime_fails() {
        let (_, _, scheduler) = fixture();
        assert!(matches!(scheduler.spawn(), Err(MemoryError::RuntimeUnavailable(_))));
    }
}
