//! Integration tests for the tracked list and the freeze loop

use memscan::memory::regions::ProtectionFlags;
use memscan::memory::{FreezeScheduler, TickReport, TrackedList};
use memscan::{
    Address, Capability, DataType, MemoryPort, ScanResult, SimulatedProcess, Value,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

const BASE: usize = 0x7000;

fn target() -> (Arc<SimulatedProcess>, MemoryPort) {
    let bytes = [100i32, 200, 300, 400]
        .iter()
        .flat_map(|v| v.to_ne_bytes())
        .collect();
    let process = Arc::new(SimulatedProcess::new(30).with_region(
        BASE,
        bytes,
        ProtectionFlags::PAGE_READWRITE,
    ));
    let capability: Capability = process.clone();
    (process, MemoryPort::new(capability))
}

fn track(list: &TrackedList, slot: usize, value: i32, frozen: bool) -> Address {
    let address = Address::new(BASE + slot * 4);
    let result = ScanResult::new(address, value.to_ne_bytes().to_vec(), DataType::Int32).shared();
    result.set_frozen(frozen);
    assert!(list.add(result, format!("slot {}", slot)));
    address
}

fn read_i32(process: &SimulatedProcess, address: Address) -> i32 {
    let bytes = process.peek(address.as_usize(), 4).unwrap();
    i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[test]
fn test_tick_restores_frozen_and_refreshes_unfrozen() {
    let (process, port) = target();
    let tracked = TrackedList::new();
    let frozen = track(&tracked, 0, 100, true);
    let watched = track(&tracked, 1, 200, false);

    process.poke(frozen.as_usize(), &999i32.to_ne_bytes());
    process.poke(watched.as_usize(), &250i32.to_ne_bytes());

    let scheduler = FreezeScheduler::new(port, tracked.clone(), Duration::from_millis(100));
    let report = scheduler.tick();

    assert_eq!(
        report,
        TickReport {
            written: 1,
            refreshed: 1,
            failed: 0,
            skipped: 0,
        }
    );
    assert_eq!(read_i32(&process, frozen), 100);
    assert_eq!(tracked.get(watched).unwrap().result.value().unwrap(), Value::Int(250));
    assert_eq!(read_i32(&process, watched), 250);
}

#[test]
fn test_latent_entries_are_resolved_or_skipped() {
    let (process, port) = target();
    let tracked = TrackedList::new();
    let latent = Address::new(BASE + 8);
    assert!(tracked.add_address(latent, DataType::Int32, "loaded"));
    let frozen_latent = ScanResult::latent(Address::new(BASE + 12), DataType::Int32, true).shared();
    assert!(tracked.add(frozen_latent, "loaded frozen"));

    let scheduler = FreezeScheduler::new(port, tracked.clone(), Duration::from_millis(100));
    let report = scheduler.tick();

    assert_eq!(report.refreshed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.written, 0);
    assert_eq!(tracked.get(latent).unwrap().result.value().unwrap(), Value::Int(300));
    assert_eq!(read_i32(&process, Address::new(BASE + 12)), 400);
    assert_eq!(process.write_count(), 0);
}

#[test]
fn test_failures_do_not_stop_the_pass() {
    let (process, port) = target();
    let tracked = TrackedList::new();
    let outside = Address::new(0x10);
    let result = ScanResult::new(outside, 1i32.to_ne_bytes().to_vec(), DataType::Int32).shared();
    result.set_frozen(true);
    tracked.add(result, "gone");
    let frozen = track(&tracked, 2, 300, true);

    process.poke(frozen.as_usize(), &0i32.to_ne_bytes());
    let report = FreezeScheduler::new(port, tracked, Duration::from_millis(100)).tick();

    assert_eq!(report.failed, 1);
    assert_eq!(report.written, 1);
    assert_eq!(read_i32(&process, frozen), 300);
}

#[test]
fn test_duplicate_addresses_are_rejected() {
    let tracked = TrackedList::new();
    let address = track(&tracked, 0, 100, false);
    let again = ScanResult::new(address, 5i32.to_ne_bytes().to_vec(), DataType::Int32).shared();

    assert!(!tracked.add(again, "other"));
    assert_eq!(tracked.len(), 1);
    assert_eq!(tracked.get(address).unwrap().description, "slot 0");
}

#[test]
fn test_freeze_all_and_unfreeze_all_report_changes() {
    let tracked = TrackedList::new();
    track(&tracked, 0, 100, true);
    track(&tracked, 1, 200, false);
    track(&tracked, 2, 300, false);

    assert_eq!(tracked.set_all_frozen(true), 2);
    assert_eq!(tracked.frozen_count(), 3);
    assert_eq!(tracked.set_all_frozen(false), 3);
    assert_eq!(tracked.frozen_count(), 0);
}

#[tokio::test]
async fn test_scheduler_keeps_value_pinned() {
    let (process, port) = target();
    let tracked = TrackedList::new();
    let frozen = track(&tracked, 3, 400, true);

    let scheduler = FreezeScheduler::new(port, tracked.clone(), Duration::from_millis(10));
    let handle = scheduler.spawn().unwrap();
    assert!(handle.is_running());

    for _ in 0..5 {
        process.poke(frozen.as_usize(), &1i32.to_ne_bytes());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(read_i32(&process, frozen), 400);
    }

    tracked.get(frozen).unwrap().result.set_frozen(false);
    tokio::time::sleep(Duration::from_millis(30)).await;
    process.poke(frozen.as_usize(), &7i32.to_ne_bytes());
    tokio::time::sleep(Duration::from_millis(80)).await;

    assert_eq!(read_i32(&process, frozen), 7);
    assert_eq!(tracked.get(frozen).unwrap().result.value().unwrap(), Value::Int(7));

    handle.join().await;
}

#[test]
fn test_spawn_without_runtime_fails() {
    let (_process, port) = target();
    let scheduler = FreezeScheduler::new(port, TrackedList::new(), Duration::from_millis(10));
    assert!(scheduler.spawn().is_err());
}
