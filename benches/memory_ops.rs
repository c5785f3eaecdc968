use criterion::{black_box, criterion_group, criterion_main, Criterion};
use memscan::core::codec;
use memscan::memory::regions::ProtectionFlags;
use memscan::memory::{FilterKind, FreezeScheduler, TrackedList};
use memscan::{
    Address, Capability, DataType, MemoryPort, MemoryScanner, ScanOptions, ScanResult,
    SimulatedProcess, Value,
};
use std::sync::Arc;
use std::time::Duration;

const BASE: usize = 0x10_0000;
const SLOTS: usize = 4096;

fn target() -> (Arc<SimulatedProcess>, MemoryPort) {
    let bytes = (0..SLOTS as i32).flat_map(|v| v.to_ne_bytes()).collect();
    let process = Arc::new(SimulatedProcess::new(2).with_region(
        BASE,
        bytes,
        ProtectionFlags::PAGE_READWRITE,
    ));
    let capability: Capability = process.clone();
    (process, MemoryPort::new(capability))
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let cases = [
        (Value::Int(-123_456), DataType::Int32),
        (Value::UInt(u64::MAX), DataType::UInt64),
        (Value::Float(1234.5625), DataType::Float),
        (Value::Text("2.718281828".into()), DataType::Double),
        (Value::Text("player_name".into()), DataType::String),
    ];

    for (value, data_type) in &cases {
        group.bench_function(format!("encode_{}", data_type), |b| {
            b.iter(|| black_box(codec::encode(black_box(value), *data_type).unwrap()));
        });

        let bytes = codec::encode(value, *data_type).unwrap();
        group.bench_function(format!("decode_{}", data_type), |b| {
            b.iter(|| black_box(codec::decode(black_box(&bytes), *data_type).unwrap()));
        });
    }
    group.finish();
}

fn bench_port(c: &mut Criterion) {
    let mut group = c.benchmark_group("port");
    let (_process, port) = target();
    let address = Address::new(BASE + 400);

    group.bench_function("read_value_int32", |b| {
        b.iter(|| black_box(port.read_value(address, DataType::Int32).unwrap()));
    });
    group.bench_function("write_value_int32", |b| {
        b.iter(|| black_box(port.write_value(address, &Value::Int(100), DataType::Int32).unwrap()));
    });
    group.bench_function("read_region_16KB", |b| {
        b.iter(|| black_box(port.read(Address::new(BASE), SLOTS * 4)));
    });
    group.finish();
}

fn bench_filter(c: &mut Criterion) {
    let (_process, port) = target();
    let results: Vec<_> = (0..SLOTS)
        .map(|i| {
            ScanResult::new(
                Address::new(BASE + i * 4),
                (i as i32).to_ne_bytes().to_vec(),
                DataType::Int32,
            )
            .shared()
        })
        .collect();

    c.bench_function("filter_unchanged_4096", |b| {
        let scanner = MemoryScanner::new(port.clone(), ScanOptions::sequential());
        b.iter(|| {
            scanner.replace_results(results.clone());
            black_box(scanner.filter(FilterKind::Unchanged, DataType::Int32).unwrap().len())
        });
    });
}

fn bench_freeze_tick(c: &mut Criterion) {
    let (_process, port) = target();
    let tracked = TrackedList::new();
    for i in 0..256usize {
        let result = ScanResult::new(
            Address::new(BASE + i * 4),
            (i as i32).to_ne_bytes().to_vec(),
            DataType::Int32,
        )
        .shared();
        result.set_frozen(i % 2 == 0);
        tracked.add(result, format!("slot {}", i));
    }
    let scheduler = FreezeScheduler::new(port, tracked, Duration::from_millis(100));

    c.bench_function("freeze_tick_256", |b| {
        b.iter(|| black_box(scheduler.tick()));
    });
}

criterion_group!(benches, bench_codec, bench_port, bench_filter, bench_freeze_tick);
criterion_main!(benches);
