//! Telemetry Engine Performance Benchmarks
//!
//! Measures the hot path of the state engine:
//! - Payload decoding
//! - Health classification (largest rule set)
//! - Dispatch across many devices

use canary_telemetry::{decode, Category, Dispatcher, TelemetryClassifier};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

const HEALTH: &[u8] = br#"{
    "battery": 72,
    "memory_free": 48000,
    "free_heap": 52000,
    "sd_mounted": true,
    "sd_errors": 0,
    "uptime": 86400,
    "tamper": {"motion": false, "gpio": false},
    "gps": {"fix_type": "3d", "satellites": 9, "hdop": 0.9}
}"#;

fn bench_decode(c: &mut Criterion) {
    c.bench_function("decode_health", |b| {
        b.iter(|| decode(black_box(Category::Health), black_box(HEALTH)))
    });
}

fn bench_classify_health(c: &mut Criterion) {
    let classifier = TelemetryClassifier::new();

    c.bench_function("classify_health", |b| {
        b.iter(|| classifier.classify_at("canary-01", Category::Health, black_box(HEALTH), 1))
    });
}

fn bench_dispatch_devices(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_devices");

    for devices in [1usize, 16, 256] {
        let dispatcher = Dispatcher::default();
        let ids: Vec<String> = (0..devices).map(|i| format!("canary-{:04}", i)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(devices), &ids, |b, ids| {
            b.iter(|| {
                for id in ids {
                    let _ = dispatcher.handle_at(id, Category::Tamper, br#"{"type":"gpio"}"#, 1);
                }
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode,
    bench_classify_health,
    bench_dispatch_devices
);
criterion_main!(benches);
