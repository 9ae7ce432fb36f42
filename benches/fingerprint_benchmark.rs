//! Benchmarks for fingerprinting and correlation.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use probelink::fingerprint::{stable_fingerprint, Correlator, DeviceGroupStore, FrameMeta, ProbeFrame};
use probelink::wireless::ieee80211::{encode_elements, parse_elements, MacAddr, TaggedElement};

fn create_elements(variant: u8) -> Vec<TaggedElement> {
    vec![
        TaggedElement::new(0, b"benchmark-net".to_vec()),
        TaggedElement::new(1, vec![0x02, 0x04, 0x0b, 0x16, 0x0c, 0x12, 0x18, 0x24]),
        TaggedElement::new(50, vec![0x30, 0x48, 0x60, 0x6c]),
        TaggedElement::new(45, vec![variant; 26]),
        TaggedElement::new(127, vec![0x04, 0x00, 0x0a, 0x02, 0x01, 0x40, 0x00, 0x40]),
        TaggedElement::new(191, vec![0x32; 12]),
        TaggedElement::new(221, vec![0x00, 0x50, 0xf2, 0x08, 0x00, 0x10, 0x00]),
        TaggedElement::new(221, vec![0x00, 0x10, 0x18, 0x02, 0x00, 0x00, 0x1c, 0x00, 0x00]),
    ]
}

fn create_frames(count: usize, devices: u8) -> Vec<ProbeFrame> {
    (0..count)
        .filter_map(|i| {
            let device = (i % devices as usize) as u8;
            let mut addr = [0x02, 0x00, 0x00, 0x00, device, (i % 7) as u8];
            if i % 5 == 0 {
                addr[0] = 0x00;
            }
            let meta = FrameMeta {
                source: MacAddr::new(addr),
                timestamp: i as f64 * 0.5,
                signal_dbm: Some(-40 - (i % 20) as i8),
                channel: Some(1 + (i % 3) as u8 * 5),
            };
            ProbeFrame::from_elements(meta, create_elements(device))
        })
        .collect()
}

fn benchmark_parse(c: &mut Criterion) {
    let body = encode_elements(&create_elements(0xaa));

    c.bench_function("parse_elements", |b| {
        b.iter(|| parse_elements(black_box(&body)))
    });
}

fn benchmark_digest(c: &mut Criterion) {
    let elements = create_elements(0xaa);

    c.bench_function("stable_fingerprint", |b| {
        b.iter(|| stable_fingerprint(black_box(&elements)))
    });
}

fn benchmark_ingest_and_assign(c: &mut Criterion) {
    let frames = create_frames(10_000, 50);
    let correlator = Correlator::default();

    c.bench_function("ingest_10k", |b| {
        b.iter(|| {
            let mut store = DeviceGroupStore::new();
            store.ingest_all(black_box(frames.iter().cloned()));
            store
        })
    });

    let mut store = DeviceGroupStore::new();
    store.ingest_all(frames.iter().cloned());
    c.bench_function("assign_50_groups", |b| {
        b.iter(|| correlator.assign_all(black_box(&store)))
    });
}

criterion_group!(benches, benchmark_parse, benchmark_digest, benchmark_ingest_and_assign);
criterion_main!(benches);
