//! Criterion benchmarks for the caps codec.
//!
//! The coordinator parses every datagram that reaches the discovery port, so
//! decode cost bounds how much broadcast noise one receive loop can absorb.
//!
//! Run with:
//! ```bash
//! cargo bench --package autonet-core --bench caps_bench
//! ```

use autonet_core::{Announcement, DeviceInfo, RendezvousOffer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn make_announcement(name_len: usize) -> Announcement {
    Announcement::new(
        "0b8e4c1e-5d0f-4d6b-9a51-2f1f6c0e7a33",
        DeviceInfo::new(3, "n".repeat(name_len)),
    )
}

fn bench_announcement(c: &mut Criterion) {
    let mut group = c.benchmark_group("announcement");
    for name_len in [8usize, 64, 512] {
        let ann = make_announcement(name_len);
        let bytes = ann.encode().unwrap();

        group.bench_with_input(BenchmarkId::new("encode", name_len), &ann, |b, ann| {
            b.iter(|| black_box(ann).encode().unwrap())
        });
        group.bench_with_input(BenchmarkId::new("decode", name_len), &bytes, |b, bytes| {
            b.iter(|| Announcement::decode(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

fn bench_offer(c: &mut Criterion) {
    let bytes = RendezvousOffer::new("tcp://192.168.1.10:2517").encode().unwrap();
    c.bench_function("offer/decode", |b| {
        b.iter(|| RendezvousOffer::decode(black_box(&bytes)).unwrap())
    });
}

fn bench_rejects_garbage(c: &mut Criterion) {
    let garbage = vec![0xA5u8; 512];
    c.bench_function("announcement/reject_garbage", |b| {
        b.iter(|| Announcement::decode(black_box(&garbage)).is_err())
    });
}

criterion_group!(benches, bench_announcement, bench_offer, bench_rejects_garbage);
criterion_main!(benches);
