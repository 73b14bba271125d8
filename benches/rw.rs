// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Write/read throughput benchmarks.
//
// Run with:
//   cargo bench --bench rw
//
// Groups:
//   store_write — fresh-name writes at three payload sizes
//   store_read  — full-content reads of pre-written names
//
// Payload sizes:
//   small    — 100 bytes   (fits the bucket chunk)
//   straddle — 5000 bytes  (spills into one continuation)
//   multi    — 64 KiB      (a run of continuations)

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use edgefs::{EdgeFs, SystemInfo};
use tempfile::TempDir;

const SIZES: &[(&str, usize)] = &[
    ("small_100", 100),
    ("straddle_5000", 5000),
    ("multi_65536", 64 * 1024),
];

fn open_fs(dir: &TempDir) -> EdgeFs {
    let info = SystemInfo {
        disk_capacity: 256 << 20,
        disk_root_dir: dir.path().to_path_buf(),
        usable_memory: 4 << 20,
    };
    EdgeFs::init(&info).expect("init")
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_write");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let payload = vec![0xABu8; sz];
            // A fresh store per iteration keeps every write on the
            // first-allocation path instead of growing one chain.
            b.iter_batched(
                || {
                    let dir = TempDir::new().unwrap();
                    let fs = open_fs(&dir);
                    (dir, fs)
                },
                |(dir, mut fs)| {
                    black_box(fs.write("bench", &payload).expect("write"));
                    dir
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_read");

    for &(label, size) in SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), &size, |b, &sz| {
            let dir = TempDir::new().unwrap();
            let mut fs = open_fs(&dir);
            let payload = vec![0xCDu8; sz];
            fs.write("bench", &payload).expect("write");
            let mut out = vec![0u8; sz];
            b.iter(|| black_box(fs.read("bench", &mut out, 0).expect("read")));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
