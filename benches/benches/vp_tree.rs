// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_benches::random_cloud;
use canopy_index::VpIndex;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn bench_build(c: &mut Criterion) {
    let ps = random_cloud(5, 4096, 99);
    c.bench_function("vp_tree/build_4k", |b| {
        b.iter_batched(
            VpIndex::new,
            |mut index| {
                index.rebuild(&ps);
                black_box(index)
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_knn_vs_scan(c: &mut Criterion) {
    let ps = random_cloud(5, 4096, 42);
    let mut index = VpIndex::new();
    index.rebuild(&ps);

    c.bench_function("vp_tree/knn8", |b| {
        b.iter(|| black_box(index.k_nearest(&ps, 17, 8)));
    });
    c.bench_function("vp_tree/knn8_linear_scan", |b| {
        b.iter(|| black_box(ps.k_nearest(17, 8)));
    });
}

criterion_group!(benches, bench_build, bench_knn_vs_scan);
criterion_main!(benches);
