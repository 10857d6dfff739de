// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_benches::random_cloud;
use canopy_kernel::{dist, exp_map, log_map, origin};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_dist(c: &mut Criterion) {
    let ps = random_cloud(3, 1024, 7);
    c.bench_function("kernel/dist_1k_pairs", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            for i in 0..1023 {
                acc += dist(ps.coords_of(i), ps.coords_of(i + 1));
            }
            black_box(acc)
        });
    });
}

fn bench_exp_log_roundtrip(c: &mut Criterion) {
    let ps = random_cloud(3, 256, 13);
    let o = origin(3);
    c.bench_function("kernel/exp_log_roundtrip", |b| {
        let mut v = vec![0.0; 4];
        let mut q = vec![0.0; 4];
        b.iter(|| {
            for i in 0..256 {
                log_map(&mut v, &o, ps.coords_of(i));
                exp_map(&mut q, &o, &v);
            }
            black_box(q[0])
        });
    });
}

criterion_group!(benches, bench_dist, bench_exp_log_roundtrip);
criterion_main!(benches);
