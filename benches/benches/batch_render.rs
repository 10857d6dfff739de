// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_benches::random_tree;
use canopy_lens::Lens;
use canopy_render::{BatchRenderer, DirtyFlags};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_full_projection(c: &mut Criterion) {
    let mut ps = random_tree(2, 4096, 3);
    let lens = Lens::new(2);
    let mut renderer = BatchRenderer::new(4096);
    c.bench_function("render/full_4k", |b| {
        b.iter(|| {
            renderer.mark_all_dirty();
            renderer.begin_frame(0.0);
            let changed = renderer.update(&mut ps, &lens);
            renderer.end_frame(1.0);
            black_box(changed)
        });
    });
}

fn bench_incremental_projection(c: &mut Criterion) {
    let mut ps = random_tree(2, 4096, 5);
    let lens = Lens::new(2);
    let mut renderer = BatchRenderer::new(4096);
    renderer.begin_frame(0.0);
    renderer.update(&mut ps, &lens);
    renderer.end_frame(1.0);

    c.bench_function("render/incremental_16_dirty", |b| {
        b.iter(|| {
            for i in 0..16 {
                renderer.mark_dirty(i * 250, DirtyFlags::COORDS);
            }
            renderer.begin_frame(2.0);
            let changed = renderer.update(&mut ps, &lens);
            renderer.end_frame(3.0);
            black_box(changed)
        });
    });
}

criterion_group!(benches, bench_full_projection, bench_incremental_projection);
criterion_main!(benches);
