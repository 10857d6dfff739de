// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the Canopy benchmarks.

use canopy_kernel::{exp_map, origin};
use canopy_pointset::PointSet;

/// Numerical Recipes LCG; deterministic benchmark inputs.
#[derive(Clone, Debug)]
pub struct Lcg(pub u64);

impl Lcg {
    /// Uniform value in `[-1, 1]`.
    pub fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.0 >> 32) as f64 / f64::from(u32::MAX)) * 2.0 - 1.0
    }
}

/// Builds a deterministic cloud of `n` root points inside a tangent ball
/// of radius ~2.
pub fn random_cloud(dim: usize, n: usize, seed: u64) -> PointSet {
    let mut ps = PointSet::new(dim, n);
    let mut rng = Lcg(seed);
    let o = origin(dim);
    let mut tangent = vec![0.0; dim + 1];
    let mut q = vec![0.0; dim + 1];
    for i in 0..n {
        for t in tangent.iter_mut().skip(1) {
            *t = rng.next_unit() * 2.0 / (dim as f64).sqrt();
        }
        exp_map(&mut q, &o, &tangent);
        ps.add_point(&format!("p{i}"), None, Some(&q)).unwrap();
    }
    ps
}

/// Builds a deterministic tree of `n` points with random parents.
pub fn random_tree(dim: usize, n: usize, seed: u64) -> PointSet {
    let mut ps = PointSet::new(dim, n);
    let mut rng = Lcg(seed);
    ps.add_point("root", None, None).unwrap();
    let mut tangent = vec![0.0; dim + 1];
    for i in 1..n {
        let parent = ((rng.next_unit() + 1.0) / 2.0 * i as f64) as usize % i;
        for t in tangent.iter_mut().skip(1) {
            *t = rng.next_unit() * 0.5;
        }
        ps.add_child_along(&format!("n{i}"), parent, &tangent)
            .unwrap();
    }
    ps
}
