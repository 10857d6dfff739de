// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Field: scalar fields over hyperbolic point sets.
//!
//! A [`ScalarField`] treats every visible point of a set as a kernel
//! source and evaluates their summed contribution anywhere on the
//! manifold. Density drives the attention shading in the viewer and the
//! `gradient_flow` operator; the gradient is estimated numerically and
//! projected into the tangent space of the evaluation point, so
//! downstream code can feed it straight into the exponential map.
//!
//! All kernels are even, positive, and decreasing in distance; see
//! [`FieldKernel`] for the closed set.

use canopy_kernel::{EPS, hyperboloid, maps};
use canopy_pointset::PointSet;
use hashbrown::HashMap;

/// Central-difference step for the numeric kernel derivative.
const GRAD_H: f64 = 0.01;

/// The closed set of field kernels.
///
/// Every kernel takes the hyperbolic distance `d` and a scale `σ` and
/// yields a non-negative contribution that decreases in `d`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldKernel {
    /// `exp(−d²/(2σ²))`: smooth, infinite support.
    Gaussian,
    /// `1/(1 + cosh(d/σ))`: heavier tail matched to hyperbolic growth.
    Hyperbolic,
    /// `exp(−1/(1−(d/σ)²))` for `d < σ`, else `0`: compact support.
    Bump,
    /// `(1 + d/σ)^(−α)`: polynomial decay with tunable exponent.
    Power {
        /// Decay exponent `α`.
        alpha: f64,
    },
}

impl FieldKernel {
    /// Evaluates the kernel at distance `d` with scale `sigma`.
    #[must_use]
    pub fn eval(&self, d: f64, sigma: f64) -> f64 {
        let sigma = sigma.max(EPS);
        match self {
            Self::Gaussian => (-d * d / (2.0 * sigma * sigma)).exp(),
            Self::Hyperbolic => 1.0 / (1.0 + (d / sigma).cosh()),
            Self::Bump => {
                let r = d / sigma;
                if r.abs() < 1.0 {
                    (-1.0 / (1.0 - r * r)).exp()
                } else {
                    0.0
                }
            }
            Self::Power { alpha } => (1.0 + d / sigma).powf(-alpha),
        }
    }
}

/// A density/attention field over one point set.
///
/// Sources default to weight `1` and the global `sigma`; both can be
/// overridden per point for weighted fields.
#[derive(Clone, Debug)]
pub struct ScalarField {
    kernel: FieldKernel,
    sigma: f64,
    weights: HashMap<usize, f64>,
    sigmas: HashMap<usize, f64>,
}

impl ScalarField {
    /// Creates a field with the given kernel and global scale.
    #[must_use]
    pub fn new(kernel: FieldKernel, sigma: f64) -> Self {
        Self {
            kernel,
            sigma,
            weights: HashMap::new(),
            sigmas: HashMap::new(),
        }
    }

    /// The kernel in use.
    #[must_use]
    pub fn kernel(&self) -> FieldKernel {
        self.kernel
    }

    /// The global kernel scale.
    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Overrides the weight of one source point.
    pub fn set_weight(&mut self, idx: usize, weight: f64) {
        self.weights.insert(idx, weight);
    }

    /// Overrides the kernel scale of one source point.
    pub fn set_sigma_override(&mut self, idx: usize, sigma: f64) {
        self.sigmas.insert(idx, sigma);
    }

    fn weight_of(&self, idx: usize) -> f64 {
        self.weights.get(&idx).copied().unwrap_or(1.0)
    }

    fn sigma_of(&self, idx: usize) -> f64 {
        self.sigmas.get(&idx).copied().unwrap_or(self.sigma)
    }

    /// Summed kernel contribution of every visible point at `x`.
    #[must_use]
    pub fn eval_density(&self, ps: &PointSet, x: &[f64]) -> f64 {
        let mut acc = 0.0;
        for i in ps.visible() {
            let d = ps.dist_to(i, x);
            acc += self.weight_of(i) * self.kernel.eval(d, self.sigma_of(i));
        }
        acc
    }

    /// Numeric density gradient at `x`, written into `out` as a vector in
    /// `T_xH^n`.
    ///
    /// For each source at distance `d > EPS` the kernel slope is estimated
    /// by the central difference `(k(d−h) − k(d+h)) / 2h` and accumulated
    /// along the unit log direction from `x` toward the source, so the
    /// result points uphill (toward mass). Sources closer than `EPS`
    /// contribute no direction and are skipped.
    pub fn gradient(&self, ps: &PointSet, x: &[f64], out: &mut [f64]) {
        out.fill(0.0);
        let n = x.len();
        let mut dir = vec![0.0; n];
        for i in ps.visible() {
            let d = ps.dist_to(i, x);
            if d < EPS {
                continue;
            }
            let sigma = self.sigma_of(i);
            let slope = (self.kernel.eval(d - GRAD_H, sigma) - self.kernel.eval(d + GRAD_H, sigma))
                / (2.0 * GRAD_H);
            let len = maps::log_map_direction(&mut dir, x, ps.coords_of(i));
            if len < EPS {
                continue;
            }
            let w = self.weight_of(i) * slope;
            for j in 0..n {
                out[j] += w * dir[j];
            }
        }
        // Accumulated directions already live near T_x; scrub drift.
        let mut projected = vec![0.0; n];
        hyperboloid::tangent_project(&mut projected, x, out);
        out.copy_from_slice(&projected);
    }

    /// Tangent norm of the density gradient; high where density changes
    /// fastest ("hotspots").
    #[must_use]
    pub fn hotspot(&self, ps: &PointSet, x: &[f64]) -> f64 {
        let mut g = vec![0.0; x.len()];
        self.gradient(ps, x, &mut g);
        canopy_kernel::minkowski_dot(&g, &g).max(0.0).sqrt()
    }

    /// Density contributed by tree edges rather than points.
    ///
    /// Each parent→child geodesic is sampled at `n_samples` interior
    /// points that contribute Gaussian kernels at the global scale.
    #[must_use]
    pub fn edge_density(&self, ps: &PointSet, x: &[f64], n_samples: usize) -> f64 {
        if n_samples == 0 {
            return 0.0;
        }
        let stride = ps.stride();
        let mut sample = vec![0.0; stride];
        let mut acc = 0.0;
        for i in ps.visible() {
            let Some(parent) = ps.parent_of(i) else {
                continue;
            };
            let a = ps.coords_of(parent);
            let b = ps.coords_of(i);
            for s in 0..n_samples {
                let t = (s + 1) as f64 / (n_samples + 1) as f64;
                hyperboloid::geodesic_lerp(&mut sample, a, b, t);
                let d = hyperboloid::dist(&sample, x);
                acc += FieldKernel::Gaussian.eval(d, self.sigma);
            }
        }
        acc
    }
}
