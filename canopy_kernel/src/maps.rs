// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exponential and logarithmic maps and parallel transport.
//!
//! The exp map realizes geodesics: starting at a point `p` with a tangent
//! vector `v` (spacelike, `⟨p,v⟩_L = 0`), `exp_p(v)` is the point reached
//! by traveling `‖v‖` along the geodesic in direction `v`. The log map is
//! its local inverse. Together they let the rest of the workspace express
//! motion, interpolation, and gradient flow directly on the manifold.

use crate::minkowski::minkowski_dot;
use crate::{EPS, hyperboloid};

/// Exponential map: writes `exp_p(v)` into `out`.
///
/// For `‖v‖² < EPS²` the result is `p` itself. Otherwise
/// `out = cosh(s)·p + (sinh(s)/s)·v` with `s = ‖v‖`, renormalized onto
/// the sheet.
pub fn exp_map(out: &mut [f64], p: &[f64], v: &[f64]) {
    exp_map_scaled(out, p, v, 1.0);
}

/// Exponential map with a scalar parameter: `exp_p(t·v)`.
pub fn exp_map_scaled(out: &mut [f64], p: &[f64], v: &[f64], t: f64) {
    let norm_sq = minkowski_dot(v, v);
    if norm_sq < EPS * EPS {
        out.copy_from_slice(p);
        return;
    }
    let s = norm_sq.sqrt() * t;
    if s.abs() < EPS {
        out.copy_from_slice(p);
        return;
    }
    let inv_norm = 1.0 / norm_sq.sqrt();
    let a = s.cosh();
    let b = s.sinh() * inv_norm;
    for i in 0..out.len() {
        out[i] = a * p[i] + b * v[i];
    }
    hyperboloid::normalize_hyperboloid(out);
}

/// Logarithmic map: writes `log_p(q)` into `out`.
///
/// Returns the tangent vector at `p` whose exp reaches `q`. Coincident
/// points (where `−⟨p,q⟩_L ≤ 1`) yield the zero vector.
pub fn log_map(out: &mut [f64], p: &[f64], q: &[f64]) {
    let dot = minkowski_dot(p, q);
    let c = -dot;
    if c <= 1.0 {
        out.fill(0.0);
        return;
    }
    let d = c.acosh();
    let sh = d.sinh();
    let factor = d / sh;
    for i in 0..out.len() {
        out[i] = factor * (q[i] + dot * p[i]);
    }
}

/// Unit-direction variant of the log map.
///
/// Writes the tangent-normalized direction from `p` toward `q` into `out`
/// and returns the hyperbolic distance. Coincident points yield a zero
/// vector and distance `0`.
pub fn log_map_direction(out: &mut [f64], p: &[f64], q: &[f64]) -> f64 {
    log_map(out, p, q);
    let norm_sq = minkowski_dot(out, out);
    if norm_sq < EPS * EPS {
        out.fill(0.0);
        return 0.0;
    }
    let norm = norm_sq.sqrt();
    let inv = 1.0 / norm;
    for v in out.iter_mut() {
        *v *= inv;
    }
    norm
}

/// Builds an orthonormal basis of a 2D tangent plane at `p` from two
/// ambient spatial axes.
///
/// `e1` is the normalized tangent projection of the `axis_a` unit vector;
/// `e2` is the `axis_b` unit vector projected, orthogonalized against
/// `e1`, and normalized. Offsets expressed in this basis keep their
/// Euclidean length as true tangent norms, so `exp_p(r·(cos θ·e1 +
/// sin θ·e2))` lands exactly at distance `r`.
pub fn tangent_basis(p: &[f64], axis_a: usize, axis_b: usize, e1: &mut [f64], e2: &mut [f64]) {
    let n = p.len();
    let mut ambient = vec![0.0; n];
    ambient[axis_a] = 1.0;
    hyperboloid::tangent_project(e1, p, &ambient);
    let norm = minkowski_dot(e1, e1).sqrt();
    for v in e1.iter_mut() {
        *v /= norm;
    }
    ambient.fill(0.0);
    ambient[axis_b] = 1.0;
    hyperboloid::tangent_project(e2, p, &ambient);
    let overlap = minkowski_dot(e2, e1);
    for i in 0..n {
        e2[i] -= overlap * e1[i];
    }
    let norm = minkowski_dot(e2, e2).sqrt();
    for v in e2.iter_mut() {
        *v /= norm;
    }
}

/// Parallel transport of `v ∈ T_pH^n` along the geodesic from `p` to `q`.
///
/// Uses the standard two-log formula: with `u = log_p(q)` and
/// `w = log_q(p)`, `out = v − (⟨v,u⟩_L/d²)·(u + w)`, followed by a tangent
/// projection onto `T_qH^n` to scrub residual drift. When `p` and `q`
/// coincide the transport is the identity.
pub fn parallel_transport(out: &mut [f64], p: &[f64], q: &[f64], v: &[f64]) {
    let d = hyperboloid::dist(p, q);
    if d < EPS {
        out.copy_from_slice(v);
        return;
    }
    let n = out.len();
    let mut u = vec![0.0; n];
    let mut w = vec![0.0; n];
    log_map(&mut u, p, q);
    log_map(&mut w, q, p);
    let c = minkowski_dot(v, &u) / (d * d);
    for i in 0..n {
        out[i] = v[i] - c * (u[i] + w[i]);
    }
    // Project onto T_q in place.
    let drift = minkowski_dot(q, out);
    for i in 0..n {
        out[i] += drift * q[i];
    }
}
