// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Projection charts from `H^n` to 2D chart coordinates.

use canopy_kernel::{exp_map, hyperboloid, log_map};

/// A 2D chart over hyperbolic n-space.
///
/// Axis indices select which spatial coordinates (`1..=n` in the ambient
/// `R^{n+1}`) the chart emits; higher dimensions are sliced away. The
/// tangent chart carries its basepoint by value; the owning lens
/// re-anchors it whenever the focus moves.
#[derive(Clone, Debug, PartialEq)]
pub enum Chart {
    /// Log-map to the tangent plane at `basepoint`, emitting the chosen
    /// tangent components.
    Tangent {
        /// Chart origin on the manifold.
        basepoint: Vec<f64>,
        /// The two emitted ambient axes (spatial, `1..=n`).
        axes: (usize, usize),
    },
    /// Poincaré ball coordinates `pᵢ = xᵢ/(x₀+1)`, sliced to two axes.
    Poincare {
        /// The two emitted ambient axes (spatial, `1..=n`).
        axes: (usize, usize),
    },
    /// Klein coordinates `kᵢ = xᵢ/x₀`, sliced to two axes.
    Klein {
        /// The two emitted ambient axes (spatial, `1..=n`).
        axes: (usize, usize),
    },
}

impl Chart {
    /// Tangent chart anchored at the origin of dimension `dim`, emitting
    /// the first two spatial axes.
    #[must_use]
    pub fn tangent(dim: usize) -> Self {
        Self::Tangent {
            basepoint: hyperboloid::origin(dim),
            axes: (1, 2),
        }
    }

    /// Poincaré chart over the first two spatial axes.
    #[must_use]
    pub const fn poincare() -> Self {
        Self::Poincare { axes: (1, 2) }
    }

    /// Klein chart over the first two spatial axes.
    #[must_use]
    pub const fn klein() -> Self {
        Self::Klein { axes: (1, 2) }
    }

    /// The two ambient axes this chart emits.
    #[must_use]
    pub fn axes(&self) -> (usize, usize) {
        match self {
            Self::Tangent { axes, .. } | Self::Poincare { axes } | Self::Klein { axes } => *axes,
        }
    }

    /// Projects a manifold point to chart coordinates.
    #[must_use]
    pub fn project(&self, point: &[f64]) -> (f64, f64) {
        match self {
            Self::Tangent { basepoint, axes } => {
                let mut v = vec![0.0; point.len()];
                log_map(&mut v, basepoint, point);
                (v[axes.0], v[axes.1])
            }
            Self::Poincare { axes } => {
                let denom = point[0] + 1.0;
                (point[axes.0] / denom, point[axes.1] / denom)
            }
            Self::Klein { axes } => (point[axes.0] / point[0], point[axes.1] / point[0]),
        }
    }

    /// Inverts chart coordinates back to a manifold point of hyperbolic
    /// dimension `dim` where the chart supports it.
    ///
    /// Tangent charts exp the coordinates from their basepoint; Poincaré
    /// charts lift from the ball (`None` outside the open unit disk);
    /// Klein unprojection is not provided.
    #[must_use]
    pub fn unproject(&self, cx: f64, cy: f64, dim: usize) -> Option<Vec<f64>> {
        match self {
            Self::Tangent { basepoint, axes } => {
                debug_assert_eq!(basepoint.len(), dim + 1, "chart/point dimension mismatch");
                let n = basepoint.len();
                let mut v = vec![0.0; n];
                v[axes.0] = cx;
                v[axes.1] = cy;
                // Constrain to the actual tangent plane before exp.
                let mut tangent = vec![0.0; n];
                hyperboloid::tangent_project(&mut tangent, basepoint, &v);
                let mut out = vec![0.0; n];
                exp_map(&mut out, basepoint, &tangent);
                Some(out)
            }
            Self::Poincare { axes } => {
                let norm_sq = cx * cx + cy * cy;
                if norm_sq >= 1.0 {
                    return None;
                }
                // Ball → hyperboloid: x = (1 + |p|², 2p) / (1 − |p|²).
                let denom = 1.0 - norm_sq;
                let mut out = vec![0.0; dim + 1];
                out[0] = (1.0 + norm_sq) / denom;
                out[axes.0] = 2.0 * cx / denom;
                out[axes.1] = 2.0 * cy / denom;
                Some(out)
            }
            Self::Klein { .. } => None,
        }
    }

    /// Moves a tangent chart's anchor; other charts are unaffected.
    pub fn set_basepoint(&mut self, point: &[f64]) {
        if let Self::Tangent { basepoint, .. } = self {
            basepoint.clear();
            basepoint.extend_from_slice(point);
        }
    }

    /// Converts Poincaré ball coordinates to Klein coordinates.
    #[must_use]
    pub fn poincare_to_klein(px: f64, py: f64) -> (f64, f64) {
        let s = 2.0 / (1.0 + px * px + py * py);
        (s * px, s * py)
    }

    /// Converts Klein coordinates to Poincaré ball coordinates.
    #[must_use]
    pub fn klein_to_poincare(kx: f64, ky: f64) -> (f64, f64) {
        let norm_sq = kx * kx + ky * ky;
        let s = 1.0 / (1.0 + (1.0 - norm_sq).max(0.0).sqrt());
        (s * kx, s * ky)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_kernel::{dist, origin};

    fn point_along(dim: usize, axis: usize, t: f64) -> Vec<f64> {
        let o = origin(dim);
        let mut v = vec![0.0; dim + 1];
        v[axis] = t;
        let mut q = vec![0.0; dim + 1];
        exp_map(&mut q, &o, &v);
        q
    }

    #[test]
    fn tangent_chart_is_metric_at_the_basepoint() {
        let chart = Chart::tangent(2);
        let q = point_along(2, 1, 0.8);
        let (cx, cy) = chart.project(&q);
        assert!((cx - 0.8).abs() < 1e-9);
        assert!(cy.abs() < 1e-9);
    }

    #[test]
    fn tangent_unproject_round_trips() {
        let chart = Chart::tangent(3);
        let q = chart.unproject(0.4, -0.7, 3).unwrap();
        let (cx, cy) = chart.project(&q);
        assert!((cx - 0.4).abs() < 1e-6);
        assert!((cy + 0.7).abs() < 1e-6);
    }

    #[test]
    fn poincare_projects_into_unit_disk() {
        let chart = Chart::poincare();
        for t in [0.5, 2.0, 6.0] {
            let q = point_along(2, 1, t);
            let (px, py) = chart.project(&q);
            assert!(px * px + py * py < 1.0, "t = {t}");
        }
    }

    #[test]
    fn poincare_unproject_inverts_projection() {
        let chart = Chart::poincare();
        let q = point_along(2, 2, 1.3);
        let (px, py) = chart.project(&q);
        let lifted = chart.unproject(px, py, 2).unwrap();
        assert!(dist(&lifted, &q) < 1e-9);
        assert!(chart.unproject(0.8, 0.7, 2).is_none());
    }

    #[test]
    fn klein_has_no_unprojection() {
        let chart = Chart::klein();
        assert!(chart.unproject(0.1, 0.1, 2).is_none());
    }

    #[test]
    fn klein_poincare_round_trip() {
        for &(kx, ky) in &[(0.0, 0.0), (0.3, -0.2), (0.7, 0.6)] {
            let (px, py) = Chart::klein_to_poincare(kx, ky);
            let (bx, by) = Chart::poincare_to_klein(px, py);
            assert!((bx - kx).abs() < 1e-9);
            assert!((by - ky).abs() < 1e-9);
        }
    }

    #[test]
    fn rebasing_moves_the_tangent_origin() {
        let mut chart = Chart::tangent(2);
        let q = point_along(2, 1, 1.0);
        chart.set_basepoint(&q);
        let (cx, cy) = chart.project(&q);
        assert!(cx.abs() < 1e-9 && cy.abs() < 1e-9);
    }
}
