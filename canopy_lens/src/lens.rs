// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The lens: chart + focus + viewport + aperture + LOD policy.

use canopy_kernel::{MAX_DIST, exp_map, hyperboloid};
use canopy_pointset::PointSet;
use kurbo::{Point, Vec2};

use crate::chart::Chart;
use crate::viewport::Viewport;
use crate::LOD_CULLED;

/// Distance window outside which points are culled outright.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aperture {
    /// Minimum distance from the focus; closer points are culled.
    pub near: f64,
    /// Maximum distance from the focus; farther points are culled.
    pub far: f64,
}

impl Default for Aperture {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: MAX_DIST,
        }
    }
}

/// One point's projection result.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectedPoint {
    /// Index into the point set.
    pub idx: usize,
    /// Screen position in pixels.
    pub screen: Point,
    /// Raw chart coordinates before the viewport mapping.
    pub chart: (f64, f64),
    /// Hyperbolic distance from the lens focus.
    pub dist: f64,
    /// LOD bucket, `0..=2` visible tiers, `3` culled.
    pub lod: u8,
    /// Caller-supplied sort priority (higher first).
    pub priority: f64,
}

/// A configured view into hyperbolic space.
///
/// The lens owns its focus coordinates. Setting the focus re-anchors a
/// tangent chart, so the chart origin always tracks the point the user is
/// looking at.
#[derive(Clone, Debug, PartialEq)]
pub struct Lens {
    chart: Chart,
    focus: Vec<f64>,
    /// Chart-to-screen mapping.
    pub viewport: Viewport,
    /// Near/far culling window.
    pub aperture: Aperture,
    lod_thresholds: [f64; 3],
}

impl Lens {
    /// Creates a lens of hyperbolic dimension `dim`: tangent chart
    /// anchored at the origin, default viewport and aperture, and LOD
    /// thresholds `[1.5, 3.5, 7.0]`.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self {
            chart: Chart::tangent(dim),
            focus: hyperboloid::origin(dim),
            viewport: Viewport::default(),
            aperture: Aperture::default(),
            lod_thresholds: [1.5, 3.5, 7.0],
        }
    }

    /// Hyperbolic dimension of the viewed space.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.focus.len() - 1
    }

    /// The active chart.
    #[must_use]
    pub fn chart(&self) -> &Chart {
        &self.chart
    }

    /// Installs a chart; tangent charts are re-anchored to the focus.
    pub fn set_chart(&mut self, mut chart: Chart) {
        chart.set_basepoint(&self.focus);
        self.chart = chart;
    }

    /// The current focus point.
    #[must_use]
    pub fn focus(&self) -> &[f64] {
        &self.focus
    }

    /// Moves the focus, re-anchoring a tangent chart.
    pub fn set_focus(&mut self, coords: &[f64]) {
        debug_assert_eq!(coords.len(), self.focus.len(), "focus dimension mismatch");
        self.focus.copy_from_slice(coords);
        self.chart.set_basepoint(&self.focus);
    }

    /// The three LOD distance thresholds, ascending.
    #[must_use]
    pub fn lod_thresholds(&self) -> [f64; 3] {
        self.lod_thresholds
    }

    /// Replaces the LOD thresholds (sorted ascending before use).
    pub fn set_lod_thresholds(&mut self, mut thresholds: [f64; 3]) {
        thresholds.sort_by(f64::total_cmp);
        self.lod_thresholds = thresholds;
    }

    /// Returns `true` when the point falls inside the aperture window.
    #[must_use]
    pub fn point_visible(&self, point: &[f64]) -> bool {
        let d = hyperboloid::dist(&self.focus, point);
        self.aperture.near <= d && d <= self.aperture.far
    }

    /// LOD bucket for a point: a monotone step function of its distance
    /// to the focus. `3` means culled.
    #[must_use]
    pub fn lod_of(&self, point: &[f64]) -> u8 {
        self.lod_for_dist(hyperboloid::dist(&self.focus, point))
    }

    /// LOD bucket for a precomputed distance.
    #[must_use]
    pub fn lod_for_dist(&self, d: f64) -> u8 {
        let [t1, t2, t3] = self.lod_thresholds;
        if d < t1 {
            0
        } else if d < t2 {
            1
        } else if d < t3 {
            2
        } else {
            LOD_CULLED
        }
    }

    /// Projects one manifold point to screen pixels.
    #[must_use]
    pub fn project_point(&self, point: &[f64]) -> Point {
        let (cx, cy) = self.chart.project(point);
        self.viewport.chart_to_screen(cx, cy)
    }

    /// Projects every visible point inside the aperture.
    ///
    /// `priority` supplies the per-point sort key; results come back in
    /// priority-descending order. Points outside the aperture (near or
    /// far) are filtered out entirely.
    pub fn project_points<F>(&self, ps: &PointSet, priority: F) -> Vec<ProjectedPoint>
    where
        F: Fn(usize) -> f64,
    {
        let mut out = Vec::with_capacity(ps.count());
        for i in ps.visible() {
            let p = ps.coords_of(i);
            let d = hyperboloid::dist(&self.focus, p);
            if d < self.aperture.near || d > self.aperture.far {
                continue;
            }
            let (cx, cy) = self.chart.project(p);
            out.push(ProjectedPoint {
                idx: i,
                screen: self.viewport.chart_to_screen(cx, cy),
                chart: (cx, cy),
                dist: d,
                lod: self.lod_for_dist(d),
                priority: priority(i),
            });
        }
        out.sort_by(|a, b| b.priority.total_cmp(&a.priority));
        out
    }

    /// Inverts a screen position to a manifold point where the chart
    /// allows it.
    #[must_use]
    pub fn unproject_screen(&self, screen: Point) -> Option<Vec<f64>> {
        let (cx, cy) = self.viewport.screen_to_chart(screen);
        self.chart.unproject(cx, cy, self.dim())
    }

    /// Nearest projected point within `threshold` pixels of `screen`.
    #[must_use]
    pub fn pick_at_screen(&self, ps: &PointSet, screen: Point, threshold: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for i in ps.visible() {
            let p = ps.coords_of(i);
            if !self.point_visible(p) {
                continue;
            }
            let s = self.project_point(p);
            let d = (s - screen).hypot();
            if d <= threshold && best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Pans the focus by a screen-space delta.
    ///
    /// The delta is converted to chart units, interpreted as a tangent
    /// step along the chart axes at the focus, and applied with the
    /// exponential map. A zero delta is the identity.
    pub fn pan(&mut self, delta: Vec2) {
        if delta.x == 0.0 && delta.y == 0.0 {
            return;
        }
        let n = self.focus.len();
        let (ax, ay) = self.chart.axes();
        let mut ambient = vec![0.0; n];
        ambient[ax] = delta.x / self.viewport.scale;
        ambient[ay] = delta.y / self.viewport.scale;
        let mut tangent = vec![0.0; n];
        hyperboloid::tangent_project(&mut tangent, &self.focus, &ambient);
        let mut next = vec![0.0; n];
        exp_map(&mut next, &self.focus, &tangent);
        self.set_focus(&next);
    }

    /// Multiplicative zoom, clamped; see [`Viewport::zoom_by`].
    pub fn zoom(&mut self, delta: f64) {
        self.viewport.zoom_by(delta);
    }

    /// Samples the geodesic between two manifold points as a screen-space
    /// polyline with `segments + 1` vertices.
    ///
    /// Straight lines are only faithful in the tangent chart near its
    /// basepoint; Poincaré and Klein views draw curved geodesics, and
    /// this gives the polyline to approximate them with.
    #[must_use]
    pub fn sample_edge(&self, a: &[f64], b: &[f64], segments: usize) -> Vec<Point> {
        let segments = segments.max(1);
        let mut out = Vec::with_capacity(segments + 1);
        let mut waypoint = vec![0.0; a.len()];
        for s in 0..=segments {
            let t = s as f64 / segments as f64;
            hyperboloid::geodesic_lerp(&mut waypoint, a, b, t);
            out.push(self.project_point(&waypoint));
        }
        out
    }

    /// Samples a scalar field over the viewport-aligned tangent grid.
    ///
    /// The viewport is divided into `resolution × resolution` cells; each
    /// cell center is unprojected to chart coordinates, exp-ed from the
    /// focus along the chart axes, and handed to `eval`. Returns
    /// row-major `f32` values.
    pub fn sample_density_grid<F>(&self, resolution: usize, mut eval: F) -> Vec<f32>
    where
        F: FnMut(&[f64]) -> f64,
    {
        let n = self.focus.len();
        let (ax, ay) = self.chart.axes();
        let mut out = Vec::with_capacity(resolution * resolution);
        let mut ambient = vec![0.0; n];
        let mut tangent = vec![0.0; n];
        let mut sample = vec![0.0; n];
        for row in 0..resolution {
            for col in 0..resolution {
                let sx = (col as f64 + 0.5) * self.viewport.width / resolution as f64;
                let sy = (row as f64 + 0.5) * self.viewport.height / resolution as f64;
                let (cx, cy) = self.viewport.screen_to_chart(Point::new(sx, sy));
                ambient.fill(0.0);
                ambient[ax] = cx;
                ambient[ay] = cy;
                hyperboloid::tangent_project(&mut tangent, &self.focus, &ambient);
                exp_map(&mut sample, &self.focus, &tangent);
                out.push(eval(&sample) as f32);
            }
        }
        out
    }
}
