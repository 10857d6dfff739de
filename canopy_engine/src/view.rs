// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! View-side APIs: lenses, renderers, picking, labels, navigation.

use canopy_animate::{Animation, AnimationKind, Easing};
use canopy_export::url::{UrlState, decode_url_state, encode_url_state};
use canopy_lens::{Chart, Lens};
use canopy_pointset::PointFlags;
use canopy_render::{BatchRenderer, BatchStats, DrawCommand, RenderBatch};
use kurbo::{Point, Vec2};

use crate::{Engine, PointSetId, RendererEntry, RendererId};

/// Radius of the Poincaré disk a minimap click is clamped to.
const MINIMAP_CLAMP: f64 = 0.95;

/// A positioned text label for one visible point.
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    /// The labeled point.
    pub idx: usize,
    /// Screen x of the label anchor.
    pub x: f64,
    /// Screen y of the label anchor (above the node).
    pub y: f64,
    /// Label text (the point's name).
    pub text: String,
}

impl Engine {
    // -------------------------------------------------------------------
    // Lenses
    // -------------------------------------------------------------------

    /// Registers (or replaces) a lens under a key.
    pub fn create_lens(&mut self, key: &str) -> &mut Lens {
        let dim = self.dim();
        self.lenses.insert(key.to_owned(), Lens::new(dim));
        self.lenses.get_mut(key).expect("just inserted")
    }

    /// A lens by key.
    #[must_use]
    pub fn lens(&self, key: &str) -> Option<&Lens> {
        self.lenses.get(key)
    }

    /// Mutable access to a lens by key.
    pub fn lens_mut(&mut self, key: &str) -> Option<&mut Lens> {
        self.lenses.get_mut(key)
    }

    /// Makes a registered lens the active one.
    pub fn set_active_lens(&mut self, key: &str) -> bool {
        if self.lenses.contains_key(key) {
            key.clone_into(&mut self.active_lens);
            true
        } else {
            log::warn!("no lens {key:?}");
            false
        }
    }

    /// The active lens.
    #[must_use]
    pub fn active_lens(&self) -> &Lens {
        &self.lenses[&self.active_lens]
    }

    /// Mutable access to the active lens.
    pub fn active_lens_mut(&mut self) -> &mut Lens {
        self.lenses
            .get_mut(&self.active_lens)
            .expect("active lens always registered")
    }

    /// Installs a chart on a lens.
    pub fn set_lens_chart(&mut self, key: &str, chart: Chart) -> bool {
        match self.lenses.get_mut(key) {
            Some(lens) => {
                lens.set_chart(chart);
                true
            }
            None => false,
        }
    }

    /// Focuses a lens on a live point, moving the `FOCUS` flag with it.
    pub fn set_lens_focus(&mut self, key: &str, id: PointSetId, idx: usize) -> bool {
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        if !entry.ps.is_live(idx) {
            log::warn!("set_lens_focus: no point {idx}");
            return false;
        }
        let coords = entry.ps.coords_of(idx).to_vec();
        let previous: Vec<usize> = entry
            .ps
            .live_indices()
            .filter(|&i| entry.ps.has_flag(i, PointFlags::FOCUS))
            .collect();
        for i in previous {
            entry.ps.set_flag(i, PointFlags::FOCUS, false);
        }
        entry.ps.set_flag(idx, PointFlags::FOCUS, true);
        match self.lenses.get_mut(key) {
            Some(lens) => {
                lens.set_focus(&coords);
                true
            }
            None => false,
        }
    }

    /// Reshapes a lens viewport.
    pub fn set_lens_viewport(
        &mut self,
        key: &str,
        width: f64,
        height: f64,
        scale: f64,
        offset_x: f64,
        offset_y: f64,
    ) -> bool {
        let Some(lens) = self.lenses.get_mut(key) else {
            return false;
        };
        lens.viewport.width = width;
        lens.viewport.height = height;
        lens.viewport.scale = scale;
        lens.viewport.offset_x = offset_x;
        lens.viewport.offset_y = offset_y;
        true
    }

    /// Multiplicative zoom on the active lens.
    pub fn zoom_lens(&mut self, delta: f64) {
        self.active_lens_mut().zoom(delta);
    }

    /// Screen-space pan of the active lens focus.
    pub fn pan_lens(&mut self, dx: f64, dy: f64) {
        self.active_lens_mut().pan(Vec2::new(dx, dy));
    }

    // -------------------------------------------------------------------
    // Renderers
    // -------------------------------------------------------------------

    /// Registers a batch renderer bound to one point set.
    pub fn create_batch_renderer(
        &mut self,
        id: PointSetId,
        max_points: usize,
    ) -> Option<RendererId> {
        self.set(id)?;
        let rid = RendererId(self.renderers.len());
        self.renderers.push(RendererEntry {
            renderer: BatchRenderer::new(max_points),
            ps: id,
        });
        Some(rid)
    }

    /// Runs one render pass: budget decision, projection, ordering,
    /// command emission. Returns whether anything was reprojected.
    pub fn update_batch(&mut self, rid: RendererId, now_ms: f64) -> bool {
        let Some(entry) = self.renderers.get_mut(rid.0) else {
            return false;
        };
        let ps_id = entry.ps;
        let Some(lens) = self.lenses.get(&self.active_lens) else {
            return false;
        };
        let lens = lens.clone();
        let Some(set) = self.sets.get_mut(ps_id.0) else {
            return false;
        };
        let renderer = &mut self.renderers[rid.0].renderer;
        renderer.begin_frame(now_ms);
        renderer.update(&mut set.ps, &lens)
    }

    /// Records the frame's end time for the budget of the next frame.
    pub fn finish_frame(&mut self, rid: RendererId, now_ms: f64) {
        if let Some(entry) = self.renderers.get_mut(rid.0) {
            entry.renderer.end_frame(now_ms);
        }
    }

    /// Stats from the renderer's last pass.
    #[must_use]
    pub fn get_batch_stats(&self, rid: RendererId) -> Option<BatchStats> {
        Some(self.renderers.get(rid.0)?.renderer.batch().stats)
    }

    /// The renderer's current columnar batch.
    #[must_use]
    pub fn batch(&self, rid: RendererId) -> Option<&RenderBatch> {
        Some(self.renderers.get(rid.0)?.renderer.batch())
    }

    /// The renderer's current command list.
    #[must_use]
    pub fn commands(&self, rid: RendererId) -> Option<&[DrawCommand]> {
        Some(self.renderers.get(rid.0)?.renderer.commands())
    }

    // -------------------------------------------------------------------
    // Picking, density, labels
    // -------------------------------------------------------------------

    /// The nearest point within `threshold` pixels of a screen position,
    /// through the active lens.
    #[must_use]
    pub fn pick_at_screen(
        &self,
        id: PointSetId,
        sx: f64,
        sy: f64,
        threshold: f64,
    ) -> Option<usize> {
        let entry = self.set(id)?;
        self.active_lens()
            .pick_at_screen(&entry.ps, Point::new(sx, sy), threshold)
    }

    /// Density of the set's field at a screen position, where the active
    /// chart supports unprojection.
    #[must_use]
    pub fn sample_density_at(&self, id: PointSetId, sx: f64, sy: f64) -> Option<f64> {
        let entry = self.set(id)?;
        let point = self.active_lens().unproject_screen(Point::new(sx, sy))?;
        Some(entry.field.eval_density(&entry.ps, &point))
    }

    /// Samples the set's density field over the viewport grid; row-major
    /// `resolution × resolution` values.
    #[must_use]
    pub fn get_density_grid(&self, id: PointSetId, resolution: usize) -> Option<Vec<f32>> {
        let entry = self.set(id)?;
        let lens = self.active_lens();
        Some(lens.sample_density_grid(resolution, |p| entry.field.eval_density(&entry.ps, p)))
    }

    /// Screen-space polyline for the geodesic edge between two live
    /// points, through the active lens.
    ///
    /// Backends that render curved geodesics (Poincaré/Klein views) draw
    /// this polyline instead of the straight edge from the batch.
    #[must_use]
    pub fn project_edge_geodesic(
        &self,
        id: PointSetId,
        i: usize,
        j: usize,
        segments: usize,
    ) -> Option<Vec<Point>> {
        let entry = self.set(id)?;
        if !entry.ps.is_live(i) || !entry.ps.is_live(j) {
            return None;
        }
        Some(
            self.active_lens()
                .sample_edge(entry.ps.coords_of(i), entry.ps.coords_of(j), segments),
        )
    }

    /// Positioned labels for the closest LOD tiers, through the active
    /// lens, capped at `max` entries.
    #[must_use]
    pub fn get_labels(&self, id: PointSetId, max: usize) -> Vec<Label> {
        let Some(entry) = self.set(id) else {
            return Vec::new();
        };
        let lens = self.active_lens();
        let mut labels = Vec::new();
        for p in lens.project_points(&entry.ps, |i| -(entry.ps.depth_of(i) as f64)) {
            if labels.len() >= max {
                break;
            }
            // Only the two nearest tiers are labeled.
            if p.lod <= 1 {
                labels.push(Label {
                    idx: p.idx,
                    x: p.screen.x,
                    y: p.screen.y - 8.0,
                    text: entry.ps.name_of(p.idx).to_owned(),
                });
            }
        }
        labels
    }

    // -------------------------------------------------------------------
    // Animation
    // -------------------------------------------------------------------

    /// Animates the active lens focus to a live point along the geodesic.
    ///
    /// Also moves the `FOCUS` flag immediately. Returns the animation id.
    pub fn animate_focus_to(
        &mut self,
        id: PointSetId,
        idx: usize,
        duration_ms: f64,
    ) -> Option<u64> {
        let entry = self.set_mut(id)?;
        if !entry.ps.is_live(idx) {
            return None;
        }
        let previous: Vec<usize> = entry
            .ps
            .live_indices()
            .filter(|&i| entry.ps.has_flag(i, PointFlags::FOCUS))
            .collect();
        for i in previous {
            entry.ps.set_flag(i, PointFlags::FOCUS, false);
        }
        entry.ps.set_flag(idx, PointFlags::FOCUS, true);
        let to = entry.ps.coords_of(idx).to_vec();
        let from = self.active_lens().focus().to_vec();
        let anim = Animation::new(
            AnimationKind::GeodesicFocus { from, to },
            duration_ms,
            Easing::InOutCubic,
        );
        Some(self.animations.add(anim))
    }

    /// Advances all animations against the active lens and one set.
    pub fn tick_animations(&mut self, id: PointSetId, now_ms: f64) {
        let Some(set_index) = self.set(id).map(|_| id.0) else {
            return;
        };
        let Some(lens) = self.lenses.get_mut(&self.active_lens) else {
            return;
        };
        let set = &mut self.sets[set_index];
        self.animations.tick(now_ms, lens, &mut set.ps);
    }

    /// Whether any animation is still running.
    #[must_use]
    pub fn has_animations(&self) -> bool {
        !self.animations.is_empty()
    }

    /// Cancels one animation by id (idempotent).
    pub fn cancel_animation(&mut self, anim_id: u64) -> bool {
        self.animations.cancel(anim_id)
    }

    /// Cancels every animation.
    pub fn cancel_animations(&mut self) {
        self.animations.cancel_all();
    }

    // -------------------------------------------------------------------
    // Navigation: minimap and URL state
    // -------------------------------------------------------------------

    /// Handles a click at `(x, y)` on a `width × height` minimap.
    ///
    /// The click maps to Poincaré disk coordinates, clamps to radius
    /// 0.95, lifts to the hyperboloid, and animates the active lens focus
    /// there. Returns the animation id.
    pub fn minimap_click(
        &mut self,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        duration_ms: f64,
    ) -> Option<u64> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let mut nx = 2.0 * x / width - 1.0;
        let mut ny = 2.0 * y / height - 1.0;
        let r = (nx * nx + ny * ny).sqrt();
        if r > MINIMAP_CLAMP {
            nx *= MINIMAP_CLAMP / r;
            ny *= MINIMAP_CLAMP / r;
        }
        let target = Chart::poincare().unproject(nx, ny, self.dim())?;
        let from = self.active_lens().focus().to_vec();
        let anim = Animation::new(
            AnimationKind::GeodesicFocus { from, to: target },
            duration_ms,
            Easing::InOutCubic,
        );
        Some(self.animations.add(anim))
    }

    /// Encodes the active lens into a URL fragment, naming the focused
    /// point of `id` when one exists.
    #[must_use]
    pub fn url_fragment(&self, id: PointSetId) -> String {
        let lens = self.active_lens();
        let name = self.set(id).and_then(|entry| {
            entry
                .ps
                .live_indices()
                .find(|&i| entry.ps.has_flag(i, PointFlags::FOCUS))
                .map(|i| entry.ps.name_of(i).to_owned())
        });
        encode_url_state(lens.focus(), lens.viewport.scale, name.as_deref())
    }

    /// Applies a URL fragment to the active lens: focus and scale, plus
    /// the named focus point when it resolves.
    pub fn apply_url_fragment(&mut self, id: PointSetId, fragment: &str) -> bool {
        let Some(UrlState { focus, scale, name }) = decode_url_state(fragment, self.dim()) else {
            log::warn!("malformed url fragment");
            return false;
        };
        let lens = self.active_lens_mut();
        lens.viewport.scale = scale.clamp(10.0, 1000.0);
        lens.set_focus(&focus);
        if let Some(name) = name
            && let Some(entry) = self.set(id)
            && let Some(idx) = entry.ps.index_of(&name)
        {
            let key = self.active_lens.clone();
            self.set_lens_focus(&key, id, idx);
        }
        true
    }
}
