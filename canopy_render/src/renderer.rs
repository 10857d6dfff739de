// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The renderer: dirty sync, projection passes, ordering, commands.

use canopy_lens::{LOD_CULLED, Lens};
use canopy_pointset::{PointFlags, PointSet};

use crate::batch::{DrawCommand, LodGroup, RenderBatch};
use crate::budget::{BudgetDecision, FrameBudget};
use crate::{DirtyFlags, LOD_RADIUS};

/// Incremental projector from a point set into a [`RenderBatch`].
///
/// Drive it once per display frame:
///
/// 1. [`BatchRenderer::begin_frame`] with the frame's start time: picks
///    the budget tier from the previous frame's duration.
/// 2. [`BatchRenderer::update`] with the point set and lens: projects,
///    sorts, projects edges, and rebuilds the command list.
/// 3. [`BatchRenderer::end_frame`] with the frame's end time: records
///    the duration that throttles the next frame.
#[derive(Debug)]
pub struct BatchRenderer {
    batch: RenderBatch,
    dirty: Vec<DirtyFlags>,
    dirty_count: usize,
    dist: Vec<f64>,
    budget: FrameBudget,
    decision: BudgetDecision,
    last_frame_ms: f64,
    frame_start_ms: Option<f64>,
    seen_lens: Option<Lens>,
    seen_version: u64,
    commands: Vec<DrawCommand>,
}

impl BatchRenderer {
    /// Creates a renderer with columns for `max_points` points.
    #[must_use]
    pub fn new(max_points: usize) -> Self {
        let budget = FrameBudget::default();
        let decision = budget.decide(0.0);
        Self {
            batch: RenderBatch::new(max_points),
            dirty: vec![DirtyFlags::empty(); max_points],
            dirty_count: 0,
            dist: vec![f64::INFINITY; max_points],
            budget,
            decision,
            last_frame_ms: 0.0,
            frame_start_ms: None,
            seen_lens: None,
            seen_version: 0,
            commands: Vec::new(),
        }
    }

    /// The columnar output of the last update.
    #[must_use]
    pub fn batch(&self) -> &RenderBatch {
        &self.batch
    }

    /// The command list of the last update, in submission order.
    #[must_use]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// The budget policy.
    #[must_use]
    pub fn budget(&self) -> FrameBudget {
        self.budget
    }

    /// Replaces the budget policy.
    pub fn set_budget(&mut self, budget: FrameBudget) {
        self.budget = budget;
    }

    /// Whether the current budget tier permits animation ticks.
    #[must_use]
    pub fn can_animate(&self) -> bool {
        self.decision.can_animate
    }

    /// Number of points with any dirty bit set.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.dirty_count
    }

    /// Sets dirty bits on one point.
    pub fn mark_dirty(&mut self, idx: usize, flags: DirtyFlags) {
        if self.dirty[idx].is_empty() && !flags.is_empty() {
            self.dirty_count += 1;
        }
        self.dirty[idx] |= flags;
    }

    /// Clears all dirty bits on one point.
    pub fn mark_clean(&mut self, idx: usize) {
        if !self.dirty[idx].is_empty() {
            self.dirty_count -= 1;
        }
        self.dirty[idx] = DirtyFlags::empty();
    }

    /// Marks every point dirty, forcing the next update to reproject all.
    pub fn mark_all_dirty(&mut self) {
        for d in &mut self.dirty {
            *d = DirtyFlags::all();
        }
        self.dirty_count = self.dirty.len();
    }

    /// Starts a frame: picks the budget tier from the last frame time.
    pub fn begin_frame(&mut self, now_ms: f64) {
        self.decision = self.budget.decide(self.last_frame_ms);
        self.frame_start_ms = Some(now_ms);
    }

    /// Ends a frame: records its duration for the next budget decision.
    pub fn end_frame(&mut self, now_ms: f64) {
        if let Some(start) = self.frame_start_ms.take() {
            self.last_frame_ms = (now_ms - start).max(0.0);
            self.batch.stats.frame_time_ms = self.last_frame_ms;
        }
    }

    /// Projects, orders, and rebuilds the command list.
    ///
    /// Returns `true` when any point was (re)projected. The pass is
    /// incremental (only dirty points are touched) unless the lens
    /// changed or the set grew since the previous update, in which case
    /// every live point is reprojected.
    pub fn update(&mut self, ps: &mut PointSet, lens: &Lens) -> bool {
        let full = self.seen_lens.as_ref() != Some(lens) || self.seen_version != ps.version();
        // Points past the batch capacity are simply not drawn.
        let limit = ps.count().min(self.batch.max_points());

        // Pull coordinate dirt the point set tracked for us.
        for i in 0..limit {
            if ps.has_flag(i, PointFlags::DIRTY) {
                if self.dirty[i].is_empty() {
                    self.dirty_count += 1;
                }
                self.dirty[i] |= DirtyFlags::COORDS;
                ps.set_flag(i, PointFlags::DIRTY, false);
            }
        }

        let projected_any = self.project(ps, lens, !full, limit);
        if projected_any {
            self.sort_render_order(limit);
            self.project_edges(ps, limit);
        }
        self.emit_commands();

        self.seen_lens = Some(lens.clone());
        self.seen_version = ps.version();
        projected_any
    }

    /// The projection pass. Culled points never make it into the command
    /// stream; their batch entries just carry the culled LOD tier.
    fn project(&mut self, ps: &PointSet, lens: &Lens, incremental: bool, limit: usize) -> bool {
        let mut projected = 0_usize;
        let mut culled = 0_usize;
        for i in 0..limit {
            let needs = !incremental || !self.dirty[i].is_empty();
            if needs {
                let hidden = ps.has_flag(i, PointFlags::HIDDEN);
                let p = ps.coords_of(i);
                let d = canopy_kernel::dist(lens.focus(), p);
                self.dist[i] = d;
                let lod = if hidden || d < lens.aperture.near || d > lens.aperture.far {
                    LOD_CULLED
                } else {
                    lens.lod_for_dist(d)
                };
                self.batch.lod[i] = lod;
                if lod < LOD_CULLED {
                    let s = lens.project_point(p);
                    self.batch.screen_x[i] = s.x as f32;
                    self.batch.screen_y[i] = s.y as f32;
                    self.batch.radius[i] = LOD_RADIUS[lod as usize];
                }
                self.batch.depth[i] = ps.depth_of(i);
                self.batch.flags[i] = ps.flags_of(i).bits();
                self.mark_clean(i);
                projected += 1;
            }
            if self.batch.lod[i] == LOD_CULLED {
                culled += 1;
            }
        }
        self.batch.stats.projected = projected;
        self.batch.stats.culled = culled;
        projected > 0
    }

    /// Stable painter sort: LOD ascending, then distance descending so
    /// each tier draws back to front.
    fn sort_render_order(&mut self, limit: usize) {
        let mut order: Vec<u32> = (0..limit)
            .filter(|&i| self.batch.lod[i] < LOD_CULLED)
            .map(|i| i as u32)
            .collect();
        order.sort_by(|&a, &b| {
            let (a, b) = (a as usize, b as usize);
            self.batch.lod[a]
                .cmp(&self.batch.lod[b])
                .then_with(|| self.dist[b].total_cmp(&self.dist[a]))
        });

        self.batch.render_count = order.len();
        self.batch.render_order[..order.len()].copy_from_slice(&order);

        let mut groups = [LodGroup::default(); 4];
        let mut cursor = 0;
        for (tier, group) in groups.iter_mut().enumerate() {
            let start = cursor;
            while cursor < order.len() && self.batch.lod[order[cursor] as usize] == tier as u8 {
                cursor += 1;
            }
            *group = LodGroup {
                start,
                count: cursor - start,
            };
        }
        self.batch.lod_groups = groups;
    }

    /// Emits parent→child edges whose endpoints are both un-culled, up to
    /// the budget's edge limit.
    fn project_edges(&mut self, ps: &PointSet, limit: usize) {
        let cap = self.decision.edge_limit.min(self.batch.max_points());
        let mut n = 0;
        for i in 0..limit {
            if n >= cap {
                break;
            }
            let Some(p) = ps.parent_of(i) else {
                continue;
            };
            if p >= limit || self.batch.lod[i] == LOD_CULLED || self.batch.lod[p] == LOD_CULLED {
                continue;
            }
            self.batch.edge_x1[n] = self.batch.screen_x[p];
            self.batch.edge_y1[n] = self.batch.screen_y[p];
            self.batch.edge_x2[n] = self.batch.screen_x[i];
            self.batch.edge_y2[n] = self.batch.screen_y[i];
            n += 1;
        }
        self.batch.edge_count = n;
    }

    /// Rebuilds the command list under the current budget decision.
    fn emit_commands(&mut self) {
        self.commands.clear();
        self.commands.push(DrawCommand::Clear);
        self.commands.push(DrawCommand::Edges {
            count: self.batch.edge_count,
        });
        for tier in 0..self.decision.lod_limit {
            let group = self.batch.lod_groups[tier as usize];
            self.commands.push(DrawCommand::NodesLod {
                lod: tier,
                start: group.start,
                count: group.count,
            });
        }
    }
}
