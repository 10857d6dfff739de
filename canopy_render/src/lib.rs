// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Render: the incremental batch renderer.
//!
//! The renderer turns a point set, as seen through a lens, into columnar
//! screen-space output plus an ordered command list a drawing backend can
//! replay. It is built around three ideas:
//!
//! - **Dirty tracking.** Per-index dirty bits ([`DirtyFlags`]) record what
//!   changed since the last frame. An incremental pass only re-projects
//!   dirty points; a lens move or structural change forces a full pass.
//!   Dirty bits are cleared only once a point has actually been projected.
//! - **LOD bucketing and painter order.** Projected points are stably
//!   sorted by (LOD ascending, distance descending) so each detail tier is
//!   drawn back-to-front, and per-tier `[start, count]` groups let the
//!   backend draw tier by tier.
//! - **Frame budget.** The previous frame's duration throttles the next
//!   one: over-budget frames silently drop LOD tiers and cap edge counts
//!   instead of stalling; see [`FrameBudget`]. No error is surfaced;
//!   degradation is the recovery.
//!
//! The renderer never allocates per point during a frame: all batch
//! columns are sized once at construction.

mod batch;
mod budget;
mod renderer;

pub use batch::{BatchStats, DrawCommand, LodGroup, RenderBatch};
pub use budget::{BudgetDecision, FrameBudget};
pub use renderer::BatchRenderer;

bitflags::bitflags! {
    /// Per-index dirty bits consumed by the incremental projection pass.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct DirtyFlags: u8 {
        /// Coordinates moved; reproject.
        const COORDS    = 1;
        /// Visibility flags changed; re-evaluate culling.
        const VISIBLE   = 2;
        /// Projection output is stale for any other reason.
        const PROJECTED = 4;
        /// Style-only change; keep geometry, refresh appearance.
        const STYLE     = 8;
    }
}

/// Node radius in screen units for each LOD tier, nearest first.
pub const LOD_RADIUS: [f32; 4] = [6.0, 4.0, 2.0, 1.0];
