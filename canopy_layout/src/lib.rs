// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Layout: arranging trees on the hyperboloid.
//!
//! Hyperbolic space is the natural home for tree layout (the area of a
//! disk grows exponentially with its radius, matching the growth of a
//! tree's levels), so every algorithm here works the same way: compute a
//! tangent-space offset at some anchor point and place nodes with the
//! exponential map, staying on the manifold by construction.
//!
//! - [`radial_layout`]: top-down angular subdivision; each node's angular
//!   budget is split among children in proportion to subtree size.
//! - [`force_layout`]: iterative relaxation with hyperbolic-distance
//!   repulsion and spring forces along edges, accumulated in tangent
//!   space. Roots and `PINNED` points hold still.
//! - [`hierarchical_layout`]: depth rows on a tangent plane at the root.
//! - Helpers: [`spread_children`], [`center_on_root`], [`compact_cluster`].
//!
//! Every placement is recorded as a `MovePoint` history record through the
//! caller's transaction, so a layout invocation is one undo step.

mod force;
mod helpers;
mod radial;

pub use force::{ForceConfig, force_layout};
pub use helpers::{center_on_root, compact_cluster, spread_children};
pub use radial::{RadialConfig, hierarchical_layout, radial_layout};

use canopy_history::{HistoryRecord, Transaction};
use canopy_pointset::{PointSet, PointSetError};

/// Moves one point, recording old and new coordinates.
pub(crate) fn move_recorded(
    ps: &mut PointSet,
    tx: &mut Transaction,
    idx: usize,
    new_coords: &[f64],
) -> Result<(), PointSetError> {
    let old = ps.coords_of(idx).to_vec();
    ps.set_coords(idx, new_coords)?;
    tx.push(HistoryRecord::MovePoint {
        idx,
        old_coords: old,
        new_coords: ps.coords_of(idx).to_vec(),
    });
    Ok(())
}
