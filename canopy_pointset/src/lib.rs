// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Point Set: the columnar state container.
//!
//! A [`PointSet`] holds up to `capacity` points of hyperbolic dimension
//! `dim` in parallel columns:
//!
//! - `coords`: Minkowski coordinates, stride `dim + 1`, every live point
//!   on the upper hyperboloid sheet (`⟨x,x⟩_L = −1`, `x₀ > 0`).
//! - `depth` / `parent`: tree topology. `parent` is `−1` for roots, and
//!   `depth[i] = depth[parent[i]] + 1` holds for every live point.
//! - `timestamp`: monotonic creation order.
//! - `flags`: [`PointFlags`] bitfield (pinned, hidden, selected, ...).
//! - `motif`: small signed cluster id, `−1` when unassigned.
//!
//! Side indices map unique names to indices and back to `{name, tags,
//! content}` metadata. Points are never physically removed: deletion is
//! soft (the `HIDDEN` flag), which keeps indices stable for the renderer,
//! the spatial index, and the undo history.
//!
//! The columnar layout is deliberate: hot loops (projection, layout,
//! field evaluation) walk `coords` with interior slices and never allocate
//! per point. Structural churn is tracked by two counters,
//! [`PointSet::version`] for adds and [`PointSet::coords_revision`] for
//! coordinate motion, which downstream caches use for invalidation.

mod error;
mod flags;
mod set;
mod tree;

pub use error::PointSetError;
pub use flags::PointFlags;
pub use set::{PointMeta, PointSet};

/// Sentinel stored in the `parent` column for roots.
pub const NO_PARENT: i32 = -1;

/// Sentinel stored in the `motif` column for unclustered points.
pub const NO_MOTIF: i32 = -1;
