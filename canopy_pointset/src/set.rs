// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The columnar container: storage, creation, naming, coordinates.

use canopy_kernel::{exp_map, hyperboloid, minkowski_dot};
use hashbrown::HashMap;

use crate::{NO_MOTIF, NO_PARENT, PointFlags, PointSetError};

/// Per-point metadata held by the side index.
///
/// The name participates in the name↔index bijection and can only change
/// through [`PointSet::rename`]; tags and content are free-form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointMeta {
    pub(crate) name: String,
    /// Free-form tag list.
    pub tags: Vec<String>,
    /// Free-form body text.
    pub content: String,
}

impl PointMeta {
    /// The point's unique name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Columnar set of points on the hyperboloid with tree topology.
///
/// See the [crate docs](crate) for the column layout and invariants.
#[derive(Clone, Debug)]
pub struct PointSet {
    dim: usize,
    capacity: usize,
    count: usize,
    pub(crate) coords: Vec<f64>,
    pub(crate) depth: Vec<u32>,
    pub(crate) parent: Vec<i32>,
    timestamp: Vec<u64>,
    pub(crate) flags: Vec<PointFlags>,
    motif: Vec<i32>,
    meta: Vec<PointMeta>,
    names: HashMap<String, usize>,
    next_timestamp: u64,
    version: u64,
    coords_revision: u64,
}

impl PointSet {
    /// Creates an empty set for hyperbolic dimension `dim` with room for
    /// `capacity` points. All columns are allocated up front.
    ///
    /// # Panics
    ///
    /// Panics if `dim < 2`; the charts and layouts require at least two
    /// spatial axes.
    #[must_use]
    pub fn new(dim: usize, capacity: usize) -> Self {
        assert!(dim >= 2, "hyperbolic dimension must be at least 2");
        Self {
            dim,
            capacity,
            count: 0,
            coords: vec![0.0; capacity * (dim + 1)],
            depth: vec![0; capacity],
            parent: vec![NO_PARENT; capacity],
            timestamp: vec![0; capacity],
            flags: vec![PointFlags::empty(); capacity],
            motif: vec![NO_MOTIF; capacity],
            meta: vec![PointMeta::default(); capacity],
            names: HashMap::with_capacity(capacity),
            next_timestamp: 0,
            version: 0,
            coords_revision: 0,
        }
    }

    /// Hyperbolic dimension `n`.
    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Coordinate stride, `dim + 1`.
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.dim + 1
    }

    /// Maximum number of points.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of live points.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns `true` when no points have been added.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns `true` when the set has reached capacity.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.count >= self.capacity
    }

    /// Structural version, bumped on every add.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Coordinate revision, bumped whenever any point moves.
    #[must_use]
    pub const fn coords_revision(&self) -> u64 {
        self.coords_revision
    }

    /// Returns `true` if `idx` refers to a live point.
    #[must_use]
    pub const fn is_live(&self, idx: usize) -> bool {
        idx < self.count
    }

    /// Iterator over all live indices in creation order.
    pub fn live_indices(&self) -> impl Iterator<Item = usize> + use<> {
        0..self.count
    }

    // -------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------

    /// Adds a point.
    ///
    /// With no parent the point becomes a root (`depth = 0`, `ROOT` flag).
    /// With a parent, `depth = depth[parent] + 1`. Coordinates default to
    /// the origin; explicit coordinates are normalized onto the
    /// hyperboloid. The name must be unique among live points; the side
    /// indices are only updated once every validation has passed.
    pub fn add_point(
        &mut self,
        name: &str,
        parent: Option<usize>,
        coords: Option<&[f64]>,
    ) -> Result<usize, PointSetError> {
        if self.is_full() {
            return Err(PointSetError::Full);
        }
        if self.names.contains_key(name) {
            return Err(PointSetError::NameConflict(name.to_owned()));
        }
        if let Some(p) = parent
            && !self.is_live(p)
        {
            return Err(PointSetError::NoSuchParent(p));
        }

        let stride = self.stride();
        let idx = self.count;
        let slot = &mut self.coords[idx * stride..(idx + 1) * stride];
        match coords {
            None => hyperboloid::set_origin(slot),
            Some(c) => {
                if c.len() != stride || c.iter().any(|v| !v.is_finite()) {
                    return Err(PointSetError::InvalidPoint);
                }
                slot.copy_from_slice(c);
                hyperboloid::normalize_hyperboloid(slot);
                if !slot[0].is_finite() {
                    return Err(PointSetError::InvalidPoint);
                }
            }
        }

        match parent {
            None => {
                self.parent[idx] = NO_PARENT;
                self.depth[idx] = 0;
                self.flags[idx] = PointFlags::ROOT;
            }
            Some(p) => {
                self.parent[idx] = p as i32;
                self.depth[idx] = self.depth[p] + 1;
                self.flags[idx] = PointFlags::empty();
            }
        }
        self.motif[idx] = NO_MOTIF;
        self.timestamp[idx] = self.next_timestamp;
        self.next_timestamp += 1;
        self.meta[idx] = PointMeta {
            name: name.to_owned(),
            tags: Vec::new(),
            content: String::new(),
        };
        self.names.insert(name.to_owned(), idx);
        self.count += 1;
        self.version += 1;
        Ok(idx)
    }

    /// Adds a child positioned by the exponential map from its parent
    /// along `tangent` (an ambient vector projected onto the parent's
    /// tangent space before use).
    pub fn add_child_along(
        &mut self,
        name: &str,
        parent: usize,
        tangent: &[f64],
    ) -> Result<usize, PointSetError> {
        if !self.is_live(parent) {
            return Err(PointSetError::NoSuchParent(parent));
        }
        let stride = self.stride();
        if tangent.len() != stride {
            return Err(PointSetError::InvalidPoint);
        }
        let mut v = vec![0.0; stride];
        let mut q = vec![0.0; stride];
        {
            let p = self.coords_of(parent);
            hyperboloid::tangent_project(&mut v, p, tangent);
            exp_map(&mut q, p, &v);
        }
        self.add_point(name, Some(parent), Some(&q))
    }

    // -------------------------------------------------------------------
    // Coordinates
    // -------------------------------------------------------------------

    /// Coordinate slice of a live point.
    #[must_use]
    pub fn coords_of(&self, idx: usize) -> &[f64] {
        let stride = self.stride();
        &self.coords[idx * stride..(idx + 1) * stride]
    }

    /// Mutable coordinate slice of a live point.
    ///
    /// Marks the point `DIRTY` and bumps the coordinate revision; callers
    /// are expected to leave the point on the hyperboloid (renormalizing
    /// after perturbation).
    pub fn coords_of_mut(&mut self, idx: usize) -> &mut [f64] {
        self.flags[idx] |= PointFlags::DIRTY;
        self.coords_revision += 1;
        let stride = self.stride();
        &mut self.coords[idx * stride..(idx + 1) * stride]
    }

    /// Replaces a live point's coordinates, normalizing onto the sheet.
    ///
    /// Fails with [`PointSetError::InvalidPoint`] (leaving the point
    /// unchanged) when the supplied coordinates cannot be normalized.
    pub fn set_coords(&mut self, idx: usize, coords: &[f64]) -> Result<(), PointSetError> {
        if !self.is_live(idx) {
            return Err(PointSetError::NoSuchPoint(idx));
        }
        let stride = self.stride();
        if coords.len() != stride || coords.iter().any(|v| !v.is_finite()) {
            return Err(PointSetError::InvalidPoint);
        }
        let mut fixed = coords.to_vec();
        hyperboloid::normalize_hyperboloid(&mut fixed);
        if !fixed[0].is_finite() {
            return Err(PointSetError::InvalidPoint);
        }
        self.coords_of_mut(idx).copy_from_slice(&fixed);
        Ok(())
    }

    /// Hyperbolic distance between two live points.
    #[must_use]
    pub fn dist(&self, i: usize, j: usize) -> f64 {
        hyperboloid::dist(self.coords_of(i), self.coords_of(j))
    }

    /// Hyperbolic distance from a live point to an arbitrary point.
    #[must_use]
    pub fn dist_to(&self, i: usize, point: &[f64]) -> f64 {
        hyperboloid::dist(self.coords_of(i), point)
    }

    // -------------------------------------------------------------------
    // Names and metadata
    // -------------------------------------------------------------------

    /// Index bound to `name`, if any.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Name of a live point.
    #[must_use]
    pub fn name_of(&self, idx: usize) -> &str {
        &self.meta[idx].name
    }

    /// Metadata record of a live point.
    #[must_use]
    pub fn meta_of(&self, idx: usize) -> &PointMeta {
        &self.meta[idx]
    }

    /// Mutable access to a live point's tags and content.
    ///
    /// The name field is only reachable through [`PointSet::rename`] so
    /// the name index cannot be bypassed.
    pub fn meta_of_mut(&mut self, idx: usize) -> &mut PointMeta {
        &mut self.meta[idx]
    }

    /// Rebinds a live point to a new unique name.
    pub fn rename(&mut self, idx: usize, new_name: &str) -> Result<(), PointSetError> {
        if !self.is_live(idx) {
            return Err(PointSetError::NoSuchPoint(idx));
        }
        if self.meta[idx].name == new_name {
            return Ok(());
        }
        if self.names.contains_key(new_name) {
            return Err(PointSetError::NameConflict(new_name.to_owned()));
        }
        let old = core::mem::replace(&mut self.meta[idx].name, new_name.to_owned());
        self.names.remove(&old);
        self.names.insert(new_name.to_owned(), idx);
        Ok(())
    }

    /// Creation timestamp of a live point.
    #[must_use]
    pub fn timestamp(&self, idx: usize) -> u64 {
        self.timestamp[idx]
    }

    /// Cluster id of a live point, [`NO_MOTIF`] when unassigned.
    #[must_use]
    pub fn motif(&self, idx: usize) -> i32 {
        self.motif[idx]
    }

    /// Assigns a cluster id.
    pub fn set_motif(&mut self, idx: usize, motif: i32) {
        self.motif[idx] = motif;
    }

    // -------------------------------------------------------------------
    // Flags
    // -------------------------------------------------------------------

    /// Flag bits of a live point.
    #[must_use]
    pub fn flags_of(&self, idx: usize) -> PointFlags {
        self.flags[idx]
    }

    /// Returns `true` if the point carries all bits in `flag`.
    #[must_use]
    pub fn has_flag(&self, idx: usize, flag: PointFlags) -> bool {
        self.flags[idx].contains(flag)
    }

    /// Sets or clears flag bits.
    pub fn set_flag(&mut self, idx: usize, flag: PointFlags, on: bool) {
        self.flags[idx].set(flag, on);
    }

    /// Toggles flag bits, returning the new state of the first bit.
    pub fn toggle_flag(&mut self, idx: usize, flag: PointFlags) -> bool {
        self.flags[idx].toggle(flag);
        self.flags[idx].contains(flag)
    }

    /// Validates the container invariants, panicking on violation.
    ///
    /// Intended for tests and debug assertions after operator batches:
    /// every live point is on the sheet, parent/depth are consistent,
    /// ancestor chains terminate, and the name maps are inverse
    /// bijections.
    pub fn assert_invariants(&self) {
        for i in 0..self.count {
            let x = self.coords_of(i);
            let norm = minkowski_dot(x, x);
            assert!(
                (norm + 1.0).abs() < canopy_kernel::EPS_NORM,
                "point {i} off the hyperboloid: ⟨x,x⟩ = {norm}"
            );
            assert!(x[0] > 0.0, "point {i} on the lower sheet");
            let p = self.parent[i];
            if p >= 0 {
                assert_eq!(
                    self.depth[i],
                    self.depth[p as usize] + 1,
                    "depth mismatch at {i}"
                );
                assert!(
                    !self.flags[i].contains(PointFlags::ROOT),
                    "non-root {i} carries ROOT"
                );
            } else {
                assert_eq!(self.depth[i], 0, "root {i} has nonzero depth");
                assert!(
                    self.flags[i].contains(PointFlags::ROOT),
                    "root {i} missing ROOT"
                );
            }
            // Ancestor chain must terminate within depth[i] + 1 hops.
            let mut steps = 0_u32;
            let mut cur = i;
            while self.parent[cur] >= 0 {
                cur = self.parent[cur] as usize;
                steps += 1;
                assert!(steps <= self.depth[i], "ancestor chain too long at {i}");
            }
            assert_eq!(
                self.names.get(&self.meta[i].name),
                Some(&i),
                "name map out of sync at {i}"
            );
        }
        assert_eq!(self.names.len(), self.count, "name map size mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_root_at_origin() {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("r", None, None).unwrap();
        assert_eq!(r, 0);
        assert_eq!(ps.coords_of(r), &[1.0, 0.0, 0.0]);
        assert!(ps.has_flag(r, PointFlags::ROOT));
        assert_eq!(ps.count(), 1);
        ps.assert_invariants();
    }

    #[test]
    fn add_children_along_tangents() {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("r", None, None).unwrap();
        let a = ps.add_child_along("a", r, &[0.0, 0.5, 0.0]).unwrap();
        let b = ps.add_child_along("b", r, &[0.0, -0.5, 0.0]).unwrap();
        assert_eq!(ps.depth[a], 1);
        assert_eq!(ps.depth[b], 1);
        assert!((ps.dist(r, a) - 0.5).abs() < 1e-9);
        assert!((ps.dist(r, b) - 0.5).abs() < 1e-9);
        // Reverse triangle: geodesic through the root is the shortest path.
        assert!(ps.dist(a, b) > ps.dist(a, r) + ps.dist(r, b) - 1e-5);
        ps.assert_invariants();
    }

    #[test]
    fn full_set_rejects_add_without_mutation() {
        let mut ps = PointSet::new(2, 1);
        ps.add_point("only", None, None).unwrap();
        let before_version = ps.version();
        assert_eq!(ps.add_point("more", None, None), Err(PointSetError::Full));
        assert_eq!(ps.count(), 1);
        assert_eq!(ps.version(), before_version);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut ps = PointSet::new(2, 4);
        ps.add_point("a", None, None).unwrap();
        assert!(matches!(
            ps.add_point("a", None, None),
            Err(PointSetError::NameConflict(_))
        ));
        assert_eq!(ps.count(), 1);
    }

    #[test]
    fn explicit_coords_are_normalized() {
        let mut ps = PointSet::new(2, 4);
        let i = ps.add_point("p", None, Some(&[3.0, 0.6, 0.8])).unwrap();
        let x = ps.coords_of(i);
        assert!((minkowski_dot(x, x) + 1.0).abs() < 1e-12);
        assert_eq!(&x[1..], &[0.6, 0.8]);
    }

    #[test]
    fn invalid_coords_are_rejected() {
        let mut ps = PointSet::new(2, 4);
        assert_eq!(
            ps.add_point("nan", None, Some(&[f64::NAN, 0.0, 0.0])),
            Err(PointSetError::InvalidPoint)
        );
        assert_eq!(
            ps.add_point("short", None, Some(&[1.0, 0.0])),
            Err(PointSetError::InvalidPoint)
        );
        assert_eq!(ps.count(), 0);
    }

    #[test]
    fn rename_keeps_maps_inverse() {
        let mut ps = PointSet::new(2, 4);
        let a = ps.add_point("a", None, None).unwrap();
        ps.add_point("b", Some(a), None).unwrap();
        assert!(matches!(
            ps.rename(a, "b"),
            Err(PointSetError::NameConflict(_))
        ));
        ps.rename(a, "root").unwrap();
        assert_eq!(ps.index_of("root"), Some(a));
        assert_eq!(ps.index_of("a"), None);
        assert_eq!(ps.name_of(a), "root");
        ps.assert_invariants();
    }

    #[test]
    fn coords_mutation_marks_dirty_and_bumps_revision() {
        let mut ps = PointSet::new(2, 4);
        let i = ps.add_point("p", None, None).unwrap();
        let rev = ps.coords_revision();
        ps.set_coords(i, &[0.0, 0.3, 0.4]).unwrap();
        assert!(ps.coords_revision() > rev);
        assert!(ps.has_flag(i, PointFlags::DIRTY));
    }

    #[test]
    fn set_coords_failure_preserves_prior_state() {
        let mut ps = PointSet::new(2, 4);
        let i = ps.add_point("p", None, Some(&[0.0, 0.1, 0.2])).unwrap();
        let before = ps.coords_of(i).to_vec();
        assert_eq!(
            ps.set_coords(i, &[0.0, f64::INFINITY, 0.0]),
            Err(PointSetError::InvalidPoint)
        );
        assert_eq!(ps.coords_of(i), &before[..]);
    }

    #[test]
    fn timestamps_are_monotonic() {
        let mut ps = PointSet::new(2, 4);
        let a = ps.add_point("a", None, None).unwrap();
        let b = ps.add_point("b", None, None).unwrap();
        let c = ps.add_point("c", None, None).unwrap();
        assert!(ps.timestamp(a) < ps.timestamp(b));
        assert!(ps.timestamp(b) < ps.timestamp(c));
    }
}
