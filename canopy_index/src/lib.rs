// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Index: a vantage-point tree over hyperbolic point sets.
//!
//! A VP-tree partitions a metric space by distance to a chosen vantage
//! point: everything closer than the median distance `μ` goes into the
//! `inside` subtree, the rest into `outside`. Queries prune whole subtrees
//! with the triangle inequality, which works for any metric and therefore
//! for hyperbolic distance directly; no embedding tricks are needed.
//!
//! ## Staleness and lazy rebuild
//!
//! The index never mutates eagerly. It snapshots the point set's
//! structural version and coordinate revision at build time; every query
//! first calls [`VpIndex::ensure_fresh`], which rebuilds when
//!
//! - the tree has never been built (or the set grew/shrank under it),
//! - any point moved (coordinate revision mismatch), or
//! - at least [`REBUILD_THRESHOLD`] inserts were noted since the last
//!   build.
//!
//! Up to that threshold, freshly inserted points are kept in a pending
//! list that queries scan linearly alongside the tree, so small
//! incremental additions do not pay the full rebuild cost.
//!
//! Hidden points participate in the tree structure (their distances still
//! partition correctly) but are filtered out of query results, so flag
//! churn alone never invalidates the index.
//!
//! Vantage points are chosen by a deterministic LCG (Numerical Recipes
//! parameters) so builds are reproducible.

use std::collections::BinaryHeap;

use canopy_kernel::hyperboloid;
use canopy_pointset::{PointFlags, PointSet};
use smallvec::SmallVec;

/// Maximum number of indices in a leaf node.
pub const LEAF_SIZE: usize = 8;

/// Pending-insert count that triggers a full rebuild.
pub const REBUILD_THRESHOLD: usize = 32;

enum Node {
    Inner {
        vantage: usize,
        mu: f64,
        inside: Option<Box<Node>>,
        outside: Option<Box<Node>>,
    },
    Leaf {
        indices: SmallVec<[usize; LEAF_SIZE]>,
    },
}

impl core::fmt::Debug for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Inner { vantage, mu, .. } => f
                .debug_struct("Inner")
                .field("vantage", vantage)
                .field("mu", mu)
                .finish_non_exhaustive(),
            Self::Leaf { indices } => f.debug_struct("Leaf").field("len", &indices.len()).finish(),
        }
    }
}

/// Deterministic vantage selection; Numerical Recipes LCG parameters.
#[derive(Clone, Debug)]
struct Lcg(u64);

impl Lcg {
    fn next_index(&mut self, upper_exclusive: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        if upper_exclusive == 0 {
            return 0;
        }
        ((self.0 >> 32) as usize) % upper_exclusive
    }
}

/// Vantage-point tree with lazy, staleness-driven rebuild.
#[derive(Debug)]
pub struct VpIndex {
    root: Option<Box<Node>>,
    indexed_count: usize,
    coords_revision: u64,
    pending: Vec<usize>,
    rebuild_threshold: usize,
    rng: Lcg,
}

impl Default for VpIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VpIndex {
    /// Creates an empty index; the first query builds it.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: None,
            indexed_count: 0,
            coords_revision: 0,
            pending: Vec::new(),
            rebuild_threshold: REBUILD_THRESHOLD,
            rng: Lcg(0x9e3779b97f4a7c15),
        }
    }

    /// Overrides the pending-insert rebuild threshold.
    pub fn set_rebuild_threshold(&mut self, threshold: usize) {
        self.rebuild_threshold = threshold.max(1);
    }

    /// Notes a point inserted after the last build.
    ///
    /// The point is served from a linear side list until enough inserts
    /// accumulate to amortize a rebuild.
    pub fn note_insert(&mut self, idx: usize) {
        self.pending.push(idx);
    }

    /// Number of pending (not yet indexed) inserts.
    #[must_use]
    pub fn pending_inserts(&self) -> usize {
        self.pending.len()
    }

    /// Rebuilds if the snapshot no longer matches the point set.
    ///
    /// Called implicitly by every query; public so callers can pay the
    /// rebuild at a convenient moment (for example between frames).
    pub fn ensure_fresh(&mut self, ps: &PointSet) {
        let covered = self.indexed_count + self.pending.len();
        let stale = (self.root.is_none() && ps.count() > 0)
            || covered != ps.count()
            || self.coords_revision != ps.coords_revision()
            || self.pending.len() >= self.rebuild_threshold;
        if stale {
            self.rebuild(ps);
        }
    }

    /// Unconditionally rebuilds the whole tree.
    pub fn rebuild(&mut self, ps: &PointSet) {
        let mut items: Vec<usize> = ps.live_indices().collect();
        self.root = self.build_node(ps, &mut items);
        self.indexed_count = ps.count();
        self.coords_revision = ps.coords_revision();
        self.pending.clear();
    }

    fn build_node(&mut self, ps: &PointSet, items: &mut [usize]) -> Option<Box<Node>> {
        if items.is_empty() {
            return None;
        }
        if items.len() <= LEAF_SIZE {
            return Some(Box::new(Node::Leaf {
                indices: SmallVec::from_slice(items),
            }));
        }
        // Swap a random vantage to the front, partition the rest by the
        // median distance to it.
        let pick = self.rng.next_index(items.len());
        items.swap(0, pick);
        let vantage = items[0];
        let rest = &mut items[1..];
        let mut dists: Vec<(usize, f64)> =
            rest.iter().map(|&i| (i, ps.dist(vantage, i))).collect();
        dists.sort_by(|a, b| a.1.total_cmp(&b.1));
        let mid = dists.len() / 2;
        let mu = dists[mid].1;
        let mut inside_items = Vec::with_capacity(mid);
        let mut outside_items = Vec::with_capacity(dists.len() - mid);
        for (i, d) in dists {
            if d < mu {
                inside_items.push(i);
            } else {
                outside_items.push(i);
            }
        }
        let inside = self.build_node(ps, &mut inside_items);
        let outside = self.build_node(ps, &mut outside_items);
        Some(Box::new(Node::Inner {
            vantage,
            mu,
            inside,
            outside,
        }))
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Nearest visible point to the live point `query`, excluding itself.
    ///
    /// Returns `None` when the set holds no other visible point.
    pub fn nearest(&mut self, ps: &PointSet, query: usize) -> Option<(usize, f64)> {
        let q = ps.coords_of(query).to_vec();
        self.nearest_to(ps, &q, Some(query))
    }

    /// Nearest visible point to an arbitrary location.
    pub fn nearest_to(
        &mut self,
        ps: &PointSet,
        point: &[f64],
        exclude: Option<usize>,
    ) -> Option<(usize, f64)> {
        self.ensure_fresh(ps);
        let mut best: Option<(usize, f64)> = None;
        let mut tau = f64::INFINITY;
        if let Some(root) = &self.root {
            Self::search_nearest(ps, root, point, exclude, &mut best, &mut tau);
        }
        for &i in &self.pending {
            consider(ps, i, point, exclude, &mut best, &mut tau);
        }
        best
    }

    fn search_nearest(
        ps: &PointSet,
        node: &Node,
        q: &[f64],
        exclude: Option<usize>,
        best: &mut Option<(usize, f64)>,
        tau: &mut f64,
    ) {
        match node {
            Node::Leaf { indices } => {
                for &i in indices {
                    consider(ps, i, q, exclude, best, tau);
                }
            }
            Node::Inner {
                vantage,
                mu,
                inside,
                outside,
            } => {
                let d_vp = ps.dist_to(*vantage, q);
                consider(ps, *vantage, q, exclude, best, tau);
                // Search the side the query falls in first; visit the other
                // side only when the ball of radius τ can cross the median.
                let (first, second, first_is_inside) = if d_vp < *mu {
                    (inside, outside, true)
                } else {
                    (outside, inside, false)
                };
                if let Some(n) = first {
                    Self::search_nearest(ps, n, q, exclude, best, tau);
                }
                let crosses = if first_is_inside {
                    d_vp + *tau >= *mu
                } else {
                    d_vp - *tau <= *mu
                };
                if crosses && let Some(n) = second {
                    Self::search_nearest(ps, n, q, exclude, best, tau);
                }
            }
        }
    }

    /// The `k` nearest visible points to the live point `query`, closest
    /// first. With `k` larger than the number of candidates, all of them
    /// are returned.
    pub fn k_nearest(&mut self, ps: &PointSet, query: usize, k: usize) -> Vec<(usize, f64)> {
        let q = ps.coords_of(query).to_vec();
        self.k_nearest_to(ps, &q, k, Some(query))
    }

    /// The `k` nearest visible points to an arbitrary location.
    pub fn k_nearest_to(
        &mut self,
        ps: &PointSet,
        point: &[f64],
        k: usize,
        exclude: Option<usize>,
    ) -> Vec<(usize, f64)> {
        self.ensure_fresh(ps);
        if k == 0 {
            return Vec::new();
        }
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(k + 1);
        if let Some(root) = &self.root {
            Self::search_k(ps, root, point, exclude, k, &mut heap);
        }
        for &i in &self.pending {
            consider_k(ps, i, point, exclude, k, &mut heap);
        }
        let mut out: Vec<(usize, f64)> = heap.into_iter().map(|e| (e.idx, e.dist)).collect();
        out.sort_by(|a, b| a.1.total_cmp(&b.1));
        out
    }

    fn search_k(
        ps: &PointSet,
        node: &Node,
        q: &[f64],
        exclude: Option<usize>,
        k: usize,
        heap: &mut BinaryHeap<HeapEntry>,
    ) {
        match node {
            Node::Leaf { indices } => {
                for &i in indices {
                    consider_k(ps, i, q, exclude, k, heap);
                }
            }
            Node::Inner {
                vantage,
                mu,
                inside,
                outside,
            } => {
                let d_vp = ps.dist_to(*vantage, q);
                consider_k(ps, *vantage, q, exclude, k, heap);
                let (first, second, first_is_inside) = if d_vp < *mu {
                    (inside, outside, true)
                } else {
                    (outside, inside, false)
                };
                if let Some(n) = first {
                    Self::search_k(ps, n, q, exclude, k, heap);
                }
                // τ is the current k-th best; ∞ while the heap is short.
                let tau = if heap.len() < k {
                    f64::INFINITY
                } else {
                    heap.peek().map_or(f64::INFINITY, |e| e.dist)
                };
                let crosses = if first_is_inside {
                    d_vp + tau >= *mu
                } else {
                    d_vp - tau <= *mu
                };
                if crosses && let Some(n) = second {
                    Self::search_k(ps, n, q, exclude, k, heap);
                }
            }
        }
    }

    /// Every visible point within distance `r` of `point`, unsorted.
    pub fn range(&mut self, ps: &PointSet, point: &[f64], r: f64) -> Vec<(usize, f64)> {
        self.ensure_fresh(ps);
        let mut out = Vec::new();
        if let Some(root) = &self.root {
            Self::search_range(ps, root, point, r, &mut out);
        }
        for &i in &self.pending {
            if !ps.has_flag(i, PointFlags::HIDDEN) {
                let d = ps.dist_to(i, point);
                if d <= r {
                    out.push((i, d));
                }
            }
        }
        out
    }

    fn search_range(
        ps: &PointSet,
        node: &Node,
        q: &[f64],
        r: f64,
        out: &mut Vec<(usize, f64)>,
    ) {
        match node {
            Node::Leaf { indices } => {
                for &i in indices {
                    if !ps.has_flag(i, PointFlags::HIDDEN) {
                        let d = ps.dist_to(i, q);
                        if d <= r {
                            out.push((i, d));
                        }
                    }
                }
            }
            Node::Inner {
                vantage,
                mu,
                inside,
                outside,
            } => {
                let d_vp = ps.dist_to(*vantage, q);
                if !ps.has_flag(*vantage, PointFlags::HIDDEN) && d_vp <= r {
                    out.push((*vantage, d_vp));
                }
                if d_vp - r <= *mu && let Some(n) = inside {
                    Self::search_range(ps, n, q, r, out);
                }
                if d_vp + r >= *mu && let Some(n) = outside {
                    Self::search_range(ps, n, q, r, out);
                }
            }
        }
    }
}

/// Candidate acceptance for single-nearest search.
fn consider(
    ps: &PointSet,
    i: usize,
    q: &[f64],
    exclude: Option<usize>,
    best: &mut Option<(usize, f64)>,
    tau: &mut f64,
) {
    if Some(i) == exclude || ps.has_flag(i, PointFlags::HIDDEN) {
        return;
    }
    let d = hyperboloid::dist(ps.coords_of(i), q);
    if best.is_none_or(|(_, bd)| d < bd) {
        *best = Some((i, d));
        *tau = d;
    }
}

/// Candidate acceptance for k-nearest search (bounded max-heap).
fn consider_k(
    ps: &PointSet,
    i: usize,
    q: &[f64],
    exclude: Option<usize>,
    k: usize,
    heap: &mut BinaryHeap<HeapEntry>,
) {
    if Some(i) == exclude || ps.has_flag(i, PointFlags::HIDDEN) {
        return;
    }
    let d = hyperboloid::dist(ps.coords_of(i), q);
    if heap.len() < k {
        heap.push(HeapEntry { dist: d, idx: i });
    } else if heap.peek().is_some_and(|e| d < e.dist) {
        heap.pop();
        heap.push(HeapEntry { dist: d, idx: i });
    }
}

/// Max-heap entry ordered by distance.
#[derive(Debug, PartialEq)]
struct HeapEntry {
    dist: f64,
    idx: usize,
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.idx.cmp(&other.idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic cloud of `n` points in a tangent ball of radius 2.
    fn random_cloud(dim: usize, n: usize, seed: u64) -> PointSet {
        let mut ps = PointSet::new(dim, n);
        let mut rng = Lcg(seed);
        let origin = canopy_kernel::hyperboloid::origin(dim);
        for i in 0..n {
            let mut tangent = vec![0.0; dim + 1];
            for t in tangent.iter_mut().skip(1) {
                // Uniform in [-1, 1], scaled so ‖v‖ stays within ~2.
                let u = (rng.next_index(2_000_001) as f64 / 1_000_000.0) - 1.0;
                *t = u * 2.0 / (dim as f64).sqrt();
            }
            let mut q = vec![0.0; dim + 1];
            canopy_kernel::exp_map(&mut q, &origin, &tangent);
            ps.add_point(&format!("p{i}"), None, Some(&q)).unwrap();
        }
        ps
    }

    #[test]
    fn empty_query_returns_none() {
        let ps = PointSet::new(2, 4);
        let mut index = VpIndex::new();
        assert!(index.nearest_to(&ps, &[1.0, 0.0, 0.0], None).is_none());
        assert!(index.k_nearest_to(&ps, &[1.0, 0.0, 0.0], 3, None).is_empty());
    }

    #[test]
    fn nearest_matches_linear_scan() {
        let ps = random_cloud(3, 120, 7);
        let mut index = VpIndex::new();
        for q in [0_usize, 17, 63, 119] {
            let got = index.nearest(&ps, q).unwrap();
            let want = ps.nearest(q).unwrap();
            assert_eq!(got.0, want.0, "query {q}");
            assert!((got.1 - want.1).abs() < 1e-12);
        }
    }

    #[test]
    fn k_nearest_matches_linear_scan_in_dimension_five() {
        let ps = random_cloud(5, 250, 42);
        let mut index = VpIndex::new();
        for q in [3_usize, 99, 200] {
            let got = index.k_nearest(&ps, q, 8);
            let want = ps.k_nearest(q, 8);
            let got_ids: Vec<usize> = got.iter().map(|e| e.0).collect();
            let want_ids: Vec<usize> = want.iter().map(|e| e.0).collect();
            assert_eq!(got_ids, want_ids, "query {q}");
        }
    }

    #[test]
    fn k_larger_than_population_returns_all() {
        let ps = random_cloud(2, 5, 3);
        let mut index = VpIndex::new();
        let got = index.k_nearest(&ps, 0, 64);
        assert_eq!(got.len(), 4);
    }

    #[test]
    fn range_query_matches_scan() {
        let ps = random_cloud(3, 150, 11);
        let mut index = VpIndex::new();
        let q = ps.coords_of(0).to_vec();
        let r = 0.75;
        let mut got: Vec<usize> = index.range(&ps, &q, r).iter().map(|e| e.0).collect();
        got.sort_unstable();
        let mut want: Vec<usize> = ps
            .live_indices()
            .filter(|&i| ps.dist_to(i, &q) <= r)
            .collect();
        want.sort_unstable();
        assert_eq!(got, want);
    }

    #[test]
    fn hidden_points_are_filtered_from_results() {
        let mut ps = random_cloud(2, 40, 5);
        let mut index = VpIndex::new();
        let victim = ps.nearest(0).unwrap().0;
        ps.set_flag(victim, PointFlags::HIDDEN, true);
        let got = index.nearest(&ps, 0).unwrap();
        assert_ne!(got.0, victim);
        assert_eq!(got.0, ps.nearest(0).unwrap().0);
    }

    #[test]
    fn pending_inserts_are_visible_before_rebuild() {
        let mut ps = random_cloud(2, 30, 9);
        let mut index = VpIndex::new();
        index.rebuild(&ps);
        // Insert a point right on top of point 0; it must win nearest.
        let coords = ps.coords_of(0).to_vec();
        let new = ps.add_point("twin", None, Some(&coords)).unwrap();
        index.note_insert(new);
        assert!(index.pending_inserts() > 0);
        let got = index.nearest(&ps, 0).unwrap();
        assert_eq!(got.0, new);
        assert!(got.1 < 1e-9);
    }

    #[test]
    fn growth_past_threshold_triggers_rebuild() {
        let mut ps = PointSet::new(2, 128);
        ps.add_point("seed", None, None).unwrap();
        let mut index = VpIndex::new();
        index.rebuild(&ps);
        for i in 0..REBUILD_THRESHOLD {
            let idx = ps
                .add_point(&format!("n{i}"), None, Some(&[0.0, 0.01 * i as f64, 0.1]))
                .unwrap();
            index.note_insert(idx);
        }
        // The query provokes ensure_fresh, which folds pending into the tree.
        let _ = index.nearest(&ps, 0);
        assert_eq!(index.pending_inserts(), 0);
    }

    #[test]
    fn coordinate_motion_invalidates_the_tree() {
        let mut ps = random_cloud(2, 50, 13);
        let mut index = VpIndex::new();
        index.rebuild(&ps);
        // Drag point 5 on top of point 0.
        let target = ps.coords_of(0).to_vec();
        ps.set_coords(5, &target).unwrap();
        let got = index.nearest(&ps, 0).unwrap();
        assert_eq!(got.0, 5);
    }
}
