// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree topology queries and structural edits.
//!
//! `children` is a linear scan over the parent column; that is O(n) but
//! acceptable because hot-path neighbor queries go through the spatial
//! index, not the topology. `descendants` uses an explicit index queue
//! rather than recursion so deep trees cannot overflow the stack.

use smallvec::SmallVec;

use crate::{NO_PARENT, PointFlags, PointSet, PointSetError};

impl PointSet {
    /// Parent of a live point, `None` for roots.
    #[must_use]
    pub fn parent_of(&self, idx: usize) -> Option<usize> {
        let p = self.parent[idx];
        (p >= 0).then(|| p as usize)
    }

    /// Tree depth of a live point.
    #[must_use]
    pub fn depth_of(&self, idx: usize) -> u32 {
        self.depth[idx]
    }

    /// Returns `true` for root points.
    #[must_use]
    pub fn is_root(&self, idx: usize) -> bool {
        self.parent[idx] == NO_PARENT
    }

    /// Pushes the direct children of `idx` into `out` in index order.
    pub fn children_into(&self, idx: usize, out: &mut Vec<usize>) {
        for i in 0..self.count() {
            if self.parent[i] == idx as i32 {
                out.push(i);
            }
        }
    }

    /// Direct children of `idx` in index order.
    #[must_use]
    pub fn children(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.children_into(idx, &mut out);
        out
    }

    /// Pushes all descendants of `idx` (excluding `idx`) into `out` in
    /// breadth-first order.
    pub fn descendants_into(&self, idx: usize, out: &mut Vec<usize>) {
        let start = out.len();
        self.children_into(idx, out);
        let mut head = start;
        while head < out.len() {
            let cur = out[head];
            head += 1;
            self.children_into(cur, out);
        }
    }

    /// All descendants of `idx` in breadth-first order.
    #[must_use]
    pub fn descendants(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.descendants_into(idx, &mut out);
        out
    }

    /// Pushes the ancestors of `idx` (excluding `idx`, nearest first)
    /// into `out`.
    pub fn ancestors_into(&self, idx: usize, out: &mut Vec<usize>) {
        let mut cur = idx;
        while let Some(p) = self.parent_of(cur) {
            out.push(p);
            cur = p;
        }
    }

    /// Ancestors of `idx`, nearest first, ending at its root.
    #[must_use]
    pub fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.ancestors_into(idx, &mut out);
        out
    }

    /// Number of points in the subtree rooted at `idx`, including `idx`.
    #[must_use]
    pub fn subtree_size(&self, idx: usize) -> usize {
        let mut queue: SmallVec<[usize; 16]> = SmallVec::new();
        queue.push(idx);
        let mut n = 0;
        let mut head = 0;
        while head < queue.len() {
            let cur = queue[head];
            head += 1;
            n += 1;
            for i in 0..self.count() {
                if self.parent[i] == cur as i32 {
                    queue.push(i);
                }
            }
        }
        n
    }

    /// Returns `true` if `maybe_ancestor` lies on `idx`'s ancestor chain.
    #[must_use]
    pub fn is_ancestor_of(&self, maybe_ancestor: usize, idx: usize) -> bool {
        let mut cur = idx;
        while let Some(p) = self.parent_of(cur) {
            if p == maybe_ancestor {
                return true;
            }
            cur = p;
        }
        false
    }

    /// Moves `idx` under `new_parent` (or detaches it as a root for
    /// `None`), repairing the depths of the whole subtree.
    ///
    /// Fails when the target parent is dead, or when it is `idx` itself or
    /// one of its descendants (which would create a cycle); nothing is
    /// mutated on failure.
    pub fn reparent(&mut self, idx: usize, new_parent: Option<usize>) -> Result<(), PointSetError> {
        if !self.is_live(idx) {
            return Err(PointSetError::NoSuchPoint(idx));
        }
        if let Some(p) = new_parent {
            if !self.is_live(p) {
                return Err(PointSetError::NoSuchParent(p));
            }
            if p == idx || self.is_ancestor_of(idx, p) {
                return Err(PointSetError::WouldCycle(idx));
            }
        }
        match new_parent {
            None => {
                self.parent[idx] = NO_PARENT;
                self.flags[idx] |= PointFlags::ROOT;
                self.set_subtree_depths(idx, 0);
            }
            Some(p) => {
                self.parent[idx] = p as i32;
                self.flags[idx] &= !PointFlags::ROOT;
                let d = self.depth[p] + 1;
                self.set_subtree_depths(idx, d);
            }
        }
        Ok(())
    }

    /// Rewrites depths below `idx` after a reparent, breadth-first.
    fn set_subtree_depths(&mut self, idx: usize, depth: u32) {
        self.depth[idx] = depth;
        let mut queue = vec![idx];
        let mut head = 0;
        while head < queue.len() {
            let cur = queue[head];
            head += 1;
            for i in 0..self.count() {
                if self.parent[i] == cur as i32 {
                    self.depth[i] = self.depth[cur] + 1;
                    queue.push(i);
                }
            }
        }
    }

    // -------------------------------------------------------------------
    // Flag-filtered views
    // -------------------------------------------------------------------

    /// Live indices without the `HIDDEN` flag.
    pub fn visible(&self) -> impl Iterator<Item = usize> + '_ {
        self.live_indices()
            .filter(|&i| !self.flags[i].contains(PointFlags::HIDDEN))
    }

    /// Live indices carrying `SELECTED`.
    pub fn selected(&self) -> impl Iterator<Item = usize> + '_ {
        self.live_indices()
            .filter(|&i| self.flags[i].contains(PointFlags::SELECTED))
    }

    /// Live indices carrying `PINNED`.
    pub fn pinned(&self) -> impl Iterator<Item = usize> + '_ {
        self.live_indices()
            .filter(|&i| self.flags[i].contains(PointFlags::PINNED))
    }

    /// Live indices at tree depth `d`.
    pub fn at_depth(&self, d: u32) -> impl Iterator<Item = usize> + '_ {
        self.live_indices().filter(move |&i| self.depth[i] == d)
    }

    // -------------------------------------------------------------------
    // Neighbor scans (linear baseline; the VP-tree is the fast path)
    // -------------------------------------------------------------------

    /// Nearest visible point to `idx`, excluding `idx` itself.
    #[must_use]
    pub fn nearest(&self, idx: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for i in self.visible() {
            if i == idx {
                continue;
            }
            let d = self.dist(idx, i);
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best
    }

    /// The `k` nearest visible points to `idx`, closest first.
    ///
    /// Returns fewer than `k` entries when the set is small.
    #[must_use]
    pub fn k_nearest(&self, idx: usize, k: usize) -> Vec<(usize, f64)> {
        let mut all: Vec<(usize, f64)> = self
            .visible()
            .filter(|&i| i != idx)
            .map(|i| (i, self.dist(idx, i)))
            .collect();
        all.sort_by(|a, b| a.1.total_cmp(&b.1));
        all.truncate(k);
        all
    }
}
