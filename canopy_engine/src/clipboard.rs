// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Subtree clipboard: copy, cut, and paste.
//!
//! Cut leans on soft deletion: the cut subtree stays in the columns
//! (hidden), and pasting it re-parents and reveals the same indices, so
//! cut+paste never consumes capacity and the point count is unchanged.
//! Copy snapshots the subtree's data and paste materializes fresh points
//! under the target parent, with the whole subtree carried over by the
//! isometry that maps the old root position to its new one.

use canopy_history::HistoryRecord;
use canopy_kernel::{Transvection, tangent_basis};
use canopy_pointset::{PointFlags, PointSet};

use crate::{Engine, PointSetId};

/// Tangent length at which a pasted (copied) subtree root is placed from
/// its new parent.
const PASTE_RADIUS: f64 = 0.5;

/// One node captured by a copy. Opaque outside the clipboard.
#[derive(Clone, Debug)]
pub struct ClipNode {
    /// Position of the parent within the clip (BFS order), `None` for
    /// the clip root.
    rel_parent: Option<usize>,
    coords: Vec<f64>,
    flags: PointFlags,
    motif: i32,
    name: String,
    tags: Vec<String>,
    content: String,
}

/// Clipboard contents.
#[derive(Clone, Debug)]
pub enum Clipboard {
    /// A cut subtree: hidden in place, pasted by re-parenting.
    Cut {
        /// The set the subtree was cut from.
        ps: PointSetId,
        /// The subtree root index.
        root: usize,
        /// Root plus descendants in breadth-first order.
        nodes: Vec<usize>,
    },
    /// A copied subtree: detached data, pasted by cloning.
    Copy {
        /// Hyperbolic dimension of the captured coordinates.
        dim: usize,
        /// Root-first capture of the subtree.
        nodes: Vec<ClipNode>,
    },
}

impl Clipboard {
    /// Number of nodes on the clipboard.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Cut { nodes, .. } => nodes.len(),
            Self::Copy { nodes, .. } => nodes.len(),
        }
    }

    /// Returns `true` when the clipboard holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn capture(ps: &PointSet, idx: usize) -> Vec<ClipNode> {
    let mut order = vec![idx];
    ps.descendants_into(idx, &mut order);
    order
        .iter()
        .map(|&i| ClipNode {
            rel_parent: if i == idx {
                None
            } else {
                let parent = ps.parent_of(i).expect("descendants have parents");
                Some(
                    order
                        .iter()
                        .position(|&o| o == parent)
                        .expect("parents precede children in BFS order"),
                )
            },
            coords: ps.coords_of(i).to_vec(),
            flags: ps.flags_of(i),
            motif: ps.motif(i),
            name: ps.name_of(i).to_owned(),
            tags: ps.meta_of(i).tags.clone(),
            content: ps.meta_of(i).content.clone(),
        })
        .collect()
}

impl Engine {
    /// Copies the subtree rooted at `idx` onto the clipboard.
    pub fn copy_subtree(&mut self, id: PointSetId, idx: usize) -> bool {
        let dim = self.dim();
        let Some(entry) = self.set(id) else {
            return false;
        };
        if !entry.ps.is_live(idx) {
            return false;
        }
        let nodes = capture(&entry.ps, idx);
        self.clipboard = Some(Clipboard::Copy { dim, nodes });
        true
    }

    /// Cuts the subtree rooted at `idx`: hides it (one undo step) and
    /// parks it on the clipboard for re-attachment.
    pub fn cut_subtree(&mut self, id: PointSetId, idx: usize, now_ms: f64) -> bool {
        let actor = self.actor;
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        if !entry.ps.is_live(idx) {
            return false;
        }
        let mut nodes = vec![idx];
        entry.ps.descendants_into(idx, &mut nodes);
        for &i in &nodes {
            entry.ps.set_flag(i, PointFlags::HIDDEN, true);
        }
        entry.history.record(
            HistoryRecord::DeleteSubtree {
                root_idx: idx,
                n_nodes: nodes.len(),
                indices: nodes.clone(),
            },
            actor,
            now_ms,
        );
        self.clipboard = Some(Clipboard::Cut {
            ps: id,
            root: idx,
            nodes,
        });
        self.invalidate_renderers(id);
        true
    }

    /// Pastes the clipboard as a child of `parent_idx`.
    ///
    /// Returns the pasted subtree root, or `None` for an empty
    /// clipboard, a dimension/set mismatch, a dead parent, or a full
    /// set; in every failure case nothing is mutated.
    pub fn paste_subtree(
        &mut self,
        id: PointSetId,
        parent_idx: usize,
        now_ms: f64,
    ) -> Option<usize> {
        match self.clipboard.take() {
            None => {
                log::warn!("paste: clipboard empty");
                None
            }
            Some(Clipboard::Cut { ps, root, nodes }) => {
                if ps != id {
                    log::warn!("paste: cut subtree belongs to another set");
                    self.clipboard = Some(Clipboard::Cut { ps, root, nodes });
                    return None;
                }
                let result = self.paste_cut(id, parent_idx, root, &nodes, now_ms);
                if result.is_none() {
                    self.clipboard = Some(Clipboard::Cut { ps, root, nodes });
                }
                result
            }
            Some(Clipboard::Copy { dim, nodes }) => {
                let result = self.paste_copy(id, parent_idx, dim, &nodes, now_ms);
                // Copies stay on the clipboard for repeated pasting.
                self.clipboard = Some(Clipboard::Copy { dim, nodes });
                result
            }
        }
    }

    /// Re-attaches a cut subtree: reveal, then reparent. One undo unit.
    fn paste_cut(
        &mut self,
        id: PointSetId,
        parent_idx: usize,
        root: usize,
        nodes: &[usize],
        now_ms: f64,
    ) -> Option<usize> {
        let actor = self.actor;
        let entry = self.set_mut(id)?;
        if !entry.ps.is_live(parent_idx) || nodes.contains(&parent_idx) {
            log::warn!("paste: target parent is dead or inside the cut subtree");
            return None;
        }
        let old_parent = entry.ps.parent_of(root);
        let old_depth = entry.ps.depth_of(root);

        let mut records = Vec::with_capacity(nodes.len() + 1);
        for &i in nodes {
            entry.ps.set_flag(i, PointFlags::HIDDEN, false);
            records.push(HistoryRecord::ToggleFlag {
                idx: i,
                flag: PointFlags::HIDDEN,
                old: true,
                new: false,
            });
        }
        if entry.ps.reparent(root, Some(parent_idx)).is_err() {
            // Roll the visibility back by hand; the reparent left no trace.
            for &i in nodes {
                entry.ps.set_flag(i, PointFlags::HIDDEN, true);
            }
            return None;
        }
        records.push(HistoryRecord::Reparent {
            idx: root,
            old_parent,
            new_parent: Some(parent_idx),
            old_depth,
            new_depth: entry.ps.depth_of(root),
        });
        entry
            .history
            .record(HistoryRecord::Batch(records), actor, now_ms);
        self.invalidate_renderers(id);
        Some(root)
    }

    /// Materializes a copied subtree under the new parent.
    fn paste_copy(
        &mut self,
        id: PointSetId,
        parent_idx: usize,
        dim: usize,
        nodes: &[ClipNode],
        now_ms: f64,
    ) -> Option<usize> {
        let actor = self.actor;
        if dim != self.dim() {
            log::warn!("paste: clipboard dimension {dim} != engine {}", self.dim());
            return None;
        }
        let entry = self.set_mut(id)?;
        if nodes.is_empty() {
            return None;
        }
        if !entry.ps.is_live(parent_idx) {
            return None;
        }
        if entry.ps.count() + nodes.len() > entry.ps.capacity() {
            log::warn!("paste: not enough capacity for {} nodes", nodes.len());
            return None;
        }

        // Carry the subtree by the isometry that lands its root a short
        // step away from the new parent.
        let stride = dim + 1;
        let sibling_rank = entry.ps.children(parent_idx).len();
        let theta = sibling_rank as f64 * 2.399_963_229_728_653;
        let mut e1 = vec![0.0; stride];
        let mut e2 = vec![0.0; stride];
        tangent_basis(entry.ps.coords_of(parent_idx), 1, 2, &mut e1, &mut e2);
        let (sin, cos) = theta.sin_cos();
        let tangent: Vec<f64> = (0..stride)
            .map(|i| PASTE_RADIUS * (cos * e1[i] + sin * e2[i]))
            .collect();
        let mut root_target = vec![0.0; stride];
        canopy_kernel::exp_map(&mut root_target, entry.ps.coords_of(parent_idx), &tangent);
        let carry = Transvection::between(&nodes[0].coords, &root_target);

        let first_new = entry.ps.count();
        let mut new_indices = Vec::with_capacity(nodes.len());
        for node in nodes {
            let parent = node
                .rel_parent
                .map_or(parent_idx, |rel| new_indices[rel]);
            let name = unique_name(&entry.ps, &node.name, now_ms);
            let mut coords = node.coords.clone();
            carry.apply(&mut coords);
            let Ok(idx) = entry.ps.add_point(&name, Some(parent), Some(&coords)) else {
                // Capacity was pre-checked; only a pathological name
                // avalanche gets here. Hide the partial paste.
                for &i in &new_indices {
                    entry.ps.set_flag(i, PointFlags::HIDDEN, true);
                }
                return None;
            };
            let keep = node.flags & !(PointFlags::ROOT | PointFlags::HIDDEN);
            for flag in [
                PointFlags::PINNED,
                PointFlags::SELECTED,
                PointFlags::FOCUS,
                PointFlags::ACTIVE,
                PointFlags::FOLDED,
            ] {
                if keep.contains(flag) {
                    entry.ps.set_flag(idx, flag, true);
                }
            }
            entry.ps.set_motif(idx, node.motif);
            entry.ps.meta_of_mut(idx).tags = node.tags.clone();
            entry.ps.meta_of_mut(idx).content = node.content.clone();
            entry.index.note_insert(idx);
            new_indices.push(idx);
        }

        entry.history.record(
            HistoryRecord::PasteSubtree {
                root_idx: first_new,
                n_nodes: nodes.len(),
            },
            actor,
            now_ms,
        );
        self.invalidate_renderers(id);
        Some(first_new)
    }
}

/// Finds a free name: the original, then a timestamp-suffixed hint, then
/// counter suffixes until one is unused.
fn unique_name(ps: &PointSet, base: &str, now_ms: f64) -> String {
    if ps.index_of(base).is_none() {
        return base.to_owned();
    }
    let hinted = format!("{base}-{}", now_ms as u64);
    if ps.index_of(&hinted).is_none() {
        return hinted;
    }
    let mut k = 2;
    loop {
        let candidate = format!("{base}-{k}");
        if ps.index_of(&candidate).is_none() {
            return candidate;
        }
        k += 1;
    }
}
