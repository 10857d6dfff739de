// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point-set APIs: creation, metadata, operators, history, queries,
//! fields, and layout invocation.

use canopy_export::document;
use canopy_field::{FieldKernel, ScalarField};
use canopy_history::{HistoryRecord, Transaction};
use canopy_kernel::tangent_basis;
use canopy_layout::{ForceConfig, RadialConfig};
use canopy_ops::Operator;
use canopy_pointset::{PointFlags, PointMeta};

use crate::{Engine, PointSetId};

/// Tangent length used to place children that arrive without coordinates.
const DEFAULT_CHILD_RADIUS: f64 = 0.5;

/// Golden angle in radians; spreads sibling placements evenly.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

impl Engine {
    /// Adds a point by name, optionally under a named parent.
    ///
    /// Without a parent the point is a root at the origin. With one, it
    /// is placed a short geodesic step away from the parent, successive
    /// siblings fanning out at golden-angle increments. Returns `None`
    /// (and logs) when the set is missing, full, the name is taken, or
    /// the parent is unknown.
    pub fn add_point(
        &mut self,
        id: PointSetId,
        name: &str,
        parent_name: Option<&str>,
        now_ms: f64,
    ) -> Option<usize> {
        let actor = self.actor;
        let entry = self.set_mut(id)?;
        let parent = match parent_name {
            None => None,
            Some(p) => match entry.ps.index_of(p) {
                Some(idx) => Some(idx),
                None => {
                    log::warn!("add_point: no parent named {p:?}");
                    return None;
                }
            },
        };

        let result = match parent {
            None => entry.ps.add_point(name, None, None),
            Some(parent_idx) => {
                let stride = entry.ps.stride();
                let sibling_rank = entry.ps.children(parent_idx).len();
                let theta = sibling_rank as f64 * GOLDEN_ANGLE;
                let mut e1 = vec![0.0; stride];
                let mut e2 = vec![0.0; stride];
                tangent_basis(entry.ps.coords_of(parent_idx), 1, 2, &mut e1, &mut e2);
                let (sin, cos) = theta.sin_cos();
                let tangent: Vec<f64> = (0..stride)
                    .map(|i| DEFAULT_CHILD_RADIUS * (cos * e1[i] + sin * e2[i]))
                    .collect();
                entry.ps.add_child_along(name, parent_idx, &tangent)
            }
        };

        match result {
            Ok(idx) => {
                entry.index.note_insert(idx);
                entry
                    .history
                    .record(HistoryRecord::CreatePoint { idx }, actor, now_ms);
                Some(idx)
            }
            Err(e) => {
                log::warn!("add_point {name:?} failed: {e}");
                None
            }
        }
    }

    /// Adds a point with explicit coordinates and parent index.
    pub fn add_point_at(
        &mut self,
        id: PointSetId,
        name: &str,
        parent: Option<usize>,
        coords: Option<&[f64]>,
        now_ms: f64,
    ) -> Option<usize> {
        let actor = self.actor;
        let entry = self.set_mut(id)?;
        match entry.ps.add_point(name, parent, coords) {
            Ok(idx) => {
                entry.index.note_insert(idx);
                entry
                    .history
                    .record(HistoryRecord::CreatePoint { idx }, actor, now_ms);
                Some(idx)
            }
            Err(e) => {
                log::warn!("add_point_at {name:?} failed: {e}");
                None
            }
        }
    }

    /// Number of live points, or `None` for an unknown id.
    #[must_use]
    pub fn get_point_count(&self, id: PointSetId) -> Option<usize> {
        Some(self.set(id)?.ps.count())
    }

    /// Metadata of one point.
    #[must_use]
    pub fn get_point_meta(&self, id: PointSetId, idx: usize) -> Option<&PointMeta> {
        let entry = self.set(id)?;
        entry.ps.is_live(idx).then(|| entry.ps.meta_of(idx))
    }

    /// Selects or deselects one point, as one undo step.
    pub fn set_selected(&mut self, id: PointSetId, idx: usize, on: bool, now_ms: f64) -> bool {
        self.toggle_point_flag(id, idx, PointFlags::SELECTED, on, now_ms)
    }

    /// Hides or reveals one point, as one undo step.
    pub fn set_hidden(&mut self, id: PointSetId, idx: usize, on: bool, now_ms: f64) -> bool {
        let changed = self.toggle_point_flag(id, idx, PointFlags::HIDDEN, on, now_ms);
        if changed {
            self.invalidate_renderers(id);
        }
        changed
    }

    fn toggle_point_flag(
        &mut self,
        id: PointSetId,
        idx: usize,
        flag: PointFlags,
        on: bool,
        now_ms: f64,
    ) -> bool {
        let actor = self.actor;
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        if !entry.ps.is_live(idx) || entry.ps.has_flag(idx, flag) == on {
            return false;
        }
        entry.ps.set_flag(idx, flag, on);
        entry.history.record(
            HistoryRecord::ToggleFlag {
                idx,
                flag,
                old: !on,
                new: on,
            },
            actor,
            now_ms,
        );
        true
    }

    /// Indices of all selected points.
    #[must_use]
    pub fn get_selected(&self, id: PointSetId) -> Vec<usize> {
        self.set(id).map_or_else(Vec::new, |e| e.ps.selected().collect())
    }

    /// Soft-deletes a subtree (root included), as one undo step.
    pub fn delete_subtree(&mut self, id: PointSetId, idx: usize, now_ms: f64) -> bool {
        let actor = self.actor;
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        if !entry.ps.is_live(idx) {
            return false;
        }
        let mut indices = vec![idx];
        entry.ps.descendants_into(idx, &mut indices);
        for &i in &indices {
            entry.ps.set_flag(i, PointFlags::HIDDEN, true);
        }
        entry.history.record(
            HistoryRecord::DeleteSubtree {
                root_idx: idx,
                n_nodes: indices.len(),
                indices,
            },
            actor,
            now_ms,
        );
        self.invalidate_renderers(id);
        true
    }

    // -------------------------------------------------------------------
    // Operators
    // -------------------------------------------------------------------

    /// Applies an operator under a history transaction.
    ///
    /// On failure the transaction rolls back (restoring the prior state),
    /// a warning is logged, and `false` is returned.
    pub fn apply_operator(&mut self, id: PointSetId, op: &Operator, now_ms: f64) -> bool {
        let actor = self.actor;
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        let mut tx = Transaction::new();
        match op.apply(&mut entry.ps, &mut tx) {
            Ok(()) => {
                tx.commit(&mut entry.history, actor, now_ms);
                self.invalidate_renderers(id);
                true
            }
            Err(e) => {
                log::warn!("operator failed: {e}");
                tx.rollback(&mut entry.ps);
                false
            }
        }
    }

    /// Applies an operator by its textual name (the string API boundary).
    pub fn apply_operator_named(&mut self, id: PointSetId, name: &str, now_ms: f64) -> bool {
        match crate::opnames::parse_operator(name) {
            Some(op) => self.apply_operator(id, &op, now_ms),
            None => {
                log::warn!("unknown operator {name:?}");
                false
            }
        }
    }

    // -------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------

    /// Undoes the latest history entry. Returns whether state changed.
    pub fn undo(&mut self, id: PointSetId) -> bool {
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        let changed = entry.history.undo(&mut entry.ps);
        if changed {
            self.invalidate_renderers(id);
        }
        changed
    }

    /// Redoes the latest undone entry. Returns whether state changed.
    pub fn redo(&mut self, id: PointSetId) -> bool {
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        let changed = entry.history.redo(&mut entry.ps);
        if changed {
            self.invalidate_renderers(id);
        }
        changed
    }

    /// Whether undo is currently possible.
    #[must_use]
    pub fn can_undo(&self, id: PointSetId) -> bool {
        self.set(id).is_some_and(|e| e.history.can_undo())
    }

    /// Whether redo is currently possible.
    #[must_use]
    pub fn can_redo(&self, id: PointSetId) -> bool {
        self.set(id).is_some_and(|e| e.history.can_redo())
    }

    // -------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------

    /// Hyperbolic distance between two live points.
    #[must_use]
    pub fn get_distance(&self, id: PointSetId, i: usize, j: usize) -> Option<f64> {
        let entry = self.set(id)?;
        (entry.ps.is_live(i) && entry.ps.is_live(j)).then(|| entry.ps.dist(i, j))
    }

    /// Nearest neighbor via the spatial index.
    pub fn query_nearest(&mut self, id: PointSetId, idx: usize) -> Option<(usize, f64)> {
        let entry = self.set_mut(id)?;
        if !entry.ps.is_live(idx) {
            return None;
        }
        entry.index.nearest(&entry.ps, idx)
    }

    /// K nearest neighbors via the spatial index, closest first.
    pub fn query_k_nearest(&mut self, id: PointSetId, idx: usize, k: usize) -> Vec<(usize, f64)> {
        let Some(entry) = self.set_mut(id) else {
            return Vec::new();
        };
        if !entry.ps.is_live(idx) {
            return Vec::new();
        }
        entry.index.k_nearest(&entry.ps, idx, k)
    }

    // -------------------------------------------------------------------
    // Fields
    // -------------------------------------------------------------------

    /// Installs the density field configuration for a set.
    pub fn set_field(&mut self, id: PointSetId, kernel: FieldKernel, sigma: f64) -> bool {
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        entry.field = ScalarField::new(kernel, sigma);
        true
    }

    /// Evaluates the set's density field at a manifold point.
    #[must_use]
    pub fn sample_density_at_point(&self, id: PointSetId, coords: &[f64]) -> Option<f64> {
        let entry = self.set(id)?;
        if coords.len() != entry.ps.stride() {
            log::warn!("sample_density_at_point: dimension mismatch");
            return None;
        }
        Some(entry.field.eval_density(&entry.ps, coords))
    }

    // -------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------

    /// Serializes a set to its JSON document form.
    #[must_use]
    pub fn export_pointset(&self, id: PointSetId) -> Option<String> {
        let entry = self.set(id)?;
        Some(document::to_json(&document::export_pointset(&entry.ps)))
    }

    /// Imports a JSON document as a new registered set.
    ///
    /// All-or-nothing: a malformed document registers nothing and
    /// returns `None`.
    pub fn import_pointset(&mut self, json: &str) -> Option<PointSetId> {
        let doc = match document::from_json(json) {
            Ok(doc) => doc,
            Err(e) => {
                log::warn!("import failed: {e}");
                return None;
            }
        };
        if doc.dim != self.dim {
            log::warn!("import failed: dimension {} != engine {}", doc.dim, self.dim);
            return None;
        }
        // Leave headroom for interactive growth past the imported size.
        let capacity = (doc.count * 2).max(64);
        match document::import_pointset(&doc, capacity) {
            Ok(ps) => {
                let id = PointSetId(self.sets.len());
                self.sets.push(crate::SetEntry {
                    ps,
                    index: canopy_index::VpIndex::new(),
                    field: ScalarField::new(FieldKernel::Gaussian, 1.0),
                    history: canopy_history::History::new(),
                });
                log::debug!("imported pointset {} ({} points)", id.0, doc.count);
                Some(id)
            }
            Err(e) => {
                log::warn!("import failed: {e}");
                None
            }
        }
    }

    // -------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------

    /// Runs the radial layout from `root`, as one undo step.
    pub fn layout_radial(
        &mut self,
        id: PointSetId,
        root: usize,
        config: &RadialConfig,
        now_ms: f64,
    ) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::radial_layout(ps, tx, root, config).is_ok()
        })
    }

    /// Runs the hierarchical layout from `root`, as one undo step.
    pub fn layout_hierarchical(
        &mut self,
        id: PointSetId,
        root: usize,
        config: &RadialConfig,
        now_ms: f64,
    ) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::hierarchical_layout(ps, tx, root, config).is_ok()
        })
    }

    /// Runs force-directed relaxation, as one undo step.
    pub fn layout_force(&mut self, id: PointSetId, config: &ForceConfig, now_ms: f64) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::force_layout(ps, tx, config).is_ok()
        })
    }

    /// Evenly spreads the children of `parent` around it, as one undo
    /// step.
    pub fn layout_spread_children(
        &mut self,
        id: PointSetId,
        parent: usize,
        radius: f64,
        now_ms: f64,
    ) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::spread_children(ps, tx, parent, radius).is_ok()
        })
    }

    /// Translates the whole set so `root` sits at the origin, as one undo
    /// step.
    pub fn layout_center_on_root(&mut self, id: PointSetId, root: usize, now_ms: f64) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::center_on_root(ps, tx, root).is_ok()
        })
    }

    /// Compacts one motif cluster toward its centroid, as one undo step.
    pub fn layout_compact_cluster(
        &mut self,
        id: PointSetId,
        motif: i32,
        t: f64,
        now_ms: f64,
    ) -> bool {
        self.run_layout(id, now_ms, |ps, tx| {
            canopy_layout::compact_cluster(ps, tx, motif, t).is_ok()
        })
    }

    fn run_layout<F>(&mut self, id: PointSetId, now_ms: f64, run: F) -> bool
    where
        F: FnOnce(&mut canopy_pointset::PointSet, &mut Transaction) -> bool,
    {
        let actor = self.actor;
        let Some(entry) = self.set_mut(id) else {
            return false;
        };
        let mut tx = Transaction::new();
        if run(&mut entry.ps, &mut tx) {
            tx.commit(&mut entry.history, actor, now_ms);
            self.invalidate_renderers(id);
            true
        } else {
            log::warn!("layout failed for set {}", id.0);
            tx.rollback(&mut entry.ps);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_point_by_names_builds_a_tree() {
        let mut engine = Engine::new(2);
        let id = engine.create_pointset(16);
        let r = engine.add_point(id, "r", None, 0.0).unwrap();
        let a = engine.add_point(id, "a", Some("r"), 1.0).unwrap();
        let b = engine.add_point(id, "b", Some("r"), 2.0).unwrap();
        let ps = engine.pointset(id).unwrap();
        assert_eq!(ps.parent_of(a), Some(r));
        assert_eq!(ps.depth_of(b), 1);
        // Children sit a default step from the parent, fanned apart.
        assert!((ps.dist(r, a) - 0.5).abs() < 1e-9);
        assert!(ps.dist(a, b) > 0.1);
        assert!(engine.add_point(id, "a", None, 3.0).is_none(), "dup name");
        assert!(engine.add_point(id, "x", Some("ghost"), 4.0).is_none());
    }

    #[test]
    fn operator_and_undo_flow() {
        let mut engine = Engine::new(2);
        let id = engine.create_pointset(8);
        engine.add_point(id, "r", None, 0.0);
        engine.add_point(id, "a", Some("r"), 1.0);
        assert!(engine.apply_operator_named(id, "select-all", 10.0));
        assert_eq!(engine.get_selected(id).len(), 2);
        assert!(engine.can_undo(id));
        assert!(engine.undo(id));
        assert_eq!(engine.get_selected(id).len(), 0);
        assert!(engine.redo(id));
        assert_eq!(engine.get_selected(id).len(), 2);
    }

    #[test]
    fn unknown_ids_and_names_are_quiet_no_ops() {
        let mut engine = Engine::new(2);
        let ghost = PointSetId(99);
        assert!(engine.get_point_count(ghost).is_none());
        assert!(!engine.apply_operator_named(ghost, "select-all", 0.0));
        assert!(!engine.undo(ghost));
        let id = engine.create_pointset(4);
        assert!(!engine.apply_operator_named(id, "not-an-op", 0.0));
        assert!(engine.get_distance(id, 0, 1).is_none());
    }

    #[test]
    fn export_import_round_trip_via_engine() {
        let mut engine = Engine::new(2);
        let id = engine.create_pointset(8);
        engine.add_point(id, "r", None, 0.0);
        engine.add_point(id, "a", Some("r"), 1.0);
        let json = engine.export_pointset(id).unwrap();
        let id2 = engine.import_pointset(&json).unwrap();
        assert_eq!(engine.get_point_count(id2), Some(2));
        assert!(engine.import_pointset("{bad").is_none());
    }

    #[test]
    fn delete_subtree_is_one_undo_step() {
        let mut engine = Engine::new(2);
        let id = engine.create_pointset(8);
        engine.add_point(id, "r", None, 0.0);
        engine.add_point(id, "a", Some("r"), 1.0);
        engine.add_point(id, "aa", Some("a"), 2.0);
        let a = engine.pointset(id).unwrap().index_of("a").unwrap();
        assert!(engine.delete_subtree(id, a, 10.0));
        assert_eq!(engine.pointset(id).unwrap().visible().count(), 1);
        assert!(engine.undo(id));
        assert_eq!(engine.pointset(id).unwrap().visible().count(), 3);
    }
}
