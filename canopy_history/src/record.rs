// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reversible history records.

use canopy_pointset::{PointFlags, PointSet, PointSetError};

/// One reversible mutation of a point set.
///
/// Records store old and new state by value so both directions are total;
/// nothing is looked up at undo time that the original operation could
/// have changed since.
#[derive(Clone, Debug, PartialEq)]
pub enum HistoryRecord {
    /// A point was created at `idx`.
    ///
    /// Creation is physically irreversible (the columns only grow), so
    /// undo hides the point and redo reveals it again.
    CreatePoint {
        /// Index of the created point.
        idx: usize,
    },
    /// A point was soft-deleted.
    DeletePoint {
        /// Index of the hidden point.
        idx: usize,
    },
    /// A point moved.
    MovePoint {
        /// Index of the moved point.
        idx: usize,
        /// Coordinates before the move.
        old_coords: Vec<f64>,
        /// Coordinates after the move.
        new_coords: Vec<f64>,
    },
    /// A point changed parent.
    Reparent {
        /// Index of the reparented point.
        idx: usize,
        /// Previous parent, `None` for a root.
        old_parent: Option<usize>,
        /// New parent, `None` for a root.
        new_parent: Option<usize>,
        /// Depth before the change.
        old_depth: u32,
        /// Depth after the change.
        new_depth: u32,
    },
    /// A point was renamed.
    Rename {
        /// Index of the renamed point.
        idx: usize,
        /// Name before the change.
        old_name: String,
        /// Name after the change.
        new_name: String,
    },
    /// A flag bit flipped.
    ToggleFlag {
        /// Index of the affected point.
        idx: usize,
        /// The flag that changed.
        flag: PointFlags,
        /// State before the change.
        old: bool,
        /// State after the change.
        new: bool,
    },
    /// Several records applied as one undo unit.
    Batch(
        /// Child records in application order.
        Vec<HistoryRecord>,
    ),
    /// A subtree was pasted; its nodes occupy consecutive indices.
    PasteSubtree {
        /// First pasted index (the subtree root).
        root_idx: usize,
        /// Number of pasted nodes.
        n_nodes: usize,
    },
    /// A subtree was soft-deleted.
    DeleteSubtree {
        /// The subtree root.
        root_idx: usize,
        /// Number of affected nodes, root included.
        n_nodes: usize,
        /// Every affected index (root first).
        indices: Vec<usize>,
    },
}

impl HistoryRecord {
    /// Re-applies the mutation (the redo direction).
    pub fn apply(&self, ps: &mut PointSet) -> Result<(), PointSetError> {
        match self {
            Self::CreatePoint { idx } => {
                ps.set_flag(*idx, PointFlags::HIDDEN, false);
                Ok(())
            }
            Self::DeletePoint { idx } => {
                ps.set_flag(*idx, PointFlags::HIDDEN, true);
                Ok(())
            }
            Self::MovePoint {
                idx, new_coords, ..
            } => ps.set_coords(*idx, new_coords),
            Self::Reparent {
                idx, new_parent, ..
            } => ps.reparent(*idx, *new_parent),
            Self::Rename { idx, new_name, .. } => ps.rename(*idx, new_name),
            Self::ToggleFlag { idx, flag, new, .. } => {
                ps.set_flag(*idx, *flag, *new);
                Ok(())
            }
            Self::Batch(records) => {
                for r in records {
                    r.apply(ps)?;
                }
                Ok(())
            }
            Self::PasteSubtree { root_idx, n_nodes } => {
                for i in *root_idx..*root_idx + *n_nodes {
                    ps.set_flag(i, PointFlags::HIDDEN, false);
                }
                Ok(())
            }
            Self::DeleteSubtree { indices, .. } => {
                for &i in indices {
                    ps.set_flag(i, PointFlags::HIDDEN, true);
                }
                Ok(())
            }
        }
    }

    /// Reverses the mutation (the undo direction).
    pub fn revert(&self, ps: &mut PointSet) -> Result<(), PointSetError> {
        match self {
            Self::CreatePoint { idx } => {
                ps.set_flag(*idx, PointFlags::HIDDEN, true);
                Ok(())
            }
            Self::DeletePoint { idx } => {
                ps.set_flag(*idx, PointFlags::HIDDEN, false);
                Ok(())
            }
            Self::MovePoint {
                idx, old_coords, ..
            } => ps.set_coords(*idx, old_coords),
            Self::Reparent {
                idx, old_parent, ..
            } => ps.reparent(*idx, *old_parent),
            Self::Rename { idx, old_name, .. } => ps.rename(*idx, old_name),
            Self::ToggleFlag { idx, flag, old, .. } => {
                ps.set_flag(*idx, *flag, *old);
                Ok(())
            }
            Self::Batch(records) => {
                // Children are reverted in reverse application order.
                for r in records.iter().rev() {
                    r.revert(ps)?;
                }
                Ok(())
            }
            Self::PasteSubtree { root_idx, n_nodes } => {
                for i in *root_idx..*root_idx + *n_nodes {
                    ps.set_flag(i, PointFlags::HIDDEN, true);
                }
                Ok(())
            }
            Self::DeleteSubtree { indices, .. } => {
                for &i in indices {
                    ps.set_flag(i, PointFlags::HIDDEN, false);
                }
                Ok(())
            }
        }
    }

    /// Stable discriminant used by the coalescing rule.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreatePoint { .. } => "create",
            Self::DeletePoint { .. } => "delete",
            Self::MovePoint { .. } => "move",
            Self::Reparent { .. } => "reparent",
            Self::Rename { .. } => "rename",
            Self::ToggleFlag { .. } => "flag",
            Self::Batch(..) => "batch",
            Self::PasteSubtree { .. } => "paste",
            Self::DeleteSubtree { .. } => "delete-subtree",
        }
    }

    /// Merges `next` into `self` when the two form one logical edit
    /// (same kind, same point). Returns the merged record, or `None` when
    /// they cannot coalesce.
    #[must_use]
    pub fn coalesce_with(&self, next: &Self) -> Option<Self> {
        match (self, next) {
            (
                Self::MovePoint {
                    idx, old_coords, ..
                },
                Self::MovePoint {
                    idx: idx2,
                    new_coords,
                    ..
                },
            ) if idx == idx2 => Some(Self::MovePoint {
                idx: *idx,
                old_coords: old_coords.clone(),
                new_coords: new_coords.clone(),
            }),
            (
                Self::Rename { idx, old_name, .. },
                Self::Rename {
                    idx: idx2,
                    new_name,
                    ..
                },
            ) if idx == idx2 => Some(Self::Rename {
                idx: *idx,
                old_name: old_name.clone(),
                new_name: new_name.clone(),
            }),
            (
                Self::ToggleFlag {
                    idx, flag, old, ..
                },
                Self::ToggleFlag {
                    idx: idx2,
                    flag: flag2,
                    new,
                    ..
                },
            ) if idx == idx2 && flag == flag2 => Some(Self::ToggleFlag {
                idx: *idx,
                flag: *flag,
                old: *old,
                new: *new,
            }),
            _ => None,
        }
    }
}
