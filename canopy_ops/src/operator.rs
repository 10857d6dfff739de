// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The operator enum, its application semantics, and combinators.

use canopy_field::ScalarField;
use canopy_history::{HistoryRecord, Transaction};
use canopy_kernel::{EPS, Transvection, exp_map_scaled, hyperboloid, maps, minkowski_dot};
use canopy_pointset::{PointFlags, PointSet, PointSetError};

use crate::pred::{SelectPred, StatePred};

/// Failures surfaced by operator application.
///
/// A failing operator may have pushed records into the transaction before
/// failing; callers are expected to roll the transaction back, which
/// restores the pre-operator state.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// An underlying point-set mutation failed.
    #[error(transparent)]
    PointSet(#[from] PointSetError),
    /// A named point does not exist.
    #[error("no point named {0:?}")]
    NotFound(String),
    /// A parameter is out of range for the operator.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

/// A composable, reversible-where-possible state operator.
///
/// Operators are applied with [`Operator::apply`], which mutates the point
/// set and pushes [`HistoryRecord`]s into the supplied transaction.
/// Composition via [`Operator::then`] is associative (sequences flatten).
#[derive(Clone, Debug)]
pub enum Operator {
    /// Select every visible point (replaces the selection).
    SelectAll,
    /// Clear the selection.
    DeselectAll,
    /// Replace the selection with the visible points matching a predicate.
    Select(SelectPred),
    /// Replace the selection with one named point.
    SelectByName(String),
    /// Add the direct children of selected points to the selection.
    ExpandSelection,
    /// Add all descendants of selected points to the selection.
    ExpandSelectionFull,
    /// Replace the selection with the parents of selected points.
    ContractSelection,

    /// Apply the transvection sending origin → `target` to every point.
    Translate {
        /// Boost target.
        target: Vec<f64>,
        /// Apply the inverse boost instead.
        inverse: bool,
    },
    /// Move selected points along geodesics toward `target` by `step`
    /// (or onto it when `step` exceeds the remaining distance).
    AttractTo {
        /// Attraction target.
        target: Vec<f64>,
        /// Geodesic step length, non-negative.
        step: f64,
    },
    /// Attract selected points toward their own centroid, recomputed on
    /// every application.
    AttractToCentroid {
        /// Geodesic step length, non-negative.
        step: f64,
    },
    /// Move selected points directly away from `target` by `step`.
    RepelFrom {
        /// Repulsion source.
        target: Vec<f64>,
        /// Geodesic step length, non-negative.
        step: f64,
    },
    /// Rotate selected points around `center` in the spatial plane
    /// spanned by two ambient axes.
    RotateAround {
        /// Rotation center on the manifold.
        center: Vec<f64>,
        /// First spatial axis (`1..=n`).
        axis_i: usize,
        /// Second spatial axis (`1..=n`).
        axis_j: usize,
        /// Rotation angle in radians.
        theta: f64,
    },

    /// Reparent `child` under `parent`.
    Attach {
        /// Point being moved.
        child: usize,
        /// New parent.
        parent: usize,
    },
    /// Make a point a root.
    Detach {
        /// Point being detached.
        idx: usize,
    },
    /// Hide and mark `FOLDED` every descendant of a point.
    FoldSubtree {
        /// Subtree root (stays visible itself).
        idx: usize,
    },
    /// Reveal previously folded descendants of a point.
    UnfoldSubtree {
        /// Subtree root.
        idx: usize,
    },

    /// Clear `HIDDEN` on the selection.
    Show,
    /// Set `HIDDEN` on the selection.
    Hide,
    /// Hide visible points farther than `threshold` from `focus`.
    PruneByDistance {
        /// Reference point.
        focus: Vec<f64>,
        /// Maximum distance kept visible.
        threshold: f64,
    },
    /// Hide visible points deeper than `max_depth`.
    PruneByDepth {
        /// Deepest level kept visible.
        max_depth: u32,
    },

    /// Move selected points along the density gradient of a field.
    ///
    /// Positive steps climb toward mass (clustering); negative steps
    /// descend (spreading). A vanishing gradient leaves the point where
    /// it is.
    GradientFlow {
        /// The field whose gradient drives the motion.
        field: ScalarField,
        /// Signed step length along the unit gradient.
        step: f64,
    },

    /// Apply operators left to right.
    Sequence(Vec<Operator>),
    /// Apply `op` only when `pred` holds.
    Conditional {
        /// Guard evaluated against the current state.
        pred: StatePred,
        /// Operator to run when the guard holds.
        op: Box<Operator>,
    },
    /// Apply `op` a fixed number of times.
    Repeat {
        /// Operator to repeat.
        op: Box<Operator>,
        /// Number of applications.
        times: usize,
    },
}

impl Operator {
    /// Builds one operator per currently selected index and sequences
    /// them. The selection is snapshotted now; later selection changes do
    /// not affect the built operator.
    pub fn on_selection<F>(ps: &PointSet, build: F) -> Self
    where
        F: Fn(usize) -> Self,
    {
        Self::Sequence(ps.selected().map(build).collect())
    }

    /// Sequential composition; sequences flatten, so composition is
    /// associative.
    #[must_use]
    pub fn then(self, other: Self) -> Self {
        match (self, other) {
            (Self::Sequence(mut a), Self::Sequence(b)) => {
                a.extend(b);
                Self::Sequence(a)
            }
            (Self::Sequence(mut a), o) => {
                a.push(o);
                Self::Sequence(a)
            }
            (s, Self::Sequence(b)) => {
                let mut v = Vec::with_capacity(b.len() + 1);
                v.push(s);
                v.extend(b);
                Self::Sequence(v)
            }
            (s, o) => Self::Sequence(vec![s, o]),
        }
    }

    /// The inverse operator, where one exists independent of state.
    ///
    /// Lossy operators (attractions, prunes, selection edits) return
    /// `None`; their effects are undone through history records instead.
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        match self {
            Self::Translate { target, inverse } => Some(Self::Translate {
                target: target.clone(),
                inverse: !inverse,
            }),
            Self::RotateAround {
                center,
                axis_i,
                axis_j,
                theta,
            } => Some(Self::RotateAround {
                center: center.clone(),
                axis_i: *axis_i,
                axis_j: *axis_j,
                theta: -theta,
            }),
            Self::FoldSubtree { idx } => Some(Self::UnfoldSubtree { idx: *idx }),
            Self::UnfoldSubtree { idx } => Some(Self::FoldSubtree { idx: *idx }),
            Self::Show => Some(Self::Hide),
            Self::Hide => Some(Self::Show),
            Self::Sequence(ops) => {
                let mut inverted = Vec::with_capacity(ops.len());
                for op in ops.iter().rev() {
                    inverted.push(op.invert()?);
                }
                Some(Self::Sequence(inverted))
            }
            Self::Repeat { op, times } => Some(Self::Repeat {
                op: Box::new(op.invert()?),
                times: *times,
            }),
            _ => None,
        }
    }

    /// Applies the operator, pushing history records as it mutates.
    ///
    /// On error the transaction may hold records for the mutations that
    /// did land; rolling it back restores the initial state.
    pub fn apply(&self, ps: &mut PointSet, tx: &mut Transaction) -> Result<(), OpError> {
        match self {
            Self::SelectAll => {
                let all: Vec<usize> = ps.visible().collect();
                for i in all {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, true);
                }
                Ok(())
            }
            Self::DeselectAll => {
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, false);
                }
                Ok(())
            }
            Self::Select(pred) => {
                let matches: Vec<(usize, bool)> = ps
                    .visible()
                    .map(|i| (i, pred.matches(ps, i)))
                    .collect();
                for (i, m) in matches {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, m);
                }
                Ok(())
            }
            Self::SelectByName(name) => {
                let Some(target) = ps.index_of(name) else {
                    return Err(OpError::NotFound(name.clone()));
                };
                let sel: Vec<usize> = ps.selected().filter(|&i| i != target).collect();
                for i in sel {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, false);
                }
                set_flag_recorded(ps, tx, target, PointFlags::SELECTED, true);
                Ok(())
            }
            Self::ExpandSelection => {
                let mut added = Vec::new();
                for i in ps.selected() {
                    ps.children_into(i, &mut added);
                }
                for i in added {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, true);
                }
                Ok(())
            }
            Self::ExpandSelectionFull => {
                let mut added = Vec::new();
                for i in ps.selected() {
                    ps.descendants_into(i, &mut added);
                }
                for i in added {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, true);
                }
                Ok(())
            }
            Self::ContractSelection => {
                let sel: Vec<usize> = ps.selected().collect();
                let parents: Vec<usize> = sel.iter().filter_map(|&i| ps.parent_of(i)).collect();
                for i in sel {
                    set_flag_recorded(ps, tx, i, PointFlags::SELECTED, false);
                }
                for p in parents {
                    set_flag_recorded(ps, tx, p, PointFlags::SELECTED, true);
                }
                Ok(())
            }

            Self::Translate { target, inverse } => {
                let tv = if *inverse {
                    Transvection::to(target).inverse()
                } else {
                    Transvection::to(target)
                };
                let stride = ps.stride();
                let mut scratch = vec![0.0; stride];
                let all: Vec<usize> = ps.live_indices().collect();
                for i in all {
                    scratch.copy_from_slice(ps.coords_of(i));
                    tv.apply(&mut scratch);
                    move_recorded(ps, tx, i, &scratch)?;
                }
                Ok(())
            }
            Self::AttractTo { target, step } => {
                check_step(*step)?;
                attract_selected(ps, tx, target, *step)
            }
            Self::AttractToCentroid { step } => {
                check_step(*step)?;
                let Some(centroid) = selection_centroid(ps) else {
                    return Ok(());
                };
                attract_selected(ps, tx, &centroid, *step)
            }
            Self::RepelFrom { target, step } => {
                check_step(*step)?;
                let stride = ps.stride();
                let mut dir = vec![0.0; stride];
                let mut next = vec![0.0; stride];
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    let d = maps::log_map_direction(&mut dir, ps.coords_of(i), target);
                    if d < EPS {
                        continue;
                    }
                    exp_map_scaled(&mut next, ps.coords_of(i), &dir, -*step);
                    move_recorded(ps, tx, i, &next)?;
                }
                Ok(())
            }
            Self::RotateAround {
                center,
                axis_i,
                axis_j,
                theta,
            } => {
                let stride = ps.stride();
                if *axis_i == 0 || *axis_j == 0 || *axis_i >= stride || *axis_j >= stride {
                    return Err(OpError::InvalidArgument("rotation axis out of range"));
                }
                if axis_i == axis_j {
                    return Err(OpError::InvalidArgument("rotation axes must differ"));
                }
                let to_origin = Transvection::to_origin(center);
                let back = Transvection::to(center);
                let (sin, cos) = theta.sin_cos();
                let mut scratch = vec![0.0; stride];
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    scratch.copy_from_slice(ps.coords_of(i));
                    to_origin.apply(&mut scratch);
                    let (a, b) = (scratch[*axis_i], scratch[*axis_j]);
                    scratch[*axis_i] = cos * a - sin * b;
                    scratch[*axis_j] = sin * a + cos * b;
                    back.apply(&mut scratch);
                    move_recorded(ps, tx, i, &scratch)?;
                }
                Ok(())
            }

            Self::Attach { child, parent } => {
                let old_parent = ps.parent_of(*child);
                let old_depth = ps.depth_of(*child);
                ps.reparent(*child, Some(*parent))?;
                tx.push(HistoryRecord::Reparent {
                    idx: *child,
                    old_parent,
                    new_parent: Some(*parent),
                    old_depth,
                    new_depth: ps.depth_of(*child),
                });
                Ok(())
            }
            Self::Detach { idx } => {
                let old_parent = ps.parent_of(*idx);
                let old_depth = ps.depth_of(*idx);
                ps.reparent(*idx, None)?;
                tx.push(HistoryRecord::Reparent {
                    idx: *idx,
                    old_parent,
                    new_parent: None,
                    old_depth,
                    new_depth: 0,
                });
                Ok(())
            }
            Self::FoldSubtree { idx } => {
                // Only currently-visible descendants fold; anything already
                // hidden keeps its state and is not revealed by unfold.
                for d in ps.descendants(*idx) {
                    if !ps.has_flag(d, PointFlags::HIDDEN) {
                        set_flag_recorded(ps, tx, d, PointFlags::HIDDEN, true);
                        set_flag_recorded(ps, tx, d, PointFlags::FOLDED, true);
                    }
                }
                Ok(())
            }
            Self::UnfoldSubtree { idx } => {
                for d in ps.descendants(*idx) {
                    if ps.has_flag(d, PointFlags::FOLDED) {
                        set_flag_recorded(ps, tx, d, PointFlags::HIDDEN, false);
                        set_flag_recorded(ps, tx, d, PointFlags::FOLDED, false);
                    }
                }
                Ok(())
            }

            Self::Show => {
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    set_flag_recorded(ps, tx, i, PointFlags::HIDDEN, false);
                }
                Ok(())
            }
            Self::Hide => {
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    set_flag_recorded(ps, tx, i, PointFlags::HIDDEN, true);
                }
                Ok(())
            }
            Self::PruneByDistance { focus, threshold } => {
                let victims: Vec<usize> = ps
                    .visible()
                    .filter(|&i| ps.dist_to(i, focus) > *threshold)
                    .collect();
                for i in victims {
                    set_flag_recorded(ps, tx, i, PointFlags::HIDDEN, true);
                }
                Ok(())
            }
            Self::PruneByDepth { max_depth } => {
                let victims: Vec<usize> = ps
                    .visible()
                    .filter(|&i| ps.depth_of(i) > *max_depth)
                    .collect();
                for i in victims {
                    set_flag_recorded(ps, tx, i, PointFlags::HIDDEN, true);
                }
                Ok(())
            }

            Self::GradientFlow { field, step } => {
                let stride = ps.stride();
                let mut grad = vec![0.0; stride];
                let mut next = vec![0.0; stride];
                let sel: Vec<usize> = ps.selected().collect();
                for i in sel {
                    field.gradient(ps, ps.coords_of(i), &mut grad);
                    let norm = minkowski_dot(&grad, &grad).max(0.0).sqrt();
                    if norm < EPS {
                        continue;
                    }
                    for g in grad.iter_mut() {
                        *g /= norm;
                    }
                    exp_map_scaled(&mut next, ps.coords_of(i), &grad, *step);
                    move_recorded(ps, tx, i, &next)?;
                }
                Ok(())
            }

            Self::Sequence(ops) => {
                for op in ops {
                    op.apply(ps, tx)?;
                }
                Ok(())
            }
            Self::Conditional { pred, op } => {
                if pred.holds(ps) {
                    op.apply(ps, tx)?;
                }
                Ok(())
            }
            Self::Repeat { op, times } => {
                for _ in 0..*times {
                    op.apply(ps, tx)?;
                }
                Ok(())
            }
        }
    }
}

fn check_step(step: f64) -> Result<(), OpError> {
    if step < 0.0 || !step.is_finite() {
        return Err(OpError::InvalidArgument("step must be non-negative"));
    }
    Ok(())
}

/// Sets a flag and records the change when it actually flips.
fn set_flag_recorded(
    ps: &mut PointSet,
    tx: &mut Transaction,
    idx: usize,
    flag: PointFlags,
    on: bool,
) {
    let old = ps.has_flag(idx, flag);
    if old == on {
        return;
    }
    ps.set_flag(idx, flag, on);
    tx.push(HistoryRecord::ToggleFlag {
        idx,
        flag,
        old,
        new: on,
    });
}

/// Moves a point and records old and new coordinates.
fn move_recorded(
    ps: &mut PointSet,
    tx: &mut Transaction,
    idx: usize,
    new_coords: &[f64],
) -> Result<(), OpError> {
    let old = ps.coords_of(idx).to_vec();
    ps.set_coords(idx, new_coords)?;
    tx.push(HistoryRecord::MovePoint {
        idx,
        old_coords: old,
        new_coords: ps.coords_of(idx).to_vec(),
    });
    Ok(())
}

/// Moves every selected point toward `target` along its geodesic.
fn attract_selected(
    ps: &mut PointSet,
    tx: &mut Transaction,
    target: &[f64],
    step: f64,
) -> Result<(), OpError> {
    let stride = ps.stride();
    let mut next = vec![0.0; stride];
    let sel: Vec<usize> = ps.selected().collect();
    for i in sel {
        let d = ps.dist_to(i, target);
        if d < EPS {
            continue;
        }
        let t = (step / d).min(1.0);
        hyperboloid::geodesic_lerp(&mut next, ps.coords_of(i), target, t);
        move_recorded(ps, tx, i, &next)?;
    }
    Ok(())
}

/// Approximate Fréchet centroid of the selection: the normalized Minkowski
/// mean. `None` when the selection is empty or the mean is degenerate.
fn selection_centroid(ps: &PointSet) -> Option<Vec<f64>> {
    let stride = ps.stride();
    let mut mean = vec![0.0; stride];
    let mut n = 0;
    for i in ps.selected() {
        for (m, v) in mean.iter_mut().zip(ps.coords_of(i)) {
            *m += v;
        }
        n += 1;
    }
    if n == 0 {
        return None;
    }
    for m in &mut mean {
        *m /= n as f64;
    }
    hyperboloid::project_to_hyperboloid(&mut mean).ok()?;
    Some(mean)
}
