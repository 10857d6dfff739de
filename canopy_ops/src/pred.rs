// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Closed predicate forms used by selection and conditional operators.
//!
//! Predicates are data, not closures, so operators stay serializable,
//! comparable, and dispatchable from the engine's string boundary.

use canopy_pointset::{PointFlags, PointSet};

/// Per-point predicate for selection operators.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectPred {
    /// Points at exactly this tree depth.
    AtDepth(u32),
    /// Points carrying all of these flag bits.
    WithFlag(PointFlags),
    /// Points with this cluster id.
    WithMotif(i32),
    /// Points within hyperbolic distance `radius` of `target`.
    WithinDist {
        /// Center of the ball.
        target: Vec<f64>,
        /// Ball radius.
        radius: f64,
    },
    /// Points whose name contains this substring.
    NameContains(String),
}

impl SelectPred {
    /// Evaluates the predicate for one live point.
    #[must_use]
    pub fn matches(&self, ps: &PointSet, idx: usize) -> bool {
        match self {
            Self::AtDepth(d) => ps.depth_of(idx) == *d,
            Self::WithFlag(f) => ps.flags_of(idx).contains(*f),
            Self::WithMotif(m) => ps.motif(idx) == *m,
            Self::WithinDist { target, radius } => ps.dist_to(idx, target) <= *radius,
            Self::NameContains(s) => ps.name_of(idx).contains(s.as_str()),
        }
    }
}

/// Whole-state predicate for conditional operators.
#[derive(Clone, Debug, PartialEq)]
pub enum StatePred {
    /// At least one point is selected.
    SelectionNonEmpty,
    /// The set holds at least this many live points.
    CountAtLeast(usize),
    /// A point with this name exists.
    HasName(String),
}

impl StatePred {
    /// Evaluates the predicate against the whole set.
    #[must_use]
    pub fn holds(&self, ps: &PointSet) -> bool {
        match self {
            Self::SelectionNonEmpty => ps.selected().next().is_some(),
            Self::CountAtLeast(n) => ps.count() >= *n,
            Self::HasName(name) => ps.index_of(name).is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicates_match_expected_points() {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("root", None, None).unwrap();
        let c = ps.add_child_along("child-a", r, &[0.0, 0.4, 0.0]).unwrap();
        ps.set_motif(c, 2);
        ps.set_flag(c, PointFlags::SELECTED, true);

        assert!(SelectPred::AtDepth(0).matches(&ps, r));
        assert!(!SelectPred::AtDepth(0).matches(&ps, c));
        assert!(SelectPred::WithFlag(PointFlags::SELECTED).matches(&ps, c));
        assert!(SelectPred::WithMotif(2).matches(&ps, c));
        assert!(SelectPred::NameContains("-a".into()).matches(&ps, c));
        let origin = canopy_kernel::origin(2);
        assert!(
            SelectPred::WithinDist {
                target: origin,
                radius: 0.1
            }
            .matches(&ps, r)
        );

        assert!(StatePred::SelectionNonEmpty.holds(&ps));
        assert!(StatePred::CountAtLeast(2).holds(&ps));
        assert!(!StatePred::CountAtLeast(3).holds(&ps));
        assert!(StatePred::HasName("root".into()).holds(&ps));
    }
}
