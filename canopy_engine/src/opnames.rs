// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Textual operator names.
//!
//! The string form exists only at the API boundary; it parses into the
//! structured [`Operator`] enum and nothing downstream ever dispatches on
//! strings. Parameterized names carry a single `:`-separated argument.

use canopy_ops::Operator;

/// Parses an operator name.
///
/// Recognized names: `select-all`, `deselect-all`, `expand-selection`,
/// `expand-selection-full`, `contract-selection`, `show`, `hide`, and the
/// parameterized `fold-subtree:<idx>`, `unfold-subtree:<idx>`,
/// `attract-centroid:<step>`, `prune-depth:<d>`.
#[must_use]
pub fn parse_operator(name: &str) -> Option<Operator> {
    match name {
        "select-all" => return Some(Operator::SelectAll),
        "deselect-all" => return Some(Operator::DeselectAll),
        "expand-selection" => return Some(Operator::ExpandSelection),
        "expand-selection-full" => return Some(Operator::ExpandSelectionFull),
        "contract-selection" => return Some(Operator::ContractSelection),
        "show" => return Some(Operator::Show),
        "hide" => return Some(Operator::Hide),
        _ => {}
    }
    let (head, arg) = name.split_once(':')?;
    match head {
        "fold-subtree" => Some(Operator::FoldSubtree {
            idx: arg.parse().ok()?,
        }),
        "unfold-subtree" => Some(Operator::UnfoldSubtree {
            idx: arg.parse().ok()?,
        }),
        "attract-centroid" => {
            let step: f64 = arg.parse().ok()?;
            (step.is_finite() && step >= 0.0).then_some(Operator::AttractToCentroid { step })
        }
        "prune-depth" => Some(Operator::PruneByDepth {
            max_depth: arg.parse().ok()?,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_parse() {
        assert!(matches!(
            parse_operator("select-all"),
            Some(Operator::SelectAll)
        ));
        assert!(matches!(parse_operator("hide"), Some(Operator::Hide)));
        assert!(matches!(
            parse_operator("expand-selection-full"),
            Some(Operator::ExpandSelectionFull)
        ));
    }

    #[test]
    fn parameterized_names_parse_their_argument() {
        assert!(matches!(
            parse_operator("fold-subtree:7"),
            Some(Operator::FoldSubtree { idx: 7 })
        ));
        match parse_operator("attract-centroid:0.25") {
            Some(Operator::AttractToCentroid { step }) => {
                assert!((step - 0.25).abs() < 1e-12);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
        assert!(matches!(
            parse_operator("prune-depth:3"),
            Some(Operator::PruneByDepth { max_depth: 3 })
        ));
    }

    #[test]
    fn junk_is_rejected() {
        assert!(parse_operator("").is_none());
        assert!(parse_operator("select-everything").is_none());
        assert!(parse_operator("fold-subtree:x").is_none());
        assert!(parse_operator("attract-centroid:-1").is_none());
        assert!(parse_operator("prune-depth:").is_none());
    }
}
