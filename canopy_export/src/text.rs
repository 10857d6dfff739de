// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Markdown and Mermaid tree emitters.

use core::fmt::Write as _;

use canopy_pointset::PointSet;

/// Emits the visible tree as Markdown nested bullets.
///
/// Roots appear at the top level in index order; each level of depth adds
/// one indent step. Hidden points and their subtrees are skipped.
#[must_use]
pub fn to_markdown(ps: &PointSet) -> String {
    let mut out = String::new();
    for root in ps.visible().filter(|&i| ps.is_root(i)) {
        emit_markdown_node(ps, root, 0, &mut out);
    }
    out
}

fn emit_markdown_node(ps: &PointSet, idx: usize, indent: usize, out: &mut String) {
    for _ in 0..indent {
        out.push_str("  ");
    }
    let _ = writeln!(out, "- {}", ps.name_of(idx));
    for child in ps.children(idx) {
        if !ps.has_flag(child, canopy_pointset::PointFlags::HIDDEN) {
            emit_markdown_node(ps, child, indent + 1, out);
        }
    }
}

/// Emits the visible tree as a Mermaid flowchart.
///
/// Node identifiers are sanitized (non-alphanumerics become `_`, a
/// leading digit gets a `_` prefix) and labels carry the original names.
#[must_use]
pub fn to_mermaid(ps: &PointSet) -> String {
    let mut out = String::from("flowchart TD\n");
    for i in ps.visible() {
        let id = sanitize_identifier(ps.name_of(i));
        let _ = writeln!(out, "    {id}[\"{}\"]", escape_label(ps.name_of(i)));
    }
    for i in ps.visible() {
        let Some(parent) = ps.parent_of(i) else {
            continue;
        };
        if ps.has_flag(parent, canopy_pointset::PointFlags::HIDDEN) {
            continue;
        }
        let _ = writeln!(
            out,
            "    {} --> {}",
            sanitize_identifier(ps.name_of(parent)),
            sanitize_identifier(ps.name_of(i))
        );
    }
    out
}

/// Maps a free-form name to a Mermaid-safe identifier.
#[must_use]
pub fn sanitize_identifier(name: &str) -> String {
    let mut id: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if id.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    if id.is_empty() {
        id.push('_');
    }
    id
}

fn escape_label(name: &str) -> String {
    name.replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_pointset::PointFlags;

    fn sample() -> PointSet {
        let mut ps = PointSet::new(2, 16);
        let r = ps.add_point("root node", None, None).unwrap();
        let a = ps.add_child_along("1st", r, &[0.0, 0.3, 0.0]).unwrap();
        ps.add_child_along("leaf-x", a, &[0.0, 0.0, 0.3]).unwrap();
        ps.add_child_along("b", r, &[0.0, -0.3, 0.0]).unwrap();
        ps
    }

    #[test]
    fn markdown_nests_by_depth() {
        let ps = sample();
        let md = to_markdown(&ps);
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(
            lines,
            vec!["- root node", "  - 1st", "    - leaf-x", "  - b"]
        );
    }

    #[test]
    fn markdown_skips_hidden_subtrees() {
        let mut ps = sample();
        let a = ps.index_of("1st").unwrap();
        ps.set_flag(a, PointFlags::HIDDEN, true);
        let md = to_markdown(&ps);
        assert!(!md.contains("1st"));
        assert!(!md.contains("leaf-x"), "children of hidden nodes drop out");
        assert!(md.contains("- b"));
    }

    #[test]
    fn mermaid_sanitizes_identifiers() {
        assert_eq!(sanitize_identifier("leaf-x"), "leaf_x");
        assert_eq!(sanitize_identifier("1st"), "_1st");
        assert_eq!(sanitize_identifier("ok42"), "ok42");
        assert_eq!(sanitize_identifier(""), "_");

        let ps = sample();
        let mm = to_mermaid(&ps);
        assert!(mm.starts_with("flowchart TD\n"));
        assert!(mm.contains("root_node[\"root node\"]"));
        assert!(mm.contains("_1st --> leaf_x"));
        assert!(mm.contains("root_node --> b"));
    }
}
