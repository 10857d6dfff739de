// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The persisted pointset document.

use canopy_pointset::{NO_MOTIF, PointFlags, PointSet};
use serde::{Deserialize, Serialize};

use crate::ExportError;

/// Per-point metadata in the document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaRecord {
    /// Unique point name.
    pub name: String,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form body text.
    #[serde(default)]
    pub content: String,
}

/// One point in the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    /// Minkowski coordinates, length `dim + 1`.
    pub coords: Vec<f64>,
    /// Tree depth.
    pub depth: u32,
    /// Parent index, `-1` for roots.
    pub parent: i32,
    /// Raw flag bits.
    pub flags: u8,
    /// Cluster id, `-1` when unassigned.
    #[serde(default = "default_motif")]
    pub motif: i32,
    /// Name, tags, and content.
    pub meta: MetaRecord,
}

fn default_motif() -> i32 {
    NO_MOTIF
}

/// The round-trippable pointset document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSetDocument {
    /// Hyperbolic dimension.
    pub dim: usize,
    /// Number of points.
    pub count: usize,
    /// Points in index order.
    pub points: Vec<PointRecord>,
}

/// Snapshots a point set into a document.
#[must_use]
pub fn export_pointset(ps: &PointSet) -> PointSetDocument {
    let points = ps
        .live_indices()
        .map(|i| PointRecord {
            coords: ps.coords_of(i).to_vec(),
            depth: ps.depth_of(i),
            parent: ps.parent_of(i).map_or(-1, |p| p as i32),
            flags: ps.flags_of(i).bits(),
            motif: ps.motif(i),
            meta: MetaRecord {
                name: ps.name_of(i).to_owned(),
                tags: ps.meta_of(i).tags.clone(),
                content: ps.meta_of(i).content.clone(),
            },
        })
        .collect();
    PointSetDocument {
        dim: ps.dim(),
        count: ps.count(),
        points,
    }
}

/// Rebuilds a point set from a document with the given capacity.
///
/// Validation is strict and import is all-or-nothing: coordinate lengths,
/// parent references, declared depths, and name uniqueness are all
/// checked, and any failure returns [`ExportError::InvalidDocument`]
/// without producing a set.
pub fn import_pointset(
    doc: &PointSetDocument,
    capacity: usize,
) -> Result<PointSet, ExportError> {
    if doc.dim < 2 {
        return Err(ExportError::InvalidDocument("dimension below 2".into()));
    }
    if doc.points.len() != doc.count {
        return Err(ExportError::InvalidDocument(format!(
            "count {} does not match {} points",
            doc.count,
            doc.points.len()
        )));
    }
    let capacity = capacity.max(doc.count);
    let mut ps = PointSet::new(doc.dim, capacity);

    // First pass: create every point as a root so indices line up.
    for (i, record) in doc.points.iter().enumerate() {
        if record.coords.len() != doc.dim + 1 {
            return Err(ExportError::InvalidDocument(format!(
                "point {i} has {} coordinates, expected {}",
                record.coords.len(),
                doc.dim + 1
            )));
        }
        ps.add_point(&record.meta.name, None, Some(&record.coords))
            .map_err(|e| ExportError::InvalidDocument(format!("point {i}: {e}")))?;
        ps.meta_of_mut(i).tags = record.meta.tags.clone();
        ps.meta_of_mut(i).content = record.meta.content.clone();
        ps.set_motif(i, record.motif);
    }

    // Second pass: restore topology (parents may point forward).
    for (i, record) in doc.points.iter().enumerate() {
        if record.parent >= 0 {
            let parent = record.parent as usize;
            if parent >= doc.count {
                return Err(ExportError::InvalidDocument(format!(
                    "point {i} references missing parent {parent}"
                )));
            }
            ps.reparent(i, Some(parent))
                .map_err(|e| ExportError::InvalidDocument(format!("point {i}: {e}")))?;
        }
    }

    // Third pass: validate declared depths and restore flags.
    for (i, record) in doc.points.iter().enumerate() {
        if ps.depth_of(i) != record.depth {
            return Err(ExportError::InvalidDocument(format!(
                "point {i} declares depth {} but topology gives {}",
                record.depth,
                ps.depth_of(i)
            )));
        }
        let Some(mut flags) = PointFlags::from_bits(record.flags) else {
            return Err(ExportError::InvalidDocument(format!(
                "point {i} carries unknown flag bits {:#04x}",
                record.flags
            )));
        };
        // ROOT is derived from topology, never trusted from the wire.
        flags.set(PointFlags::ROOT, record.parent < 0);
        let current = ps.flags_of(i);
        for flag in [
            PointFlags::PINNED,
            PointFlags::HIDDEN,
            PointFlags::SELECTED,
            PointFlags::FOCUS,
            PointFlags::ACTIVE,
            PointFlags::DIRTY,
            PointFlags::FOLDED,
        ] {
            if current.contains(flag) != flags.contains(flag) {
                ps.set_flag(i, flag, flags.contains(flag));
            }
        }
    }
    Ok(ps)
}

/// Serializes a document to pretty JSON.
#[must_use]
pub fn to_json(doc: &PointSetDocument) -> String {
    serde_json::to_string_pretty(doc).expect("document serialization is infallible")
}

/// Parses a document from JSON.
pub fn from_json(text: &str) -> Result<PointSetDocument, ExportError> {
    serde_json::from_str(text).map_err(|e| ExportError::InvalidDocument(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PointSet {
        let mut ps = PointSet::new(2, 16);
        let r = ps.add_point("r", None, None).unwrap();
        let a = ps.add_child_along("a", r, &[0.0, 0.5, 0.0]).unwrap();
        ps.add_child_along("b", r, &[0.0, -0.5, 0.2]).unwrap();
        ps.add_child_along("aa", a, &[0.0, 0.0, 0.4]).unwrap();
        ps.set_motif(a, 3);
        ps.set_flag(a, PointFlags::SELECTED, true);
        ps.meta_of_mut(a).tags = vec!["alpha".into(), "beta".into()];
        ps.meta_of_mut(a).content = "body text".into();
        ps
    }

    #[test]
    fn export_import_round_trips_everything() {
        let ps = sample();
        let doc = export_pointset(&ps);
        let json = to_json(&doc);
        let parsed = from_json(&json).unwrap();
        assert_eq!(parsed, doc);

        let rebuilt = import_pointset(&parsed, 32).unwrap();
        rebuilt.assert_invariants();
        assert_eq!(rebuilt.count(), ps.count());
        assert_eq!(rebuilt.dim(), ps.dim());
        for i in ps.live_indices() {
            assert_eq!(rebuilt.coords_of(i), ps.coords_of(i), "coords {i}");
            assert_eq!(rebuilt.parent_of(i), ps.parent_of(i), "parent {i}");
            assert_eq!(rebuilt.depth_of(i), ps.depth_of(i), "depth {i}");
            assert_eq!(rebuilt.flags_of(i), ps.flags_of(i), "flags {i}");
            assert_eq!(rebuilt.motif(i), ps.motif(i), "motif {i}");
            assert_eq!(rebuilt.name_of(i), ps.name_of(i), "name {i}");
            assert_eq!(rebuilt.meta_of(i), ps.meta_of(i), "meta {i}");
        }
    }

    #[test]
    fn forward_parent_references_import_correctly() {
        let mut ps = sample();
        // Reparent the first child under the last point so a parent index
        // exceeds a child index in the document.
        let b = ps.index_of("b").unwrap();
        ps.reparent(b, Some(ps.index_of("aa").unwrap())).unwrap();
        let doc = export_pointset(&ps);
        let rebuilt = import_pointset(&doc, 16).unwrap();
        rebuilt.assert_invariants();
        assert_eq!(rebuilt.parent_of(b), ps.parent_of(b));
    }

    #[test]
    fn malformed_documents_are_rejected_whole() {
        let ps = sample();
        let mut doc = export_pointset(&ps);
        doc.points[1].depth = 7;
        assert!(matches!(
            import_pointset(&doc, 16),
            Err(ExportError::InvalidDocument(_))
        ));

        let mut doc = export_pointset(&ps);
        doc.points[2].parent = 99;
        assert!(import_pointset(&doc, 16).is_err());

        let mut doc = export_pointset(&ps);
        doc.points[0].coords.pop();
        assert!(import_pointset(&doc, 16).is_err());

        let mut doc = export_pointset(&ps);
        doc.count = 2;
        assert!(import_pointset(&doc, 16).is_err());

        assert!(from_json("{not json").is_err());
    }

    #[test]
    fn duplicate_names_fail_import() {
        let ps = sample();
        let mut doc = export_pointset(&ps);
        doc.points[1].meta.name = "r".into();
        assert!(import_pointset(&doc, 16).is_err());
    }
}
