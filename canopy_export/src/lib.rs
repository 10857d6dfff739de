// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Export: getting trees in and out of the engine.
//!
//! Four serialization surfaces, all pure functions over the core model:
//!
//! - [`document`]: the persisted pointset document, a textual,
//!   round-trippable JSON form carrying coordinates, topology, flags,
//!   motifs, and metadata. Import is all-or-nothing: a document that
//!   fails validation produces [`ExportError::InvalidDocument`] and no
//!   partial state.
//! - [`svg`]: a standalone SVG snapshot of a lens view: background
//!   `<rect>`, `<g id="edges">` of `<line>`s, `<g id="nodes">` of
//!   `<circle>`s colored by an HSL ramp over tree depth.
//! - [`text`]: Markdown nested bullets and a Mermaid flowchart with
//!   sanitized identifiers.
//! - [`url`]: the `#f0,f1,f2,scale[;name]` fragment encoding of the lens
//!   focus, re-normalized on load.

pub mod document;
pub mod svg;
pub mod text;
pub mod url;

pub use document::{MetaRecord, PointRecord, PointSetDocument};

/// Failures surfaced by import and decode operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// The document could not be parsed or failed validation; nothing was
    /// imported.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
