// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy History: transactional undo/redo over point sets.
//!
//! Every mutation of interest is described by a [`HistoryRecord`] carrying
//! enough state to run in both directions: `apply` re-does it, `revert`
//! un-does it, and both are total for every record kind. Because the point
//! set soft-deletes (points are hidden, never removed), creation and
//! deletion are reversible flag flips and indices stay stable across the
//! whole undo timeline.
//!
//! [`History`] keeps the usual two stacks, past and future, with a
//! capacity cap that discards the oldest entries, and a coalescing window
//! that merges rapid same-kind edits from the same actor (a drag produces
//! one undo step, not hundreds). Any new record clears the future stack.
//!
//! [`Transaction`] buffers records so a compound operation (paste, layout,
//! operator sequence) commits as a single [`HistoryRecord::Batch`] undo
//! unit, or rolls back by reverting the buffered records in reverse.

mod history;
mod record;

pub use history::{History, Transaction};
pub use record::HistoryRecord;

/// Maximum number of undo entries retained.
pub const HISTORY_CAP: usize = 100;

/// Coalescing window in milliseconds.
pub const COALESCE_WINDOW_MS: f64 = 500.0;
