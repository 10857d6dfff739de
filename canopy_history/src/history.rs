// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The undo/redo stacks and transaction buffer.

use std::collections::VecDeque;

use canopy_pointset::PointSet;

use crate::record::HistoryRecord;
use crate::{COALESCE_WINDOW_MS, HISTORY_CAP};

#[derive(Clone, Debug)]
struct Entry {
    record: HistoryRecord,
    actor: u32,
    at_ms: f64,
}

/// Undo/redo stacks with capacity cap and coalescing.
///
/// Records arrive through [`History::record`] as mutations happen (the
/// mutation itself has already been applied by the caller). Undo pops the
/// past stack and reverts; redo pops the future stack and re-applies. Any
/// new record clears the future stack.
#[derive(Debug)]
pub struct History {
    past: VecDeque<Entry>,
    future: Vec<Entry>,
    cap: usize,
    coalesce_window_ms: f64,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Creates an empty history with the default cap and coalescing
    /// window.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(HISTORY_CAP, COALESCE_WINDOW_MS)
    }

    /// Creates an empty history with an explicit cap and window.
    #[must_use]
    pub fn with_config(cap: usize, coalesce_window_ms: f64) -> Self {
        Self {
            past: VecDeque::with_capacity(cap.min(1024)),
            future: Vec::new(),
            cap: cap.max(1),
            coalesce_window_ms,
        }
    }

    /// Number of undoable entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.past.len()
    }

    /// Returns `true` when nothing can be undone.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.past.is_empty()
    }

    /// Returns `true` when undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    /// Returns `true` when redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Appends a record for an already-applied mutation.
    ///
    /// When the top of the past stack holds a record of the same kind from
    /// the same actor within the coalescing window, the two are merged
    /// into one undo step (a drag is one step, not one per pointer event).
    /// Recording always clears the redo stack.
    pub fn record(&mut self, record: HistoryRecord, actor: u32, now_ms: f64) {
        self.future.clear();
        if let Some(top) = self.past.back()
            && top.actor == actor
            && now_ms - top.at_ms <= self.coalesce_window_ms
            && top.record.kind() == record.kind()
            && let Some(merged) = top.record.coalesce_with(&record)
        {
            let top = self.past.back_mut().expect("top exists");
            top.record = merged;
            top.at_ms = now_ms;
            return;
        }
        self.past.push_back(Entry {
            record,
            actor,
            at_ms: now_ms,
        });
        while self.past.len() > self.cap {
            self.past.pop_front();
        }
    }

    /// Undoes the most recent entry. Returns `true` when state changed.
    pub fn undo(&mut self, ps: &mut PointSet) -> bool {
        let Some(entry) = self.past.pop_back() else {
            return false;
        };
        if entry.record.revert(ps).is_err() {
            // The record no longer matches the state; drop it rather than
            // leave a stack that can never make progress.
            return false;
        }
        self.future.push(entry);
        true
    }

    /// Redoes the most recently undone entry. Returns `true` when state
    /// changed.
    pub fn redo(&mut self, ps: &mut PointSet) -> bool {
        let Some(entry) = self.future.pop() else {
            return false;
        };
        if entry.record.apply(ps).is_err() {
            return false;
        }
        self.past.push_back(entry);
        true
    }

    /// Drops both stacks.
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}

/// Buffers records so a compound edit commits as one undo unit.
#[derive(Debug, Default)]
pub struct Transaction {
    records: Vec<HistoryRecord>,
}

impl Transaction {
    /// Opens an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffers one record.
    pub fn push(&mut self, record: HistoryRecord) {
        self.records.push(record);
    }

    /// Number of buffered records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when nothing has been buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Commits the buffer as a single [`HistoryRecord::Batch`].
    ///
    /// An empty transaction commits nothing; a single-record transaction
    /// commits that record directly.
    pub fn commit(self, history: &mut History, actor: u32, now_ms: f64) {
        match self.records.len() {
            0 => {}
            1 => history.record(
                self.records.into_iter().next().expect("one record"),
                actor,
                now_ms,
            ),
            _ => history.record(HistoryRecord::Batch(self.records), actor, now_ms),
        }
    }

    /// Reverts every buffered mutation in reverse order and discards the
    /// buffer; nothing reaches the history.
    pub fn rollback(self, ps: &mut PointSet) {
        for record in self.records.iter().rev() {
            // Rollback is best-effort cleanup of our own records; a revert
            // can only fail if the state was mutated behind our back.
            let _ = record.revert(ps);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_pointset::PointFlags;

    fn pair() -> (PointSet, usize) {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("r", None, None).unwrap();
        let c = ps.add_child_along("c", r, &[0.0, 0.5, 0.0]).unwrap();
        (ps, c)
    }

    fn move_record(ps: &mut PointSet, idx: usize, to: &[f64]) -> HistoryRecord {
        let old = ps.coords_of(idx).to_vec();
        ps.set_coords(idx, to).unwrap();
        HistoryRecord::MovePoint {
            idx,
            old_coords: old,
            new_coords: ps.coords_of(idx).to_vec(),
        }
    }

    #[test]
    fn undo_then_redo_restores_both_states() {
        let (mut ps, c) = pair();
        let before = ps.coords_of(c).to_vec();
        let mut history = History::new();
        let rec = move_record(&mut ps, c, &[0.0, 1.2, 0.3]);
        let after = ps.coords_of(c).to_vec();
        history.record(rec, 0, 0.0);

        assert!(history.can_undo());
        assert!(history.undo(&mut ps));
        assert_eq!(ps.coords_of(c), &before[..]);
        assert!(history.can_redo());
        assert!(history.redo(&mut ps));
        assert_eq!(ps.coords_of(c), &after[..]);
    }

    #[test]
    fn empty_stacks_refuse_quietly() {
        let (mut ps, _) = pair();
        let mut history = History::new();
        assert!(!history.undo(&mut ps));
        assert!(!history.redo(&mut ps));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn new_records_clear_the_future() {
        let (mut ps, c) = pair();
        let mut history = History::new();
        let rec = move_record(&mut ps, c, &[0.0, 1.0, 0.0]);
        history.record(rec, 0, 0.0);
        history.undo(&mut ps);
        assert!(history.can_redo());
        let rec = move_record(&mut ps, c, &[0.0, 0.0, 1.0]);
        history.record(rec, 0, 1000.0);
        assert!(!history.can_redo());
    }

    #[test]
    fn rapid_same_actor_moves_coalesce() {
        let (mut ps, c) = pair();
        let before = ps.coords_of(c).to_vec();
        let mut history = History::new();
        for step in 1..=5 {
            let rec = move_record(&mut ps, c, &[0.0, 0.2 * step as f64, 0.0]);
            history.record(rec, 0, step as f64 * 50.0);
        }
        assert_eq!(history.len(), 1, "drag must be one undo step");
        assert!(history.undo(&mut ps));
        assert_eq!(ps.coords_of(c), &before[..]);
    }

    #[test]
    fn coalescing_respects_actor_and_window() {
        let (mut ps, c) = pair();
        let mut history = History::new();
        let rec = move_record(&mut ps, c, &[0.0, 0.2, 0.0]);
        history.record(rec, 0, 0.0);
        // Other actor: no merge.
        let rec = move_record(&mut ps, c, &[0.0, 0.4, 0.0]);
        history.record(rec, 1, 100.0);
        // Outside the window: no merge.
        let rec = move_record(&mut ps, c, &[0.0, 0.6, 0.0]);
        history.record(rec, 1, 2000.0);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn capacity_discards_oldest() {
        let (mut ps, c) = pair();
        let mut history = History::new();
        for i in 0..(HISTORY_CAP + 10) {
            let rec = move_record(&mut ps, c, &[0.0, 0.001 * i as f64, 0.0]);
            // Spread far apart in time so nothing coalesces.
            history.record(rec, 0, i as f64 * 10_000.0);
        }
        assert_eq!(history.len(), HISTORY_CAP);
    }

    #[test]
    fn transaction_commits_one_batch() {
        let (mut ps, c) = pair();
        let before = ps.coords_of(c).to_vec();
        let mut history = History::new();
        let mut tx = Transaction::new();
        tx.push(move_record(&mut ps, c, &[0.0, 1.0, 0.0]));
        tx.push(move_record(&mut ps, c, &[0.0, 1.0, 1.0]));
        let r = ps.index_of("r").unwrap();
        ps.set_flag(r, PointFlags::SELECTED, true);
        tx.push(HistoryRecord::ToggleFlag {
            idx: r,
            flag: PointFlags::SELECTED,
            old: false,
            new: true,
        });
        tx.commit(&mut history, 0, 0.0);

        assert_eq!(history.len(), 1);
        assert!(history.undo(&mut ps));
        assert_eq!(ps.coords_of(c), &before[..]);
        assert!(!ps.has_flag(r, PointFlags::SELECTED));
    }

    #[test]
    fn rollback_reverts_and_records_nothing() {
        let (mut ps, c) = pair();
        let before = ps.coords_of(c).to_vec();
        let mut tx = Transaction::new();
        tx.push(move_record(&mut ps, c, &[0.0, 2.0, 0.0]));
        tx.rollback(&mut ps);
        assert_eq!(ps.coords_of(c), &before[..]);
    }
}
