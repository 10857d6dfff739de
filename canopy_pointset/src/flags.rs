// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-point flag bits.

bitflags::bitflags! {
    /// State bits carried by every point.
    ///
    /// `ROOT` is maintained by the container: it is set exactly when the
    /// point's parent slot is [`crate::NO_PARENT`]. `HIDDEN` together with
    /// `FOLDED` implements soft deletion and subtree folding; hidden points
    /// stay in the columns but drop out of queries, projection, and the
    /// spatial index.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct PointFlags: u8 {
        /// Excluded from layout motion.
        const PINNED   = 1;
        /// Soft-deleted or folded away; invisible to queries and rendering.
        const HIDDEN   = 2;
        /// Member of the current selection.
        const SELECTED = 4;
        /// The lens focus point.
        const FOCUS    = 8;
        /// Transient interaction highlight.
        const ACTIVE   = 16;
        /// Coordinates changed since the renderer last projected them.
        const DIRTY    = 32;
        /// Collapsed by a fold operation (restored by unfold).
        const FOLDED   = 64;
        /// The point is a tree root.
        const ROOT     = 128;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_values_are_stable() {
        // The export document stores raw bits; these values are a wire
        // format and must not drift.
        assert_eq!(PointFlags::PINNED.bits(), 1);
        assert_eq!(PointFlags::HIDDEN.bits(), 2);
        assert_eq!(PointFlags::SELECTED.bits(), 4);
        assert_eq!(PointFlags::FOCUS.bits(), 8);
        assert_eq!(PointFlags::ACTIVE.bits(), 16);
        assert_eq!(PointFlags::DIRTY.bits(), 32);
        assert_eq!(PointFlags::FOLDED.bits(), 64);
        assert_eq!(PointFlags::ROOT.bits(), 128);
    }
}
