// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Failures surfaced by point-set mutations.
///
/// Mutations are atomic with respect to these errors: a failed operation
/// leaves the columns and the name index untouched.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PointSetError {
    /// The set already holds `capacity` points.
    #[error("point set is full")]
    Full,
    /// The requested name is already bound to another live point.
    #[error("name {0:?} is already taken")]
    NameConflict(String),
    /// The referenced parent index is not a live point.
    #[error("no live point at parent index {0}")]
    NoSuchParent(usize),
    /// The referenced index is not a live point.
    #[error("no live point at index {0}")]
    NoSuchPoint(usize),
    /// Supplied coordinates could not be normalized onto the hyperboloid.
    #[error("coordinates cannot be normalized onto the hyperboloid")]
    InvalidPoint,
    /// Reparenting would make a point its own ancestor.
    #[error("reparenting point {0} under its own subtree")]
    WouldCycle(usize),
}
