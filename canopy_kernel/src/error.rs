// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Failures surfaced by kernel operations.
///
/// The kernel recovers locally wherever a safe answer exists (clamped
/// distances, zero log vectors); only operations that cannot restore the
/// hyperboloid invariant report an error, and they leave their output
/// buffer untouched when they do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// A point could not be projected back onto the hyperboloid because its
    /// timelike component or Minkowski norm was degenerate.
    #[error("cannot project degenerate vector onto the hyperboloid")]
    Degenerate,
}
