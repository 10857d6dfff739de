// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Ops: the operator algebra.
//!
//! State evolves through [`Operator`] values: a closed enum covering
//! selection, motion, structure, visibility, and field-driven categories,
//! plus combinators (`sequence`, `conditional`, `repeat`, per-selection
//! expansion). Operators are plain data: they can be stored, inverted
//! where an inverse exists, composed associatively with
//! [`Operator::then`], and parsed from the engine's textual operator
//! names.
//!
//! Applying an operator mutates the point set and pushes reversible
//! records into a [`Transaction`](canopy_history::Transaction); the caller
//! commits the transaction as one undo unit (or rolls it back). Operators
//! never touch the history stacks directly.
//!
//! Motion stays on the manifold by construction: translations are
//! transvections, attractions interpolate along geodesics, and gradient
//! flow exps along tangent vectors. A degenerate direction (zero gradient,
//! coincident points) makes the affected point a no-op rather than an
//! error.

mod operator;
mod pred;

pub use operator::{OpError, Operator};
pub use pred::{SelectPred, StatePred};
