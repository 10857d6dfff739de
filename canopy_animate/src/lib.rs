// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Animate: cooperative animations over an injected clock.
//!
//! The core never reads a wall clock. An [`AnimationQueue`] is ticked by
//! the embedder's display loop with the current time in milliseconds;
//! each tick advances every running animation, applies its effect to the
//! lens or point set, and retires completed or cancelled entries. The
//! loop is free to stop calling `tick` when [`AnimationQueue::is_empty`]
//! turns true.
//!
//! Animation kinds are a closed enum: geodesic interpolation of the lens
//! focus or of one point's coordinates, a critically damped spring on the
//! focus, and sequence/parallel grouping of child animations. Eased
//! progress is always computed from the closed [`Easing`] set.
//!
//! Cancellation (by id or en masse) is single-shot and idempotent: a
//! cancelled animation is skipped on the next tick and removed without
//! applying any further state.

mod easing;
mod queue;

pub use easing::Easing;
pub use queue::{Animation, AnimationKind, AnimationQueue};
