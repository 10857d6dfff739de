// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Canopy Lens: from the hyperboloid to the screen.
//!
//! A [`Chart`] maps manifold points to 2D chart coordinates; a [`Lens`]
//! composes a chart with a focus point, a [`Viewport`] (chart→screen
//! mapping), an [`Aperture`] (near/far distance culling), and LOD
//! thresholds. The renderer asks the lens where points land on screen and
//! which detail bucket they belong to; input adapters ask it the reverse
//! (screen→manifold) for picking and panning.
//!
//! Three charts are provided:
//!
//! - **Tangent**: log-map to the tangent plane at a basepoint that tracks
//!   the lens focus. The only chart with full unprojection (via exp), so
//!   it is the default for interactive lenses.
//! - **Poincaré**: the ball model `pᵢ = xᵢ/(x₀+1)`; conformal, invertible.
//! - **Klein**: the projective model `kᵢ = xᵢ/x₀`; geodesics are straight
//!   lines, unprojection is not provided.

mod chart;
mod lens;
mod viewport;

pub use chart::Chart;
pub use lens::{Aperture, Lens, ProjectedPoint};
pub use viewport::Viewport;

/// LOD bucket for culled points (beyond the last threshold or outside the
/// aperture).
pub const LOD_CULLED: u8 = 3;
