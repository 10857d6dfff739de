// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chart-to-screen mapping.

use kurbo::Point;

/// Screen mapping for chart coordinates.
///
/// Chart space is centered: chart `(0,0)` lands at the viewport center
/// plus the offset, and one chart unit spans `scale` pixels. Zooming is
/// multiplicative on `scale` and clamped; see [`Viewport::zoom_by`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
    /// Pixels per chart unit.
    pub scale: f64,
    /// Horizontal offset in pixels applied after scaling.
    pub offset_x: f64,
    /// Vertical offset in pixels applied after scaling.
    pub offset_y: f64,
}

/// Minimum pixels-per-unit zoom.
pub(crate) const MIN_SCALE: f64 = 10.0;

/// Maximum pixels-per-unit zoom.
pub(crate) const MAX_SCALE: f64 = 1000.0;

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
            scale: 100.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Viewport {
    /// Creates a viewport of the given pixel size with the default scale.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Maps chart coordinates to screen pixels.
    #[must_use]
    pub fn chart_to_screen(&self, cx: f64, cy: f64) -> Point {
        Point::new(
            self.width / 2.0 + self.scale * cx + self.offset_x,
            self.height / 2.0 + self.scale * cy + self.offset_y,
        )
    }

    /// Maps screen pixels back to chart coordinates.
    #[must_use]
    pub fn screen_to_chart(&self, screen: Point) -> (f64, f64) {
        (
            (screen.x - self.width / 2.0 - self.offset_x) / self.scale,
            (screen.y - self.height / 2.0 - self.offset_y) / self.scale,
        )
    }

    /// Applies a multiplicative zoom step: `scale ·= 1.1^delta`, clamped
    /// to `[10, 1000]` pixels per unit.
    pub fn zoom_by(&mut self, delta: f64) {
        self.scale = (self.scale * 1.1_f64.powf(delta)).clamp(MIN_SCALE, MAX_SCALE);
    }
}
