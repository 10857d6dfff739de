// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Style resolution: theme palette plus per-point overrides.

use hashbrown::HashMap;
use peniko::Color;

use crate::{Engine, PointSetId};

/// Color theme for the default palette.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
    /// Dark background, saturated nodes.
    #[default]
    Dark,
    /// Light background, deeper node colors.
    Light,
}

impl Theme {
    /// Background color.
    #[must_use]
    pub fn background(&self) -> Color {
        match self {
            Self::Dark => Color::from_rgb8(0x10, 0x14, 0x1a),
            Self::Light => Color::from_rgb8(0xf7, 0xf7, 0xf4),
        }
    }

    /// Edge stroke color.
    #[must_use]
    pub fn edge(&self) -> Color {
        match self {
            Self::Dark => Color::from_rgb8(0x3a, 0x44, 0x54),
            Self::Light => Color::from_rgb8(0xc0, 0xc4, 0xcc),
        }
    }

    /// Default node color for a tree depth: an HSL hue ramp.
    #[must_use]
    pub fn node_for_depth(&self, depth: u32) -> Color {
        let hue = (depth as f64 * 47.0) % 360.0;
        let lightness = match self {
            Self::Dark => 0.60,
            Self::Light => 0.42,
        };
        let (r, g, b) = hsl_to_rgb(hue, 0.65, lightness);
        Color::from_rgb8(r, g, b)
    }
}

/// Per-point style override; `None` fields fall back to the theme.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StyleOverride {
    /// Node fill override.
    pub color: Option<Color>,
    /// Node radius override in screen units.
    pub radius: Option<f64>,
}

/// A point's fully resolved appearance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedStyle {
    /// Node fill.
    pub color: Color,
    /// Node radius in screen units.
    pub radius: f64,
}

/// Theme plus the override map.
#[derive(Clone, Debug, Default)]
pub struct StyleState {
    theme: Theme,
    overrides: HashMap<(usize, usize), StyleOverride>,
}

impl StyleState {
    /// The active theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme
    }
}

impl Engine {
    /// Switches the palette theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.styles.theme = theme;
    }

    /// The active palette theme.
    #[must_use]
    pub fn theme(&self) -> Theme {
        self.styles.theme
    }

    /// Installs a per-point style override.
    pub fn set_style_override(&mut self, id: PointSetId, idx: usize, over: StyleOverride) {
        self.styles.overrides.insert((id.0, idx), over);
    }

    /// Removes a per-point style override.
    pub fn clear_style_override(&mut self, id: PointSetId, idx: usize) {
        self.styles.overrides.remove(&(id.0, idx));
    }

    /// Resolves the appearance of one point at a given LOD tier.
    #[must_use]
    pub fn resolved_style(&self, id: PointSetId, idx: usize, lod: u8) -> Option<ResolvedStyle> {
        let entry = self.set(id)?;
        if !entry.ps.is_live(idx) {
            return None;
        }
        let over = self.styles.overrides.get(&(id.0, idx)).copied().unwrap_or_default();
        let tier = (lod as usize).min(canopy_render::LOD_RADIUS.len() - 1);
        Some(ResolvedStyle {
            color: over
                .color
                .unwrap_or_else(|| self.styles.theme.node_for_depth(entry.ps.depth_of(idx))),
            radius: over
                .radius
                .unwrap_or(f64::from(canopy_render::LOD_RADIUS[tier])),
        })
    }
}

/// Standard HSL→RGB conversion; `h` in degrees, `s`/`l` in `[0, 1]`.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let hp = h / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = l - c / 2.0;
    (
        ((r1 + m) * 255.0).round() as u8,
        ((g1 + m) * 255.0).round() as u8,
        ((b1 + m) * 255.0).round() as u8,
    )
}
