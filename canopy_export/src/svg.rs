// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Standalone SVG snapshots of a lens view.

use core::fmt::Write as _;

use canopy_lens::{LOD_CULLED, Lens};
use canopy_pointset::PointSet;
use peniko::Color;

/// Node radius by LOD tier, matching the renderer's tiers.
const RADIUS: [f64; 3] = [6.0, 4.0, 2.0];

/// Renders the visible points and edges of `ps`, as seen through `lens`,
/// into a standalone SVG document.
///
/// Layout mirrors the live renderer: a background `<rect>`, one
/// `<g id="edges">` of `<line>` elements, and one `<g id="nodes">` of
/// `<circle>` elements colored by an HSL hue ramp over tree depth.
#[must_use]
pub fn render_svg(ps: &PointSet, lens: &Lens) -> String {
    let width = lens.viewport.width;
    let height = lens.viewport.height;
    let mut svg = String::new();
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    );
    let _ = write!(
        svg,
        "<rect width=\"{width}\" height=\"{height}\" fill=\"#10141a\"/>"
    );

    let projected = lens.project_points(ps, |_| 0.0);
    let mut on_screen = vec![None; ps.count()];
    for p in &projected {
        if p.lod < LOD_CULLED {
            on_screen[p.idx] = Some(p);
        }
    }

    svg.push_str("<g id=\"edges\" stroke=\"#3a4454\" stroke-width=\"1\">");
    for p in &projected {
        if p.lod >= LOD_CULLED {
            continue;
        }
        let Some(parent) = ps.parent_of(p.idx) else {
            continue;
        };
        let Some(pp) = on_screen[parent] else {
            continue;
        };
        let _ = write!(
            svg,
            "<line x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"/>",
            pp.screen.x, pp.screen.y, p.screen.x, p.screen.y
        );
    }
    svg.push_str("</g>");

    svg.push_str("<g id=\"nodes\">");
    for p in &projected {
        if p.lod >= LOD_CULLED {
            continue;
        }
        let r = RADIUS[p.lod as usize];
        let fill = fill_for_depth(ps.depth_of(p.idx));
        let _ = write!(
            svg,
            "<circle cx=\"{:.1}\" cy=\"{:.1}\" r=\"{r}\" fill=\"{fill}\"/>",
            p.screen.x, p.screen.y
        );
    }
    svg.push_str("</g>");
    svg.push_str("</svg>");
    svg
}

/// Hex fill for a tree depth: an HSL hue ramp, constant saturation and
/// lightness.
fn fill_for_depth(depth: u32) -> String {
    let hue = (depth as f64 * 47.0) % 360.0;
    let (r, g, b) = hsl_to_rgb(hue, 0.65, 0.55);
    let color = Color::from_rgb8(r, g, b);
    let rgba = color.to_rgba8();
    format!("#{:02x}{:02x}{:02x}", rgba.r, rgba.g, rgba.b)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (PointSet, Lens) {
        let mut ps = PointSet::new(2, 8);
        let r = ps.add_point("r", None, None).unwrap();
        ps.add_child_along("a", r, &[0.0, 0.5, 0.0]).unwrap();
        ps.add_child_along("b", r, &[0.0, -0.5, 0.3]).unwrap();
        (ps, Lens::new(2))
    }

    #[test]
    fn document_structure_is_complete() {
        let (ps, lens) = sample();
        let svg = render_svg(&ps, &lens);
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("<rect"));
        assert!(svg.contains("<g id=\"edges\""));
        assert!(svg.contains("<g id=\"nodes\""));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert_eq!(svg.matches("<line").count(), 2);
    }

    #[test]
    fn culled_points_are_omitted() {
        let (ps, mut lens) = sample();
        lens.aperture.far = 0.4;
        let svg = render_svg(&ps, &lens);
        // Only the root survives the tight aperture; no edges remain.
        assert_eq!(svg.matches("<circle").count(), 1);
        assert_eq!(svg.matches("<line").count(), 0);
    }

    #[test]
    fn depth_ramp_gives_distinct_fills() {
        assert_ne!(fill_for_depth(0), fill_for_depth(1));
        assert_ne!(fill_for_depth(1), fill_for_depth(2));
    }

    #[test]
    fn hsl_conversion_hits_known_anchors() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
    }
}
