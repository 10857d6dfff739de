// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! URL-fragment state: `#f0,f1,f2,scale[;urlenc(name)]`.
//!
//! Only the lens focus (first three Minkowski components, 4-decimal
//! precision), the zoom scale, and an optional focused-point name are
//! encoded; everything else stays out of the URL. Decoded focus
//! coordinates are re-normalized onto the hyperboloid to absorb the
//! rounding.

use core::fmt::Write as _;

use canopy_pointset::PointSet;

/// Decoded URL state.
#[derive(Clone, Debug, PartialEq)]
pub struct UrlState {
    /// Lens focus, re-normalized, length `dim + 1`.
    pub focus: Vec<f64>,
    /// Viewport scale in pixels per chart unit.
    pub scale: f64,
    /// Optional focused-point name.
    pub name: Option<String>,
}

/// Encodes focus, scale, and an optional name into a fragment string.
///
/// Focus components beyond the first three are dropped; they are
/// reconstructed as zero on decode and absorbed by renormalization.
#[must_use]
pub fn encode_url_state(focus: &[f64], scale: f64, name: Option<&str>) -> String {
    let mut out = String::from("#");
    for (i, v) in focus.iter().take(3).enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{v:.4}");
    }
    let _ = write!(out, ",{scale:.4}");
    if let Some(name) = name {
        out.push(';');
        out.push_str(&percent_encode(name));
    }
    out
}

/// Decodes a fragment produced by [`encode_url_state`].
///
/// Returns `None` for anything malformed. The focus is re-normalized
/// onto the hyperboloid of dimension `dim`.
#[must_use]
pub fn decode_url_state(fragment: &str, dim: usize) -> Option<UrlState> {
    let body = fragment.strip_prefix('#').unwrap_or(fragment);
    if body.is_empty() {
        return None;
    }
    let (numbers, name) = match body.split_once(';') {
        Some((n, encoded)) => (n, Some(percent_decode(encoded)?)),
        None => (body, None),
    };
    let parts: Vec<&str> = numbers.split(',').collect();
    if parts.len() != 4 {
        return None;
    }
    let mut values = [0.0_f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part.parse().ok()?;
        if !slot.is_finite() {
            return None;
        }
    }
    let mut focus = vec![0.0; dim + 1];
    for (i, v) in values[..3].iter().enumerate() {
        if i < focus.len() {
            focus[i] = *v;
        }
    }
    canopy_kernel::normalize_hyperboloid(&mut focus);
    Some(UrlState {
        focus,
        scale: values[3],
        name,
    })
}

/// Resolves the decoded name against a point set.
#[must_use]
pub fn resolve_named_focus(state: &UrlState, ps: &PointSet) -> Option<usize> {
    state.name.as_deref().and_then(|n| ps.index_of(n))
}

fn percent_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

fn percent_decode(text: &str) -> Option<String> {
    let mut bytes = Vec::with_capacity(text.len());
    let raw = text.as_bytes();
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            let value = u8::from_str_radix(core::str::from_utf8(hex).ok()?, 16).ok()?;
            bytes.push(value);
            i += 3;
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_kernel::minkowski_dot;

    #[test]
    fn fragment_round_trips_focus_and_scale() {
        let focus = [1.2473, 0.5311, -0.4672];
        let fragment = encode_url_state(&focus, 140.0, None);
        assert!(fragment.starts_with('#'));
        let state = decode_url_state(&fragment, 2).unwrap();
        assert!((state.scale - 140.0).abs() < 1e-9);
        // Spatial components survive at 4-decimal precision; the focus is
        // back on the hyperboloid.
        assert!((state.focus[1] - focus[1]).abs() < 1e-4);
        assert!((state.focus[2] - focus[2]).abs() < 1e-4);
        assert!((minkowski_dot(&state.focus, &state.focus) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn names_survive_percent_encoding() {
        let fragment = encode_url_state(&[1.0, 0.0, 0.0], 100.0, Some("my node/α"));
        let state = decode_url_state(&fragment, 2).unwrap();
        assert_eq!(state.name.as_deref(), Some("my node/α"));
        assert!(!fragment.contains(' '), "spaces must be escaped");
    }

    #[test]
    fn malformed_fragments_decode_to_none() {
        assert!(decode_url_state("", 2).is_none());
        assert!(decode_url_state("#", 2).is_none());
        assert!(decode_url_state("#1.0,2.0", 2).is_none());
        assert!(decode_url_state("#a,b,c,d", 2).is_none());
        assert!(decode_url_state("#1.0,0.0,0.0,nan", 2).is_none());
        assert!(decode_url_state("#1,0,0,100;%zz", 2).is_none());
    }

    #[test]
    fn higher_dimensional_focus_truncates_gracefully() {
        let focus = [2.0, 0.9, 0.4, 0.7, -0.2, 0.1];
        let fragment = encode_url_state(&focus, 100.0, None);
        let state = decode_url_state(&fragment, 5).unwrap();
        assert_eq!(state.focus.len(), 6);
        assert!((minkowski_dot(&state.focus, &state.focus) + 1.0).abs() < 1e-9);
    }
}
