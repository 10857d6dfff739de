// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The closed easing set.

/// Easing functions mapping linear progress `t ∈ [0, 1]` to eased
/// progress.
///
/// All curves pass through `(0, 0)` and `(1, 1)`. `OutBack` and
/// `OutElastic` overshoot by design; consumers that cannot tolerate
/// values outside `[0, 1]` should clamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    /// Identity.
    #[default]
    Linear,
    /// Quadratic acceleration from rest.
    InQuad,
    /// Quadratic deceleration to rest.
    OutQuad,
    /// Quadratic ease on both ends.
    InOutQuad,
    /// Cubic acceleration from rest.
    InCubic,
    /// Cubic deceleration to rest.
    OutCubic,
    /// Cubic ease on both ends.
    InOutCubic,
    /// Exponential deceleration.
    OutExpo,
    /// Decelerates past the target and settles back.
    OutBack,
    /// Elastic oscillation settling on the target.
    OutElastic,
}

impl Easing {
    /// Applies the easing curve to `t` (clamped to `[0, 1]` first).
    #[must_use]
    pub fn apply(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    t.mul_add(4.0 - 2.0 * t, -1.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    (t - 1.0) * u * u + 1.0
                }
            }
            Self::OutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f64.powf(-10.0 * t)
                }
            }
            Self::OutBack => {
                const C1: f64 = 1.70158;
                const C3: f64 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
            Self::OutElastic => {
                const C4: f64 = core::f64::consts::TAU / 3.0;
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    2.0_f64.powf(-10.0 * t) * ((10.0 * t - 0.75) * C4).sin() + 1.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 10] = [
        Easing::Linear,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::InOutQuad,
        Easing::InCubic,
        Easing::OutCubic,
        Easing::InOutCubic,
        Easing::OutExpo,
        Easing::OutBack,
        Easing::OutElastic,
    ];

    #[test]
    fn every_easing_hits_both_endpoints() {
        for e in ALL {
            assert!(e.apply(0.0).abs() < 1e-9, "{e:?} at 0");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-9, "{e:?} at 1");
        }
    }

    #[test]
    fn inputs_are_clamped() {
        for e in ALL {
            assert_eq!(e.apply(-3.0), e.apply(0.0));
            assert_eq!(e.apply(7.0), e.apply(1.0));
        }
    }

    #[test]
    fn in_out_pairs_meet_in_the_middle() {
        assert!((Easing::InOutQuad.apply(0.5) - 0.5).abs() < 1e-9);
        assert!((Easing::InOutCubic.apply(0.5) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn out_back_overshoots() {
        let mut max = 0.0_f64;
        for i in 0..=100 {
            max = max.max(Easing::OutBack.apply(i as f64 / 100.0));
        }
        assert!(max > 1.0);
    }
}
