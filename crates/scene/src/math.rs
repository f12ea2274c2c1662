//! Float helpers for the CPU side of the marcher.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI, TAU};

/// `a * (1 - t) + b * t`.
#[must_use]
pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Folds a coordinate into the repeating cell `[-0.5, 0.5]`.
#[must_use]
pub fn fast_clamp(v: f32) -> f32 {
    if v.abs() > 0.5 {
        v - (v + 0.5).floor()
    } else {
        v
    }
}

#[must_use]
pub fn fast_clamp_vec(p: Vec3) -> Vec3 {
    Vec3::new(fast_clamp(p.x), fast_clamp(p.y), fast_clamp(p.z))
}

/// Sine via range reduction and a 7th order odd polynomial. Absolute error
/// stays below `2e-4`.
#[must_use]
pub fn sin_approx(x: f32) -> f32 {
    let mut x = x - TAU * (x / TAU).round();
    if x > FRAC_PI_2 {
        x = PI - x;
    } else if x < -FRAC_PI_2 {
        x = -PI - x;
    }
    let x2 = x * x;
    x * (1.0 - x2 / 6.0 * (1.0 - x2 / 20.0 * (1.0 - x2 / 42.0)))
}

/// Square root from halving the exponent bits. Roughly 6% error; only valid
/// for non-negative inputs.
#[must_use]
pub fn sqrt_approx(x: f32) -> f32 {
    f32::from_bits(x.to_bits().wrapping_add(127 << 23) >> 1)
}

/// Reciprocal square root from the magic-constant estimate refined with one
/// Newton step. Relative error stays below `0.2%`.
#[must_use]
pub fn rsqrt_approx(x: f32) -> f32 {
    let y = f32::from_bits(0x5f37_59df - (x.to_bits() >> 1));
    y * (1.5 - 0.5 * x * y * y)
}

/// Trade-off used by normal and shading code for square roots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// Bit-trick approximations.
    #[default]
    Fast,
    /// Library `sqrt`.
    Exact,
}

impl Precision {
    #[must_use]
    pub fn sqrt(self, x: f32) -> f32 {
        match self {
            Precision::Fast => sqrt_approx(x),
            Precision::Exact => x.sqrt(),
        }
    }

    #[must_use]
    pub fn rsqrt(self, x: f32) -> f32 {
        match self {
            Precision::Fast => rsqrt_approx(x),
            Precision::Exact => x.sqrt().recip(),
        }
    }

    /// Scales `v` to unit length. A zero vector yields non-finite components.
    #[must_use]
    pub fn normalize(self, v: Vec3) -> Vec3 {
        v * self.rsqrt(v.length_squared())
    }
}

/// Packs an RGBA5551 pixel with the coverage bit set.
#[must_use]
pub const fn rgb5(r: u16, g: u16, b: u16) -> u16 {
    ((r & 0x1F) << 11) | ((g & 0x1F) << 6) | ((b & 0x1F) << 1) | 1
}

/// Packs float channels in `0..=31` into an RGBA5551 pixel with the coverage
/// bit set. Channels are truncated and saturated.
#[must_use]
pub fn pack_rgb5(col: Vec3) -> u16 {
    let c = col.clamp(Vec3::ZERO, Vec3::splat(31.0));
    rgb5(c.x as u16, c.y as u16, c.z as u16)
}

/// Channels of an RGBA5551 pixel as floats in `0..=31`.
#[must_use]
pub fn unpack_rgb5(pixel: u16) -> Vec3 {
    Vec3::new(
        f32::from(pixel >> 11),
        f32::from((pixel >> 6) & 0x1F),
        f32::from((pixel >> 1) & 0x1F),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_clamp_repeats_unit_cell() {
        assert_eq!(fast_clamp(0.3), 0.3);
        assert!((fast_clamp(1.3) - 0.3).abs() < 1e-6);
        assert!((fast_clamp(-0.7) - 0.3).abs() < 1e-6);
        assert!((fast_clamp(0.6) + 0.4).abs() < 1e-6);
    }

    #[test]
    fn sin_approx_tracks_sin() {
        let mut x = -20.0_f32;
        while x < 20.0 {
            let err = (sin_approx(x) - x.sin()).abs();
            assert!(err < 2e-4, "sin({x}) off by {err}");
            x += 0.037;
        }
    }

    #[test]
    fn sqrt_approx_is_within_seven_percent() {
        for x in [0.01_f32, 0.25, 1.0, 2.0, 7.5, 100.0] {
            let rel = (sqrt_approx(x) - x.sqrt()).abs() / x.sqrt();
            assert!(rel < 0.07, "sqrt_approx({x}) rel error {rel}");
        }
        assert_eq!(sqrt_approx(4.0), 2.0);
    }

    #[test]
    fn rsqrt_approx_is_close_after_newton_step() {
        for x in [0.001_f32, 0.3, 1.0, 3.0, 42.0, 1e4] {
            let exact = 1.0 / x.sqrt();
            let rel = (rsqrt_approx(x) - exact).abs() / exact;
            assert!(rel < 2e-3, "rsqrt_approx({x}) rel error {rel}");
        }
    }

    #[test]
    fn both_precisions_normalize_to_unit_length() {
        let v = Vec3::new(0.3, -1.2, 2.5);
        for precision in [Precision::Fast, Precision::Exact] {
            let len = precision.normalize(v).length();
            assert!((len - 1.0).abs() < 2e-3, "{precision:?} length {len}");
        }
    }

    #[test]
    fn packing_sets_coverage_and_saturates() {
        assert_eq!(pack_rgb5(Vec3::ZERO), 1);
        assert_eq!(pack_rgb5(Vec3::splat(40.0)), 0xFFFF);
        assert_eq!(pack_rgb5(Vec3::new(-3.0, 0.0, 0.0)), 1);
        assert_eq!(rgb5(31, 0, 0), 0xF801);
        assert_eq!(unpack_rgb5(rgb5(22, 22, 31)), Vec3::new(22.0, 22.0, 31.0));
    }

    #[test]
    fn precision_parses_lowercase() {
        let p: Precision = serde_json::from_str("\"exact\"").unwrap();
        assert_eq!(p, Precision::Exact);
        assert_eq!(Precision::default(), Precision::Fast);
    }
}
