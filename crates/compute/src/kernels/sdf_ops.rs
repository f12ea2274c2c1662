//! Fixed-point distance fields evaluated by the march kernels.
//!
//! These mirror the float fields on the CPU side closely enough that a ray
//! marched here lands on the surface the CPU shades.

use super::FrameRegisters;
use crate::fixed::{Fixed, FixedVec3};

const SPHERE_RADIUS: Fixed = Fixed::from_raw(0x4000); // 0.25
const TORUS_MINOR: Fixed = Fixed::from_raw(0x1333); // 0.075
const PILLAR_RADIUS: Fixed = Fixed::from_raw(0x4000); // 0.25
const INV_SQRT3: Fixed = Fixed::from_raw(0x93C9); // 0.5773

/// Bit-by-bit integer square root.
#[must_use]
pub fn isqrt(mut n: u64) -> u64 {
    let mut result = 0u64;
    let mut bit = 1u64 << 62;
    while bit > n {
        bit >>= 2;
    }
    while bit != 0 {
        if n >= result + bit {
            n -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }
    result
}

/// Square root of a Q16.16 value; non-positive inputs give zero.
#[must_use]
pub fn sqrt(v: Fixed) -> Fixed {
    if v.raw() <= 0 {
        return Fixed::ZERO;
    }
    let wide = (v.raw() as u64) << 16;
    Fixed::from_raw(isqrt(wide) as i32)
}

/// Folds a coordinate into the repeating cell `[-0.5, 0.5]`.
#[must_use]
pub fn fast_clamp(v: Fixed) -> Fixed {
    if v.abs() > Fixed::HALF {
        v - (v + Fixed::HALF).floor()
    } else {
        v
    }
}

#[must_use]
pub fn fast_clamp_vec(p: FixedVec3) -> FixedVec3 {
    FixedVec3::new(fast_clamp(p.x), fast_clamp(p.y), fast_clamp(p.z))
}

/// Distance field evaluated by one march kernel.
pub trait FixedSdf {
    /// Hard cap on march iterations; guarantees the kernel halts.
    const MAX_STEPS: u32;

    fn distance(p: FixedVec3, frame: &FrameRegisters) -> Fixed;
}

/// Single sphere at the origin.
pub struct Sphere;

impl FixedSdf for Sphere {
    const MAX_STEPS: u32 = 32;

    fn distance(p: FixedVec3, _frame: &FrameRegisters) -> Fixed {
        sqrt(p.dot(p)) - SPHERE_RADIUS
    }
}

/// Repeating torus morphed into a sphere by the blend weights.
pub struct Morph;

impl FixedSdf for Morph {
    const MAX_STEPS: u32 = 48;

    fn distance(p: FixedVec3, frame: &FrameRegisters) -> Fixed {
        let p = fast_clamp_vec(p);
        let sq_xz = p.x * p.x + p.z * p.z;
        let sq_y = p.y * p.y;

        let sphere = sqrt(sq_xz + sq_y) - SPHERE_RADIUS;
        let q = sqrt(sq_xz) - SPHERE_RADIUS;
        let torus = sqrt(q * q + sq_y) - TORUS_MINOR;

        torus * frame.lerp_b + sphere * frame.lerp_a
    }
}

/// Infinite vertical cylinders on a repeating grid.
pub struct Pillars;

impl FixedSdf for Pillars {
    const MAX_STEPS: u32 = 40;

    fn distance(p: FixedVec3, _frame: &FrameRegisters) -> Fixed {
        let x = fast_clamp(p.x);
        let z = fast_clamp(p.z);
        sqrt(x * x + z * z) - PILLAR_RADIUS
    }
}

/// Repeating octahedra whose size follows the blend weight.
pub struct Octa;

impl FixedSdf for Octa {
    const MAX_STEPS: u32 = 40;

    fn distance(p: FixedVec3, frame: &FrameRegisters) -> Fixed {
        let p = fast_clamp_vec(p);
        let sum = p.x.abs() + p.y.abs() + p.z.abs();
        (sum - frame.lerp_a) * INV_SQRT3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fx(v: f32) -> Fixed {
        Fixed::from_f32(v)
    }

    #[test]
    fn isqrt_is_exact_on_squares_and_floors_between() {
        for n in [0u64, 1, 4, 9, 1 << 32, 12_345 * 12_345] {
            let r = isqrt(n);
            assert_eq!(r * r, n);
        }
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(u64::from(u32::MAX)), 65535);
    }

    #[test]
    fn fixed_sqrt_tracks_float_sqrt() {
        for v in [0.0625_f32, 0.5, 1.0, 2.0, 9.0, 42.25] {
            let got = sqrt(fx(v)).to_f32();
            assert!((got - v.sqrt()).abs() < 1e-4, "sqrt({v}) = {got}");
        }
        assert_eq!(sqrt(fx(-1.0)), Fixed::ZERO);
    }

    #[test]
    fn fast_clamp_wraps_into_unit_cell() {
        assert_eq!(fast_clamp(fx(0.4)), fx(0.4));
        assert_eq!(fast_clamp(fx(0.75)), fx(-0.25));
        assert_eq!(fast_clamp(fx(-0.75)), fx(0.25));
        assert_eq!(fast_clamp(fx(2.25)), fx(0.25));
    }

    #[test]
    fn sphere_surface_is_at_quarter_unit() {
        let frame = FrameRegisters::default();
        let on_surface = FixedVec3::from_f32s([0.0, 0.0, -0.25]);
        assert_eq!(Sphere::distance(on_surface, &frame), Fixed::ZERO);
        let outside = FixedVec3::from_f32s([0.0, 0.0, -3.0]);
        assert!((Sphere::distance(outside, &frame).to_f32() - 2.75).abs() < 1e-4);
    }

    #[test]
    fn morph_blends_between_torus_and_sphere() {
        let p = FixedVec3::from_f32s([0.0, 0.4, 0.0]);
        let sphere_only = FrameRegisters { lerp_a: Fixed::ONE, lerp_b: Fixed::ZERO, ..Default::default() };
        let torus_only = FrameRegisters { lerp_a: Fixed::ZERO, lerp_b: Fixed::ONE, ..Default::default() };

        assert!((Morph::distance(p, &sphere_only).to_f32() - 0.15).abs() < 1e-3);
        let torus_expected = (0.25_f32 * 0.25 + 0.16).sqrt() - 0.075;
        assert!((Morph::distance(p, &torus_only).to_f32() - torus_expected).abs() < 1e-3);
    }

    #[test]
    fn pillars_ignore_height_and_repeat() {
        let frame = FrameRegisters::default();
        let a = Pillars::distance(FixedVec3::from_f32s([0.4, 0.0, 0.0]), &frame);
        let b = Pillars::distance(FixedVec3::from_f32s([3.4, 17.0, 5.0]), &frame);
        assert_eq!(a, b);
        assert!((a.to_f32() - 0.15).abs() < 1e-4);
    }
}
