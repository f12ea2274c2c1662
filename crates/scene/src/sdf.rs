//! CPU-side distance fields and their normals.
//!
//! Repeating fields fold the point into the unit cell first, exactly like the
//! fixed-point kernels, so a distance evaluated here at the camera is a safe
//! starting distance for the co-processor march.

use glam::Vec3;

use crate::context::FrameContext;
use crate::math::{fast_clamp, fast_clamp_vec, mix};

const SPHERE_RADIUS: f32 = 0.25;
const TORUS_MINOR: f32 = 0.075;
const PILLAR_RADIUS: f32 = 0.25;
const INV_SQRT3: f32 = 0.5773;

/// Repeating torus that morphs into a sphere as `blend` goes to 1.
#[must_use]
pub fn morph(p: Vec3, ctx: &FrameContext<'_>) -> f32 {
    let p = fast_clamp_vec(p);
    let sq_xz = p.x * p.x + p.z * p.z;
    let sq_y = p.y * p.y;

    let sphere = (sq_xz + sq_y).sqrt() - SPHERE_RADIUS;
    let q = sq_xz.sqrt() - SPHERE_RADIUS;
    let torus = (q * q + sq_y).sqrt() - TORUS_MINOR;

    mix(torus, sphere, ctx.blend)
}

#[must_use]
pub fn morph_normal(p: Vec3, ctx: &FrameContext<'_>) -> Vec3 {
    let p = fast_clamp_vec(p);
    // On the ring axis the torus correction is 0 * -large, not 0 * -inf.
    let dist_xz = ctx.precision.sqrt(p.x * p.x + p.z * p.z).max(f32::EPSILON);
    let q = 1.0 - SPHERE_RADIUS / dist_xz;
    let torus = Vec3::new(p.x * q, p.y, p.z * q);
    ctx.precision.normalize(torus.lerp(p, ctx.blend))
}

/// Single sphere at the origin.
#[must_use]
pub fn sphere(p: Vec3, _ctx: &FrameContext<'_>) -> f32 {
    p.length() - SPHERE_RADIUS
}

#[must_use]
pub fn sphere_normal(p: Vec3, ctx: &FrameContext<'_>) -> Vec3 {
    ctx.precision.normalize(p)
}

/// Infinite vertical cylinders on a unit grid.
#[must_use]
pub fn pillars(p: Vec3, _ctx: &FrameContext<'_>) -> f32 {
    let x = fast_clamp(p.x);
    let z = fast_clamp(p.z);
    (x * x + z * z).sqrt() - PILLAR_RADIUS
}

#[must_use]
pub fn pillars_normal(p: Vec3, ctx: &FrameContext<'_>) -> Vec3 {
    ctx.precision
        .normalize(Vec3::new(fast_clamp(p.x), 0.0, fast_clamp(p.z)))
}

/// Repeating octahedra whose size follows `blend`.
#[must_use]
pub fn octa(p: Vec3, ctx: &FrameContext<'_>) -> f32 {
    let p = fast_clamp_vec(p).abs();
    (p.x + p.y + p.z - ctx.blend) * INV_SQRT3
}

/// Flat face normals.
#[must_use]
pub fn octa_normal(p: Vec3, ctx: &FrameContext<'_>) -> Vec3 {
    let p = fast_clamp_vec(p);
    let sign = |v: f32| if v >= 0.0 { 1.0 } else { -1.0 };
    ctx.precision
        .normalize(Vec3::new(sign(p.x), sign(p.y), sign(p.z)))
}
