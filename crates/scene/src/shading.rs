//! Shaders turning a marched sample into an RGBA5551 pixel.
//!
//! Every shader is pure given the [`FrameContext`] and always returns a
//! pixel with the coverage bit set.

use glam::Vec3;

use crate::context::FrameContext;
use crate::math::{pack_rgb5, sin_approx};
use crate::texture::{TexPixel, TEX_DIM};

/// A marched sample handed to a shader.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub normal: Vec3,
    pub position: Vec3,
    /// Unit ray direction.
    pub direction: Vec3,
    /// Total marched distance.
    pub distance: f32,
    pub hit: bool,
}

impl Surface {
    /// Sample for a ray that reached the render distance.
    #[must_use]
    pub fn miss(origin: Vec3, direction: Vec3, render_distance: f32) -> Self {
        Self {
            normal: -direction,
            position: origin + direction * render_distance,
            direction,
            distance: render_distance,
            hit: false,
        }
    }

    fn diffuse(&self) -> f32 {
        (-self.normal.dot(self.direction)).max(0.0)
    }
}

const RAINBOW: [Vec3; 4] = [
    Vec3::new(31.0, 10.0, 10.0),
    Vec3::new(10.0, 31.0, 10.0),
    Vec3::new(31.0, 31.0, 10.0),
    Vec3::new(31.0, 31.0, 31.0),
];

const PHASE_COLORS: [Vec3; 4] = [
    Vec3::new(31.0, 15.0, 15.0),
    Vec3::new(15.0, 31.0, 15.0),
    Vec3::new(31.0, 31.0, 15.0),
    Vec3::new(31.0, 31.0, 31.0),
];

pub const FOG: Vec3 = Vec3::new(22.0, 22.0, 31.0);
pub const OCTA_HAZE: Vec3 = Vec3::new(31.0, 11.0, 11.0);

/// Grid cell index along one axis, offset so cells start between objects.
fn cell(v: f32, offset: f32) -> i32 {
    (v + offset).floor() as i32
}

fn sine_palette(s: f32, base: f32) -> Vec3 {
    Vec3::new(
        sin_approx(s) * base + base,
        sin_approx(s + 2.0) * base + base,
        sin_approx(s + 4.0) * base + base,
    )
}

/// Checkerboard of lit rainbow tiles and normal-tinted tiles.
#[must_use]
pub fn rainbow(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    let fade = ctx.fade(s.distance);
    let mut light = s.diffuse();
    let phase = cell(s.position.x, 0.55).wrapping_mul(cell(s.position.z, 0.55));

    let col = if phase & 1 != 0 {
        light *= light;
        RAINBOW[((phase >> 1) & 0b11) as usize]
    } else {
        light = (1.0 - light) * (1.0 - light);
        light = 0.2 + light * 0.8;
        Vec3::new(s.normal.x * 15.0 + 15.0, s.normal.y * 15.0 + 15.0, 30.0)
    };
    pack_rgb5(col * (fade * light))
}

/// Height stripes fading into fog.
#[must_use]
pub fn stripes(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    let fade = ctx.fade(s.distance);
    let light = s.diffuse();
    let base = if (s.position.y * 24.0) as i32 & 1 != 0 { 5.0 } else { 15.0 };
    let col = sine_palette(s.position.y * 2.0, base);
    pack_rgb5(FOG.lerp(col * light, fade))
}

/// One flat colour per grid cell, fading into a red haze.
#[must_use]
pub fn flat(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    let fade = ctx.fade(s.distance);
    let light = (s.diffuse() + 0.25).min(1.0);
    let phase = cell(s.position.x, 0.5) + cell(s.position.z, 0.5) + cell(s.position.y, 0.5);
    let col = sine_palette(phase as f32 * 32.0, 15.5);
    pack_rgb5(OCTA_HAZE.lerp(col * light, fade))
}

/// Orbiting point light with quadratic falloff over five units.
#[must_use]
pub fn point_light(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    const RANGE_INV: f32 = 1.0 / 5.0;

    let fade = ctx.fade(s.distance);
    let to_light = ctx.light_pos - s.position;
    let falloff = (to_light.length() * RANGE_INV).powi(2).clamp(0.0, 1.0);

    let lambert = s.normal.dot(ctx.precision.normalize(to_light)).max(0.0);
    let light = (lambert + 0.0125).min(1.0) * (1.0 - falloff);

    let phase = cell(s.position.x, 0.5) + cell(s.position.z, 0.5) + cell(s.position.y, 0.5);
    let col = PHASE_COLORS[((phase & 0b110) >> 1) as usize];
    pack_rgb5(col * (light * fade))
}

/// Rotates a tangent-space vector about Y by the angle whose cosine and sine
/// are `c` and `s`.
fn rotate_y(v: Vec3, c: f32, s: f32) -> Vec3 {
    Vec3::new(v.x * c - v.z * s, v.y, v.x * s + v.z * c)
}

/// Cylindrical projection of a material texture with normal mapping.
#[must_use]
pub fn textured(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    const ANGLE_TO_UV: f32 = (1.0 / std::f32::consts::TAU) * (TEX_DIM as f32 * -2.0);
    const AMBIENT: Vec3 = Vec3::new(0.15, 0.15, 0.3);
    const LIGHT_TINT: Vec3 = Vec3::new(1.0, 0.8, 0.6);

    let fade = ctx.fade(s.distance);
    let phase = cell(s.position.x, 0.5) + cell(s.position.z, 0.5);
    let material = match phase & 0b11 {
        1 => &ctx.assets.materials[1],
        2 => &ctx.assets.materials[2],
        _ => &ctx.assets.materials[0],
    };

    let angle = s.normal.z.atan2(s.normal.x);
    let u = (angle * ANGLE_TO_UV) as i32;
    let v = (s.position.y * (1.2 * TEX_DIM as f32)) as i32;
    let texel: TexPixel = material.sample(u, v);

    let mut tangent = Vec3::new(
        f32::from(texel.norm_a) / 128.0,
        f32::from(texel.norm_b) / 128.0,
        1.0,
    );
    if !texel.is_flat_normal() {
        tangent.z = ctx.assets.normal_z.lookup(texel.norm_a, texel.norm_b);
    }
    let bumped = rotate_y(tangent, s.normal.x, s.normal.z);

    let lambert = bumped.dot(ctx.light_dir).max(0.0);
    let light = (LIGHT_TINT * lambert + AMBIENT).min(Vec3::ONE);
    pack_rgb5(texel.rgb() * light * fade)
}

/// Chrome: screen-space environment lookup with a white fresnel rim. Misses
/// show the environment seen along the ray.
#[must_use]
pub fn environment(s: &Surface, ctx: &FrameContext<'_>) -> u16 {
    let env = &ctx.assets.environment;
    let dim = TEX_DIM as f32;

    if !s.hit {
        let u = (s.direction.dot(ctx.right) * 0.5 + 0.5) * dim;
        let v = (0.5 - s.direction.dot(ctx.up) * 0.5) * dim;
        return pack_rgb5(env.sample(u as i32, v as i32).rgb() * 0.6);
    }

    let fade = (ctx.fade(s.distance) * 2.0).min(1.0);
    let u = (-s.normal.dot(ctx.right) * 0.4 + 0.5) * dim;
    let v = (s.normal.dot(ctx.up) * 0.4 + 0.5) * dim;
    let facing = 1.0 - (s.normal.dot(s.direction) * 0.5 + 0.5);

    let reflected = env.sample(u as i32, v as i32).rgb();
    pack_rgb5(Vec3::splat(31.0).lerp(reflected, facing * fade))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{rgb5, Precision};
    use crate::texture::Assets;

    fn hit(normal: Vec3, position: Vec3, direction: Vec3, distance: f32) -> Surface {
        Surface {
            normal,
            position,
            direction,
            distance,
            hit: true,
        }
    }

    #[test]
    fn every_shader_sets_coverage_bit() {
        let assets = Assets::procedural();
        let ctx = FrameContext::new(0.8, 11.0, Precision::Fast, &assets);
        let shaders: [fn(&Surface, &FrameContext<'_>) -> u16; 6] =
            [rainbow, stripes, flat, point_light, textured, environment];

        for (i, shade) in shaders.into_iter().enumerate() {
            for k in 0..50 {
                let t = k as f32 * 0.29;
                let normal = Vec3::new(t.cos(), 0.3, t.sin()).normalize();
                let s = hit(normal, normal * 0.25 + Vec3::new(t, 0.1 * t, -t), -normal, t);
                assert_eq!(shade(&s, &ctx) & 1, 1, "shader {i} sample {k}");
            }
        }
    }

    #[test]
    fn surface_facing_light_is_brighter_than_surface_facing_away() {
        let assets = Assets::procedural();
        let ctx = FrameContext::new(0.0, 11.0, Precision::Exact, &assets);
        let toward_light = ctx.light_pos.normalize();
        let position = toward_light * 0.25;

        let lit = point_light(&hit(toward_light, position, -toward_light, 2.0), &ctx);
        let dark = point_light(&hit(-toward_light, -position, toward_light, 2.0), &ctx);
        assert!(lit >> 1 > dark >> 1, "lit {lit:#06x} dark {dark:#06x}");
    }

    #[test]
    fn far_stripes_fade_to_fog() {
        let assets = Assets::procedural();
        let ctx = FrameContext::new(0.0, 11.0, Precision::Fast, &assets);
        let s = hit(Vec3::X, Vec3::ZERO, Vec3::NEG_X, 11.0);
        assert_eq!(stripes(&s, &ctx), rgb5(22, 22, 31));
    }

    #[test]
    fn chrome_rim_goes_white_at_grazing_angles() {
        let assets = Assets::procedural();
        let ctx = FrameContext::new(0.0, 11.0, Precision::Fast, &assets);
        // Normal perpendicular to the ray, close to the camera.
        let s = hit(Vec3::X, Vec3::ZERO, Vec3::Z, 0.0);
        let facing_away = hit(Vec3::NEG_Z, Vec3::ZERO, Vec3::Z, 0.0);
        let (rim, centre) = (environment(&s, &ctx), environment(&facing_away, &ctx));
        assert_ne!(rim, centre);
        assert!(rim >> 11 >= centre >> 11, "rim {rim:#06x} centre {centre:#06x}");
        let miss = Surface::miss(Vec3::ZERO, Vec3::Z, 11.0);
        assert_eq!(environment(&miss, &ctx) & 1, 1);
    }
}
