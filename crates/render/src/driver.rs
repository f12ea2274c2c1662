//! The pipelined scanline loop.
//!
//! While the co-processor marches one pixel pair the CPU shades the pair it
//! marched before, so every row keeps one dispatch in flight. The loop is
//! generic over the scene and the output scale so each combination compiles
//! to its own straight-line code.

use std::time::Instant;

use compute::{Coprocessor, Fixed, FixedVec3, JobChannel, Lane};
use glam::Vec3;
use scene::{math, Assets, FrameContext, Scene, SceneId, Surface};

use crate::camera::Camera;
use crate::config::{RenderConfig, Scale};
use crate::framebuffer::FrameBuffer;
use crate::{FrameStats, LaneSample, RenderError};

/// Written for a miss when the scene has neither a miss shader nor a
/// background: black with the coverage bit.
pub const FALLBACK_PIXEL: u16 = math::rgb5(0, 0, 0);

pub(crate) struct FrameSetup<'a> {
    pub config: &'a RenderConfig,
    pub assets: &'a Assets,
    pub camera: Camera,
    pub time: f32,
    pub scene: SceneId,
    pub scale: Scale,
    pub probe: Option<(usize, usize)>,
}

/// A lane direction in both representations.
#[derive(Clone, Copy)]
struct Ray {
    dir: Vec3,
    fixed: FixedVec3,
}

impl Ray {
    fn new(dir: Vec3) -> Self {
        Self {
            dir,
            fixed: FixedVec3::from_f32s(dir.to_array()),
        }
    }
}

/// Walks a row left to right, one sample column at a time.
struct RowCursor {
    dir: Vec3,
    step: Vec3,
}

impl RowCursor {
    fn next_pair(&mut self) -> (Ray, Ray) {
        let a = Ray::new(self.dir.normalize());
        self.dir += self.step;
        let b = Ray::new(self.dir.normalize());
        self.dir += self.step;
        (a, b)
    }
}

/// Renders one frame of `S` at `SCALE` into `fb`.
///
/// On return the channel is halted, on success and on error alike.
#[allow(clippy::too_many_lines)]
pub(crate) fn draw_scaled<S: Scene, C: Coprocessor, const SCALE: usize>(
    channel: &mut JobChannel<C>,
    fb: &mut FrameBuffer,
    frame: &FrameSetup<'_>,
) -> Result<FrameStats, RenderError> {
    let started = Instant::now();
    let scene = S::CONFIG;
    let config = frame.config;
    let camera = frame.camera;

    let ctx = FrameContext::new(
        frame.time,
        scene.render_distance,
        config.precision,
        frame.assets,
    );

    // Frame reset
    let initial_distance = clamp_initial_distance(
        (scene.distance)(camera.position, &ctx),
        config.min_initial_distance,
    )?;
    let origin = FixedVec3::from_f32s(camera.position.to_array());
    channel.reset(origin, ctx.blend, Fixed::from_f32(initial_distance));

    let Some((right, up)) = camera.screen_basis() else {
        channel.sync();
        return Err(RenderError::NumericFault("screen basis"));
    };
    let ctx = ctx.with_basis(right, up);

    let width = config.output_width / SCALE;
    let height = config.output_height / SCALE;
    let inv_h = 1.0 / height as f32;
    let right_step = right * inv_h;
    let up_step = up * inv_h;
    let mut row_dir =
        camera.forward + up * (-((height / 2) as f32) * inv_h) + right * (-((width / 2) as f32) * inv_h);

    let cutoff = Fixed::from_f32(scene.render_distance);
    let shader = Shader::<S> {
        ctx: &ctx,
        origin,
        camera_pos: camera.position,
        marker: std::marker::PhantomData,
    };

    let mut stats = FrameStats::new(frame.scene, frame.scale, initial_distance);
    channel.sync();

    // Scanline loop
    for y in 0..height {
        let mut cursor = RowCursor {
            dir: row_dir,
            step: right_step,
        };
        let (mut ray_a, mut ray_b) = cursor.next_pair();

        channel.stop();
        channel.set_lane_directions(ray_a.fixed, ray_b.fixed);
        channel.run(scene.kernel);
        channel.stop();
        channel.run(scene.kernel);

        row_dir += up_step;

        for x in (0..width).step_by(2) {
            let (done_a, done_b) = (ray_a, ray_b);
            (ray_a, ray_b) = cursor.next_pair();

            channel.sync();
            let [dist_a, dist_b] = channel.lane_distances();
            let probe_lane = match frame.probe {
                Some((px, py)) if py == y && px & !1 == x => {
                    let lane = if px & 1 == 0 { Lane::A } else { Lane::B };
                    Some((lane, channel.lane_last_distance(lane)))
                }
                _ => None,
            };
            if x + 2 != width {
                channel.set_lane_directions(ray_a.fixed, ray_b.fixed);
                channel.run(scene.kernel);
            }

            let a = shader.sample(done_a, dist_a, dist_a < cutoff);
            let b = shader.sample(done_b, dist_b, dist_b < cutoff);
            write_pair::<SCALE>(fb, config.offset_x + x * SCALE, config.offset_y + y * SCALE, a.color, b.color);
            stats.record(&a);
            stats.record(&b);

            if let Some((lane, last_distance)) = probe_lane {
                let sample = if lane == Lane::A { a } else { b };
                stats.probe = Some(LaneSample {
                    last_distance: last_distance.to_f32(),
                    ..sample
                });
            }
        }
    }

    stats.elapsed = started.elapsed();
    tracing::trace!(
        scene = %frame.scene,
        scale = %frame.scale,
        hits = stats.hits,
        misses = stats.misses,
        "frame done in {:?}",
        stats.elapsed
    );
    Ok(stats)
}

/// Rejects a non-finite scene distance before applying the lower bound,
/// since `f32::max` would swallow a NaN.
fn clamp_initial_distance(distance: f32, min: f32) -> Result<f32, RenderError> {
    if !distance.is_finite() {
        return Err(RenderError::NumericFault("initial distance"));
    }
    Ok(distance.max(min))
}

/// Shading half of the loop for scene `S`.
struct Shader<'a, S> {
    ctx: &'a FrameContext<'a>,
    origin: FixedVec3,
    camera_pos: Vec3,
    marker: std::marker::PhantomData<S>,
}

impl<S: Scene> Shader<'_, S> {
    fn sample(&self, ray: Ray, distance: Fixed, hit: bool) -> LaneSample {
        let scene = S::CONFIG;
        let total = distance.to_f32();

        if hit {
            let position = Vec3::from_array((self.origin + ray.fixed * distance).to_f32s());
            let normal = (scene.normal)(position, self.ctx);
            let surface = Surface {
                normal,
                position,
                direction: ray.dir,
                distance: total,
                hit: true,
            };
            return LaneSample {
                direction: ray.dir,
                distance: total,
                hit: true,
                position,
                normal: Some(normal),
                last_distance: 0.0,
                color: (scene.shade)(&surface, self.ctx),
            };
        }

        let color = if scene.shade_on_miss {
            let surface = Surface::miss(self.camera_pos, ray.dir, scene.render_distance);
            (scene.shade)(&surface, self.ctx)
        } else if scene.background != 0 {
            scene.background
        } else {
            FALLBACK_PIXEL
        };
        LaneSample {
            direction: ray.dir,
            distance: total,
            hit: false,
            position: self.camera_pos + ray.dir * total,
            normal: None,
            last_distance: 0.0,
            color,
        }
    }
}

/// Writes a shaded pair whose left sample lands on pixel `(x, y)`.
///
/// Each sample covers a `SCALE` x `SCALE` block, so the pair spans
/// `SCALE` words per row at scales above one.
fn write_pair<const SCALE: usize>(fb: &mut FrameBuffer, x: usize, y: usize, a: u16, b: u16) {
    let stride = fb.stride_words();
    let first = y * stride + x / 2;
    let words = fb.words_mut();

    if SCALE == 1 {
        words[first] = (u32::from(a) << 16) | u32::from(b);
        return;
    }

    let half = SCALE / 2;
    let (word_a, word_b) = (u32::from(a) * 0x0001_0001, u32::from(b) * 0x0001_0001);
    for row in 0..SCALE {
        let start = first + row * stride;
        words[start..start + half].fill(word_a);
        words[start + half..start + SCALE].fill(word_b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_or_infinite_scene_distance_faults_instead_of_clamping() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(
                clamp_initial_distance(bad, 0.01),
                Err(RenderError::NumericFault("initial distance"))
            ));
        }
        assert_eq!(clamp_initial_distance(-0.3, 0.01).unwrap(), 0.01);
        assert_eq!(clamp_initial_distance(2.75, 0.01).unwrap(), 2.75);
    }

    #[test]
    fn full_scale_pair_packs_one_word() {
        let mut fb = FrameBuffer::new(8, 2).unwrap();
        write_pair::<1>(&mut fb, 2, 1, 0x1111, 0x2223);
        assert_eq!(fb.pixel(2, 1), 0x1111);
        assert_eq!(fb.pixel(3, 1), 0x2223);
        assert_eq!(fb.words().iter().filter(|&&w| w != 0).count(), 1);
    }

    #[test]
    fn quarter_scale_pair_fills_two_blocks() {
        let mut fb = FrameBuffer::new(12, 6).unwrap();
        write_pair::<4>(&mut fb, 2, 1, 0xAAAB, 0x5555);
        for y in 0..6 {
            for x in 0..12 {
                let expected = match (x, y) {
                    (2..=5, 1..=4) => 0xAAAB,
                    (6..=9, 1..=4) => 0x5555,
                    _ => 0,
                };
                assert_eq!(fb.pixel(x, y), expected, "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn half_scale_pair_fills_two_by_two_blocks() {
        let mut fb = FrameBuffer::new(4, 2).unwrap();
        write_pair::<2>(&mut fb, 0, 0, 3, 5);
        assert_eq!(fb.words(), &[0x0003_0003, 0x0005_0005, 0x0003_0003, 0x0005_0005]);
    }
}
