use glam::Vec3;

use crate::math::Precision;
use crate::texture::Assets;

/// Values shared by every distance, normal and shading call of one frame.
///
/// Built once per frame by the driver and passed down by reference.
#[derive(Clone, Copy, Debug)]
pub struct FrameContext<'a> {
    pub time: f32,
    /// Morph factor in `[0, 1]`, also handed to the march kernels.
    pub blend: f32,
    pub light_pos: Vec3,
    pub light_dir: Vec3,
    /// Screen basis of the camera.
    pub right: Vec3,
    pub up: Vec3,
    pub render_distance: f32,
    pub render_distance_inv: f32,
    pub precision: Precision,
    pub assets: &'a Assets,
}

impl<'a> FrameContext<'a> {
    /// Derives the per-frame values for `time`. The screen basis defaults to
    /// the world axes until [`Self::with_basis`] is applied.
    #[must_use]
    pub fn new(time: f32, render_distance: f32, precision: Precision, assets: &'a Assets) -> Self {
        let light_pos = Vec3::new((time * 0.8).sin() * 3.0, 1.5, (time * 0.8).cos() * 3.0);
        Self {
            time,
            blend: (time * 4.0).sin() * 0.5 + 0.5,
            light_pos,
            light_dir: light_pos.normalize_or_zero(),
            right: Vec3::X,
            up: Vec3::Y,
            render_distance,
            render_distance_inv: render_distance.recip(),
            precision,
            assets,
        }
    }

    #[must_use]
    pub fn with_basis(mut self, right: Vec3, up: Vec3) -> Self {
        self.right = right;
        self.up = up;
        self
    }

    /// `1` at the camera falling to `0` at the render distance.
    #[must_use]
    pub fn fade(&self, distance: f32) -> f32 {
        (self.render_distance - distance) * self.render_distance_inv
    }
}
