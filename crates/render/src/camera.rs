//! Per-frame camera input.

use glam::Vec3;

/// Camera position and view direction, read-only for the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Unit view direction.
    pub forward: Vec3,
}

impl Camera {
    #[must_use]
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    /// Camera at `position` facing `target`.
    #[must_use]
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self::new(position, (target - position).normalize_or_zero())
    }

    /// Camera orbiting the origin on a Lissajous path, looking at it.
    #[must_use]
    pub fn orbit(time: f32) -> Self {
        let angle = (time + 3.5) * 0.7;
        let position = Vec3::new(
            angle.sin() * 2.5,
            (angle - 1.1).cos() * 2.5,
            (angle * 0.6).sin() * 3.5,
        );
        Self::looking_at(position, Vec3::ZERO)
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.forward.is_finite()
    }

    /// `(right, up)` of the image plane. `None` when the view direction is
    /// degenerate or parallel to the world up axis.
    #[must_use]
    pub fn screen_basis(&self) -> Option<(Vec3, Vec3)> {
        let right = self.forward.cross(Vec3::Y).try_normalize()?;
        let up = right.cross(self.forward);
        Some((right, up))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_is_orthonormal_for_level_view() {
        let camera = Camera::looking_at(Vec3::new(0.0, 0.0, -3.0), Vec3::ZERO);
        let (right, up) = camera.screen_basis().unwrap();
        assert!((right - Vec3::NEG_X).length() < 1e-6, "right {right}");
        assert!((up - Vec3::Y).length() < 1e-6, "up {up}");
    }

    #[test]
    fn vertical_or_nan_view_has_no_basis() {
        assert!(Camera::new(Vec3::ZERO, Vec3::Y).screen_basis().is_none());
        assert!(Camera::new(Vec3::ZERO, Vec3::NAN).screen_basis().is_none());
        assert!(!Camera::new(Vec3::NAN, Vec3::Z).is_finite());
    }

    #[test]
    fn orbit_always_faces_origin() {
        for i in 0..100 {
            let camera = Camera::orbit(i as f32 * 0.025);
            let to_origin = (-camera.position).normalize();
            assert!((camera.forward - to_origin).length() < 1e-5);
            assert!(camera.screen_basis().is_some());
        }
    }
}
