use super::sdf_ops::FixedSdf;
use super::FrameRegisters;
use crate::fixed::{Fixed, FixedVec3};
use crate::layout::JobRecord;

/// Distance below which a lane counts as touching the surface (~0.002).
pub const HIT_EPSILON: Fixed = Fixed::from_raw(0x80);

/// Marching stops once the total distance reaches this bound. It sits above
/// every scene's render-distance cutoff so a ray stopped here is a miss.
pub const FAR: Fixed = Fixed::from_raw(12 << 16);

/// Output of one marched lane.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LaneOutput {
    pub hit_pos: FixedVec3,
    pub last_dist: Fixed,
    pub total_dist: Fixed,
}

/// Sphere-traces a single ray from the latched origin.
///
/// `hit_pos` is always `origin + dir * total_dist`, evaluated with the same
/// multiply the CPU uses.
#[must_use]
pub fn march_lane<S: FixedSdf>(dir: FixedVec3, frame: &FrameRegisters) -> LaneOutput {
    let mut t = frame.init_dist;
    let mut d = Fixed::ZERO;

    for _ in 0..S::MAX_STEPS {
        if t >= FAR {
            break;
        }
        let p = frame.origin + dir * t;
        d = S::distance(p, frame);
        if d < HIT_EPSILON {
            break;
        }
        t += d;
    }

    LaneOutput {
        hit_pos: frame.origin + dir * t,
        last_dist: d,
        total_dist: t,
    }
}

/// Marches both lanes of the job record.
pub fn handle_march<S: FixedSdf>(job: &mut JobRecord, frame: &FrameRegisters) {
    let a = march_lane::<S>(job.ray_dir_a, frame);
    job.hit_pos_a = a.hit_pos;
    job.last_dist_a = a.last_dist;
    job.total_dist_a = a.total_dist;

    let b = march_lane::<S>(job.ray_dir_b, frame);
    job.hit_pos_b = b.hit_pos;
    job.last_dist_b = b.last_dist;
    job.total_dist_b = b.total_dist;
}
