use super::FrameRegisters;
use crate::layout::{unpack_blend_weights, JobRecord};

/// Latches the per-frame inputs of the job record into kernel registers.
pub fn handle_begin_frame(job: &JobRecord, frame: &mut FrameRegisters) {
    let (lerp_a, lerp_b) = unpack_blend_weights(job.blend_weights);
    *frame = FrameRegisters {
        origin: job.origin,
        lerp_a,
        lerp_b,
        init_dist: job.init_dist,
    };
}
