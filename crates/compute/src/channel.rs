//! The job protocol between the CPU and the co-processor.
//!
//! A frame starts with [`JobChannel::reset`], which writes the per-frame
//! inputs and starts `BeginFrame`. After that the CPU and the co-processor
//! take turns on the job record: directions are written only while halted,
//! a march is started with [`JobChannel::run`], and outputs are read only
//! after [`JobChannel::sync`] has observed the halt. The channel does not
//! check the turn order; the software backends count violations instead.

use std::sync::atomic::{fence, Ordering};

use crate::backend::{status, Coprocessor};
use crate::fixed::{Fixed, FixedVec3};
use crate::layout::{self, JobRecord, JOB_RECORD_WORDS};
use crate::Kernel;

/// One of the two rays of a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    A,
    B,
}

impl Lane {
    const fn total_dist_word(self) -> usize {
        match self {
            Lane::A => layout::TOTAL_DIST_A,
            Lane::B => layout::TOTAL_DIST_B,
        }
    }

    const fn last_dist_word(self) -> usize {
        match self {
            Lane::A => layout::LAST_DIST_A,
            Lane::B => layout::LAST_DIST_B,
        }
    }

    const fn hit_pos_word(self) -> usize {
        match self {
            Lane::A => layout::HIT_POS_A,
            Lane::B => layout::HIT_POS_B,
        }
    }
}

pub struct JobChannel<C: Coprocessor> {
    coprocessor: C,
    initial_distance: Fixed,
}

impl<C: Coprocessor> JobChannel<C> {
    #[must_use]
    pub fn new(coprocessor: C) -> Self {
        Self {
            coprocessor,
            initial_distance: Fixed::ZERO,
        }
    }

    /// Writes the per-frame inputs and starts `BeginFrame`.
    ///
    /// The channel is left running; call [`Self::sync`] before touching the
    /// job record again.
    pub fn reset(&mut self, origin: FixedVec3, blend: f32, initial_distance: Fixed) {
        self.coprocessor
            .write_dmem(layout::ORIGIN, bytemuck::cast_slice(&[origin]));
        self.coprocessor
            .write_dmem(layout::BLEND_WEIGHTS, &[layout::pack_blend_weights(blend)]);
        self.coprocessor
            .write_dmem(layout::INIT_DIST, &[initial_distance.raw() as u32]);
        self.initial_distance = initial_distance;
        self.run(Kernel::BeginFrame);
    }

    /// Writes the ray directions of both lanes. Only valid while halted.
    pub fn set_lane_directions(&mut self, dir_a: FixedVec3, dir_b: FixedVec3) {
        self.coprocessor
            .write_dmem(layout::RAY_DIR_A, bytemuck::cast_slice(&[dir_a]));
        self.coprocessor
            .write_dmem(layout::RAY_DIR_B, bytemuck::cast_slice(&[dir_b]));
    }

    /// Starts `kernel` and returns without waiting.
    pub fn run(&mut self, kernel: Kernel) {
        fence(Ordering::Release);
        self.coprocessor.write_pc(kernel.pc());
        self.coprocessor
            .write_status(status::CLEAR_HALT | status::CLEAR_BROKE | status::SET_INTR_BREAK);
    }

    /// Spins until the co-processor reports halted. Returns at once if it
    /// already is.
    pub fn sync(&self) {
        while self.coprocessor.read_status() & status::HALTED == 0 {
            std::hint::spin_loop();
        }
        fence(Ordering::Acquire);
    }

    /// Forces the co-processor into the halted state.
    pub fn stop(&mut self) {
        self.coprocessor.write_status(status::SET_HALT);
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.coprocessor.read_status() & status::HALTED != 0
    }

    #[must_use]
    pub fn lane_total_distance(&self, lane: Lane) -> Fixed {
        self.read_fixed(lane.total_dist_word())
    }

    #[must_use]
    pub fn lane_last_distance(&self, lane: Lane) -> Fixed {
        self.read_fixed(lane.last_dist_word())
    }

    /// Total distances of lanes A and B.
    #[must_use]
    pub fn lane_distances(&self) -> [Fixed; 2] {
        [
            self.lane_total_distance(Lane::A),
            self.lane_total_distance(Lane::B),
        ]
    }

    #[must_use]
    pub fn lane_hit_position(&self, lane: Lane) -> FixedVec3 {
        let mut words = [0u32; 3];
        self.coprocessor.read_dmem(lane.hit_pos_word(), &mut words);
        bytemuck::cast(words)
    }

    /// Snapshot of the whole job record.
    #[must_use]
    pub fn job_record(&self) -> JobRecord {
        let mut words = [0u32; JOB_RECORD_WORDS];
        self.coprocessor.read_dmem(0, &mut words);
        bytemuck::pod_read_unaligned(bytemuck::cast_slice(&words))
    }

    /// Value handed to the last [`Self::reset`].
    #[must_use]
    pub fn initial_distance(&self) -> Fixed {
        self.initial_distance
    }

    #[must_use]
    pub fn coprocessor(&self) -> &C {
        &self.coprocessor
    }

    pub fn coprocessor_mut(&mut self) -> &mut C {
        &mut self.coprocessor
    }

    #[must_use]
    pub fn into_inner(self) -> C {
        self.coprocessor
    }

    fn read_fixed(&self, word: usize) -> Fixed {
        let mut out = [0u32; 1];
        self.coprocessor.read_dmem(word, &mut out);
        Fixed::from_raw(out[0] as i32)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::MockCoprocessor;

    #[test]
    fn reset_latches_inputs_and_leaves_channel_running() {
        let mut channel = JobChannel::new(MockCoprocessor::new());
        let origin = FixedVec3::from_f32s([1.0, -2.0, 0.5]);
        channel.reset(origin, 0.25, Fixed::from_f32(0.75));
        assert_eq!(channel.coprocessor().dispatches(), 0);

        channel.sync();
        let job = channel.job_record();
        assert_eq!(job.origin, origin);
        assert_eq!(job.init_dist, Fixed::from_f32(0.75));
        assert_eq!(job.blend_weights, layout::pack_blend_weights(0.25));
        assert_eq!(channel.initial_distance(), Fixed::from_f32(0.75));
    }

    #[test]
    fn stop_forces_halt() {
        let mut channel = JobChannel::new(MockCoprocessor::new());
        channel.run(Kernel::MarchMorph);
        channel.stop();
        assert!(channel.is_halted());
        assert_eq!(channel.coprocessor().dispatches(), 0);
    }
}
