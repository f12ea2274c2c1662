// Software model of the march microcode. Each entry point has its own
// handler, dispatched by program counter.

pub mod begin_frame_op;
pub use begin_frame_op::handle_begin_frame;
pub mod march_op;
pub use march_op::handle_march;
pub mod sdf_ops;

use crate::fixed::{Fixed, FixedVec3};
use crate::layout::JobRecord;
use crate::{ComputeError, Kernel};

/// Values the `BeginFrame` entry point latches into vector registers. March
/// kernels read these rather than the job record, so a frame that skips
/// `reset` marches from stale state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameRegisters {
    pub origin: FixedVec3,
    pub lerp_a: Fixed,
    pub lerp_b: Fixed,
    pub init_dist: Fixed,
}

/// Runs the program at `pc` to completion against `job`.
///
/// # Errors
///
/// Returns [`ComputeError::UnknownEntryPoint`] when `pc` is not the start of
/// a known kernel. Nothing is written in that case.
pub fn execute(
    pc: u32,
    job: &mut JobRecord,
    frame: &mut FrameRegisters,
) -> Result<(), ComputeError> {
    let kernel = Kernel::from_pc(pc).ok_or(ComputeError::UnknownEntryPoint(pc))?;
    match kernel {
        Kernel::BeginFrame => handle_begin_frame(job, frame),
        Kernel::MarchMorph => handle_march::<sdf_ops::Morph>(job, frame),
        Kernel::MarchSphere => handle_march::<sdf_ops::Sphere>(job, frame),
        Kernel::MarchPillars => handle_march::<sdf_ops::Pillars>(job, frame),
        Kernel::MarchOcta => handle_march::<sdf_ops::Octa>(job, frame),
    }
    Ok(())
}
