#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
//! # Co-processor compute layer
//!
//! Everything that crosses between the CPU and the two-lane vector
//! co-processor lives here: the Q16.16 [`fixed`] bridge, the packed
//! [`layout`] of the job record, the register-level [`Coprocessor`] trait
//! with its software and hardware backends, the march [`kernels`] and the
//! [`JobChannel`] protocol the renderer drives.

use thiserror::Error;

pub mod backend;
pub mod channel;
pub mod fixed;
pub mod kernels;
pub mod layout;

pub use backend::{status, Coprocessor};
pub use channel::{JobChannel, Lane};
pub use fixed::{Fixed, FixedVec3};
pub use layout::JobRecord;

#[cfg(feature = "mock")]
pub use backend::mock_cpu::MockCoprocessor;
#[cfg(feature = "threaded")]
pub use backend::threaded::ThreadedCoprocessor;
#[cfg(feature = "mmio")]
pub use backend::mmio::MmioCoprocessor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ComputeError {
    #[error("no kernel starts at pc {0:#05x}")]
    UnknownEntryPoint(u32),
    #[error("backend not available")]
    BackendUnavailable,
}

/// Entry points of the march microcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kernel {
    /// Latches origin, blend weights and initial distance for a frame.
    BeginFrame,

    // Two-lane march steps, one per distance field
    MarchMorph,
    MarchSphere,
    MarchPillars,
    MarchOcta,
}

impl Kernel {
    pub const ALL: [Kernel; 5] = [
        Kernel::BeginFrame,
        Kernel::MarchMorph,
        Kernel::MarchSphere,
        Kernel::MarchPillars,
        Kernel::MarchOcta,
    ];

    /// Instruction-memory address the kernel starts at.
    #[must_use]
    pub const fn pc(self) -> u32 {
        match self {
            Kernel::BeginFrame => 0x000,
            Kernel::MarchMorph => 0x100,
            Kernel::MarchSphere => 0x200,
            Kernel::MarchPillars => 0x300,
            Kernel::MarchOcta => 0x400,
        }
    }

    #[must_use]
    pub const fn from_pc(pc: u32) -> Option<Self> {
        match pc {
            0x000 => Some(Kernel::BeginFrame),
            0x100 => Some(Kernel::MarchMorph),
            0x200 => Some(Kernel::MarchSphere),
            0x300 => Some(Kernel::MarchPillars),
            0x400 => Some(Kernel::MarchOcta),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_march(self) -> bool {
        !matches!(self, Kernel::BeginFrame)
    }
}

/// Returns the best available software co-processor.
///
/// With the `threaded` feature the kernels run on their own worker thread so
/// dispatches overlap CPU work. If the worker cannot be spawned, or the
/// feature is off, the synchronous [`MockCoprocessor`] is used.
#[cfg(feature = "mock")]
#[must_use]
pub fn default_backend() -> Box<dyn Coprocessor + Send> {
    #[cfg(feature = "threaded")]
    match ThreadedCoprocessor::new() {
        Ok(threaded) => {
            tracing::info!("Using ThreadedCoprocessor backend.");
            return Box::new(threaded);
        }
        Err(e) => tracing::warn!("ThreadedCoprocessor initialization failed ({e}), falling back..."),
    }

    tracing::info!("Using MockCoprocessor backend.");
    Box::new(MockCoprocessor::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pc_round_trips_for_every_kernel() {
        for kernel in Kernel::ALL {
            assert_eq!(Kernel::from_pc(kernel.pc()), Some(kernel));
        }
        assert_eq!(Kernel::from_pc(0x104), None);
    }

    #[test]
    fn only_begin_frame_is_not_a_march() {
        let marches: Vec<Kernel> = Kernel::ALL.into_iter().filter(|k| k.is_march()).collect();
        assert_eq!(marches.len(), 4);
        assert!(!Kernel::BeginFrame.is_march());
    }
}
