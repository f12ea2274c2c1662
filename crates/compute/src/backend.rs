#[cfg(feature = "mmio")]
pub mod mmio;
#[cfg(feature = "mock")]
pub mod mock_cpu;
#[cfg(feature = "threaded")]
pub mod threaded;

/// Bits of the co-processor status register.
///
/// The register reads and writes different things: reads report state,
/// writes are set/clear commands.
pub mod status {
    pub const HALTED: u32 = 0x0001;
    pub const BROKE: u32 = 0x0002;

    pub const CLEAR_HALT: u32 = 0x0001;
    pub const SET_HALT: u32 = 0x0002;
    pub const CLEAR_BROKE: u32 = 0x0004;
    pub const SET_INTR_BREAK: u32 = 0x0100;
}

/// Register-level view of the two-lane vector co-processor.
///
/// Implementations only move words and toggle status bits; the ordering
/// rules of the job protocol are enforced by [`crate::JobChannel`].
pub trait Coprocessor {
    /// Copies `data` into data memory starting at word `word`.
    fn write_dmem(&mut self, word: usize, data: &[u32]);

    /// Fills `out` from data memory starting at word `word`.
    fn read_dmem(&self, word: usize, out: &mut [u32]);

    fn write_pc(&mut self, pc: u32);

    /// Applies a set/clear command made of [`status`] write bits.
    fn write_status(&mut self, bits: u32);

    /// Current state as [`status`] read bits.
    fn read_status(&self) -> u32;
}

impl<T: Coprocessor + ?Sized> Coprocessor for Box<T> {
    fn write_dmem(&mut self, word: usize, data: &[u32]) {
        (**self).write_dmem(word, data);
    }

    fn read_dmem(&self, word: usize, out: &mut [u32]) {
        (**self).read_dmem(word, out);
    }

    fn write_pc(&mut self, pc: u32) {
        (**self).write_pc(pc);
    }

    fn write_status(&mut self, bits: u32) {
        (**self).write_status(bits);
    }

    fn read_status(&self) -> u32 {
        (**self).read_status()
    }
}

/// Data memory plus latched kernel registers of a software co-processor.
#[cfg(any(feature = "mock", feature = "threaded"))]
#[derive(Debug, Clone)]
pub(crate) struct SoftCore {
    pub dmem: Vec<u32>,
    pub regs: crate::kernels::FrameRegisters,
}

#[cfg(any(feature = "mock", feature = "threaded"))]
impl Default for SoftCore {
    fn default() -> Self {
        Self {
            dmem: vec![0; crate::layout::DMEM_WORDS],
            regs: crate::kernels::FrameRegisters::default(),
        }
    }
}

#[cfg(any(feature = "mock", feature = "threaded"))]
impl SoftCore {

    /// Executes the kernel at `pc` against the job record in data memory.
    pub fn run(&mut self, pc: u32) -> Result<(), crate::ComputeError> {
        use crate::layout::{JobRecord, JOB_RECORD_WORDS};

        let words = &mut self.dmem[..JOB_RECORD_WORDS];
        let mut job: JobRecord = bytemuck::pod_read_unaligned(bytemuck::cast_slice(&*words));
        crate::kernels::execute(pc, &mut job, &mut self.regs)?;
        words.copy_from_slice(bytemuck::cast_slice(std::slice::from_ref(&job)));
        Ok(())
    }

    pub fn write(&mut self, word: usize, data: &[u32]) {
        self.dmem[word..word + data.len()].copy_from_slice(data);
    }

    pub fn read(&self, word: usize, out: &mut [u32]) {
        out.copy_from_slice(&self.dmem[word..word + out.len()]);
    }
}

/// True when a data-memory access of `len` words at `word` breaks the job
/// protocol: any access while the core runs, or a CPU write over a word the
/// kernels own.
#[cfg(any(feature = "mock", feature = "threaded"))]
pub(crate) fn is_hazard(running: bool, is_write: bool, word: usize, len: usize) -> bool {
    use crate::layout::{is_input_word, JOB_RECORD_WORDS};

    if running {
        return true;
    }
    is_write && (word..word + len).any(|w| w < JOB_RECORD_WORDS && !is_input_word(w))
}
