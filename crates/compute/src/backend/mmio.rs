use std::ptr::{self, NonNull};

use super::Coprocessor;
use crate::ComputeError;

/// Co-processor reached through memory-mapped registers.
///
/// Every access is a volatile 32-bit load or store; ordering against the
/// trigger is left to the fences in [`crate::JobChannel`].
#[derive(Debug)]
pub struct MmioCoprocessor {
    dmem: NonNull<u32>,
    dmem_words: usize,
    pc: NonNull<u32>,
    status: NonNull<u32>,
}

// The register block is owned by whoever holds this handle.
unsafe impl Send for MmioCoprocessor {}

impl MmioCoprocessor {
    /// Wraps the data-memory window and the PC and status registers.
    ///
    /// # Safety
    ///
    /// `dmem` must be valid for volatile reads and writes of `dmem_words`
    /// words, `pc` and `status` must be valid register addresses, and all of
    /// them must stay mapped for the lifetime of the handle with no other
    /// writer.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::BackendUnavailable`] if any pointer is null.
    pub unsafe fn new(
        dmem: *mut u32,
        dmem_words: usize,
        pc: *mut u32,
        status: *mut u32,
    ) -> Result<Self, ComputeError> {
        match (NonNull::new(dmem), NonNull::new(pc), NonNull::new(status)) {
            (Some(dmem), Some(pc), Some(status)) => Ok(Self {
                dmem,
                dmem_words,
                pc,
                status,
            }),
            _ => Err(ComputeError::BackendUnavailable),
        }
    }

    fn check_range(&self, word: usize, len: usize) {
        assert!(
            word + len <= self.dmem_words,
            "data memory access {word}..{} out of {} words",
            word + len,
            self.dmem_words
        );
    }
}

impl Coprocessor for MmioCoprocessor {
    fn write_dmem(&mut self, word: usize, data: &[u32]) {
        self.check_range(word, data.len());
        for (i, &value) in data.iter().enumerate() {
            // SAFETY: in range per `check_range`, validity per `new`.
            unsafe { ptr::write_volatile(self.dmem.as_ptr().add(word + i), value) };
        }
    }

    fn read_dmem(&self, word: usize, out: &mut [u32]) {
        self.check_range(word, out.len());
        for (i, slot) in out.iter_mut().enumerate() {
            // SAFETY: in range per `check_range`, validity per `new`.
            *slot = unsafe { ptr::read_volatile(self.dmem.as_ptr().add(word + i)) };
        }
    }

    fn write_pc(&mut self, pc: u32) {
        // SAFETY: register address validated in `new`.
        unsafe { ptr::write_volatile(self.pc.as_ptr(), pc) };
    }

    fn write_status(&mut self, bits: u32) {
        // SAFETY: register address validated in `new`.
        unsafe { ptr::write_volatile(self.status.as_ptr(), bits) };
    }

    fn read_status(&self) -> u32 {
        // SAFETY: register address validated in `new`.
        unsafe { ptr::read_volatile(self.status.as_ptr()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::status;
    use crate::layout::DMEM_WORDS;

    #[test]
    fn volatile_accesses_reach_backing_memory() {
        let mut dmem = vec![0u32; DMEM_WORDS];
        let mut pc = 0u32;
        let mut status_reg = status::HALTED;

        let mut cop = unsafe {
            MmioCoprocessor::new(dmem.as_mut_ptr(), DMEM_WORDS, &mut pc, &mut status_reg).unwrap()
        };
        cop.write_dmem(3, &[7, 8, 9]);
        cop.write_pc(0x200);
        let mut out = [0u32; 3];
        cop.read_dmem(3, &mut out);
        assert_eq!(out, [7, 8, 9]);
        assert_eq!(cop.read_status(), status::HALTED);
        drop(cop);

        assert_eq!(&dmem[3..6], &[7, 8, 9]);
        assert_eq!(pc, 0x200);
    }

    #[test]
    fn null_register_is_rejected() {
        let mut dmem = [0u32; 4];
        let mut pc = 0u32;
        let result = unsafe {
            MmioCoprocessor::new(dmem.as_mut_ptr(), 4, &mut pc, std::ptr::null_mut())
        };
        assert!(matches!(result, Err(ComputeError::BackendUnavailable)));
    }
}
