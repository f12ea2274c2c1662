use std::cell::{Cell, RefCell};

use super::{is_hazard, status, Coprocessor, SoftCore};
use crate::ComputeError;

/// Synchronous software co-processor.
///
/// A started kernel does not run until the status register is next read, so
/// the CPU sees the job as in flight between `run` and the first poll and
/// the results appear at `sync`. Protocol hazards and faults are recorded
/// instead of being reported, matching what real hardware would do.
#[derive(Debug)]
pub struct MockCoprocessor {
    core: RefCell<SoftCore>,
    pc: Cell<u32>,
    status: Cell<u32>,
    pending: Cell<bool>,
    hazards: Cell<u64>,
    dispatches: Cell<u64>,
    last_fault: RefCell<Option<ComputeError>>,
}

impl Default for MockCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCoprocessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            core: RefCell::new(SoftCore::default()),
            pc: Cell::new(0),
            status: Cell::new(status::HALTED),
            pending: Cell::new(false),
            hazards: Cell::new(0),
            dispatches: Cell::new(0),
            last_fault: RefCell::new(None),
        }
    }

    /// Number of data-memory accesses that broke the job protocol.
    #[must_use]
    pub fn hazards(&self) -> u64 {
        self.hazards.get()
    }

    /// Number of kernels that ran to completion or faulted.
    #[must_use]
    pub fn dispatches(&self) -> u64 {
        self.dispatches.get()
    }

    #[must_use]
    pub fn last_fault(&self) -> Option<ComputeError> {
        self.last_fault.borrow().clone()
    }

    fn running(&self) -> bool {
        self.status.get() & status::HALTED == 0
    }

    fn note_access(&self, is_write: bool, word: usize, len: usize) {
        if is_hazard(self.running(), is_write, word, len) {
            tracing::trace!(word, len, is_write, "data memory hazard");
            self.hazards.set(self.hazards.get() + 1);
        }
    }

    fn step(&self) {
        if !self.pending.replace(false) {
            return;
        }
        let pc = self.pc.get();
        if let Err(e) = self.core.borrow_mut().run(pc) {
            tracing::warn!("co-processor fault: {e}");
            *self.last_fault.borrow_mut() = Some(e);
        }
        self.dispatches.set(self.dispatches.get() + 1);
        // Every kernel ends in a break.
        self.status.set(status::HALTED | status::BROKE);
    }
}

impl Coprocessor for MockCoprocessor {
    fn write_dmem(&mut self, word: usize, data: &[u32]) {
        self.note_access(true, word, data.len());
        self.core.get_mut().write(word, data);
    }

    fn read_dmem(&self, word: usize, out: &mut [u32]) {
        self.note_access(false, word, out.len());
        self.core.borrow().read(word, out);
    }

    fn write_pc(&mut self, pc: u32) {
        self.pc.set(pc);
    }

    fn write_status(&mut self, bits: u32) {
        let mut state = self.status.get();
        if bits & status::SET_HALT != 0 {
            state |= status::HALTED;
            self.pending.set(false);
        }
        if bits & status::CLEAR_BROKE != 0 {
            state &= !status::BROKE;
        }
        if bits & status::CLEAR_HALT != 0 {
            state &= !status::HALTED;
            self.pending.set(true);
        }
        self.status.set(state);
    }

    fn read_status(&self) -> u32 {
        self.step();
        self.status.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BLEND_WEIGHTS, TOTAL_DIST_A};
    use crate::Kernel;

    fn start(cop: &mut MockCoprocessor, pc: u32) {
        cop.write_pc(pc);
        cop.write_status(status::CLEAR_HALT | status::CLEAR_BROKE | status::SET_INTR_BREAK);
    }

    #[test]
    fn started_kernel_runs_on_first_poll() {
        let mut cop = MockCoprocessor::new();
        start(&mut cop, Kernel::MarchSphere.pc());
        assert_eq!(cop.dispatches(), 0);

        let bits = cop.read_status();
        assert_eq!(bits, status::HALTED | status::BROKE);
        assert_eq!(cop.dispatches(), 1);
        assert_eq!(cop.last_fault(), None);
    }

    #[test]
    fn set_halt_discards_pending_kernel() {
        let mut cop = MockCoprocessor::new();
        start(&mut cop, Kernel::MarchSphere.pc());
        cop.write_status(status::SET_HALT);

        assert_eq!(cop.read_status() & status::HALTED, status::HALTED);
        assert_eq!(cop.dispatches(), 0);
    }

    #[test]
    fn unknown_entry_point_breaks_and_records_fault() {
        let mut cop = MockCoprocessor::new();
        start(&mut cop, 0x0FFC);
        assert_eq!(cop.read_status(), status::HALTED | status::BROKE);
        assert_eq!(cop.last_fault(), Some(ComputeError::UnknownEntryPoint(0x0FFC)));
    }

    #[test]
    fn access_while_running_counts_as_hazard() {
        let mut cop = MockCoprocessor::new();
        cop.write_dmem(BLEND_WEIGHTS, &[0]);
        assert_eq!(cop.hazards(), 0);

        start(&mut cop, Kernel::BeginFrame.pc());
        let mut out = [0u32; 1];
        cop.read_dmem(TOTAL_DIST_A, &mut out);
        assert_eq!(cop.hazards(), 1);
    }

    #[test]
    fn writing_a_kernel_output_counts_as_hazard() {
        let mut cop = MockCoprocessor::new();
        cop.write_dmem(TOTAL_DIST_A, &[0]);
        assert_eq!(cop.hazards(), 1);
    }
}
