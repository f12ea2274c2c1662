use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::{is_hazard, status, Coprocessor, SoftCore};
use crate::ComputeError;

#[derive(Debug, Default)]
struct Request {
    /// Bumped by every start and every forced halt. A finishing job only
    /// raises the halt bit if no newer command arrived while it ran.
    generation: u64,
    pc: u32,
    pending: bool,
    shutdown: bool,
}

#[derive(Debug)]
struct Shared {
    core: Mutex<SoftCore>,
    request: Mutex<Request>,
    wake: Condvar,
    status: AtomicU32,
    hazards: AtomicU64,
    dispatches: AtomicU64,
    last_fault: Mutex<Option<ComputeError>>,
}

/// Software co-processor running the march kernels on a worker thread.
///
/// Unlike [`super::mock_cpu::MockCoprocessor`] a started kernel really runs
/// concurrently with the caller, so the scanline pipeline overlaps shading
/// with marching the way it does on hardware.
pub struct ThreadedCoprocessor {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl ThreadedCoprocessor {
    /// Spawns the worker thread.
    ///
    /// # Errors
    ///
    /// Returns [`ComputeError::BackendUnavailable`] if the thread cannot be
    /// spawned.
    pub fn new() -> Result<Self, ComputeError> {
        let shared = Arc::new(Shared {
            core: Mutex::new(SoftCore::default()),
            request: Mutex::new(Request::default()),
            wake: Condvar::new(),
            status: AtomicU32::new(status::HALTED),
            hazards: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            last_fault: Mutex::new(None),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("coprocessor".into())
            .spawn(move || worker_loop(&worker_shared))
            .map_err(|e| {
                tracing::error!("failed to spawn co-processor thread: {e}");
                ComputeError::BackendUnavailable
            })?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    #[must_use]
    pub fn hazards(&self) -> u64 {
        self.shared.hazards.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn dispatches(&self) -> u64 {
        self.shared.dispatches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn last_fault(&self) -> Option<ComputeError> {
        self.shared.last_fault.lock().clone()
    }

    fn note_access(&self, is_write: bool, word: usize, len: usize) {
        let running = self.shared.status.load(Ordering::Acquire) & status::HALTED == 0;
        if is_hazard(running, is_write, word, len) {
            tracing::trace!(word, len, is_write, "data memory hazard");
            self.shared.hazards.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let (pc, generation) = {
            let mut request = shared.request.lock();
            while !request.pending && !request.shutdown {
                shared.wake.wait(&mut request);
            }
            if request.shutdown {
                return;
            }
            request.pending = false;
            (request.pc, request.generation)
        };

        let result = shared.core.lock().run(pc);
        shared.dispatches.fetch_add(1, Ordering::Relaxed);
        if let Err(e) = result {
            tracing::warn!("co-processor fault: {e}");
            *shared.last_fault.lock() = Some(e);
        }

        let request = shared.request.lock();
        if request.generation == generation {
            shared
                .status
                .store(status::HALTED | status::BROKE, Ordering::Release);
        }
    }
}

impl Coprocessor for ThreadedCoprocessor {
    fn write_dmem(&mut self, word: usize, data: &[u32]) {
        self.note_access(true, word, data.len());
        self.shared.core.lock().write(word, data);
    }

    fn read_dmem(&self, word: usize, out: &mut [u32]) {
        self.note_access(false, word, out.len());
        self.shared.core.lock().read(word, out);
    }

    fn write_pc(&mut self, pc: u32) {
        self.shared.request.lock().pc = pc;
    }

    fn write_status(&mut self, bits: u32) {
        let mut request = self.shared.request.lock();
        let status_word = &self.shared.status;

        if bits & status::SET_HALT != 0 {
            request.generation += 1;
            request.pending = false;
            status_word.fetch_or(status::HALTED, Ordering::Release);
        }
        if bits & status::CLEAR_BROKE != 0 {
            status_word.fetch_and(!status::BROKE, Ordering::Release);
        }
        if bits & status::CLEAR_HALT != 0 {
            request.generation += 1;
            request.pending = true;
            status_word.fetch_and(!status::HALTED, Ordering::Release);
            self.shared.wake.notify_one();
        }
    }

    fn read_status(&self) -> u32 {
        self.shared.status.load(Ordering::Acquire)
    }
}

impl Drop for ThreadedCoprocessor {
    fn drop(&mut self) {
        self.shared.request.lock().shutdown = true;
        self.shared.wake.notify_one();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::error!("co-processor thread panicked");
            }
        }
    }
}
