//! Spawning the executor thread.
//!
//! The dispatch loop itself (decode plus micro-op engine) lives
//! outside the core; this module provides the thread it runs on, the
//! cycle bound, and the join/signal handle the host keeps.

use std::io;
use std::thread;

use crate::cpu::Cpu;
use crate::perf::PerfCounter;
use crate::signal::SignalHandle;

/// Join point and signal surface for a running executor.
pub struct ExecutorHandle {
    signals: SignalHandle,
    thread: thread::JoinHandle<Cpu>,
}

impl ExecutorHandle {
    /// Signal surface of the running CPU.
    pub fn signals(&self) -> SignalHandle {
        self.signals.clone()
    }

    /// Wait for the dispatch loop to return and recover the CPU state.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the executor thread panicked.
    pub fn join(self) -> thread::Result<Cpu> {
        self.thread.join()
    }
}

impl Cpu {
    /// Spawn the executor thread and run `dispatch` on it, consuming
    /// the CPU.
    ///
    /// A `cycle_count` of zero or less means run until externally
    /// stopped; a positive count is the cooperative threshold the loop
    /// checks through [`Cpu::should_stop`]. Exceptions raised before
    /// the spawn stay pending and are delivered at the first
    /// instruction boundary.
    ///
    /// # Errors
    ///
    /// Returns the OS error when the thread cannot be spawned.
    pub fn start<F>(mut self, cycle_count: i64, dispatch: F) -> io::Result<ExecutorHandle>
    where
        F: FnOnce(&mut Cpu) + Send + 'static,
    {
        self.stop_at_cycle = if cycle_count > 0 { cycle_count } else { -1 };
        let signals = self.signals();
        let thread = thread::Builder::new().name("cpu".into()).spawn(move || {
            dispatch(&mut self);
            self
        })?;
        Ok(ExecutorHandle { signals, thread })
    }

    /// Cooperative stop check for the dispatch loop: has the cycle
    /// counter reached the configured bound?
    pub fn should_stop(&self) -> bool {
        u64::try_from(self.stop_at_cycle)
            .is_ok_and(|limit| self.perf.get(PerfCounter::Cycles) >= limit)
    }
}
