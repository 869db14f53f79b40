//! # Emulator core for an AArch32 Arm CPU
//!
//! The architectural state machine of the emulated CPU: the register
//! file with its per-mode banked sets, the mode switcher, the
//! exception delivery pipeline, and the thread-safe surface through
//! which peripheral models raise and lower interrupt lines.
//!
//! The instruction decoder, the micro-op engine, the MMU, and the
//! system-control coprocessor are deliberately outside this crate.
//! They drive the core through a small contract:
//!
//! * the dispatch loop calls [`Cpu::process_pending_exceptions`] at
//!   every instruction boundary (and after any access that can fault)
//!   and refetches whenever it returns `true`;
//! * conditional execution consults [`Cpu::condition_passes`];
//! * coprocessor instructions go through the [`Coprocessor`] slots.
//!
//! ## Threading
//!
//! Exactly one thread, the executor, owns the [`Cpu`] and all of its
//! state. Any number of other threads (peripheral models, host timers,
//! a debugger) may hold a [`SignalHandle`] and raise or lower
//! exceptions at any time; the handle touches nothing but one atomic
//! word. A raised exception is observed by the executor no later than
//! its next instruction boundary.

pub mod coproc;
pub mod cpu;
pub mod exception;
pub mod executor;
pub mod perf;
pub mod signal;

pub use coproc::{Coprocessor, CpAccess};
pub use cpu::{BankedRegs, Cpu, RegisterBank};
pub use exception::Exception;
pub use executor::ExecutorHandle;
pub use perf::{PerfCounter, PerfCounters};
pub use signal::SignalHandle;
