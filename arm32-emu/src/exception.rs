//! Exception classes, the pending set, and the delivery pipeline.
//!
//! Exceptions are an ordered variant set rather than a bag of flag
//! tests: each class knows its pending bit, vector, entry mode, link
//! offset, and mask predicate, and the pipeline is one walk over the
//! priority order.

use std::sync::atomic::{AtomicU32, Ordering};

use arm32_cpu::{Cpsr, ProcessorMode};

use crate::cpu::{Cpu, RegisterBank};
use crate::perf::PerfCounter;

/// The exception classes the core delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exception {
    /// System reset
    Reset = 0,
    /// Undefined instruction
    Undefined,
    /// Software interrupt (SWI/SVC)
    Swi,
    /// Instruction prefetch abort
    PrefetchAbort,
    /// Data abort
    DataAbort,
    /// Interrupt request line
    Irq,
    /// Fast interrupt request line
    Fiq,
}

impl Exception {
    /// Delivery order. Reset preempts everything, synchronous aborts
    /// bound to an instruction outrank the asynchronous lines, and FIQ
    /// outranks IRQ.
    pub const PRIORITY: [Exception; 7] = [
        Exception::Reset,
        Exception::Undefined,
        Exception::Swi,
        Exception::PrefetchAbort,
        Exception::DataAbort,
        Exception::Fiq,
        Exception::Irq,
    ];

    /// Bit in the pending word.
    pub(crate) const fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Low-memory vector the PC is loaded with on entry.
    pub const fn vector(self) -> u32 {
        match self {
            Exception::Reset => 0x00,
            Exception::Undefined => 0x04,
            Exception::Swi => 0x08,
            Exception::PrefetchAbort => 0x0c,
            Exception::DataAbort => 0x10,
            Exception::Irq => 0x18,
            Exception::Fiq => 0x1c,
        }
    }

    /// The mode the handler runs in.
    pub const fn entry_mode(self) -> ProcessorMode {
        match self {
            Exception::Reset | Exception::Swi => ProcessorMode::Svc,
            Exception::Undefined => ProcessorMode::Und,
            Exception::PrefetchAbort | Exception::DataAbort => ProcessorMode::Abt,
            Exception::Irq => ProcessorMode::Irq,
            Exception::Fiq => ProcessorMode::Fiq,
        }
    }

    /// Offset added to the executing pc to form the handler's r14.
    ///
    /// Undefined and SWI link to the next instruction; aborts and the
    /// interrupt lines record pc + 4. Thumb entry carries the extra
    /// halfword bit. Reset leaves the link register meaningless.
    pub(crate) const fn link_offset(self, thumb: bool) -> u32 {
        let t = thumb as u32;
        match self {
            Exception::Reset => 0,
            Exception::Undefined | Exception::Swi => t,
            Exception::PrefetchAbort
            | Exception::DataAbort
            | Exception::Irq
            | Exception::Fiq => 4 + t,
        }
    }

    /// Level-sensitive lines stay pending across entry; the source must
    /// lower them (normally after the handler acknowledges the
    /// interrupt controller).
    pub const fn level_sensitive(self) -> bool {
        matches!(self, Exception::Irq | Exception::Fiq)
    }

    /// Whether `cpsr` masks this exception out.
    pub(crate) fn masked_by(self, cpsr: Cpsr) -> bool {
        match self {
            Exception::Irq => cpsr.i(),
            Exception::Fiq => cpsr.f(),
            Exception::Reset
            | Exception::Undefined
            | Exception::Swi
            | Exception::PrefetchAbort
            | Exception::DataAbort => false,
        }
    }
}

/// The pending-exception word: the single piece of CPU state shared
/// across threads.
///
/// All mutation is sequentially consistent read-modify-write, so a
/// signaller that raises a bit and returns knows the executor will
/// observe it at its next poll. Only defined exception bits are
/// representable.
#[derive(Debug, Default)]
pub struct PendingSet {
    bits: AtomicU32,
}

impl PendingSet {
    /// Mask of every defined exception bit.
    const DEFINED: u32 = (1 << Exception::PRIORITY.len()) - 1;

    pub(crate) fn new() -> PendingSet {
        PendingSet {
            bits: AtomicU32::new(0),
        }
    }

    pub(crate) fn raise(&self, exception: Exception) {
        let _ = self.bits.fetch_or(exception.bit(), Ordering::SeqCst);
    }

    pub(crate) fn clear(&self, exception: Exception) {
        let _ = self.bits.fetch_and(!exception.bit(), Ordering::SeqCst);
    }

    /// Drop every pending bit outside `keep`.
    pub(crate) fn retain(&self, keep: u32) {
        let _ = self.bits.fetch_and(keep & Self::DEFINED, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> u32 {
        self.bits.load(Ordering::SeqCst)
    }
}

impl Cpu {
    /// Deliver the highest-priority pending exception whose mask is not
    /// asserted, if any.
    ///
    /// The dispatch loop calls this at every instruction boundary, and
    /// defensively after any memory access that can fault. A `true`
    /// return means an exception was taken: PC, CPSR, and the mode may
    /// all have changed and the caller must refetch.
    pub fn process_pending_exceptions(&mut self) -> bool {
        let pending = self.pending.snapshot();
        if pending == 0 {
            return false;
        }
        log::trace!("pending exceptions {pending:#04x}");

        for exception in Exception::PRIORITY {
            if pending & exception.bit() == 0 || exception.masked_by(self.cpsr()) {
                continue;
            }
            if exception == Exception::Reset {
                self.enter_reset();
            } else {
                self.enter_handler(exception);
            }
            self.perf_mut().inc(PerfCounter::ExceptionsTaken);
            return true;
        }
        false
    }

    /// Reset: everything pending except the interrupt lines is
    /// discarded, the CPU lands in Supervisor mode with both lines
    /// masked, and execution restarts at the reset vector.
    fn enter_reset(&mut self) {
        log::info!("cpu reset");

        // Bank the outgoing mode normally, then rebuild the status word
        // from scratch.
        self.set_mode(ProcessorMode::Svc);
        self.cpsr = Cpsr::new_with_raw_value(0)
            .with_i(true)
            .with_f(true)
            .with_mode(ProcessorMode::Svc);

        self.invalidate_coprocessor_selection();
        self.pending
            .retain(Exception::Irq.bit() | Exception::Fiq.bit());
        self.set_reg(Cpu::PC, Exception::Reset.vector());
    }

    fn enter_handler(&mut self, exception: Exception) {
        let old_cpsr = self.cpsr();
        let thumb = old_cpsr.t();
        let target = exception.entry_mode();
        let link = self.pc().wrapping_add(exception.link_offset(thumb));

        log::debug!(
            "taking {exception:?} at pc {:#010x}, handler mode {target:?}",
            self.pc()
        );

        if self.mode() == target {
            // Already in the handler's mode: the live registers are the
            // bank, so write them directly.
            self.regs[Cpu::LR] = link;
            self.set_spsr(old_cpsr);
        } else {
            let bank = RegisterBank::of_mode(target);
            self.banks[bank as usize].r14 = link;
            self.banks[bank as usize].spsr = old_cpsr;
        }

        if thumb {
            // The selected coprocessor belongs to the Thumb stream we
            // are leaving.
            self.invalidate_coprocessor_selection();
        }
        self.set_thumb(false);
        self.set_irq_masked(true);
        self.set_mode(target);

        if !exception.level_sensitive() {
            self.pending.clear(exception);
        }
        self.set_reg(Cpu::PC, exception.vector());
    }
}
