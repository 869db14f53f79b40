//! The CPU state machine: register file, banked registers, mode
//! switching, and diagnostics.

use std::fmt;
use std::sync::Arc;

use arm32_cpu::{
    ArmCore, Condition, ConditionTable, Cpsr, CpuModel, Flags, InstructionSet, ProcessorMode,
};

use crate::coproc::Coprocessor;
use crate::exception::{Exception, PendingSet};
use crate::perf::{PerfCounter, PerfCounters};
use crate::signal::SignalHandle;

/// Index of a banked register set.
///
/// User and System share one bank; every exception mode has its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterBank {
    /// User/System bank
    Usr = 0,
    /// Fast-interrupt bank
    Fiq,
    /// Interrupt bank
    Irq,
    /// Supervisor bank
    Svc,
    /// Abort bank
    Abt,
    /// Undefined-instruction bank
    Und,
}

impl RegisterBank {
    pub(crate) const COUNT: usize = 6;

    /// The bank backing a processor mode. Total: every defined mode has
    /// a bank, so there is no "unrecognised mode, skip the swap" branch.
    pub const fn of_mode(mode: ProcessorMode) -> RegisterBank {
        match mode {
            ProcessorMode::Usr | ProcessorMode::Sys => RegisterBank::Usr,
            ProcessorMode::Fiq => RegisterBank::Fiq,
            ProcessorMode::Irq => RegisterBank::Irq,
            ProcessorMode::Svc => RegisterBank::Svc,
            ProcessorMode::Abt => RegisterBank::Abt,
            ProcessorMode::Und => RegisterBank::Und,
        }
    }
}

/// One banked register set: stack pointer, link register, and the
/// saved status register captured on exception entry.
///
/// Only r13/r14/SPSR are banked here; the additional r8-r12 FIQ bank
/// of the hardware is not modelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BankedRegs {
    /// Banked r13 (stack pointer)
    pub r13: u32,
    /// Banked r14 (link register)
    pub r14: u32,
    /// Banked SPSR
    pub spsr: Cpsr,
}

/// The emulated CPU.
///
/// Owned and mutated by the executor thread only. Other threads
/// interact exclusively through the [`SignalHandle`] returned by
/// [`Cpu::signals`], which reaches nothing but the shared
/// pending-exception word.
pub struct Cpu {
    /// Active general-purpose registers. r13 is SP, r14 is LR, r15 is
    /// the PC as instructions see it.
    pub(crate) regs: [u32; 16],
    /// Address of the instruction currently executing. r15 usually runs
    /// ahead of this because of the fetch pipeline.
    pub(crate) pc: u32,
    pub(crate) cpsr: Cpsr,
    /// SPSR of the active mode. Dead storage while in User/System.
    pub(crate) spsr: Cpsr,
    model: CpuModel,
    pub(crate) banks: [BankedRegs; RegisterBank::COUNT],
    /// The only cross-thread state; see [`SignalHandle`].
    pub(crate) pending: Arc<PendingSet>,
    condition_table: ConditionTable,
    coprocs: [Option<Box<dyn Coprocessor>>; 16],
    /// Slot selected by the last coprocessor prefix; cleared whenever
    /// the selection can no longer be trusted (reset, Thumb entry).
    pub(crate) current_cp: Option<usize>,
    pub(crate) perf: PerfCounters,
    /// Negative runs until an external quit; non-negative is the
    /// cooperative stop threshold consulted by [`Cpu::should_stop`].
    pub(crate) stop_at_cycle: i64,
}

impl Cpu {
    /// Register index of the stack pointer.
    pub const SP: usize = 13;
    /// Register index of the link register.
    pub const LR: usize = 14;
    /// Register index of the program counter.
    pub const PC: usize = 15;

    /// Build a CPU for `model` with every register zeroed.
    ///
    /// The condition table is computed here, once; the CPU comes up in
    /// Supervisor mode with both interrupt lines masked, which is the
    /// state a reset would establish.
    pub fn new(model: CpuModel) -> Cpu {
        Cpu {
            regs: [0; 16],
            pc: 0,
            cpsr: Cpsr::new_with_raw_value(0)
                .with_i(true)
                .with_f(true)
                .with_mode(ProcessorMode::Svc),
            spsr: Cpsr::default(),
            model,
            banks: [BankedRegs::default(); RegisterBank::COUNT],
            pending: Arc::new(PendingSet::new()),
            condition_table: ConditionTable::build(),
            coprocs: std::array::from_fn(|_| None),
            current_cp: None,
            perf: PerfCounters::new(),
            stop_at_cycle: -1,
        }
    }

    /// Build a CPU from a model name, falling back to the ARMv4/ARM7
    /// default when the name is absent or not recognised.
    pub fn from_name(name: Option<&str>) -> Cpu {
        let model = match name {
            None => CpuModel::default(),
            Some(name) => CpuModel::from_name(name).unwrap_or_else(|| {
                log::warn!("unknown cpu model {name:?}, using the armv4 default");
                CpuModel::default()
            }),
        };
        Cpu::new(model)
    }

    /// The configured model.
    pub fn model(&self) -> CpuModel {
        self.model
    }

    /// The emulated instruction set.
    pub fn isa(&self) -> InstructionSet {
        self.model.isa
    }

    /// The emulated core family.
    pub fn core(&self) -> ArmCore {
        self.model.core
    }

    // ---- register file -------------------------------------------------

    /// Read a general-purpose register.
    pub fn reg(&self, index: usize) -> u32 {
        self.regs[index]
    }

    /// Write a general-purpose register.
    ///
    /// Writes to r15 take the branch path: the address is realigned for
    /// the current instruction-set state and both r15 and the executing
    /// pc are updated.
    pub fn set_reg(&mut self, index: usize, value: u32) {
        if index == Cpu::PC {
            self.branch_to(value);
        } else {
            self.regs[index] = value;
        }
    }

    fn branch_to(&mut self, address: u32) {
        let address = if self.cpsr.t() {
            address & !1
        } else {
            address & !3
        };
        self.regs[Cpu::PC] = address;
        self.pc = address;
    }

    /// Address of the instruction currently executing.
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Advance the executing-instruction address without branch
    /// side-effects. The dispatch loop calls this as it walks a block.
    pub fn set_pc(&mut self, address: u32) {
        self.pc = address;
    }

    // ---- status registers ----------------------------------------------

    /// The current program status register.
    pub fn cpsr(&self) -> Cpsr {
        self.cpsr
    }

    /// Replace the CPSR wholesale (the MSR path).
    ///
    /// The mode field is routed through [`Cpu::set_mode`] so the banked
    /// registers swap; the Thumb bit is clamped on instruction sets
    /// without Thumb state.
    ///
    /// # Panics
    ///
    /// Panics with a register dump when the new value's mode field holds
    /// an undefined encoding.
    pub fn set_cpsr(&mut self, value: Cpsr) {
        let value = self.clamp_thumb(value);
        match value.mode() {
            Ok(mode) => {
                self.set_mode(mode);
                self.cpsr = value;
            }
            Err(err) => self.fatal(&format!("cpsr write rejected: {err}")),
        }
    }

    /// SPSR of the active mode.
    pub fn spsr(&self) -> Cpsr {
        self.spsr
    }

    /// Replace the SPSR of the active mode.
    pub fn set_spsr(&mut self, value: Cpsr) {
        self.spsr = value;
    }

    /// Replace the NZCV flags (the ALU write-back path).
    pub fn set_flags(&mut self, flags: Flags) {
        self.cpsr = self.cpsr.with_flags(flags);
    }

    /// Set or clear the Thumb bit. Ignored (held at zero) when the
    /// configured instruction set has no Thumb state.
    pub fn set_thumb(&mut self, thumb: bool) {
        self.cpsr = self.clamp_thumb(self.cpsr.with_t(thumb));
    }

    /// Mask or unmask IRQ delivery.
    pub fn set_irq_masked(&mut self, masked: bool) {
        self.cpsr = self.cpsr.with_i(masked);
    }

    /// Mask or unmask FIQ delivery.
    pub fn set_fiq_masked(&mut self, masked: bool) {
        self.cpsr = self.cpsr.with_f(masked);
    }

    fn clamp_thumb(&self, value: Cpsr) -> Cpsr {
        if self.model.isa == InstructionSet::V4 && value.t() {
            value.with_t(false)
        } else {
            value
        }
    }

    /// Condition predicate for the decoder: one bit test against the
    /// precomputed table.
    #[inline]
    pub fn condition_passes(&self, cond: Condition) -> bool {
        self.condition_table.passes(cond, self.cpsr.flags())
    }

    // ---- processor modes -----------------------------------------------

    /// Decode the active mode from the CPSR.
    ///
    /// # Panics
    ///
    /// Panics with a register dump when the mode field holds an
    /// undefined encoding. Every write path in this crate keeps the
    /// field defined, so reaching the panic means memory corruption or
    /// a bug in the caller's MSR handling.
    pub fn mode(&self) -> ProcessorMode {
        match self.cpsr.mode() {
            Ok(mode) => mode,
            Err(err) => self.fatal(&err.to_string()),
        }
    }

    /// Switch processor mode, swapping banked r13/r14/SPSR.
    ///
    /// This is the only place the CPSR mode field changes. Executor
    /// thread only; never called from the signal surface.
    ///
    /// # Panics
    ///
    /// Panics if the current CPSR mode field is undefined (see
    /// [`Cpu::mode`]).
    pub fn set_mode(&mut self, new_mode: ProcessorMode) {
        let old_mode = self.mode();
        log::debug!("mode change: {old_mode:?} to {new_mode:?}");
        if old_mode == new_mode {
            return;
        }

        let from = RegisterBank::of_mode(old_mode);
        let to = RegisterBank::of_mode(new_mode);

        self.banks[from as usize] = BankedRegs {
            r13: self.regs[13],
            r14: self.regs[14],
            spsr: self.spsr,
        };
        let bank = self.banks[to as usize];
        self.regs[13] = bank.r13;
        self.regs[14] = bank.r14;
        self.spsr = bank.spsr;

        self.cpsr = self.cpsr.with_mode(new_mode);
    }

    /// Read-only view of a banked register set.
    ///
    /// While a mode is active its bank copy may be stale; the live
    /// values are in the register file until the next switch away.
    pub fn banked(&self, bank: RegisterBank) -> BankedRegs {
        self.banks[bank as usize]
    }

    // ---- signals -------------------------------------------------------

    /// A handle for raising and lowering exceptions from other threads.
    pub fn signals(&self) -> SignalHandle {
        SignalHandle::new(Arc::clone(&self.pending))
    }

    /// Raise an exception from the executor itself, e.g. a
    /// decoder-detected SWI or undefined instruction. Taken at the next
    /// instruction boundary.
    pub fn raise(&self, exception: Exception) {
        self.pending.raise(exception);
    }

    // ---- coprocessors --------------------------------------------------

    /// Install a coprocessor in `slot`.
    ///
    /// # Panics
    ///
    /// A slot outside 0..=15 is a configuration error and panics with a
    /// register dump.
    pub fn install_coprocessor(&mut self, slot: usize, coproc: Box<dyn Coprocessor>) {
        if slot >= self.coprocs.len() {
            self.fatal(&format!("install_coprocessor: bad slot {slot}"));
        }
        self.coprocs[slot] = Some(coproc);
    }

    /// Access the coprocessor in `slot`, if one is installed.
    pub fn coprocessor_mut(&mut self, slot: usize) -> Option<&mut (dyn Coprocessor + 'static)> {
        self.coprocs.get_mut(slot).and_then(move |s| s.as_deref_mut())
    }

    /// Remember the coprocessor addressed by the current instruction.
    /// Selecting an empty or out-of-range slot clears the selection.
    pub fn select_coprocessor(&mut self, slot: usize) {
        self.current_cp = self
            .coprocs
            .get(slot)
            .is_some_and(|s| s.is_some())
            .then_some(slot);
    }

    /// The coprocessor selected by the last prefix, if any.
    pub fn selected_coprocessor(&mut self) -> Option<&mut (dyn Coprocessor + 'static)> {
        let slot = self.current_cp?;
        self.coprocs[slot].as_deref_mut()
    }

    /// Drop the remembered selection; it does not survive a reset or an
    /// instruction-set state switch.
    pub fn invalidate_coprocessor_selection(&mut self) {
        self.current_cp = None;
    }

    // ---- counters ------------------------------------------------------

    /// The performance counters.
    pub fn perf(&self) -> &PerfCounters {
        &self.perf
    }

    /// Mutable access for the executor's counting.
    pub fn perf_mut(&mut self) -> &mut PerfCounters {
        &mut self.perf
    }

    // ---- diagnostics ---------------------------------------------------

    /// Log the register dump at info level.
    pub fn dump(&self) {
        log::info!("{self}");
    }

    /// Report an unrecoverable inconsistency: log the message and a full
    /// register dump, then panic.
    ///
    /// # Panics
    ///
    /// Always.
    pub fn fatal(&self, msg: &str) -> ! {
        log::error!("panic: {msg}");
        log::error!("{self}");
        panic!("{msg}");
    }
}

impl fmt::Display for Cpu {
    /// The multi-line register dump used by the diagnostics paths.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.regs;
        writeln!(
            f,
            "cpu dump: ins {}",
            self.perf.get(PerfCounter::Instructions)
        )?;
        writeln!(
            f,
            "r0:   {:#010x} r1:   {:#010x} r2:   {:#010x} r3:   {:#010x}",
            r[0], r[1], r[2], r[3]
        )?;
        writeln!(
            f,
            "r4:   {:#010x} r5:   {:#010x} r6:   {:#010x} r7:   {:#010x}",
            r[4], r[5], r[6], r[7]
        )?;
        writeln!(
            f,
            "r8:   {:#010x} r9:   {:#010x} r10:  {:#010x} r11:  {:#010x}",
            r[8], r[9], r[10], r[11]
        )?;
        writeln!(
            f,
            "r12:  {:#010x} sp:   {:#010x} lr:   {:#010x} r15:  {:#010x} pc:   {:#010x}",
            r[12], r[13], r[14], r[15], self.pc
        )?;
        write!(
            f,
            "cpsr: {:#010x} ({} {}{}{}{}) spsr: {:#010x}",
            self.cpsr.raw_value(),
            if self.cpsr.t() { 'T' } else { ' ' },
            if self.cpsr.n() { 'N' } else { ' ' },
            if self.cpsr.z() { 'Z' } else { ' ' },
            if self.cpsr.c() { 'C' } else { ' ' },
            if self.cpsr.v() { 'V' } else { ' ' },
            self.spsr.raw_value()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Cpu, RegisterBank};
    use arm32_cpu::{Condition, Flags, ProcessorMode};

    #[test]
    fn pc_writes_realign_and_track_the_executing_pc() {
        let mut cpu = Cpu::from_name(None);
        cpu.set_reg(Cpu::PC, 0x1003);
        assert_eq!(cpu.reg(Cpu::PC), 0x1000);
        assert_eq!(cpu.pc(), 0x1000);
    }

    #[test]
    fn thumb_pc_writes_keep_the_halfword_bit_clear() {
        let mut cpu = Cpu::from_name(Some("armv5"));
        cpu.set_thumb(true);
        cpu.set_reg(Cpu::PC, 0x1003);
        assert_eq!(cpu.reg(Cpu::PC), 0x1002);
    }

    #[test]
    fn thumb_is_held_clear_on_v4_configurations() {
        let mut cpu = Cpu::from_name(Some("arm7tdmi"));
        cpu.set_thumb(true);
        assert!(!cpu.cpsr().t());
    }

    #[test]
    fn condition_checks_follow_the_flags() {
        let mut cpu = Cpu::from_name(None);
        cpu.set_flags(Flags {
            n: false,
            z: true,
            c: false,
            v: false,
        });
        assert!(cpu.condition_passes(Condition::Eq));
        assert!(!cpu.condition_passes(Condition::Ne));
        assert!(cpu.condition_passes(Condition::Al));
    }

    #[test]
    fn user_and_system_share_a_bank() {
        assert_eq!(
            RegisterBank::of_mode(ProcessorMode::Usr),
            RegisterBank::of_mode(ProcessorMode::Sys)
        );
    }

    #[test]
    #[should_panic(expected = "bad slot")]
    fn installing_past_the_last_slot_is_fatal() {
        struct Nop;
        impl crate::coproc::Coprocessor for Nop {
            fn read(&mut self, _: crate::coproc::CpAccess) -> u32 {
                0
            }
            fn write(&mut self, _: crate::coproc::CpAccess, _: u32) {}
            fn data_op(&mut self, _: crate::coproc::CpAccess) {}
        }
        let mut cpu = Cpu::from_name(None);
        cpu.install_coprocessor(16, Box::new(Nop));
    }
}
