//! # Architectural model of an AArch32 Arm CPU
//!
//! Value types shared by the emulator: the program status register with
//! its flags, masks, and five-bit mode field; the processor modes; the
//! sixteen condition codes together with the precomputed condition
//! table; and the CPU model selection table (instruction set, core
//! family, coprocessor/MMU presence).
//!
//! Nothing in this crate holds mutable machine state. The register
//! file, banked registers, and exception machinery live in the
//! `arm32-emu` crate, which builds on these types.

pub mod condition;
pub mod model;
pub mod register;

pub use condition::{Condition, ConditionTable};
pub use model::{ArmCore, CpuModel, InstructionSet};
pub use register::cpsr::{Cpsr, Flags, InvalidMode, ProcessorMode};
