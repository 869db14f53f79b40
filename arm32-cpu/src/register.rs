//! Register types of the emulated CPU.

pub mod cpsr;

pub use cpsr::{Cpsr, Flags, InvalidMode, ProcessorMode};
