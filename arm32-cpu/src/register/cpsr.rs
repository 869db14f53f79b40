//! Code for managing CPSR (*Current Program Status Register*)

use arbitrary_int::{u4, u5};

/// The processor modes, as encoded in the five-bit mode field of the
/// CPSR.
///
/// User and System run with the same register bank; the five exception
/// modes each bank their own r13, r14, and SPSR. Hyp and Monitor are
/// not modelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::TryFromPrimitive, num_enum::IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ProcessorMode {
    /// User mode (unprivileged)
    Usr = 0x10,
    /// Fast-interrupt handler mode
    Fiq = 0x11,
    /// Interrupt handler mode
    Irq = 0x12,
    /// Supervisor mode; entered on reset and SWI
    Svc = 0x13,
    /// Abort mode; entered on data and prefetch aborts
    Abt = 0x17,
    /// Undefined-instruction handler mode
    Und = 0x1B,
    /// System mode (privileged, User register bank)
    Sys = 0x1F,
}

/// Error for a CPSR mode field holding an encoding that is not a
/// defined processor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid processor mode bits {0:#07b}")]
pub struct InvalidMode(pub u8);

/// The NZCV condition flags, the top nibble of the CPSR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Flags {
    /// Negative
    pub n: bool,
    /// Zero
    pub z: bool,
    /// Carry (or no-borrow)
    pub c: bool,
    /// Signed overflow
    pub v: bool,
}

impl Flags {
    /// Pack into a nibble, N in bit 3 down to V in bit 0.
    #[inline]
    pub const fn nibble(self) -> u4 {
        u4::new((self.n as u8) << 3 | (self.z as u8) << 2 | (self.c as u8) << 1 | self.v as u8)
    }

    /// Unpack from a nibble laid out as [`Flags::nibble`] produces.
    #[inline]
    pub fn from_nibble(bits: u4) -> Flags {
        let bits = bits.value();
        Flags {
            n: bits & 0b1000 != 0,
            z: bits & 0b0100 != 0,
            c: bits & 0b0010 != 0,
            v: bits & 0b0001 != 0,
        }
    }
}

/// CPSR (*Current Program Status Register*)
///
/// Also used for the SPSR copies saved in the banked register sets; an
/// SPSR is simply the CPSR value captured on exception entry.
///
/// Bits 8..=27 are reserved on the cores modelled here and read back
/// exactly as written.
#[bitbybit::bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct Cpsr {
    /// Negative flag
    #[bit(31, rw)]
    n: bool,
    /// Zero flag
    #[bit(30, rw)]
    z: bool,
    /// Carry flag
    #[bit(29, rw)]
    c: bool,
    /// Overflow flag
    #[bit(28, rw)]
    v: bool,
    /// IRQ mask; set means IRQs are not taken
    #[bit(7, rw)]
    i: bool,
    /// FIQ mask; set means FIQs are not taken
    #[bit(6, rw)]
    f: bool,
    /// Thumb state bit
    #[bit(5, rw)]
    t: bool,
    /// Raw mode field; decode through [`Cpsr::mode`]
    #[bits(0..=4, rw)]
    mode_bits: u5,
}

impl Cpsr {
    /// Decode the mode field.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidMode`] when the field holds one of the 25
    /// undefined five-bit encodings.
    #[inline]
    pub fn mode(self) -> Result<ProcessorMode, InvalidMode> {
        let raw = self.mode_bits().value();
        ProcessorMode::try_from(raw).map_err(|_| InvalidMode(raw))
    }

    /// Replace the mode field. Encoding a mode is total; only decoding
    /// can fail.
    #[inline]
    #[must_use]
    pub const fn with_mode(self, mode: ProcessorMode) -> Cpsr {
        self.with_mode_bits(u5::new(mode as u8))
    }

    /// The NZCV nibble.
    #[inline]
    pub const fn flags(self) -> Flags {
        Flags {
            n: self.n(),
            z: self.z(),
            c: self.c(),
            v: self.v(),
        }
    }

    /// Replace the NZCV nibble, leaving everything else untouched.
    #[inline]
    #[must_use]
    pub const fn with_flags(self, flags: Flags) -> Cpsr {
        self.with_n(flags.n)
            .with_z(flags.z)
            .with_c(flags.c)
            .with_v(flags.v)
    }
}

impl Default for Cpsr {
    /// The all-zero word. Note the mode field of this value is not a
    /// defined mode; it is the blank SPSR content of a bank that has
    /// never been entered.
    fn default() -> Cpsr {
        Cpsr::new_with_raw_value(0)
    }
}

impl core::fmt::Debug for Cpsr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Cpsr {{ {:#010x} {}{}{}{}{}{}{} mode={:#07b} }}",
            self.raw_value(),
            if self.n() { 'N' } else { '-' },
            if self.z() { 'Z' } else { '-' },
            if self.c() { 'C' } else { '-' },
            if self.v() { 'V' } else { '-' },
            if self.i() { 'I' } else { '-' },
            if self.f() { 'F' } else { '-' },
            if self.t() { 'T' } else { '-' },
            self.mode_bits()
        )
    }
}
