//! CPU model selection.
//!
//! Maps the model names accepted on the command line to an instruction
//! set, a core family, and the presence of the system-control
//! coprocessor and MMU.

/// Instruction-set generations the core can emulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstructionSet {
    /// ARMv4
    V4,
    /// ARMv5
    V5,
    /// ARMv5E (DSP extensions)
    V5e,
    /// ARMv6
    V6,
}

/// Core families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArmCore {
    /// ARM7 family
    Arm7,
    /// ARM9 family
    Arm9,
    /// ARM9E family
    Arm9e,
}

/// A named CPU configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CpuModel {
    /// Instruction set
    pub isa: InstructionSet,
    /// Core family
    pub core: ArmCore,
    /// System-control coprocessor (CP15) present
    pub cp15: bool,
    /// MMU present
    pub mmu: bool,
}

/// The recognised model names. Lookup is case-insensitive.
const MODELS: &[(&str, CpuModel)] = &[
    (
        "armv4",
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm7,
            cp15: false,
            mmu: false,
        },
    ),
    (
        "armv5",
        CpuModel {
            isa: InstructionSet::V5,
            core: ArmCore::Arm9,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "armv5e",
        CpuModel {
            isa: InstructionSet::V5e,
            core: ArmCore::Arm9e,
            cp15: true,
            mmu: true,
        },
    ),
    // No ARM11 model yet, so armv6 runs on the ARM9 core.
    (
        "armv6",
        CpuModel {
            isa: InstructionSet::V6,
            core: ArmCore::Arm9,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "arm7tdmi",
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm7,
            cp15: false,
            mmu: false,
        },
    ),
    (
        "arm7",
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm7,
            cp15: false,
            mmu: false,
        },
    ),
    (
        "arm9tdmi",
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm9,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "arm9",
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm9,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "arm9e",
        CpuModel {
            isa: InstructionSet::V5e,
            core: ArmCore::Arm9e,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "arm926ejs",
        CpuModel {
            isa: InstructionSet::V5e,
            core: ArmCore::Arm9e,
            cp15: true,
            mmu: true,
        },
    ),
    (
        "arm926",
        CpuModel {
            isa: InstructionSet::V5e,
            core: ArmCore::Arm9e,
            cp15: true,
            mmu: true,
        },
    ),
];

impl CpuModel {
    /// Look up a model by name, ignoring case. Unknown names return
    /// `None`; callers fall back to [`CpuModel::default`].
    pub fn from_name(name: &str) -> Option<CpuModel> {
        MODELS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map(|&(_, model)| model)
    }
}

impl Default for CpuModel {
    /// The plain ARMv4/ARM7 configuration, no CP15 and no MMU.
    fn default() -> CpuModel {
        CpuModel {
            isa: InstructionSet::V4,
            core: ArmCore::Arm7,
            cp15: false,
            mmu: false,
        }
    }
}
