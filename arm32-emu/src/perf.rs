//! Performance counters.
//!
//! Monotonic event counts written by the executor and read by
//! diagnostics. The host's once-a-second reporter subtracts
//! consecutive snapshots with [`PerfCounters::delta_since`] to print
//! rates; [`PerfCounters::to_json`] feeds the same numbers to
//! structured tooling.

use serde::Serialize;

/// The counted event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum PerfCounter {
    /// Emulated cycles
    Cycles = 0,
    /// Instructions retired
    Instructions,
    /// Decoder invocations (uop cache misses)
    InstructionDecodes,
    /// Software page-table walks
    SlowMmuTranslates,
    /// Exceptions taken
    ExceptionsTaken,
    /// Instructions skipped on a false condition
    SkippedConditions,
    /// Branches executed
    Branches,
}

impl PerfCounter {
    const COUNT: usize = 7;
}

/// The counter file. Values only ever grow; wrapping subtraction in
/// [`PerfCounters::delta_since`] keeps the rate report correct across
/// a u64 wrap, not that one is expected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PerfCounters {
    counts: [u64; PerfCounter::COUNT],
}

impl PerfCounters {
    pub(crate) fn new() -> PerfCounters {
        PerfCounters::default()
    }

    /// Bump `counter` by one.
    #[inline]
    pub fn inc(&mut self, counter: PerfCounter) {
        self.counts[counter as usize] = self.counts[counter as usize].wrapping_add(1);
    }

    /// Bump `counter` by `n` (bulk retire from a translated block).
    #[inline]
    pub fn add(&mut self, counter: PerfCounter, n: u64) {
        self.counts[counter as usize] = self.counts[counter as usize].wrapping_add(n);
    }

    /// Current value of `counter`.
    #[inline]
    pub fn get(&self, counter: PerfCounter) -> u64 {
        self.counts[counter as usize]
    }

    /// Events accumulated since the `earlier` snapshot.
    pub fn delta_since(&self, earlier: &PerfCounters) -> PerfCounters {
        let mut counts = [0u64; PerfCounter::COUNT];
        for (slot, (now, then)) in counts
            .iter_mut()
            .zip(self.counts.iter().zip(earlier.counts.iter()))
        {
            *slot = now.wrapping_sub(*then);
        }
        PerfCounters { counts }
    }

    /// Snapshot under stable field names.
    pub fn summary(&self) -> Summary {
        Summary {
            cycles: self.get(PerfCounter::Cycles),
            instructions: self.get(PerfCounter::Instructions),
            instruction_decodes: self.get(PerfCounter::InstructionDecodes),
            slow_mmu_translates: self.get(PerfCounter::SlowMmuTranslates),
            exceptions_taken: self.get(PerfCounter::ExceptionsTaken),
            skipped_conditions: self.get(PerfCounter::SkippedConditions),
            branches: self.get(PerfCounter::Branches),
        }
    }

    /// JSON rendering of [`PerfCounters::summary`].
    ///
    /// # Errors
    ///
    /// Propagates the serializer error, which for this plain struct
    /// does not occur in practice.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.summary())
    }
}

/// Every counter under a stable name, for export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Emulated cycles
    pub cycles: u64,
    /// Instructions retired
    pub instructions: u64,
    /// Decoder invocations
    pub instruction_decodes: u64,
    /// Software page-table walks
    pub slow_mmu_translates: u64,
    /// Exceptions taken
    pub exceptions_taken: u64,
    /// Condition-skipped instructions
    pub skipped_conditions: u64,
    /// Branches executed
    pub branches: u64,
}
