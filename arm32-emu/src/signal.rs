//! Thread-safe exception signalling.

use std::sync::Arc;

use crate::exception::{Exception, PendingSet};

/// Raises and lowers exception lines from outside the executor thread.
///
/// Handles clone freely; every clone addresses the same pending word.
/// None of these calls block, acquire a lock, or touch any other CPU
/// state, so they are safe from interrupt-style contexts such as host
/// timer callbacks. The executor observes a raised line no later than
/// its next instruction boundary.
#[derive(Clone, Debug)]
pub struct SignalHandle {
    pending: Arc<PendingSet>,
}

impl SignalHandle {
    pub(crate) fn new(pending: Arc<PendingSet>) -> SignalHandle {
        SignalHandle { pending }
    }

    /// Schedule a system reset.
    pub fn reset(&self) {
        log::debug!("reset requested");
        self.pending.raise(Exception::Reset);
    }

    /// Assert the IRQ line.
    pub fn raise_irq(&self) {
        log::trace!("raise_irq");
        self.pending.raise(Exception::Irq);
    }

    /// Drop the IRQ line.
    pub fn lower_irq(&self) {
        log::trace!("lower_irq");
        self.pending.clear(Exception::Irq);
    }

    /// Assert the FIQ line.
    pub fn raise_fiq(&self) {
        log::trace!("raise_fiq");
        self.pending.raise(Exception::Fiq);
    }

    /// Drop the FIQ line.
    pub fn lower_fiq(&self) {
        log::trace!("lower_fiq");
        self.pending.clear(Exception::Fiq);
    }

    /// Report a failed data access at `address`.
    pub fn signal_data_abort(&self, address: u32) {
        log::debug!("data abort at {address:#010x}");
        self.pending.raise(Exception::DataAbort);
    }

    /// Report a failed instruction fetch at `address`.
    pub fn signal_prefetch_abort(&self, address: u32) {
        log::debug!("prefetch abort at {address:#010x}");
        self.pending.raise(Exception::PrefetchAbort);
    }
}
