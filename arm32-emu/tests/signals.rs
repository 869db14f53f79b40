//! The cross-thread signalling contract.

use std::thread;

use arm32_cpu::ProcessorMode;
use arm32_emu::{Cpu, PerfCounter};
use pretty_assertions::assert_eq;

#[test]
fn a_raise_lower_pair_before_the_poll_is_invisible() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_irq_masked(false);
    cpu.set_fiq_masked(false);
    let signals = cpu.signals();

    signals.raise_irq();
    signals.lower_irq();
    assert!(!cpu.process_pending_exceptions());

    signals.raise_fiq();
    signals.lower_fiq();
    assert!(!cpu.process_pending_exceptions());
}

#[test]
fn every_handle_clone_addresses_the_same_lines() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_irq_masked(false);
    let a = cpu.signals();
    let b = a.clone();

    a.raise_irq();
    b.lower_irq();
    assert!(!cpu.process_pending_exceptions());
}

#[test]
fn raises_from_other_threads_are_observed_at_the_next_poll() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_irq_masked(false);
    let signals = cpu.signals();

    let raiser = thread::spawn(move || {
        signals.raise_irq();
    });
    raiser.join().unwrap();

    assert!(cpu.process_pending_exceptions());
    assert_eq!(cpu.mode(), ProcessorMode::Irq);
}

#[test]
fn concurrent_signallers_do_not_lose_lines() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_irq_masked(false);
    cpu.set_fiq_masked(false);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let signals = cpu.signals();
            thread::spawn(move || {
                if i % 2 == 0 {
                    signals.raise_irq();
                } else {
                    signals.raise_fiq();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // FIQ first (priority), then IRQ once the entry mask drops.
    assert!(cpu.process_pending_exceptions());
    assert_eq!(cpu.mode(), ProcessorMode::Fiq);
    let fiq_signals = cpu.signals();
    fiq_signals.lower_fiq();
    cpu.set_irq_masked(false);
    assert!(cpu.process_pending_exceptions());
    assert_eq!(cpu.mode(), ProcessorMode::Irq);
}

#[test]
fn signals_raised_before_the_spawn_are_delivered_on_the_first_boundary() {
    let cpu = Cpu::from_name(None);
    cpu.signals().signal_prefetch_abort(0x9000);

    let handle = cpu
        .start(0, |cpu| {
            while !cpu.process_pending_exceptions() {
                thread::yield_now();
            }
        })
        .unwrap();
    let cpu = handle.join().unwrap();

    assert_eq!(cpu.mode(), ProcessorMode::Abt);
    assert_eq!(cpu.reg(Cpu::PC), 0x0c);
    assert_eq!(cpu.perf().get(PerfCounter::ExceptionsTaken), 1);
}

#[test]
fn a_running_executor_sees_lines_raised_through_its_handle() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_irq_masked(false);

    let handle = cpu
        .start(0, |cpu| {
            while !cpu.process_pending_exceptions() {
                thread::yield_now();
            }
        })
        .unwrap();
    handle.signals().raise_irq();

    let cpu = handle.join().unwrap();
    assert_eq!(cpu.mode(), ProcessorMode::Irq);
    assert_eq!(cpu.reg(Cpu::PC), 0x18);
}
