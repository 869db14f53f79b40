//! Mode switching and register banking.

use arm32_cpu::{Cpsr, ProcessorMode};
use arm32_emu::{Cpu, RegisterBank};
use pretty_assertions::assert_eq;

#[test]
fn fiq_bank_survives_a_trip_through_user() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Usr);

    cpu.set_mode(ProcessorMode::Fiq);
    cpu.set_reg(Cpu::SP, 0xF1);
    cpu.set_reg(Cpu::LR, 0xF2);

    cpu.set_mode(ProcessorMode::Usr);
    cpu.set_reg(Cpu::SP, 0xAA);

    cpu.set_mode(ProcessorMode::Fiq);
    assert_eq!(cpu.reg(Cpu::SP), 0xF1);
    assert_eq!(cpu.reg(Cpu::LR), 0xF2);

    cpu.set_mode(ProcessorMode::Usr);
    assert_eq!(cpu.reg(Cpu::SP), 0xAA);
}

#[test]
fn a_walk_through_every_mode_preserves_each_bank() {
    let tour = [
        (ProcessorMode::Svc, 0x5C00u32),
        (ProcessorMode::Abt, 0xAB00),
        (ProcessorMode::Irq, 0x1900),
        (ProcessorMode::Und, 0x0D00),
        (ProcessorMode::Fiq, 0xF100),
    ];

    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Usr);
    cpu.set_reg(Cpu::SP, 0x1000);
    cpu.set_reg(Cpu::LR, 0x2000);

    for (mode, sp) in tour {
        cpu.set_mode(mode);
        cpu.set_reg(Cpu::SP, sp);
        cpu.set_reg(Cpu::LR, sp | 0xE);
    }
    for (mode, sp) in tour {
        cpu.set_mode(mode);
        assert_eq!(cpu.reg(Cpu::SP), sp, "{mode:?}");
        assert_eq!(cpu.reg(Cpu::LR), sp | 0xE, "{mode:?}");
    }

    cpu.set_mode(ProcessorMode::Usr);
    assert_eq!(cpu.reg(Cpu::SP), 0x1000);
    assert_eq!(cpu.reg(Cpu::LR), 0x2000);
}

#[test]
fn user_and_system_share_the_live_registers() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Usr);
    cpu.set_reg(Cpu::SP, 0x77);

    cpu.set_mode(ProcessorMode::Sys);
    assert_eq!(cpu.reg(Cpu::SP), 0x77);
    cpu.set_reg(Cpu::SP, 0x88);

    cpu.set_mode(ProcessorMode::Usr);
    assert_eq!(cpu.reg(Cpu::SP), 0x88);
}

#[test]
fn switching_to_the_same_mode_changes_nothing() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Irq);
    cpu.set_reg(Cpu::SP, 0x123);
    let spsr = Cpsr::new_with_raw_value(0x600000D3);
    cpu.set_spsr(spsr);

    cpu.set_mode(ProcessorMode::Irq);
    assert_eq!(cpu.reg(Cpu::SP), 0x123);
    assert_eq!(cpu.spsr(), spsr);
    assert_eq!(cpu.mode(), ProcessorMode::Irq);
}

#[test]
fn the_spsr_is_banked_per_mode() {
    let svc_spsr = Cpsr::new_with_raw_value(0x1_0010);
    let irq_spsr = Cpsr::new_with_raw_value(0x2_0010);

    let mut cpu = Cpu::from_name(None);
    cpu.set_spsr(svc_spsr); // initial mode is Supervisor

    cpu.set_mode(ProcessorMode::Irq);
    cpu.set_spsr(irq_spsr);

    cpu.set_mode(ProcessorMode::Svc);
    assert_eq!(cpu.spsr(), svc_spsr);

    cpu.set_mode(ProcessorMode::Irq);
    assert_eq!(cpu.spsr(), irq_spsr);
}

#[test]
fn the_mode_field_tracks_the_switch() {
    let mut cpu = Cpu::from_name(None);
    for mode in [
        ProcessorMode::Usr,
        ProcessorMode::Fiq,
        ProcessorMode::Irq,
        ProcessorMode::Svc,
        ProcessorMode::Abt,
        ProcessorMode::Und,
        ProcessorMode::Sys,
    ] {
        cpu.set_mode(mode);
        assert_eq!(cpu.mode(), mode);
        assert_eq!(cpu.cpsr().mode(), Ok(mode));
    }
}

#[test]
fn banked_views_reflect_the_last_switch_away() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Abt);
    cpu.set_reg(Cpu::SP, 0xA0);
    cpu.set_reg(Cpu::LR, 0xA4);

    cpu.set_mode(ProcessorMode::Usr);
    let bank = cpu.banked(RegisterBank::Abt);
    assert_eq!(bank.r13, 0xA0);
    assert_eq!(bank.r14, 0xA4);
}

#[test]
fn msr_style_writes_route_mode_changes_through_the_switcher() {
    let mut cpu = Cpu::from_name(None);
    cpu.set_mode(ProcessorMode::Fiq);
    cpu.set_reg(Cpu::SP, 0xF100);

    // A whole-word CPSR write that lands in User mode must swap banks
    // exactly like an explicit switch.
    cpu.set_cpsr(Cpsr::new_with_raw_value(0).with_mode(ProcessorMode::Usr));
    assert_eq!(cpu.mode(), ProcessorMode::Usr);
    cpu.set_reg(Cpu::SP, 0x1100);

    cpu.set_mode(ProcessorMode::Fiq);
    assert_eq!(cpu.reg(Cpu::SP), 0xF100);

    cpu.set_mode(ProcessorMode::Usr);
    assert_eq!(cpu.reg(Cpu::SP), 0x1100);
}
