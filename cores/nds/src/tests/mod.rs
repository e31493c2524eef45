// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::options::SystemConfig;
use dualcore::{
    arm_index,
    state::{Flag, Mode},
    Address, CpuId, Cores, Exception,
};

use crate::{Nds, NdsBus};

const NOP: u32 = 0xE1A0_0000;
const HALT: u32 = 0xE320_F003;
const RESERVED: u32 = 0xE7F0_00F0;

const ARM9_CODE: u32 = 0x0200_0000;
const ARM7_CODE: u32 = 0x0380_0000;
const ARM9_IRQ_VECTOR: u32 = 0xFFFF_0018;

fn count(cores: &mut Cores, _bus: &mut NdsBus, cpu: CpuId, _opcode: u32) -> u32 {
    cores[cpu].registers[0] += 1;
    1
}

fn halt(cores: &mut Cores, _bus: &mut NdsBus, cpu: CpuId, _opcode: u32) -> u32 {
    cores[cpu].wait_for_irq()
}

fn reserved(cores: &mut Cores, bus: &mut NdsBus, cpu: CpuId, _opcode: u32) -> u32 {
    cores[cpu].exception(bus, Exception::Reserved);
    1
}

fn load_words(ds: &mut Nds, cpu: CpuId, addr: u32, words: &[u32]) {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    ds.load(cpu, addr, &bytes);
}

/// Both CPUs running NOPs, with the given programs in front.
fn system_with(config: SystemConfig, arm9: &[u32], arm7: &[u32]) -> Nds {
    let config = SystemConfig {
        arm9_entry: ARM9_CODE,
        arm7_entry: ARM7_CODE,
        ..config
    };
    let mut ds = Nds::new(&config);
    for cpu in CpuId::BOTH {
        ds.bus.set_arm_handler(cpu, arm_index(NOP), count);
        ds.bus.set_arm_handler(cpu, arm_index(HALT), halt);
    }
    ds.bus
        .set_arm_handler(CpuId::Arm7, arm_index(RESERVED), reserved);

    let nops = vec![NOP; 1024];
    load_words(&mut ds, CpuId::Arm9, ARM9_CODE, &nops);
    load_words(&mut ds, CpuId::Arm7, ARM7_CODE, &nops);
    load_words(&mut ds, CpuId::Arm9, ARM9_IRQ_VECTOR, &nops[..16]);
    load_words(&mut ds, CpuId::Arm9, ARM9_CODE, arm9);
    load_words(&mut ds, CpuId::Arm7, ARM7_CODE, arm7);
    ds.reset();
    ds
}

fn system(arm9: &[u32], arm7: &[u32]) -> Nds {
    system_with(SystemConfig::default(), arm9, arm7)
}

#[test]
fn arm7_catches_up_at_half_speed() {
    let mut ds = system(&[], &[]);
    ds.advance();
    // ARM9: execute overlaps the 4 cycle main RAM fetch
    assert_eq!(ds.bus.scheduler.now(), 4);
    // ARM7: 1 execute + 1 fetch, at half the clock
    assert_eq!(ds.time_7(), 4);
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], 1);
    assert_eq!(ds.cores[CpuId::Arm7].registers[0], 1);

    ds.run_for(400).unwrap();
    assert_eq!(ds.bus.scheduler.now(), 404);
    assert_eq!(ds.time_7(), 404);
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], 101);
    assert_eq!(ds.cores[CpuId::Arm7].registers[0], 101);
    assert_eq!(
        ds.cores[CpuId::Arm9].instruction_address(),
        Address(ARM9_CODE + 101 * 4)
    );
}

#[test]
fn fetch_cycles_can_be_ignored() {
    let config = SystemConfig {
        account_code_fetch_cycles: false,
        ..SystemConfig::default()
    };
    let mut ds = system_with(config, &[], &[]);
    ds.advance();
    assert_eq!(ds.bus.scheduler.now(), 1);
    assert_eq!(ds.time_7(), 2);
}

#[test]
fn stalled_cpu_is_charged_fixed_cycles() {
    let mut ds = system(&[], &[]);
    ds.cores[CpuId::Arm9].stall();
    ds.advance();
    assert_eq!(ds.bus.scheduler.now(), 10);
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], 0);
    assert_eq!(ds.cores[CpuId::Arm9].instruction_address(), Address(ARM9_CODE));
    assert_eq!(ds.time_7(), 12);
    assert_eq!(ds.cores[CpuId::Arm7].registers[0], 3);

    ds.cores[CpuId::Arm9].unstall();
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], 1);
}

#[test]
fn waiting_cpu_skips_to_interrupt() {
    let mut ds = system(&[HALT], &[]);
    ds.set_ie(CpuId::Arm9, 1);
    ds.set_ime(CpuId::Arm9, true);
    ds.schedule_interrupt(CpuId::Arm9, 1, 100).unwrap();

    ds.advance();
    assert!(ds.cores[CpuId::Arm9].is_waiting_for_irq());
    assert_eq!(ds.bus.scheduler.now(), 4);

    // Skips straight to the interrupt, which gets delivered while the
    // ARM7 catches up
    ds.advance();
    assert_eq!(ds.bus.scheduler.now(), 100);
    let arm9 = &ds.cores[CpuId::Arm9];
    assert!(!arm9.is_waiting_for_irq());
    assert_eq!(arm9.mode(), Some(Mode::Irq));
    assert!(arm9.is_flag(Flag::IrqDisable));
    assert_eq!(arm9.lr(), ARM9_CODE + 8);
    assert_eq!(arm9.instruction_address(), Address(ARM9_IRQ_VECTOR));
    assert_eq!(arm9.registers[0], 0);

    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], 1);
    assert_eq!(
        ds.cores[CpuId::Arm9].instruction_address(),
        Address(ARM9_IRQ_VECTOR + 4)
    );
}

#[test]
fn halt_wakes_without_ime() {
    let mut ds = system(&[], &[HALT]);
    ds.set_ie(CpuId::Arm7, 4);
    ds.advance();
    assert!(ds.cores[CpuId::Arm7].is_waiting_for_irq());

    ds.set_if(CpuId::Arm7, 4);
    ds.advance();
    let arm7 = &ds.cores[CpuId::Arm7];
    assert!(!arm7.is_waiting_for_irq());
    assert_eq!(arm7.mode(), Some(Mode::System));
    assert!(arm7.registers[0] > 0);
}

#[test]
fn masked_interrupts_are_held() {
    let mut ds = system(&[], &[]);
    ds.set_ie(CpuId::Arm9, 1);
    ds.set_if(CpuId::Arm9, 1);
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].mode(), Some(Mode::System));

    ds.cores[CpuId::Arm9].set_flag(Flag::IrqDisable, true);
    ds.set_ime(CpuId::Arm9, true);
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].mode(), Some(Mode::System));

    // Acknowledged interrupts stay quiet even when unmasked
    ds.acknowledge(CpuId::Arm9, 1);
    ds.cores[CpuId::Arm9].set_flag(Flag::IrqDisable, false);
    ds.cores[CpuId::Arm9].changed_cpsr(&mut ds.bus);
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].mode(), Some(Mode::System));

    ds.set_if(CpuId::Arm9, 1);
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].mode(), Some(Mode::Irq));
    assert_eq!(ds.cores[CpuId::Arm7].mode(), Some(Mode::System));
}

#[test]
fn undefined_opcodes_by_default() {
    let mut ds = system(&[RESERVED, RESERVED], &[]);
    ds.advance();
    // Vector table is not where the ARM9 expects it to be
    let arm9 = &ds.cores[CpuId::Arm9];
    assert_eq!(arm9.mode(), Some(Mode::System));
    assert_eq!(arm9.instruction_address(), Address(ARM9_CODE + 4));
    assert_eq!(ds.bus.scheduler.now(), 4);

    ds.cores[CpuId::Arm9].set_vector_base(0);
    ds.advance();
    let arm9 = &ds.cores[CpuId::Arm9];
    assert_eq!(arm9.mode(), Some(Mode::Undefined));
    assert_eq!(arm9.lr(), ARM9_CODE + 8);
    assert_eq!(arm9.instruction_address(), Address(0x4));
}

#[test]
fn reserved_vector_halts() {
    let mut ds = system(&[], &[RESERVED]);
    ds.run_for(1000).unwrap();
    assert!(!ds.is_running());
    assert_eq!(ds.bus.scheduler.now(), 4);
    assert_eq!(ds.cores[CpuId::Arm7].mode(), Some(Mode::System));
    assert_eq!(ds.bus.scheduler.next_event_in(), None);

    ds.run_for(1000).unwrap();
    assert_eq!(ds.bus.scheduler.now(), 4);

    ds.reset();
    assert!(ds.is_running());
    assert_eq!(ds.bus.scheduler.now(), 0);
}

#[test]
fn many_pending_interrupts() {
    let mut ds = system(&[], &[]);
    let mut scheduled = 0;
    for i in 0..40 {
        if ds.schedule_interrupt(CpuId::Arm7, 1 << (i % 16), 10 + i).is_err() {
            break;
        }
        scheduled += 1;
    }
    assert_eq!(scheduled, 32);
    // No room left to pause again
    assert!(ds.run_for(100).is_err());
    assert_eq!(ds.bus.scheduler.now(), 0);

    // Interrupts already pending at the same time are merged
    ds.schedule_interrupt(CpuId::Arm7, 1, 10).unwrap();

    // Let some of them fire to make room
    while ds.bus.scheduler.now() < 20 {
        ds.advance();
    }
    ds.run_for(100).unwrap();
    assert_eq!(ds.bus.intr[1].if_, 0xFFFF);
}

#[test]
fn cpus_share_main_ram() {
    let mut ds = system(&[], &[]);
    ds.write32(CpuId::Arm7, 0x0210_0000, 0x1234_5678);
    assert_eq!(ds.read32(CpuId::Arm9, 0x0210_0000), 0x1234_5678);
    assert_eq!(ds.read32(CpuId::Arm9, ARM7_CODE), 0);
    assert_eq!(ds.read32(CpuId::Arm7, ARM7_CODE), NOP);
}

#[cfg(feature = "serde")]
#[test]
fn save_state_roundtrip() {
    let mut ds = system(&[], &[]);
    ds.run_for(40).unwrap();
    let state = ds.save_state().unwrap();
    let time = ds.bus.scheduler.now();
    let time_7 = ds.time_7();
    let address = ds.cores[CpuId::Arm9].instruction_address();

    ds.run_for(40).unwrap();
    ds.write32(CpuId::Arm9, ARM9_CODE + 0x400, 0);
    assert_ne!(ds.bus.scheduler.now(), time);

    ds.load_state(&state).unwrap();
    assert_eq!(ds.bus.scheduler.now(), time);
    assert_eq!(ds.time_7(), time_7);
    assert_eq!(ds.cores[CpuId::Arm9].instruction_address(), address);
    assert_eq!(ds.read32(CpuId::Arm9, ARM9_CODE + 0x400), NOP);

    // Opcode tables and memory views survive the load
    let executed = ds.cores[CpuId::Arm9].registers[0];
    ds.advance();
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], executed + 1);

    assert!(ds.load_state(&state[..8]).is_err());
    assert_eq!(ds.cores[CpuId::Arm9].registers[0], executed + 1);
}
