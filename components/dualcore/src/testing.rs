// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! A minimal system for unit tests.

use alloc::{boxed::Box, rc::Rc, vec, vec::Vec};
use core::cell::RefCell;

use crate::{
    interface::{ArmInstructionSet, Bus, MemoryInterface, ThumbInstructionSet},
    memory::{Address, Width},
    CpuId, Cores,
};

/// Cycles the default test handlers take.
pub const EXECUTED_CYCLES: u32 = 3;

const MEMORY_MASK: u32 = 0xFFFF;

/// 64KiB of RAM, mirrored across the whole address space.
pub struct TestMemory {
    data: Vec<u8>,
}

impl TestMemory {
    pub fn shared() -> Rc<RefCell<TestMemory>> {
        Rc::new(RefCell::new(TestMemory {
            data: vec![0; MEMORY_MASK as usize + 1],
        }))
    }

    fn at(addr: Address) -> usize {
        (addr.0 & MEMORY_MASK) as usize
    }
}

impl MemoryInterface for TestMemory {
    fn prefetch32(&mut self, addr: Address) -> u32 {
        self.read32(addr)
    }

    fn prefetch16(&mut self, addr: Address) -> u16 {
        self.read16(addr)
    }

    fn read8(&mut self, addr: Address) -> u8 {
        self.data[Self::at(addr)]
    }

    fn read16(&mut self, addr: Address) -> u16 {
        let lo = self.read8(addr) as u16;
        let hi = self.read8(addr + Address(1)) as u16;
        lo | (hi << 8)
    }

    fn read32(&mut self, addr: Address) -> u32 {
        let lo = self.read16(addr) as u32;
        let hi = self.read16(addr + Address::HW) as u32;
        lo | (hi << 16)
    }

    fn write8(&mut self, addr: Address, value: u8) {
        self.data[Self::at(addr)] = value;
    }

    fn write16(&mut self, addr: Address, value: u16) {
        self.write8(addr, value as u8);
        self.write8(addr + Address(1), (value >> 8) as u8);
    }

    fn write32(&mut self, addr: Address, value: u32) {
        self.write16(addr, value as u16);
        self.write16(addr + Address::HW, (value >> 16) as u16);
    }
}

/// Bus with shared opcode tables for both processors that record
/// everything they execute.
pub struct TestBus {
    pub arm: Box<ArmInstructionSet<TestBus>>,
    pub thumb: Box<ThumbInstructionSet<TestBus>>,
    pub memory: Rc<RefCell<TestMemory>>,
    pub fetch_cycles: u32,
    pub last_fetch: Option<(CpuId, Address, Width)>,
    pub executed: Vec<(CpuId, u32)>,
    pub thumb_executed: usize,
    pub reschedules: usize,
    pub halts: usize,
}

fn record_arm(_cores: &mut Cores, bus: &mut TestBus, cpu: CpuId, opcode: u32) -> u32 {
    bus.executed.push((cpu, opcode));
    EXECUTED_CYCLES
}

fn record_thumb(_cores: &mut Cores, bus: &mut TestBus, cpu: CpuId, opcode: u32) -> u32 {
    bus.executed.push((cpu, opcode));
    bus.thumb_executed += 1;
    EXECUTED_CYCLES
}

impl TestBus {
    pub fn new() -> Self {
        Self {
            arm: Box::new(ArmInstructionSet::filled(record_arm)),
            thumb: Box::new(ThumbInstructionSet::filled(record_thumb)),
            memory: TestMemory::shared(),
            fetch_cycles: 1,
            last_fetch: None,
            executed: Vec::new(),
            thumb_executed: 0,
            reschedules: 0,
            halts: 0,
        }
    }

    /// Both processors on this bus's memory, reset to the given entry
    /// points.
    pub fn cores(&mut self, arm9_entry: u32, arm7_entry: u32) -> Cores {
        let mut cores = Cores::with_memory(self.memory.clone());
        cores.reset(self, arm9_entry, arm7_entry);
        cores
    }
}

impl Bus for TestBus {
    fn arm_instructions(&self, _cpu: CpuId) -> &ArmInstructionSet<Self> {
        &self.arm
    }

    fn thumb_instructions(&self, _cpu: CpuId) -> &ThumbInstructionSet<Self> {
        &self.thumb
    }

    fn code_fetch_cycles(&mut self, cpu: CpuId, addr: Address, width: Width) -> u32 {
        self.last_fetch = Some((cpu, addr, width));
        self.fetch_cycles
    }

    fn reschedule(&mut self) {
        self.reschedules += 1;
    }

    fn halt(&mut self) {
        self.halts += 1;
    }
}
