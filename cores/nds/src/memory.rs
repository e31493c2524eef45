// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use std::{cell::RefCell, rc::Rc};

use dualcore::{interface::MemoryInterface, Address, CpuId, Width};

pub const KB: usize = 1024;
pub const MB: usize = KB * KB;

/// Code fetch wait states by region (address bits 27-24).
const FETCH_WAIT_16: [u32; 16] = [1, 1, 2, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];
const FETCH_WAIT_32: [u32; 16] = [1, 1, 4, 1, 1, 2, 2, 2, 1, 1, 1, 1, 1, 1, 1, 1];

/// Memory regions of the NDS that matter to the processors.
/// Main RAM is shared; the rest is separated by the 2 CPUs.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    pub psram: Box<[u8]>,
    pub wram7: Box<[u8]>,
    /// Low vectors of the ARM7, at 0x0000_0000.
    pub bios7: Box<[u8]>,
    /// High vectors of the ARM9, at 0xFFFF_0000.
    pub bios9: Box<[u8]>,
}

impl Memory {
    /// Get the region backing the given address for the given CPU, along
    /// with the offset into it.
    fn region(&mut self, cpu: CpuId, addr: Address) -> Option<(&mut [u8], usize)> {
        let a = addr.0 as usize;
        match (cpu, a >> 24) {
            (_, 0x02) => Some((&mut self.psram[..], a & (4 * MB - 1))),
            (CpuId::Arm7, 0x00) => Some((&mut self.bios7[..], a & (16 * KB - 1))),
            (CpuId::Arm7, 0x03) => Some((&mut self.wram7[..], a & (64 * KB - 1))),
            (CpuId::Arm9, 0xFF) => Some((&mut self.bios9[..], a & (32 * KB - 1))),
            _ => None,
        }
    }

    pub fn get(&mut self, cpu: CpuId, addr: Address, width: Width) -> u32 {
        let bytes = width.bytes();
        let addr = addr.align(bytes);
        let Some((region, offset)) = self.region(cpu, addr) else {
            log::debug!("ARM{}: unmapped read from {addr}", cpu.name());
            return 0;
        };
        region[offset..(offset + bytes as usize)]
            .iter()
            .rev()
            .fold(0, |acc, b| (acc << 8) | *b as u32)
    }

    pub fn set(&mut self, cpu: CpuId, addr: Address, width: Width, value: u32) {
        let bytes = width.bytes();
        let addr = addr.align(bytes);
        let Some((region, offset)) = self.region(cpu, addr) else {
            log::debug!("ARM{}: unmapped write to {addr} (0x{value:X})", cpu.name());
            return;
        };
        for (i, byte) in region[offset..(offset + bytes as usize)]
            .iter_mut()
            .enumerate()
        {
            *byte = (value >> (i * 8)) as u8;
        }
    }

    /// Copy a program into memory, as seen by the given CPU.
    pub fn load(&mut self, cpu: CpuId, addr: Address, data: &[u8]) {
        for (i, byte) in data.iter().enumerate() {
            self.set(cpu, addr + Address(i as u32), Width::Byte, *byte as u32);
        }
    }

    /// Cycles a code fetch takes.
    pub fn fetch_wait(addr: Address, width: Width) -> u32 {
        let region = ((addr.0 >> 24) & 0xF) as usize;
        match width {
            Width::Word => FETCH_WAIT_32[region],
            _ => FETCH_WAIT_16[region],
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            psram: vec![0; 4 * MB].into_boxed_slice(),
            wram7: vec![0; 64 * KB].into_boxed_slice(),
            bios7: vec![0; 16 * KB].into_boxed_slice(),
            bios9: vec![0; 32 * KB].into_boxed_slice(),
        }
    }
}

/// Memory as seen by one of the CPUs.
pub struct MemoryView {
    cpu: CpuId,
    memory: Rc<RefCell<Memory>>,
}

impl MemoryView {
    pub fn new(cpu: CpuId, memory: Rc<RefCell<Memory>>) -> Self {
        Self { cpu, memory }
    }
}

impl MemoryInterface for MemoryView {
    fn prefetch32(&mut self, addr: Address) -> u32 {
        self.read32(addr)
    }

    fn prefetch16(&mut self, addr: Address) -> u16 {
        self.read16(addr)
    }

    fn read8(&mut self, addr: Address) -> u8 {
        self.memory.borrow_mut().get(self.cpu, addr, Width::Byte) as u8
    }

    fn read16(&mut self, addr: Address) -> u16 {
        self.memory.borrow_mut().get(self.cpu, addr, Width::Halfword) as u16
    }

    fn read32(&mut self, addr: Address) -> u32 {
        self.memory.borrow_mut().get(self.cpu, addr, Width::Word)
    }

    fn write8(&mut self, addr: Address, value: u8) {
        self.memory
            .borrow_mut()
            .set(self.cpu, addr, Width::Byte, value as u32);
    }

    fn write16(&mut self, addr: Address, value: u16) {
        self.memory
            .borrow_mut()
            .set(self.cpu, addr, Width::Halfword, value as u32);
    }

    fn write32(&mut self, addr: Address, value: u32) {
        self.memory.borrow_mut().set(self.cpu, addr, Width::Word, value);
    }
}
