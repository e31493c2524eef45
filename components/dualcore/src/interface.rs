// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::rc::Rc;
use core::cell::RefCell;

use crate::{
    memory::{Address, Width},
    CpuId, Cores,
};

/// Trait for a system that contains both processors.
pub trait Bus: Sized + 'static {
    /// ARM opcode table of the given processor.
    fn arm_instructions(&self, cpu: CpuId) -> &ArmInstructionSet<Self>;
    /// THUMB opcode table of the given processor.
    fn thumb_instructions(&self, cpu: CpuId) -> &ThumbInstructionSet<Self>;

    /// Cycles a code fetch of the given width at the given address takes.
    /// The type is mut here since things like caches change state when
    /// accessed.
    fn code_fetch_cycles(&mut self, cpu: CpuId, addr: Address, width: Width) -> u32;

    /// Merge the cycles an instruction took to execute with the cycles
    /// its following fetch took.
    fn fetch_execute_cycles(&self, cpu: CpuId, execute: u32, fetch: u32) -> u32 {
        merge_fetch_execute(cpu, execute, fetch)
    }

    /// Called whenever CPSR changed in a way that might unmask a pending
    /// interrupt. The system should check for interrupts before the next
    /// dispatch.
    fn reschedule(&mut self);

    /// Stop emulation entirely. Called when the CPU hits an unrecoverable
    /// state.
    fn halt(&mut self);
}

/// Default merge of execute and fetch cycles.
/// The ARM9 fetches in parallel to executing; the ARM7 does not.
#[inline]
pub fn merge_fetch_execute(cpu: CpuId, execute: u32, fetch: u32) -> u32 {
    match cpu {
        CpuId::Arm9 => execute.max(fetch),
        CpuId::Arm7 => execute + fetch,
    }
}

/// Handler for an opcode. Receives the opcode and returns the amount of
/// cycles it took to execute.
pub type OpcodeHandler<B> = fn(&mut Cores, &mut B, CpuId, u32) -> u32;

/// Lookup table of opcode handlers.
pub struct InstructionSet<B: Bus, const LUT_SIZE: usize> {
    lut: [OpcodeHandler<B>; LUT_SIZE],
}

impl<B: Bus, const LUT_SIZE: usize> InstructionSet<B, LUT_SIZE> {
    /// Create a table with every entry set to the given handler.
    pub fn filled(handler: OpcodeHandler<B>) -> Self {
        Self {
            lut: [handler; LUT_SIZE],
        }
    }

    /// Set the handler of an index.
    pub fn set(&mut self, index: usize, handler: OpcodeHandler<B>) {
        self.lut[index] = handler;
    }

    #[inline]
    pub fn handler(&self, index: usize) -> OpcodeHandler<B> {
        self.lut[index]
    }
}

/// ARM table, indexed by bits 27-20 and 7-4 of the opcode.
pub type ArmInstructionSet<B> = InstructionSet<B, 4096>;
/// THUMB table, indexed by bits 15-6 of the opcode.
pub type ThumbInstructionSet<B> = InstructionSet<B, 1024>;

/// Memory as seen by a processor.
/// Accesses never fail; bus errors are the implementor's business.
pub trait MemoryInterface {
    /// Fetch an ARM opcode.
    fn prefetch32(&mut self, addr: Address) -> u32;
    /// Fetch a THUMB opcode.
    fn prefetch16(&mut self, addr: Address) -> u16;

    fn read8(&mut self, addr: Address) -> u8;
    fn read16(&mut self, addr: Address) -> u16;
    fn read32(&mut self, addr: Address) -> u32;

    fn write8(&mut self, addr: Address, value: u8);
    fn write16(&mut self, addr: Address, value: u16);
    fn write32(&mut self, addr: Address, value: u32);
}

/// Shared handle to a memory interface.
/// Both processors may share one.
pub type MemoryRef = Rc<RefCell<dyn MemoryInterface>>;

/// Memory that reads as 0 and ignores writes.
/// Used until the system attaches its own.
#[derive(Debug, Default)]
pub struct UnmappedMemory;

impl MemoryInterface for UnmappedMemory {
    fn prefetch32(&mut self, _addr: Address) -> u32 {
        0
    }

    fn prefetch16(&mut self, _addr: Address) -> u16 {
        0
    }

    fn read8(&mut self, _addr: Address) -> u8 {
        0
    }

    fn read16(&mut self, _addr: Address) -> u16 {
        0
    }

    fn read32(&mut self, _addr: Address) -> u32 {
        0
    }

    fn write8(&mut self, _addr: Address, _value: u8) {}

    fn write16(&mut self, _addr: Address, _value: u16) {}

    fn write32(&mut self, _addr: Address, _value: u32) {}
}

pub(crate) fn unmapped() -> MemoryRef {
    Rc::new(RefCell::new(UnmappedMemory))
}
