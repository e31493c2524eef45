// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use crate::{
    interface::Bus,
    memory::{Address, Width},
    state::{Flag, ProcessorState},
    CpuId,
};

impl ProcessorState {
    /// Latch the instruction at `next_instruction` and advance.
    /// Returns the cycles the fetch took.
    pub fn prefetch(&mut self, bus: &mut impl Bus) -> u32 {
        if !self.is_flag(Flag::Thumb) {
            // Do not mask down to 0x0FFFFFFC, high addresses mirror.
            let addr = self.next_instruction.align(4);
            self.instruction_address = addr;
            self.next_instruction = addr + Address::WORD;
            // R15 has to be up to date before the read, since the BIOS
            // protection looks at it.
            self.registers[15] = addr.0.wrapping_add(8);
            let inst = self.memory_ref().borrow_mut().prefetch32(addr);
            self.instruction = inst;
            return bus.code_fetch_cycles(self.id, addr, Width::Word);
        }

        let previous = self.instruction_address;
        let addr = self.next_instruction.align(2);
        self.instruction_address = addr;
        self.next_instruction = addr + Address::HW;
        self.registers[15] = addr.0.wrapping_add(4);
        let inst = self.memory_ref().borrow_mut().prefetch16(addr);
        self.instruction = inst as u32;

        match self.id {
            // The ARM9 fetches 2 THUMB instructions at a time; the second
            // half of a word is free.
            CpuId::Arm9 if addr == previous + Address::HW && addr.0 & 2 != 0 => 0,
            CpuId::Arm9 => bus.code_fetch_cycles(self.id, addr, Width::Word),
            CpuId::Arm7 => bus.code_fetch_cycles(self.id, addr, Width::Halfword),
        }
    }
}
