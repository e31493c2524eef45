// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::numutil::NumExt;

use crate::{
    condition::{self, ALWAYS},
    interface::Bus,
    memory::Width,
    state::Flag,
    CpuId, Cores,
};

/// Index into the ARM opcode table: bits 27-20 and 7-4.
#[inline]
pub fn arm_index(opcode: u32) -> usize {
    (((opcode >> 16) & 0xFF0) | ((opcode >> 4) & 0xF)) as usize
}

/// Index into the THUMB opcode table: bits 15-6.
#[inline]
pub fn thumb_index(opcode: u32) -> usize {
    ((opcode >> 6) & 0x3FF) as usize
}

impl Cores {
    /// Execute the latched instruction of the given processor, then fetch
    /// the next one. Returns the cycles taken.
    pub fn exec<B: Bus>(&mut self, bus: &mut B, cpu: CpuId) -> u32 {
        let state = &self[cpu];
        let opcode = state.instruction;
        let retired = state.instruction_address;
        state.trace_instruction();

        let (execute, width) = if !state.is_flag(Flag::Thumb) {
            let cond = opcode.bits(28, 4);
            let execute =
                if cond == ALWAYS || condition::test_cond(cond, opcode.bits(25, 3), state.cpsr) {
                    let handler = bus.arm_instructions(cpu).handler(arm_index(opcode));
                    handler(self, bus, cpu, opcode)
                } else {
                    // Failed condition: 1S cycle
                    1
                };
            (execute, Width::Word)
        } else {
            let handler = bus.thumb_instructions(cpu).handler(thumb_index(opcode));
            (handler(self, bus, cpu, opcode), Width::Halfword)
        };

        let state = &mut self[cpu];
        let fetch = state.prefetch(bus);
        if let Some(hook) = state.post_exec.as_mut() {
            hook(retired, width);
        }
        bus.fetch_execute_cycles(cpu, execute, fetch)
    }

    /// Test the condition of an ARM opcode and run its handler if it
    /// passes, without touching the pipeline. Used by compiled code
    /// falling back to the interpreter; never call with THUMB opcodes.
    pub fn fast_exec<B: Bus>(&mut self, bus: &mut B, cpu: CpuId, opcode: u32) -> u32 {
        if condition::test_cond(opcode.bits(28, 4), opcode.bits(25, 3), self[cpu].cpsr) {
            let handler = bus.arm_instructions(cpu).handler(arm_index(opcode));
            return handler(self, bus, cpu, opcode);
        }
        1
    }

    /// Execute the latched ARM instruction without testing its
    /// condition, then fetch the next one.
    pub fn exec_arm_fast<B: Bus>(&mut self, bus: &mut B, cpu: CpuId) -> u32 {
        let opcode = self[cpu].instruction;
        let handler = bus.arm_instructions(cpu).handler(arm_index(opcode));
        let execute = handler(self, bus, cpu, opcode);
        let fetch = self[cpu].prefetch(bus);
        bus.fetch_execute_cycles(cpu, execute, fetch)
    }

    /// Execute the latched THUMB instruction, then fetch the next one.
    pub fn exec_thumb_fast<B: Bus>(&mut self, bus: &mut B, cpu: CpuId) -> u32 {
        let opcode = self[cpu].instruction;
        let handler = bus.thumb_instructions(cpu).handler(thumb_index(opcode));
        let execute = handler(self, bus, cpu, opcode);
        let fetch = self[cpu].prefetch(bus);
        bus.fetch_execute_cycles(cpu, execute, fetch)
    }
}
