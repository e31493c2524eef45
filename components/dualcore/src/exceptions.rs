// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::{
    interface::Bus,
    memory::Address,
    state::{
        Flag::{IrqDisable, Thumb},
        Mode, ProcessorState,
    },
    trace::decode_instruction,
    CpuId, Cores,
};

/// Possible exceptions, in vector table order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Exception {
    Reset,
    Undefined,
    Swi,
    PrefetchAbort,
    DataAbort,
    /// Unused slot of the vector table. Ending up here means emulation
    /// went wrong; it halts the system.
    Reserved,
    Irq,
    Fiq,
}

impl Exception {
    /// Offset of this exception's handler from the vector base.
    pub fn vector(self) -> u32 {
        self as u32 * 4
    }

    /// Exception at the given offset from the vector base.
    pub fn from_vector(offset: u32) -> Option<Self> {
        if offset % 4 != 0 {
            return None;
        }
        Self::from_u32(offset / 4)
    }

    /// Mode to execute the exception in.
    pub fn mode(self) -> Option<Mode> {
        const MODE: [Option<Mode>; 8] = [
            Some(Mode::Supervisor),
            Some(Mode::Undefined),
            Some(Mode::Supervisor),
            Some(Mode::Abort),
            Some(Mode::Abort),
            None,
            Some(Mode::Irq),
            Some(Mode::Fiq),
        ];
        MODE[self as usize]
    }
}

impl ProcessorState {
    /// An exception occurred, jump to the handler and deal with it.
    /// The link register receives the next instruction to be fetched, not
    /// the one that raised the exception. The pipeline is not refilled;
    /// the dispatch after the raising opcode fetches the handler.
    pub fn exception(&mut self, bus: &mut impl Bus, kind: Exception) {
        let Some(mode) = kind.mode() else {
            log::error!(
                "ARM{}: jumped to reserved exception vector at {}, halting",
                self.id.name(),
                self.instruction_address
            );
            bus.halt();
            return;
        };
        if !matches!(kind, Exception::Undefined | Exception::Swi | Exception::Irq) {
            log::warn!(
                "ARM{}: {kind:?} exception at {}",
                self.id.name(),
                self.instruction_address
            );
        }

        let cpsr = self.cpsr;
        self.switch_mode(bus, mode.bits());
        self.registers[14] = self.next_instruction.0;
        self.spsr = cpsr;
        self.set_flag(Thumb, false);
        self.set_flag(IrqDisable, true);
        self.changed_cpsr(bus);

        self.registers[15] = self.vector_base.wrapping_add(kind.vector());
        self.next_instruction = Address(self.registers[15]);
    }

    /// Deliver an IRQ. Unlike [Self::exception], the pipeline is refilled
    /// right away, so the handler's first instruction is ready for the
    /// next dispatch.
    pub fn irq_exception(&mut self, bus: &mut impl Bus) -> bool {
        let cpsr = self.cpsr;
        self.switch_mode(bus, Mode::Irq.bits());
        self.registers[14] = self.instruction_address.0.wrapping_add(4);
        self.spsr = cpsr;
        self.set_flag(Thumb, false);
        self.set_flag(IrqDisable, true);
        self.changed_cpsr(bus);

        self.next_instruction = Address(self.vector_base.wrapping_add(Exception::Irq.vector()));
        self.waiting_for_irq = false;
        self.prefetch(bus);
        true
    }

    /// Halt until an interrupt is flagged.
    /// Returns the cycles this took.
    pub fn wait_for_irq(&mut self) -> u32 {
        self.waiting_for_irq = true;
        self.halt_ie_and_if = true;
        1
    }

    /// The exception whose handler starts at the latched instruction, if
    /// the processor is at one of its vectors.
    pub fn vector_entered(&self) -> Option<Exception> {
        let offset = self.instruction_address.0.wrapping_sub(self.vector_base);
        Exception::from_vector(offset)
    }
}

/// Handler for opcodes that are undefined.
/// Depending on which processor owns which vector table, the undefined
/// instruction exception gets raised on the ARM9, or not at all.
pub fn trap_undefined<B: Bus>(cores: &mut Cores, bus: &mut B, cpu: CpuId, opcode: u32) -> u32 {
    let state = &cores[cpu];
    log::info!(
        "ARM{}: Undefined instruction: 0x{opcode:08X} ({}) PC=0x{:08X}",
        cpu.name(),
        decode_instruction(false, opcode),
        state.instruction_address.0
    );

    if (state.vector_base != 0) ^ cpu.is_v5() {
        cores[CpuId::Arm9].exception(bus, Exception::Undefined);
    }
    4
}
