// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use alloc::{format, string::String};
use core::fmt::Write;

use crate::{
    condition,
    dispatch::{arm_index, thumb_index},
    state::{Flag, ProcessorState},
};

/// Render the opcode table index bits of an opcode in binary;
/// 10 bits for THUMB, 12 for ARM.
pub fn decode_instruction(thumb: bool, opcode: u32) -> String {
    if thumb {
        format!("{:010b}", thumb_index(opcode))
    } else {
        format!("{:012b}", arm_index(opcode))
    }
}

impl ProcessorState {
    /// Log the instruction about to be executed along with all registers.
    /// Only does work when trace logging is enabled.
    pub fn trace_instruction(&self) {
        if !log::log_enabled!(log::Level::Trace) {
            return;
        }

        if let Some(kind) = self.vector_entered() {
            log::trace!("ARM{}: entering {kind:?} handler", self.id.name());
        }

        let mut buf = String::with_capacity(160);
        for reg in self.registers.iter() {
            write!(buf, "{reg:08X} ").ok();
        }
        let inst = self.instruction;
        let cpsr = self.cpsr;
        if self.is_flag(Flag::Thumb) {
            log::trace!(
                "{}{buf}cpsr: {cpsr:08X} |     {inst:04X}: {}",
                self.id.name(),
                decode_instruction(true, inst)
            );
        } else {
            log::trace!(
                "{}{buf}cpsr: {cpsr:08X} | {inst:08X}: {}{}",
                self.id.name(),
                decode_instruction(false, inst),
                condition::mnemonic(inst >> 28)
            );
        }
    }
}
