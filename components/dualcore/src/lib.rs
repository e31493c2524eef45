// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Execution core for the two ARM processors of the NDS.
//! The ARM946E-S (ARMv5, "ARM9") has index 0, the ARM7TDMI (ARMv4, "ARM7")
//! has index 1.
//!
//! Instruction semantics are not part of this crate; the system provides
//! opcode tables through [interface::Bus], and this core handles everything
//! around them: register banking, the prefetch pipeline, exception entry and
//! dispatching to the tables.

#![no_std]

extern crate alloc;

pub mod condition;
pub mod control;
mod dispatch;
pub mod exceptions;
pub mod interface;
pub mod jit;
mod memory;
mod pipeline;
pub mod state;
#[cfg(test)]
mod testing;
pub mod trace;

use core::ops::{Index, IndexMut};

pub use control::{ControlInterface, ControlRef, PostExecHook, RegisterFileControl};
pub use dispatch::{arm_index, thumb_index};
pub use exceptions::{trap_undefined, Exception};
use interface::{Bus, MemoryRef};
pub use memory::{Address, Width};
pub use state::ProcessorState;

/// Fixed cost charged for a time slice of a stalled processor.
pub const STALLED_CYCLE_COUNT: u32 = 10;

/// Identifies one of the two processors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum CpuId {
    Arm9 = 0,
    Arm7 = 1,
}

impl CpuId {
    pub const BOTH: [CpuId; 2] = [CpuId::Arm9, CpuId::Arm7];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// If this processor implements ARMv5 behavior.
    #[inline]
    pub fn is_v5(self) -> bool {
        self == CpuId::Arm9
    }

    /// Number used in log output, '9' or '7'.
    pub fn name(self) -> char {
        match self {
            CpuId::Arm9 => '9',
            CpuId::Arm7 => '7',
        }
    }

    /// Exception vector base the processor is wired to on power-on.
    pub fn default_vector_base(self) -> u32 {
        match self {
            CpuId::Arm9 => 0xFFFF_0000,
            CpuId::Arm7 => 0,
        }
    }
}

/// Both processors of the system. Opcode handlers receive this to be
/// able to raise exceptions on the other processor.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Cores {
    cpus: [ProcessorState; 2],
}

impl Cores {
    /// Create both processors without any memory attached.
    /// They need a [Cores::reset] before running.
    pub fn new() -> Self {
        Self {
            cpus: [
                ProcessorState::new(CpuId::Arm9),
                ProcessorState::new(CpuId::Arm7),
            ],
        }
    }

    /// Create both processors with the given memory as their base memory
    /// interface.
    pub fn with_memory(memory: MemoryRef) -> Self {
        let mut cores = Self::new();
        for cpu in cores.cpus.iter_mut() {
            cpu.set_base_memory(memory.clone());
            cpu.reset_memory_to_base();
        }
        cores
    }

    /// Reset both processors to the given entry points and fill their
    /// pipelines.
    pub fn reset(&mut self, bus: &mut impl Bus, arm9_entry: u32, arm7_entry: u32) {
        self[CpuId::Arm9].reset(bus, arm9_entry);
        self[CpuId::Arm7].reset(bus, arm7_entry);
    }

    /// Resynchronize both pipelines with their latched instruction,
    /// after compiled code changed the processor state behind its back.
    pub fn jit_sync(&mut self, bus: &mut impl Bus) {
        for cpu in self.cpus.iter_mut() {
            cpu.next_instruction = cpu.instruction_address;
            cpu.prefetch(bus);
        }
    }

    /// Restore state after a savestate load. `old_self` should be the
    /// state before the state was loaded.
    pub fn restore_from(&mut self, old_self: Self) {
        let [arm9, arm7] = old_self.cpus;
        self[CpuId::Arm9].restore_from(arm9);
        self[CpuId::Arm7].restore_from(arm7);
    }
}

impl Default for Cores {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<CpuId> for Cores {
    type Output = ProcessorState;

    fn index(&self, index: CpuId) -> &Self::Output {
        &self.cpus[index.index()]
    }
}

impl IndexMut<CpuId> for Cores {
    fn index_mut(&mut self, index: CpuId) -> &mut Self::Output {
        &mut self.cpus[index.index()]
    }
}
