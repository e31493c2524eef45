// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! The system as seen by the CPUs.
//! Note that when it comes to timing, the ARM9 runs on the scheduler until
//! the ARM7 is behind, which then runs outside the scheduler until the ARM9 is
//! behind. This is repeated in a loop.
//! Effectively, the ARM9 is the one handling the scheduling, with the ARM7
//! being dragged along.

use common::components::scheduler::Scheduler;
use dualcore::{
    interface::{
        merge_fetch_execute, ArmInstructionSet, Bus, OpcodeHandler, ThumbInstructionSet,
    },
    trap_undefined, Address, CpuId, Width,
};

use crate::{memory::Memory, scheduling::NdsEvent, CpuDevice};

/// Interrupt registers of one CPU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct InterruptLatch {
    pub ime: bool,
    pub ie: u32,
    pub if_: u32,
}

impl InterruptLatch {
    /// Is any enabled interrupt flagged? Ignores IME.
    pub fn any_flagged(&self) -> bool {
        (self.ie & self.if_) != 0
    }
}

/// Everything of the system the CPUs need while executing.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct NdsBus {
    #[cfg_attr(feature = "serde", serde(skip, default = "undefined_arm"))]
    arm: CpuDevice<Box<ArmInstructionSet<NdsBus>>>,
    #[cfg_attr(feature = "serde", serde(skip, default = "undefined_thumb"))]
    thumb: CpuDevice<Box<ThumbInstructionSet<NdsBus>>>,

    pub scheduler: Scheduler<NdsEvent>,
    pub intr: CpuDevice<InterruptLatch>,

    /// Set when a CPU changed state in a way that might unmask an
    /// interrupt.
    pub(crate) reschedule: bool,
    /// Cleared when a CPU hit an unrecoverable state.
    pub(crate) running: bool,
    /// Cleared by [NdsEvent::PauseEmulation].
    pub(crate) ticking: bool,
    pub(crate) account_code_fetch: bool,
}

impl NdsBus {
    /// Install the handler for an ARM opcode table index.
    pub fn set_arm_handler(&mut self, cpu: CpuId, index: usize, handler: OpcodeHandler<Self>) {
        self.arm[cpu.index()].set(index, handler);
    }

    /// Install the handler for a THUMB opcode table index.
    pub fn set_thumb_handler(&mut self, cpu: CpuId, index: usize, handler: OpcodeHandler<Self>) {
        self.thumb[cpu.index()].set(index, handler);
    }

    /// Take over opcode tables after a state load; they are not part of
    /// save states.
    #[cfg(feature = "serde")]
    pub(crate) fn restore_from(&mut self, old_self: Self) {
        self.arm = old_self.arm;
        self.thumb = old_self.thumb;
        self.account_code_fetch = old_self.account_code_fetch;
    }
}

impl Bus for NdsBus {
    fn arm_instructions(&self, cpu: CpuId) -> &ArmInstructionSet<Self> {
        &self.arm[cpu.index()]
    }

    fn thumb_instructions(&self, cpu: CpuId) -> &ThumbInstructionSet<Self> {
        &self.thumb[cpu.index()]
    }

    fn code_fetch_cycles(&mut self, _cpu: CpuId, addr: Address, width: Width) -> u32 {
        Memory::fetch_wait(addr, width)
    }

    fn fetch_execute_cycles(&self, cpu: CpuId, execute: u32, fetch: u32) -> u32 {
        if self.account_code_fetch {
            merge_fetch_execute(cpu, execute, fetch)
        } else {
            execute
        }
    }

    fn reschedule(&mut self) {
        self.reschedule = true;
    }

    fn halt(&mut self) {
        log::error!("Emulation halted");
        self.running = false;
    }
}

impl Default for NdsBus {
    fn default() -> Self {
        Self {
            arm: undefined_arm(),
            thumb: undefined_thumb(),
            scheduler: Scheduler::default(),
            intr: Default::default(),
            reschedule: false,
            running: true,
            ticking: false,
            account_code_fetch: true,
        }
    }
}

fn undefined_arm() -> CpuDevice<Box<ArmInstructionSet<NdsBus>>> {
    [
        Box::new(ArmInstructionSet::filled(trap_undefined::<NdsBus>)),
        Box::new(ArmInstructionSet::filled(trap_undefined::<NdsBus>)),
    ]
}

fn undefined_thumb() -> CpuDevice<Box<ThumbInstructionSet<NdsBus>>> {
    [
        Box::new(ThumbInstructionSet::filled(trap_undefined::<NdsBus>)),
        Box::new(ThumbInstructionSet::filled(trap_undefined::<NdsBus>)),
    ]
}
