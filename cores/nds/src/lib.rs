// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! A minimal NDS: both processors, the memory they run from and the
//! interrupt latches, driven by a scheduler.

mod cpu;
mod memory;
mod scheduling;
#[cfg(test)]
mod tests;

use std::{cell::RefCell, mem, rc::Rc};

use common::{
    components::scheduler::{Scheduler, SchedulerFull},
    options::SystemConfig,
    Time,
};
#[cfg(feature = "serde")]
use common::serialize::{self, StateError};
pub use cpu::{InterruptLatch, NdsBus};
use dualcore::{state::Flag, Address, CpuId, Cores, Width, STALLED_CYCLE_COUNT};
pub use memory::{Memory, MemoryView};
pub use scheduling::NdsEvent;

/// One value for each of the CPUs, indexed by [CpuId::index].
pub type CpuDevice<T> = [T; 2];

#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Nds {
    pub cores: Cores,
    pub bus: NdsBus,
    memory: Rc<RefCell<Memory>>,
    /// ARM7 time in ARM9 cycles.
    time_7: Time,

    #[cfg_attr(feature = "serde", serde(skip, default))]
    pub config: SystemConfig,
}

impl Nds {
    pub fn new(config: &SystemConfig) -> Self {
        let mut nds = Self {
            cores: Cores::new(),
            bus: NdsBus::default(),
            memory: Rc::new(RefCell::new(Memory::default())),
            time_7: 0,
            config: config.clone(),
        };
        nds.init_memory();
        nds.reset();
        nds
    }

    /// Give each CPU its own view of memory.
    fn init_memory(&mut self) {
        for cpu in CpuId::BOTH {
            let view = MemoryView::new(cpu, self.memory.clone());
            self.cores[cpu].set_base_memory(Rc::new(RefCell::new(view)));
            self.cores[cpu].reset_memory_to_base();
        }
    }

    /// Reset both CPUs to their entry points. Memory is kept.
    pub fn reset(&mut self) {
        self.bus.scheduler = Scheduler::default();
        self.bus.intr = Default::default();
        self.bus.running = true;
        self.bus.ticking = false;
        self.bus.account_code_fetch = self.config.account_code_fetch_cycles;
        self.time_7 = 0;
        self.cores
            .reset(&mut self.bus, self.config.arm9_entry, self.config.arm7_entry);
        self.bus.reschedule = false;
    }

    /// Run for the given amount of ARM9 cycles. Might run a few more.
    /// Does not run at all when the scheduler has no room to pause
    /// emulation afterwards.
    pub fn run_for(&mut self, cycles: Time) -> Result<(), SchedulerFull> {
        if !self.bus.running {
            return Ok(());
        }

        self.bus
            .scheduler
            .schedule(NdsEvent::PauseEmulation, cycles)?;
        self.bus.ticking = true;
        while self.bus.running && self.bus.ticking {
            self.advance();
        }
        // Halted before the pause event fired
        self.bus.scheduler.cancel(NdsEvent::PauseEmulation);
        Ok(())
    }

    /// Run an instruction on the ARM9, then keep running the ARM7
    /// until it has caught up.
    pub fn advance(&mut self) {
        if mem::take(&mut self.bus.reschedule) {
            self.check_interrupts();
        }

        let cycles = self.step(CpuId::Arm9);
        self.bus.scheduler.advance(cycles as Time);
        while let Some(event) = self.bus.scheduler.get_next_pending() {
            event.kind.dispatch(self, event.late_by);
        }

        while self.bus.running && self.time_7 < self.bus.scheduler.now() {
            if mem::take(&mut self.bus.reschedule) {
                self.check_interrupts();
            }
            let cycles = self.step(CpuId::Arm7);
            self.time_7 += (cycles as Time) << 1;
        }
    }

    /// Give one time slice to the given CPU. Returns the cycles it took,
    /// in that CPU's clock.
    fn step(&mut self, cpu: CpuId) -> u32 {
        let state = &self.cores[cpu];
        if state.is_stalled() {
            STALLED_CYCLE_COUNT
        } else if state.is_waiting_for_irq() {
            self.idle_cycles(cpu)
        } else {
            self.cores.exec(&mut self.bus, cpu)
        }
    }

    /// Cycles a CPU waiting for an interrupt can skip: until the next
    /// event for the ARM9, until the ARM9 for the ARM7.
    fn idle_cycles(&self, cpu: CpuId) -> u32 {
        let skip = match cpu {
            CpuId::Arm9 => self.bus.scheduler.next_event_in().unwrap_or(1),
            CpuId::Arm7 => (self.bus.scheduler.now() - self.time_7 + 1) >> 1,
        };
        u32::try_from(skip).unwrap_or(u32::MAX).max(1)
    }

    /// Wake CPUs and deliver interrupts that are now unmasked.
    fn check_interrupts(&mut self) {
        for cpu in CpuId::BOTH {
            let latch = &self.bus.intr[cpu.index()];
            if !latch.any_flagged() {
                continue;
            }
            let ime = latch.ime;

            let state = &mut self.cores[cpu];
            if state.halt_ie_and_if() {
                state.wake();
            }
            if ime && !state.is_flag(Flag::IrqDisable) {
                log::trace!("ARM{}: Delivering IRQ", cpu.name());
                state.irq_exception(&mut self.bus);
            }
        }
    }

    /// Flag interrupts on a CPU.
    pub fn set_if(&mut self, cpu: CpuId, flag: u32) {
        self.bus.intr[cpu.index()].if_ |= flag;
        self.bus.reschedule = true;
    }

    /// Acknowledge interrupts on a CPU, clearing their flags.
    pub fn acknowledge(&mut self, cpu: CpuId, flag: u32) {
        self.bus.intr[cpu.index()].if_ &= !flag;
    }

    pub fn set_ime(&mut self, cpu: CpuId, ime: bool) {
        self.bus.intr[cpu.index()].ime = ime;
        self.bus.reschedule = true;
    }

    pub fn set_ie(&mut self, cpu: CpuId, ie: u32) {
        self.bus.intr[cpu.index()].ie = ie;
        self.bus.reschedule = true;
    }

    /// Flag interrupts on a CPU after the given amount of ARM9 cycles.
    pub fn schedule_interrupt(
        &mut self,
        cpu: CpuId,
        flag: u32,
        after: Time,
    ) -> Result<(), SchedulerFull> {
        let is_arm9 = cpu == CpuId::Arm9;
        self.bus
            .scheduler
            .schedule(NdsEvent::RaiseInterrupt { is_arm9, flag }, after)
    }

    /// If emulation was not halted by a CPU.
    pub fn is_running(&self) -> bool {
        self.bus.running
    }

    /// ARM7 time, in ARM9 cycles.
    pub fn time_7(&self) -> Time {
        self.time_7
    }

    /// Copy data into memory, as seen by the given CPU.
    pub fn load(&mut self, cpu: CpuId, addr: u32, data: &[u8]) {
        self.memory.borrow_mut().load(cpu, Address(addr), data);
    }

    pub fn read32(&self, cpu: CpuId, addr: u32) -> u32 {
        self.memory.borrow_mut().get(cpu, Address(addr), Width::Word)
    }

    pub fn write32(&mut self, cpu: CpuId, addr: u32, value: u32) {
        self.memory
            .borrow_mut()
            .set(cpu, Address(addr), Width::Word, value);
    }

    #[cfg(feature = "serde")]
    pub fn save_state(&self) -> Result<Vec<u8>, StateError> {
        serialize::serialize(self, self.config.compress_savestates)
    }

    /// Load a state made by [Self::save_state]. On error, the system is
    /// left unchanged.
    #[cfg(feature = "serde")]
    pub fn load_state(&mut self, state: &[u8]) -> Result<(), StateError> {
        let loaded: Nds = serialize::deserialize(state, self.config.compress_savestates)?;
        let old_self = mem::replace(self, loaded);
        self.restore_from(old_self);
        Ok(())
    }

    /// Restore state after a savestate load. `old_self` should be the
    /// system state before the state was loaded.
    #[cfg(feature = "serde")]
    fn restore_from(&mut self, old_self: Self) {
        // The CPUs' memory views point at the old memory; keep it and
        // move the loaded contents in.
        let loaded = mem::replace(&mut self.memory, old_self.memory);
        mem::swap(&mut *self.memory.borrow_mut(), &mut *loaded.borrow_mut());

        self.cores.restore_from(old_self.cores);
        self.bus.restore_from(old_self.bus);
        self.config = old_self.config;
    }
}

impl Default for Nds {
    fn default() -> Self {
        Self::new(&SystemConfig::default())
    }
}
