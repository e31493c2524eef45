// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Interface for debuggers and scripting to inspect and steer a processor.

use alloc::{boxed::Box, rc::Rc};
use core::cell::RefCell;

use crate::{
    memory::{Address, Width},
    state::ProcessorState,
};

/// Callback run after every dispatched instruction with the address and
/// width of the instruction that just retired.
pub type PostExecHook = Box<dyn FnMut(Address, Width)>;

/// Register number used to access CPSR.
pub const CPSR_REGISTER: u32 = 16;

/// Capabilities a debugger can use on a processor, independent of the
/// emulated architecture.
/// Implementations wrapping [RegisterFileControl] must call it directly;
/// going through the processor's methods again would re-borrow the
/// interface.
pub trait ControlInterface {
    /// Stop the processor from committing fetched state.
    fn stall(&mut self, cpu: &mut ProcessorState);
    fn unstall(&mut self, cpu: &mut ProcessorState);

    /// Read a register. 0-14 are general purpose registers, 15 is the
    /// address of the executing instruction and 16 is CPSR.
    /// Unknown registers read as 0.
    fn read_register(&self, cpu: &ProcessorState, reg: u32) -> u32;
    /// Write a register. Writing 15 redirects the next fetch;
    /// CPSR is read-only here.
    fn write_register(&mut self, cpu: &mut ProcessorState, reg: u32, value: u32);

    /// Install the post-execution hook, replacing any previous one.
    fn install_post_exec(&mut self, cpu: &mut ProcessorState, hook: PostExecHook);
    fn remove_post_exec(&mut self, cpu: &mut ProcessorState);
}

/// Shared handle to a control interface.
pub type ControlRef = Rc<RefCell<dyn ControlInterface>>;

/// Control interface working directly on the register file.
/// Every processor starts out with this one.
#[derive(Debug, Default)]
pub struct RegisterFileControl;

impl ControlInterface for RegisterFileControl {
    fn stall(&mut self, cpu: &mut ProcessorState) {
        cpu.stalled = true;
    }

    fn unstall(&mut self, cpu: &mut ProcessorState) {
        cpu.stalled = false;
    }

    fn read_register(&self, cpu: &ProcessorState, reg: u32) -> u32 {
        match reg {
            0..=14 => cpu.registers[reg as usize],
            15 => cpu.instruction_address.0,
            CPSR_REGISTER => cpu.cpsr,
            _ => 0,
        }
    }

    fn write_register(&mut self, cpu: &mut ProcessorState, reg: u32, value: u32) {
        match reg {
            0..=14 => cpu.registers[reg as usize] = value,
            15 => cpu.next_instruction = Address(value),
            _ => log::debug!(
                "ARM{}: ignoring write of 0x{value:08X} to register {reg}",
                cpu.id.name()
            ),
        }
    }

    fn install_post_exec(&mut self, cpu: &mut ProcessorState, hook: PostExecHook) {
        cpu.post_exec = Some(hook);
    }

    fn remove_post_exec(&mut self, cpu: &mut ProcessorState) {
        cpu.post_exec = None;
    }
}

pub(crate) fn register_file() -> ControlRef {
    Rc::new(RefCell::new(RegisterFileControl))
}

impl ProcessorState {
    /// Control interface currently in use.
    pub fn control(&self) -> ControlRef {
        self.control.clone()
    }

    /// Swap the control interface, for example to put a debugger in
    /// between.
    pub fn set_control(&mut self, control: ControlRef) {
        self.control = control;
    }

    /// Go back to the control interface working on the register file.
    pub fn reset_control(&mut self) {
        self.control = register_file();
    }

    pub fn stall(&mut self) {
        let control = self.control.clone();
        control.borrow_mut().stall(self);
    }

    pub fn unstall(&mut self) {
        let control = self.control.clone();
        control.borrow_mut().unstall(self);
    }

    pub fn read_register(&self, reg: u32) -> u32 {
        self.control.borrow().read_register(self, reg)
    }

    pub fn write_register(&mut self, reg: u32, value: u32) {
        let control = self.control.clone();
        control.borrow_mut().write_register(self, reg, value);
    }

    pub fn install_post_exec(&mut self, hook: PostExecHook) {
        let control = self.control.clone();
        control.borrow_mut().install_post_exec(self, hook);
    }

    pub fn remove_post_exec(&mut self) {
        let control = self.control.clone();
        control.borrow_mut().remove_post_exec(self);
    }
}
