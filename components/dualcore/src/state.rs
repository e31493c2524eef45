// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use bitmatch::bitmatch;
use common::numutil::NumExt;

use crate::{
    control::{self, ControlRef, PostExecHook},
    interface::{self, Bus, MemoryRef},
    memory::Address,
    CpuId,
};

/// A register with different values for the different CPU modes.
/// Indexed by [Mode::bank]; User and System share index 0.
type ModeReg = [u32; 6];

/// Full state of one processor.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ProcessorState {
    pub(crate) id: CpuId,

    // Registers
    pub registers: [u32; 16],
    pub(crate) cpsr: u32,
    pub(crate) spsr: u32,
    banked_sp: ModeReg,
    banked_lr: ModeReg,
    banked_spsr: ModeReg,
    fiq_bank: [u32; 5],

    // Pipeline
    pub(crate) instruction_address: Address,
    pub(crate) instruction: u32,
    pub(crate) next_instruction: Address,

    // Execution gating
    pub(crate) stalled: bool,
    pub(crate) waiting_for_irq: bool,
    pub(crate) halt_ie_and_if: bool,

    pub(crate) vector_base: u32,

    #[cfg_attr(feature = "serde", serde(skip, default = "interface::unmapped"))]
    base_memory: MemoryRef,
    #[cfg_attr(feature = "serde", serde(skip, default = "interface::unmapped"))]
    memory: MemoryRef,
    #[cfg_attr(feature = "serde", serde(skip, default = "control::register_file"))]
    pub(crate) control: ControlRef,
    #[cfg_attr(feature = "serde", serde(skip, default))]
    pub(crate) post_exec: Option<PostExecHook>,
}

impl ProcessorState {
    /// Create a processor in System mode with all registers cleared.
    /// Memory reads as 0 until an interface is attached.
    pub fn new(id: CpuId) -> Self {
        let memory = interface::unmapped();
        Self {
            id,
            registers: [0; 16],
            cpsr: Mode::System.bits(),
            spsr: Mode::System.bits(),
            banked_sp: [0; 6],
            banked_lr: [0; 6],
            banked_spsr: [0; 6],
            fiq_bank: [0; 5],
            instruction_address: Address(0),
            instruction: 0,
            next_instruction: Address(0),
            stalled: false,
            waiting_for_irq: false,
            halt_ie_and_if: false,
            vector_base: id.default_vector_base(),
            base_memory: memory.clone(),
            memory,
            control: control::register_file(),
            post_exec: None,
        }
    }

    /// Reset the processor and start executing at `entry`.
    /// Bit 0 of the entry point selects THUMB mode.
    /// Memory interfaces and the post-execution hook are kept.
    pub fn reset(&mut self, bus: &mut impl Bus, entry: u32) {
        self.vector_base = self.id.default_vector_base();
        self.waiting_for_irq = false;
        self.halt_ie_and_if = false;

        self.registers = [0; 16];
        self.cpsr = Mode::System.bits();
        self.spsr = Mode::System.bits();
        self.banked_sp = [0; 6];
        self.banked_lr = [0; 6];
        self.banked_spsr = [0; 6];
        self.fiq_bank = [0; 5];

        self.instruction_address = Address(0);
        self.instruction = 0;
        self.next_instruction = Address(entry & !1);
        self.set_flag(Flag::Thumb, entry.is_bit(0));
        self.prefetch(bus);
    }

    /// Restore state after a savestate load, taking over the handles that
    /// are not part of the state.
    pub fn restore_from(&mut self, old_self: Self) {
        self.base_memory = old_self.base_memory;
        self.memory = old_self.memory;
        self.control = old_self.control;
        self.post_exec = old_self.post_exec;
    }

    #[inline]
    pub fn id(&self) -> CpuId {
        self.id
    }

    #[inline]
    pub fn is_v5(&self) -> bool {
        self.id.is_v5()
    }

    #[inline]
    pub fn sp(&self) -> u32 {
        self.registers[13]
    }

    #[inline]
    pub fn lr(&self) -> u32 {
        self.registers[14]
    }

    /// PC as seen by executing instructions; 2 instructions ahead of the
    /// one being executed.
    #[inline]
    pub fn pc(&self) -> u32 {
        self.registers[15]
    }

    #[inline]
    pub fn cpsr(&self) -> u32 {
        self.cpsr
    }

    #[inline]
    pub fn spsr(&self) -> u32 {
        self.spsr
    }

    /// Set CPSR without any mode switching. Only flags should change
    /// through this; use [Self::switch_mode] for mode changes.
    #[inline]
    pub fn set_cpsr_flags(&mut self, value: u32) {
        self.cpsr = (value & !0x1F) | (self.cpsr & 0x1F);
    }

    #[inline]
    pub fn set_spsr(&mut self, value: u32) {
        self.spsr = value;
    }

    #[inline]
    pub fn is_flag(&self, flag: Flag) -> bool {
        self.cpsr.is_bit(flag as u16)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: Flag, en: bool) {
        self.cpsr = self.cpsr.set_bit(flag as u16, en);
    }

    /// Get the current CPU mode, if the mode bits are valid.
    pub fn mode(&self) -> Option<Mode> {
        Mode::from_bits(self.cpsr & 0x1F)
    }

    /// Address of the instruction currently being executed.
    #[inline]
    pub fn instruction_address(&self) -> Address {
        self.instruction_address
    }

    /// Opcode currently being executed.
    #[inline]
    pub fn instruction(&self) -> u32 {
        self.instruction
    }

    /// Address the next prefetch will read from.
    #[inline]
    pub fn next_instruction(&self) -> Address {
        self.next_instruction
    }

    /// Redirect execution. Takes effect on the next prefetch.
    #[inline]
    pub fn set_next_instruction(&mut self, addr: Address) {
        self.next_instruction = addr;
    }

    #[inline]
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    #[inline]
    pub fn is_waiting_for_irq(&self) -> bool {
        self.waiting_for_irq
    }

    /// If the processor should wake up once any enabled interrupt is
    /// flagged, regardless of IME.
    #[inline]
    pub fn halt_ie_and_if(&self) -> bool {
        self.halt_ie_and_if
    }

    /// Wake up from waiting for an interrupt.
    pub fn wake(&mut self) {
        self.waiting_for_irq = false;
        self.halt_ie_and_if = false;
    }

    #[inline]
    pub fn vector_base(&self) -> u32 {
        self.vector_base
    }

    /// Set the exception vector base, which CP15 can move on the ARM9.
    #[inline]
    pub fn set_vector_base(&mut self, base: u32) {
        self.vector_base = base;
    }

    /// 4 on ARM, 2 on THUMB
    #[inline]
    pub fn instruction_size(&self) -> u32 {
        4 - ((self.is_flag(Flag::Thumb) as u32) << 1)
    }

    /// Switch to the given mode, banking the registers of the current one.
    /// Returns the mode bits that were active before.
    /// An unknown target mode leaves all registers alone, but the mode
    /// bits are still committed.
    pub fn switch_mode(&mut self, bus: &mut impl Bus, mode: u32) -> u32 {
        let old = self.cpsr & 0x1F;

        match Mode::from_bits(old) {
            Some(Mode::Fiq) => {
                self.swap_fiq_bank();
                self.store_bank(Mode::Fiq);
            }
            Some(outgoing) => self.store_bank(outgoing),
            None => (),
        }

        match Mode::from_bits(mode) {
            Some(Mode::Fiq) => {
                self.swap_fiq_bank();
                self.load_bank(Mode::Fiq);
            }
            Some(incoming) => self.load_bank(incoming),
            None => log::trace!(
                "ARM{}: switch to unknown mode 0x{mode:02X}",
                self.id.name()
            ),
        }

        log::trace!(
            "ARM{}: mode 0x{old:02X} -> 0x{:02X}",
            self.id.name(),
            mode & 0x1F
        );
        self.cpsr = (self.cpsr & !0x1F) | (mode & 0x1F);
        self.changed_cpsr(bus);
        old
    }

    /// Call this whenever CPSR changed in a way other than the condition
    /// flags or THUMB bit; interrupts may need to be unleashed.
    #[inline]
    pub fn changed_cpsr(&mut self, bus: &mut impl Bus) {
        bus.reschedule();
    }

    fn swap_fiq_bank(&mut self) {
        for (reg, banked) in self.registers[8..13].iter_mut().zip(self.fiq_bank.iter_mut()) {
            core::mem::swap(reg, banked);
        }
    }

    fn store_bank(&mut self, mode: Mode) {
        let bank = mode.bank();
        self.banked_sp[bank] = self.registers[13];
        self.banked_lr[bank] = self.registers[14];
        if mode.has_spsr() {
            self.banked_spsr[bank] = self.spsr;
        }
    }

    fn load_bank(&mut self, mode: Mode) {
        let bank = mode.bank();
        self.registers[13] = self.banked_sp[bank];
        self.registers[14] = self.banked_lr[bank];
        if mode.has_spsr() {
            self.spsr = self.banked_spsr[bank];
        }
    }

    /// Memory interface currently in use.
    pub fn memory(&self) -> MemoryRef {
        self.memory.clone()
    }

    /// Swap the memory interface in use, for example to intercept
    /// accesses.
    pub fn set_memory(&mut self, memory: MemoryRef) {
        self.memory = memory;
    }

    pub fn base_memory(&self) -> MemoryRef {
        self.base_memory.clone()
    }

    pub fn set_base_memory(&mut self, memory: MemoryRef) {
        self.base_memory = memory;
    }

    /// Go back to using the base memory interface.
    pub fn reset_memory_to_base(&mut self) {
        self.memory = self.base_memory.clone();
    }

    pub(crate) fn memory_ref(&self) -> &MemoryRef {
        &self.memory
    }
}

/// Execution context of the CPU.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Mode {
    User,
    Fiq,
    Supervisor,
    Abort,
    Irq,
    Undefined,
    System,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::User,
        Mode::Fiq,
        Mode::Supervisor,
        Mode::Abort,
        Mode::Irq,
        Mode::Undefined,
        Mode::System,
    ];

    /// Decode the mode bits of CPSR.
    #[bitmatch]
    pub fn from_bits(bits: u32) -> Option<Self> {
        if bits > 0x1F {
            return None;
        }
        #[bitmatch]
        match bits {
            "10000" => Some(Self::User),
            "10001" => Some(Self::Fiq),
            "10010" => Some(Self::Irq),
            "10011" => Some(Self::Supervisor),
            "10111" => Some(Self::Abort),
            "11011" => Some(Self::Undefined),
            "11111" => Some(Self::System),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::User => 0b10000,
            Self::Fiq => 0b10001,
            Self::Irq => 0b10010,
            Self::Supervisor => 0b10011,
            Self::Abort => 0b10111,
            Self::Undefined => 0b11011,
            Self::System => 0b11111,
        }
    }

    /// Index into banked registers; User and System share a bank.
    fn bank(self) -> usize {
        match self {
            Self::System => 0,
            mode => mode as usize,
        }
    }

    fn has_spsr(self) -> bool {
        !matches!(self, Self::User | Self::System)
    }
}

/// Flags inside CPSR.
#[derive(Debug, Copy, Clone)]
pub enum Flag {
    Neg = 31,
    Zero = 30,
    Carry = 29,
    Overflow = 28,
    QClamped = 27,
    IrqDisable = 7,
    FiqDisable = 6,
    Thumb = 5,
}
