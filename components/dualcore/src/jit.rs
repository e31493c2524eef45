// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Integration points for a recompiler. The recompiler itself is up to the
//! system; this core only looks up and runs its blocks.

use hashbrown::HashMap;

use crate::{interface::Bus, memory::Address, CpuId, Cores};

/// A compiled block of code. Returns the cycles it took to run.
pub type CompiledBlock<B> = fn(&mut Cores, &mut B, CpuId) -> u32;

/// Compiled blocks of both processors, keyed by their aligned start
/// address.
pub struct BlockCache<B: Bus> {
    blocks: [HashMap<u32, CompiledBlock<B>>; 2],
}

impl<B: Bus> BlockCache<B> {
    pub fn get(&self, cpu: CpuId, addr: Address) -> Option<CompiledBlock<B>> {
        self.blocks[cpu.index()].get(&addr.0).copied()
    }

    pub fn insert(&mut self, cpu: CpuId, addr: Address, block: CompiledBlock<B>) {
        self.blocks[cpu.index()].insert(addr.0, block);
    }

    /// Drop the block starting at the given address, for example after
    /// the code there was overwritten.
    pub fn invalidate(&mut self, cpu: CpuId, addr: Address) {
        self.blocks[cpu.index()].remove(&addr.0);
    }

    pub fn clear(&mut self) {
        for blocks in self.blocks.iter_mut() {
            blocks.clear();
        }
    }

    pub fn len(&self, cpu: CpuId) -> usize {
        self.blocks[cpu.index()].len()
    }
}

impl<B: Bus> Default for BlockCache<B> {
    fn default() -> Self {
        Self {
            blocks: [HashMap::new(), HashMap::new()],
        }
    }
}

/// A recompiler that can produce blocks for the given system.
pub trait Recompiler<B: Bus> {
    /// Block for the given address, if one was compiled already.
    fn lookup(&self, cpu: CpuId, addr: Address) -> Option<CompiledBlock<B>>;
    /// Compile a block at the processor's current instruction and run it.
    /// Returns the cycles it took to run.
    fn compile(&mut self, cores: &mut Cores, bus: &mut B, cpu: CpuId) -> u32;
}

impl Cores {
    /// Run the compiled block at the latched instruction, compiling it
    /// first if necessary.
    pub fn exec_jit<B: Bus>(
        &mut self,
        bus: &mut B,
        jit: &mut impl Recompiler<B>,
        cpu: CpuId,
    ) -> u32 {
        let state = &mut self[cpu];
        state.instruction_address = state.instruction_address.align(state.instruction_size());
        match jit.lookup(cpu, state.instruction_address) {
            Some(block) => block(self, bus, cpu),
            None => jit.compile(self, bus, cpu),
        }
    }
}
