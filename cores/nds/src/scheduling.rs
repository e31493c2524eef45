// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use common::{components::scheduler::Kind, Time};
use dualcore::CpuId;
use NdsEvent::*;

use crate::Nds;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum NdsEvent {
    /// Stop [Nds::run_for].
    #[default]
    PauseEmulation,
    /// Flag an interrupt on one of the CPUs, like a timer or IPC would.
    RaiseInterrupt { is_arm9: bool, flag: u32 },
}

impl NdsEvent {
    pub fn dispatch(self, ds: &mut Nds, late_by: Time) {
        match self {
            PauseEmulation => ds.bus.ticking = false,
            RaiseInterrupt { is_arm9, flag } => {
                if late_by > 0 {
                    log::trace!("Interrupt 0x{flag:X} raised {late_by} cycles late");
                }
                let cpu = if is_arm9 { CpuId::Arm9 } else { CpuId::Arm7 };
                ds.set_if(cpu, flag);
            }
        }
    }
}

impl Kind for NdsEvent {}
