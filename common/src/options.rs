// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

/// Configuration used when initializing the system.
/// These options don't change at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_config", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde_config", serde(default))]
pub struct SystemConfig {
    /// Address the ARM9 starts executing at after reset.
    /// Bit 0 selects THUMB mode.
    pub arm9_entry: u32,
    /// Address the ARM7 starts executing at after reset.
    /// Bit 0 selects THUMB mode.
    pub arm7_entry: u32,
    /// If code fetch cycles should be taken into account when merging
    /// them with execution cycles. When false, only execution time counts.
    pub account_code_fetch_cycles: bool,
    /// If save states should be compressed.
    pub compress_savestates: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            arm9_entry: 0xFFFF_0000,
            arm7_entry: 0x0000_0000,
            account_code_fetch_cycles: true,
            compress_savestates: false,
        }
    }
}
