// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::{
    fmt::Display,
    ops::{Add, AddAssign, Sub},
};

use common::numutil::NumExt;

/// An address on one of the processor buses.
/// Arithmetic wraps; the NDS happily runs code at 0xF******* addresses.
#[derive(Default, Debug, Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Address(pub u32);

impl Address {
    pub const HW: Address = Address(2);
    pub const WORD: Address = Address(4);

    /// Clear the low bits so the address is a multiple of `to`.
    pub fn align(self, to: u32) -> Address {
        Address(self.0.align_down(to))
    }
}

impl Add for Address {
    type Output = Address;

    fn add(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_add(rhs.0))
    }
}

impl Sub for Address {
    type Output = Address;

    fn sub(self, rhs: Self) -> Self::Output {
        Address(self.0.wrapping_sub(rhs.0))
    }
}

impl AddAssign for Address {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "$0x{:08X}", self.0)
    }
}

/// Width of a memory access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Width {
    Byte,
    Halfword,
    Word,
}

impl Width {
    /// Size of the access in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            Width::Byte => 1,
            Width::Halfword => 2,
            Width::Word => 4,
        }
    }

    /// Size of the access in bits.
    pub fn bits(self) -> u32 {
        self.bytes() << 3
    }
}
