// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use core::ops::BitAnd;

/// Bit twiddling shared by the CPU core and the console.
pub trait NumExt: BitAnd<Output = Self> + Copy + PartialEq + Default {
    /// Is the given bit set?
    fn is_bit(self, bit: u16) -> bool;
    /// Set the given bit.
    fn set_bit(self, bit: u16, state: bool) -> Self;
    /// Get `len` bits starting at `start`, shifted down.
    fn bits(self, start: u16, len: u16) -> Self;
    /// Clear the low bits so the value is a multiple of `to`.
    /// `to` has to be a power of two.
    fn align_down(self, to: u32) -> Self;
}

macro_rules! num_ext_impl {
    ($ty:ident) => {
        impl NumExt for $ty {
            #[inline(always)]
            fn is_bit(self, bit: u16) -> bool {
                (self >> bit) & 1 != 0
            }

            #[inline(always)]
            fn set_bit(self, bit: u16, state: bool) -> $ty {
                (self & !(1 << bit)) | ((state as $ty) << bit)
            }

            #[inline(always)]
            fn bits(self, start: u16, len: u16) -> $ty {
                (self >> start) & (<$ty>::MAX >> (<$ty>::BITS - len as u32))
            }

            #[inline(always)]
            fn align_down(self, to: u32) -> $ty {
                self & !((to as $ty).wrapping_sub(1))
            }
        }
    };
}

num_ext_impl!(u8);
num_ext_impl!(u16);
num_ext_impl!(u32);

#[cfg(test)]
mod test {
    use super::NumExt;

    #[test]
    fn bit_helpers() {
        assert!(0x20u32.is_bit(5));
        assert!(!0x20u32.is_bit(4));
        assert_eq!(0x1Fu32.set_bit(5, true), 0x3F);
        assert_eq!(0x3Fu32.set_bit(0, false), 0x3E);
        assert_eq!(0xE12F_FF1Eu32.bits(28, 4), 0xE);
        assert_eq!(0xFFFF_FFFFu32.bits(0, 32), 0xFFFF_FFFF);
    }

    #[test]
    fn alignment() {
        assert_eq!(0x0200_0003u32.align_down(4), 0x0200_0000);
        assert_eq!(0xFFFF_FFFFu32.align_down(2), 0xFFFF_FFFE);
        assert_eq!(0x1234u16.align_down(1), 0x1234);
    }
}
