// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

//! Evaluation of the condition field of ARM opcodes.

// This condition table is taken from mGBA sources, which are licensed under
// MPL2 at https://github.com/mgba-emu/mgba
// Thank you to endrift and other mGBA contributors!
const COND_MASKS: [u16; 16] = [
    0xF0F0, // EQ [-Z--]
    0x0F0F, // NE [-z--]
    0xCCCC, // CS [--C-]
    0x3333, // CC [--c-]
    0xFF00, // MI [N---]
    0x00FF, // PL [n---]
    0xAAAA, // VS [---V]
    0x5555, // VC [---v]
    0x0C0C, // HI [-zC-]
    0xF3F3, // LS [-Z--] || [--c-]
    0xAA55, // GE [N--V] || [n--v]
    0x55AA, // LT [N--v] || [n--V]
    0x0A05, // GT [Nz-V] || [nz-v]
    0xF5FA, // LE [-Z--] || [Nz-v] || [nz-V]
    0xFFFF, // AL [----]
    0x0000, // NV
];

/// Condition code that always passes.
pub const ALWAYS: u32 = 0xE;
/// Condition code that never passes, outside of unconditional ARMv5
/// opcodes.
pub const NEVER: u32 = 0xF;

/// Does the condition pass with the given NZCV flags (bits 3-0)?
#[inline]
pub fn condition_passed(cond: u32, flags: u32) -> bool {
    (COND_MASKS[(cond & 0xF) as usize] & (1 << (flags & 0xF))) != 0
}

/// Test the condition of an ARM opcode against CPSR.
/// `code` is bits 27-25 of the opcode. The NV space only passes for
/// `0b101`, which is BLX with an immediate offset.
#[inline]
pub fn test_cond(cond: u32, code: u32, cpsr: u32) -> bool {
    if cond == NEVER {
        return code == 0b101;
    }
    condition_passed(cond, cpsr >> 28)
}

/// Mnemonic suffix of a condition code.
pub fn mnemonic(cond: u32) -> &'static str {
    const NAMES: [&str; 16] = [
        "eq", "ne", "cs", "cc", "mi", "pl", "vs", "vc", "hi", "ls", "ge", "lt", "gt", "le", "",
        "nv",
    ];
    NAMES[(cond & 0xF) as usize]
}

#[cfg(test)]
mod test {
    use super::*;

    const N: u32 = 8;
    const Z: u32 = 4;
    const C: u32 = 2;
    const V: u32 = 1;

    fn reference(cond: u32, flags: u32) -> bool {
        let (n, z, c, v) = (
            flags & N != 0,
            flags & Z != 0,
            flags & C != 0,
            flags & V != 0,
        );
        match cond {
            0x0 => z,
            0x1 => !z,
            0x2 => c,
            0x3 => !c,
            0x4 => n,
            0x5 => !n,
            0x6 => v,
            0x7 => !v,
            0x8 => c && !z,
            0x9 => !c || z,
            0xA => n == v,
            0xB => n != v,
            0xC => !z && n == v,
            0xD => z || n != v,
            0xE => true,
            _ => false,
        }
    }

    #[test]
    fn truth_table() {
        for cond in 0..16 {
            for flags in 0..16 {
                assert_eq!(
                    condition_passed(cond, flags),
                    reference(cond, flags),
                    "cond {cond:X} flags {flags:04b}"
                );
            }
        }
    }

    #[test]
    fn always_and_equal() {
        for flags in 0..16 {
            assert!(condition_passed(ALWAYS, flags));
            assert_eq!(condition_passed(0x0, flags), flags & Z != 0);
        }
    }

    #[test]
    fn never_only_passes_blx() {
        for code in 0..8 {
            assert_eq!(test_cond(NEVER, code, 0xF000_0000), code == 0b101);
            assert_eq!(test_cond(NEVER, code, 0), code == 0b101);
        }
    }

    #[test]
    fn test_cond_reads_cpsr_flags() {
        let cpsr = (Z << 28) | 0x1F;
        assert!(test_cond(0x0, 0, cpsr));
        assert!(!test_cond(0x1, 0, cpsr));
        assert_eq!(mnemonic(0x0), "eq");
        assert_eq!(mnemonic(ALWAYS), "");
    }
}
