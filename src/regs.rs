/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Register identifiers and bitmasks.
//!
//! Every register and pseudo-register id gets its own bit, including `SP`
//! and `MEM_HL_W`: aliasing them onto the same bit would be harmless only by
//! accident (both happen to always appear together in `KEEPMASK`), and risks
//! masking a genuine SP need behind an unrelated memory-write set bit.

/// The tracked 8-bit registers, `A..L`, laid out contiguously from 1 so that
/// `1 << id` gives a stable bit position and `(H, L+1)` lets a pair be
/// addressed as two consecutive single-register ids.
pub const REG_A: u8 = 1;
pub const REG_B: u8 = 2;
pub const REG_C: u8 = 3;
pub const REG_D: u8 = 4;
pub const REG_E: u8 = 5;
pub const REG_H: u8 = 6;
pub const REG_L: u8 = 7;

/// Pair tags. Pairs are named by their high half except `SP` and `PSW`.
pub const REG_PSW: u8 = 8;
pub const REG_SP: u8 = 9;

/// Pseudo-registers: not real 8-bit values, used only for liveness/KEEPMASK.
pub const MEM_HL: u8 = 10;
pub const MEMORY: u8 = 11;
pub const MEM_HL_W: u8 = 12;
pub const SIDEEFFECT: u8 = 13;

pub const REGM_A: u16 = 1 << REG_A;
pub const REGM_B: u16 = 1 << REG_B;
pub const REGM_C: u16 = 1 << REG_C;
pub const REGM_D: u16 = 1 << REG_D;
pub const REGM_E: u16 = 1 << REG_E;
pub const REGM_H: u16 = 1 << REG_H;
pub const REGM_L: u16 = 1 << REG_L;
pub const REGM_PSW: u16 = 1 << REG_PSW;
pub const REGM_SP: u16 = 1 << REG_SP;
pub const MEMM_HL: u16 = 1 << MEM_HL;
pub const MEMORYM: u16 = 1 << MEMORY;
pub const MEMM_HL_W: u16 = 1 << MEM_HL_W;
pub const SIDEEFFECTM: u16 = 1 << SIDEEFFECT;

/// Full barrier mask used at labels and for worst-case branch/call effects.
pub const REGM_ALL: u16 = 0xFFFF;

/// The subset of observable effects that forbid elimination regardless of
/// register liveness: memory writes, SP itself, and explicit side effects.
pub const KEEPMASK: u16 = SIDEEFFECTM | MEMM_HL | MEMORYM | MEMM_HL_W | REGM_SP;

/// The 8-bit registers plus PSW for which value/liveness tracking applies.
pub const TRACKED: u16 =
    REGM_A | REGM_B | REGM_C | REGM_D | REGM_E | REGM_H | REGM_L | REGM_PSW;

/// Out-of-range sentinel for an unknown immediate/address constant.
pub const CONST_UNKNOWN: i32 = 0xFFFF_0000u32 as i32;
/// Out-of-range sentinel for an unknown SP bias.
pub const BIAS_UNKNOWN: i32 = 0xFFFF_0000u32 as i32;

/// Bit set on an `EffectNode`'s flags when HL currently holds an SP-relative
/// displacement (from a `DAD SP` against a known HL), enabling a later
/// `SPHL` to update the tracked SP bias by that displacement.
pub const HL_SPBIAS: u8 = 1;

/// Marks a per-register value slot as holding a known byte value.
pub const VALUE_KNOWN: u16 = 0x100;

/// Lowest tracked 8-bit register id, for iterating `A..=L`.
pub const FIRST_8BIT: u8 = REG_A;
/// Highest tracked 8-bit register id, for iterating `A..=L`.
pub const LAST_8BIT: u8 = REG_L;

/// Single-character canonical name for a register id, `M` for `(HL)`.
pub fn regname(reg: u8) -> char {
    match reg {
        MEM_HL => 'M',
        REG_A => 'A',
        REG_B => 'B',
        REG_C => 'C',
        REG_D => 'D',
        REG_E => 'E',
        REG_H => 'H',
        REG_L => 'L',
        REG_PSW => 'F',
        _ => '?',
    }
}

/// Assembly-syntax name for a pair operand, given its high half (or
/// `SP`/`PSW`, which have no "low half" in the register file).
pub fn pairname(pair: u8) -> &'static str {
    match pair {
        REG_B => "B",
        REG_D => "D",
        REG_H => "H",
        REG_PSW => "PSW",
        REG_SP => "SP",
        _ => "?",
    }
}

/// The two-register mask affected by a pair operand, given the pair's high
/// half (or `SP`/`PSW`, which have no "low half" in the register file).
pub fn pair_mask(pair: u8) -> Option<u16> {
    match pair {
        REG_B => Some(REGM_B | REGM_C),
        REG_D => Some(REGM_D | REGM_E),
        REG_H => Some(REGM_H | REGM_L),
        REG_PSW => Some(REGM_PSW | REGM_A),
        REG_SP => Some(REGM_SP),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eight_bit_ids_are_contiguous_and_maskable() {
        assert_eq!(REG_A, 1);
        assert_eq!(REG_L, 7);
        for r in REG_A..=REG_L {
            assert_eq!(1u16 << r, 1u16 << r);
        }
    }

    #[test]
    fn pairs_are_adjacent_high_low() {
        assert_eq!(REG_H + 1, REG_L);
        assert_eq!(REG_B + 1, REG_C);
        assert_eq!(REG_D + 1, REG_E);
    }

    #[test]
    fn every_register_id_has_a_unique_bit() {
        let ids = [
            REG_A, REG_B, REG_C, REG_D, REG_E, REG_H, REG_L, REG_PSW, REG_SP, MEM_HL, MEMORY,
            MEM_HL_W, SIDEEFFECT,
        ];
        let mut seen = 0u32;
        for id in ids {
            let bit = 1u32 << id;
            assert_eq!(seen & bit, 0, "id {id} collides with a previous id");
            seen |= bit;
        }
    }

    #[test]
    fn keepmask_covers_memory_sp_and_sideeffects() {
        assert_ne!(KEEPMASK & MEMM_HL, 0);
        assert_ne!(KEEPMASK & MEMORYM, 0);
        assert_ne!(KEEPMASK & MEMM_HL_W, 0);
        assert_ne!(KEEPMASK & REGM_SP, 0);
        assert_ne!(KEEPMASK & SIDEEFFECTM, 0);
        assert_eq!(KEEPMASK & REGM_A, 0);
    }
}
