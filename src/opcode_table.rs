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

//! Static opcode catalogue.
//!
//! Each entry gives a mnemonic, a set of behavioral flags, and its *implicit*
//! read/write masks (explicit operand reads/writes are layered on by the IR
//! builder). Every `AOP` mnemonic with an immediate form is placed
//! immediately after its non-immediate counterpart, so a rewrite can step
//! from immediate to register form by decrementing a table index —
//! `register_form_index` makes that step an explicit, checked operation
//! instead of raw pointer arithmetic.

use crate::regs::*;

/// Behavioral flags, carried as a transparent `u32` newtype rather than
/// pulled in via the `bitflags` crate: the flag set here is small and fixed,
/// so plain associated consts read the same way with no dependency weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpFlags(pub u32);

impl OpFlags {
    pub const AOP: OpFlags = OpFlags(1 << 0); // A-accumulator arithmetic/logic
    pub const SPAIR: OpFlags = OpFlags(1 << 1); // pair operand is the source
    pub const DPAIR: OpFlags = OpFlags(1 << 2); // pair operand is the destination
    pub const CARRY: OpFlags = OpFlags(1 << 4); // consumes carry
    pub const BRA: OpFlags = OpFlags(1 << 6); // branching
    pub const CALL: OpFlags = OpFlags(1 << 7); // calling
    pub const MOV: OpFlags = OpFlags(1 << 8); // OP R/M, R/M
    pub const MVI: OpFlags = OpFlags(1 << 9); // OP R, const
    pub const IMMED: OpFlags = OpFlags(1 << 10); // immediate operand, value may be known
    pub const ADDR: OpFlags = OpFlags(1 << 11); // fixed address reference
    pub const REGMOD: OpFlags = OpFlags(1 << 12); // modifies the following register or M
    pub const PAIRMOD: OpFlags = OpFlags(1 << 13); // modifies the following pair, never M
    pub const RET: OpFlags = OpFlags(1 << 14); // returns
    pub const KEEP: OpFlags = OpFlags(1 << 15); // side effects (I/O, interrupt control)

    pub const fn intersects(self, other: OpFlags) -> bool {
        (self.0 & other.0) != 0
    }
}

/// A mnemonic, tagged at table-construction time rather than compared by
/// string equality at rewrite time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Mnemonic {
    Mov,
    Mvi,
    Lxi,
    Lda,
    Sta,
    Lhld,
    Shld,
    Ldax,
    Stax,
    Xchg,
    Inr,
    Dcr,
    Inx,
    Dex,
    Dad,
    Daa,
    Rlc,
    Rrc,
    Ral,
    Rar,
    Cma,
    Cmc,
    Stc,
    Add,
    Adi,
    Adc,
    Aci,
    Sub,
    Sui,
    Sbc,
    Sbi,
    Ana,
    Ani,
    Ora,
    Ori,
    Xra,
    Xri,
    Cmp,
    Cpi,
    Jmp,
    Jz,
    Jnz,
    Jc,
    Jnc,
    Jp,
    Jm,
    Jpo,
    Jpe,
    Pchl,
    Ret,
    Rz,
    Rnz,
    Rc,
    Rnc,
    Rp,
    Rm,
    Rpo,
    Rpe,
    Call,
    Cz,
    Cnz,
    Cc,
    Cnc,
    Cp,
    Cm,
    Cpo,
    Cpe,
    Rst,
    Push,
    Pop,
    Xthl,
    Sphl,
    In,
    Out,
    Ei,
    Di,
    Hlt,
    Nop,
}

impl Mnemonic {
    /// Canonical uppercase textual form, normalized once here rather than
    /// carried around as case-sensitive text.
    pub fn as_str(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Mov => "MOV",
            Mvi => "MVI",
            Lxi => "LXI",
            Lda => "LDA",
            Sta => "STA",
            Lhld => "LHLD",
            Shld => "SHLD",
            Ldax => "LDAX",
            Stax => "STAX",
            Xchg => "XCHG",
            Inr => "INR",
            Dcr => "DCR",
            Inx => "INX",
            Dex => "DEX",
            Dad => "DAD",
            Daa => "DAA",
            Rlc => "RLC",
            Rrc => "RRC",
            Ral => "RAL",
            Rar => "RAR",
            Cma => "CMA",
            Cmc => "CMC",
            Stc => "STC",
            Add => "ADD",
            Adi => "ADI",
            Adc => "ADC",
            Aci => "ACI",
            Sub => "SUB",
            Sui => "SUI",
            Sbc => "SBC",
            Sbi => "SBI",
            Ana => "ANA",
            Ani => "ANI",
            Ora => "ORA",
            Ori => "ORI",
            Xra => "XRA",
            Xri => "XRI",
            Cmp => "CMP",
            Cpi => "CPI",
            Jmp => "JMP",
            Jz => "JZ",
            Jnz => "JNZ",
            Jc => "JC",
            Jnc => "JNC",
            Jp => "JP",
            Jm => "JM",
            Jpo => "JPO",
            Jpe => "JPE",
            Pchl => "PCHL",
            Ret => "RET",
            Rz => "RZ",
            Rnz => "RNZ",
            Rc => "RC",
            Rnc => "RNC",
            Rp => "RP",
            Rm => "RM",
            Rpo => "RPO",
            Rpe => "RPE",
            Call => "CALL",
            Cz => "CZ",
            Cnz => "CNZ",
            Cc => "CC",
            Cnc => "CNC",
            Cp => "CP",
            Cm => "CM",
            Cpo => "CPO",
            Cpe => "CPE",
            Rst => "RST",
            Push => "PUSH",
            Pop => "POP",
            Xthl => "XTHL",
            Sphl => "SPHL",
            In => "IN",
            Out => "OUT",
            Ei => "EI",
            Di => "DI",
            Hlt => "HLT",
            Nop => "NOP",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub mnemonic: Mnemonic,
    pub flags: OpFlags,
    pub imask: u16,
    pub omask: u16,
}

const fn op(mnemonic: Mnemonic, flags: OpFlags, imask: u16, omask: u16) -> OpInfo {
    OpInfo {
        mnemonic,
        flags,
        imask,
        omask,
    }
}

/// The opcode table. The immediate form of every `AOP` mnemonic must follow
/// its non-immediate form, an invariant enforced by `register_form_index`
/// and checked by `table_adjacency_invariant_holds_for_every_immediate_aop`
/// below.
pub static OPCODES: &[OpInfo] = &[
    op(Mnemonic::Mov, OpFlags::MOV, 0, 0),
    op(Mnemonic::Mvi, OpFlags::MVI, 0, 0),
    op(Mnemonic::Lxi, OpFlags(OpFlags::DPAIR.0 | OpFlags::IMMED.0), 0, 0),
    op(Mnemonic::Lda, OpFlags::ADDR, MEMORYM, REGM_A),
    op(Mnemonic::Sta, OpFlags::ADDR, REGM_A, MEMORYM),
    op(Mnemonic::Lhld, OpFlags::ADDR, MEMORYM, REGM_H | REGM_L),
    op(Mnemonic::Shld, OpFlags::ADDR, REGM_H | REGM_L, MEMORYM),
    op(
        Mnemonic::Ldax,
        OpFlags(OpFlags::ADDR.0 | OpFlags::SPAIR.0),
        MEMORYM,
        REGM_A,
    ),
    op(
        Mnemonic::Stax,
        OpFlags(OpFlags::ADDR.0 | OpFlags::DPAIR.0),
        REGM_A,
        MEMORYM,
    ),
    op(
        Mnemonic::Xchg,
        OpFlags::default(),
        REGM_D | REGM_E | REGM_H | REGM_L,
        REGM_D | REGM_E | REGM_H | REGM_L,
    ),
    op(Mnemonic::Inr, OpFlags::REGMOD, 0, 0),
    op(Mnemonic::Dcr, OpFlags::REGMOD, 0, 0),
    op(Mnemonic::Inx, OpFlags::PAIRMOD, 0, 0),
    op(Mnemonic::Dex, OpFlags::PAIRMOD, 0, 0),
    op(
        Mnemonic::Dad,
        OpFlags::SPAIR,
        REGM_H | REGM_L,
        REGM_H | REGM_L | REGM_PSW,
    ),
    op(Mnemonic::Daa, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Rlc, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Rrc, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Ral, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Rar, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Cma, OpFlags::default(), REGM_A | REGM_PSW, REGM_A | REGM_PSW),
    op(Mnemonic::Cmc, OpFlags::default(), REGM_PSW, REGM_PSW),
    op(Mnemonic::Stc, OpFlags::default(), REGM_PSW, REGM_PSW),
    // For every AOP mnemonic below, the immediate form *must* follow the
    // non-immediate form: adjust_immed8 steps back one table slot to go
    // from e.g. ADI to ADD.
    op(Mnemonic::Add, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Adi,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    op(
        Mnemonic::Adc,
        OpFlags(OpFlags::AOP.0 | OpFlags::CARRY.0),
        REGM_A | REGM_PSW,
        REGM_A | REGM_PSW,
    ),
    op(
        Mnemonic::Aci,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A | REGM_PSW,
        REGM_A | REGM_PSW,
    ),
    op(Mnemonic::Sub, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Sui,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    op(
        Mnemonic::Sbc,
        OpFlags(OpFlags::AOP.0 | OpFlags::CARRY.0),
        REGM_A | REGM_PSW,
        REGM_A | REGM_PSW,
    ),
    op(
        Mnemonic::Sbi,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A | REGM_PSW,
        REGM_A | REGM_PSW,
    ),
    op(Mnemonic::Ana, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Ani,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    op(Mnemonic::Ora, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Ori,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    op(Mnemonic::Xra, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Xri,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    op(Mnemonic::Cmp, OpFlags::AOP, REGM_A, REGM_A | REGM_PSW),
    op(
        Mnemonic::Cpi,
        OpFlags(OpFlags::AOP.0 | OpFlags::IMMED.0),
        REGM_A,
        REGM_A | REGM_PSW,
    ),
    // Branches: assume the worst case until inter-block analysis exists.
    op(Mnemonic::Jmp, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jz, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jnz, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jc, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jnc, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jp, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jm, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jpo, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Jpe, OpFlags::BRA, REGM_ALL, 0),
    op(Mnemonic::Pchl, OpFlags::BRA, REGM_ALL, 0),
    // Returns need the ABI's call-survivor registers and SP right.
    op(Mnemonic::Ret, OpFlags::RET, REGM_SP, REGM_SP),
    op(Mnemonic::Rz, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rnz, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rc, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rnc, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rp, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rm, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rpo, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    op(Mnemonic::Rpe, OpFlags::RET, REGM_PSW | REGM_SP, REGM_SP),
    // Calls: treat as needing/clobbering everything for now.
    op(Mnemonic::Call, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cz, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cnz, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cc, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cnc, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cp, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cm, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cpo, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Cpe, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Rst, OpFlags::CALL, REGM_ALL, REGM_ALL),
    op(Mnemonic::Push, OpFlags::SPAIR, REGM_SP, REGM_SP | MEMORYM),
    op(Mnemonic::Pop, OpFlags::DPAIR, REGM_SP | MEMORYM, REGM_SP),
    op(
        Mnemonic::Xthl,
        OpFlags::default(),
        MEMORYM | REGM_SP | REGM_H | REGM_L,
        MEMORYM | REGM_H | REGM_L,
    ),
    op(Mnemonic::Sphl, OpFlags::default(), REGM_H | REGM_L, REGM_SP),
    op(Mnemonic::In, OpFlags::KEEP, 0, REGM_A),
    op(Mnemonic::Out, OpFlags::KEEP, REGM_A, 0),
    op(Mnemonic::Ei, OpFlags::KEEP, 0, SIDEEFFECTM),
    op(Mnemonic::Di, OpFlags::KEEP, 0, SIDEEFFECTM),
    op(Mnemonic::Hlt, OpFlags::KEEP, 0, SIDEEFFECTM),
    op(Mnemonic::Nop, OpFlags::default(), 0, 0),
];

/// Case-insensitive linear scan over the table by mnemonic text.
pub fn find_operation(name: &str) -> Option<usize> {
    OPCODES
        .iter()
        .position(|o| o.mnemonic.as_str().eq_ignore_ascii_case(name))
}

/// Steps from an immediate-form `OpInfo` (e.g. `ADI`, or `MVI` itself) to its
/// non-immediate register form (`ADD`, `MOV`), one table slot back, per the
/// adjacency invariant this table is required to maintain. `MVI` carries the
/// `MVI` flag rather than `IMMED`, but the same one-slot-back trick applies:
/// `MOV` is its immediate table predecessor.
pub fn register_form_index(immediate_index: usize) -> Option<usize> {
    if immediate_index == 0 {
        return None;
    }
    let idx = immediate_index - 1;
    let immed = OPCODES[immediate_index];
    let reg = OPCODES[idx];
    let is_immediate_like = |f: OpFlags| f.intersects(OpFlags::IMMED) || f.intersects(OpFlags::MVI);
    if is_immediate_like(immed.flags) && !is_immediate_like(reg.flags) {
        Some(idx)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_operation_is_case_insensitive() {
        assert_eq!(find_operation("mvi"), find_operation("MVI"));
        assert!(find_operation("mvi").is_some());
        assert!(find_operation("bogus").is_none());
    }

    #[test]
    fn table_adjacency_invariant_holds_for_every_immediate_aop() {
        for (idx, info) in OPCODES.iter().enumerate() {
            if info.flags.intersects(OpFlags::IMMED) && info.flags.intersects(OpFlags::AOP) {
                assert!(
                    register_form_index(idx).is_some(),
                    "{:?} has no preceding register form",
                    info.mnemonic
                );
            }
        }
    }

    #[test]
    fn lxi_and_dex_precede_their_partners_correctly() {
        // LXI has no register-form predecessor of its own (it is the only
        // DPAIR|IMMED entry); this documents that register_form_index is
        // only meaningful for AOP immediates, matching adjust_immed8's use.
        let lxi = find_operation("LXI").unwrap();
        assert!(OPCODES[lxi].flags.intersects(OpFlags::IMMED));
    }

    #[test]
    fn mvi_steps_back_to_mov() {
        let mvi = find_operation("MVI").unwrap();
        let mov = find_operation("MOV").unwrap();
        assert_eq!(register_form_index(mvi), Some(mov));
    }
}
