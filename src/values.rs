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

//! Forward constant-value pass: interprets each instruction against its
//! incoming edge to populate known-value slots on its outgoing edge.

use crate::errors::CoreError;
use crate::ir::{invalidate_effect, pair_value, reg_value, set_pair_value, set_reg_value, Chain, InstrId};
use crate::opcode_table::{Mnemonic, OpFlags, OPCODES};
use crate::regs::*;

/// Runs [`compute_effects`] forward over the whole chain.
pub fn compute_values(chain: &mut Chain) -> Result<(), CoreError> {
    let ids: Vec<InstrId> = chain.iter().collect();
    for id in ids {
        compute_effects(chain, id)?;
    }
    Ok(())
}

/// Interprets instruction `id` against its incoming edge, producing the
/// known-value and SP-bias state on its outgoing edge. Also used by the
/// rewrite passes to refresh state around a locally reshaped node.
pub fn compute_effects(chain: &mut Chain, id: InstrId) -> Result<(), CoreError> {
    let (mnemonic, sr, dr, addrconst, opinfo, line) = {
        let instr = chain.instr(id);
        (
            instr.mnemonic,
            instr.sr,
            instr.dr,
            instr.addrconst,
            instr.opinfo,
            instr.line,
        )
    };
    let flags = OPCODES[opinfo].flags;
    let prev = chain.prev_effect(id);
    let next = chain.next_effect(id);

    if flags.intersects(OpFlags::MOV) {
        if let Some(v) = reg_value(chain.effect(prev), sr) {
            set_reg_value(chain.effect_mut(next), dr, v);
        }
    }

    if flags.intersects(OpFlags::MVI) {
        set_reg_value(chain.effect_mut(next), dr, (addrconst & 0xFF) as u8);
    }

    if flags.intersects(OpFlags::IMMED) {
        if flags.intersects(OpFlags::AOP) {
            set_reg_value(chain.effect_mut(next), dr, (addrconst & 0xFF) as u8);
        } else {
            set_pair_value(chain.effect_mut(next), dr, (addrconst & 0xFFFF) as u16);
        }
    }

    compute_spbias(chain, id, mnemonic, sr, dr, line)?;

    // Propagate every register this instruction doesn't define.
    for r in FIRST_8BIT..=LAST_8BIT {
        let set = chain.effect(next).set;
        if set & (1u16 << r) == 0 {
            if let Some(v) = reg_value(chain.effect(prev), r) {
                set_reg_value(chain.effect_mut(next), r, v);
            }
        }
    }

    match mnemonic {
        Mnemonic::Dcr => {
            if let Some(v) = reg_value(chain.effect(prev), dr) {
                set_reg_value(chain.effect_mut(next), dr, v.wrapping_sub(1));
            }
        }
        Mnemonic::Inr => {
            if let Some(v) = reg_value(chain.effect(prev), dr) {
                set_reg_value(chain.effect_mut(next), dr, v.wrapping_add(1));
            }
        }
        Mnemonic::Dex => {
            if let Some(v) = pair_value(chain.effect(prev), dr) {
                set_pair_value(chain.effect_mut(next), dr, v.wrapping_sub(1));
            }
        }
        Mnemonic::Inx => {
            if let Some(v) = pair_value(chain.effect(prev), dr) {
                set_pair_value(chain.effect_mut(next), dr, v.wrapping_add(1));
            }
        }
        Mnemonic::Ana => {
            if let (Some(a), Some(r)) = (
                reg_value(chain.effect(prev), REG_A),
                reg_value(chain.effect(prev), sr),
            ) {
                set_reg_value(chain.effect_mut(next), dr, a & r);
            }
        }
        Mnemonic::Ora => {
            if let (Some(a), Some(r)) = (
                reg_value(chain.effect(prev), REG_A),
                reg_value(chain.effect(prev), sr),
            ) {
                set_reg_value(chain.effect_mut(next), dr, a | r);
            }
        }
        Mnemonic::Xra if sr == REG_A => {
            // XRA A zeroes A unconditionally: treat as MVI A,0 and clear
            // the source read it otherwise would have required.
            chain.effect_mut(prev).need &= !REGM_A;
            set_reg_value(chain.effect_mut(next), REG_A, 0);
        }
        Mnemonic::Xra => {
            if let (Some(a), Some(r)) = (
                reg_value(chain.effect(prev), REG_A),
                reg_value(chain.effect(prev), sr),
            ) {
                set_reg_value(chain.effect_mut(next), dr, a ^ r);
            }
        }
        _ => {}
    }

    if addrconst != CONST_UNKNOWN {
        if let Some(a) = reg_value(chain.effect(prev), REG_A) {
            let k = (addrconst & 0xFF) as u8;
            match mnemonic {
                Mnemonic::Ani => set_reg_value(chain.effect_mut(next), dr, a & k),
                Mnemonic::Ori => set_reg_value(chain.effect_mut(next), dr, a | k),
                Mnemonic::Xri => set_reg_value(chain.effect_mut(next), dr, a ^ k),
                Mnemonic::Adi => set_reg_value(chain.effect_mut(next), dr, a.wrapping_add(k)),
                Mnemonic::Sui => set_reg_value(chain.effect_mut(next), dr, a.wrapping_sub(k)),
                _ => {}
            }
        }
    }

    if mnemonic == Mnemonic::Dad {
        if let (Some(hl), Some(v)) = (
            pair_value(chain.effect(prev), REG_H),
            pair_value(chain.effect(prev), sr),
        ) {
            set_pair_value(chain.effect_mut(next), REG_H, hl.wrapping_add(v));
        }
    }

    // If the following instruction carries a label, `next` is the barrier
    // edge the builder (or a splice migrating the label) already
    // invalidated. Everything above just wrote tentative values into it by
    // interpreting this instruction in isolation; re-assert the barrier so
    // a join point stays fully unknown regardless of what the single
    // predecessor on this linear walk happened to know.
    if let Some(succ) = chain.next_instr(id) {
        if chain.instr(succ).label.is_some() {
            invalidate_effect(chain.effect_mut(next));
        }
    }

    Ok(())
}

/// SP-bias tracking: carried forward on the effect chain rather than on the
/// instruction, so that it threads the same way known values do.
fn compute_spbias(
    chain: &mut Chain,
    id: InstrId,
    mnemonic: Mnemonic,
    sr: u8,
    dr: u8,
    line: usize,
) -> Result<(), CoreError> {
    let prev = chain.prev_effect(id);
    let next = chain.next_effect(id);

    let prev_bias = chain.effect(prev).spbias;
    chain.effect_mut(next).spbias = prev_bias;

    match mnemonic {
        Mnemonic::Push => {
            if prev_bias != BIAS_UNKNOWN {
                chain.effect_mut(next).spbias = prev_bias + 2;
            }
        }
        Mnemonic::Pop => {
            if prev_bias != BIAS_UNKNOWN {
                let bias = prev_bias - 2;
                if bias < 0 {
                    return Err(CoreError::NegativeFrameBias { line });
                }
                chain.effect_mut(next).spbias = bias;
            }
        }
        Mnemonic::Inx if dr == REG_SP => {
            if prev_bias != BIAS_UNKNOWN {
                chain.effect_mut(next).spbias = prev_bias - 1;
            }
        }
        Mnemonic::Dex if dr == REG_SP => {
            if prev_bias != BIAS_UNKNOWN {
                chain.effect_mut(next).spbias = prev_bias + 1;
            }
        }
        _ => {}
    }

    // Tracks `LXI H,k` / `DAD SP` / `SPHL` sequences that adjust SP by a
    // compile-time-known displacement held in HL.
    if mnemonic == Mnemonic::Dad && sr == REG_SP {
        if let Some(hl) = pair_value(chain.effect(prev), REG_H) {
            chain.effect_mut(next).flags |= HL_SPBIAS;
            chain.effect_mut(next).spbias = hl as i16 as i32;
        }
    }
    if mnemonic == Mnemonic::Sphl {
        let bias = chain.effect(next).spbias;
        if bias != BIAS_UNKNOWN {
            let prev_flags = chain.effect(prev).flags;
            if prev_flags & HL_SPBIAS != 0 {
                let displacement = chain.effect(prev).spbias as i16 as i32;
                chain.effect_mut(next).spbias = bias + displacement;
            } else {
                chain.effect_mut(next).spbias = BIAS_UNKNOWN;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::config::AnalysisConfig;
    use crate::ir::know_reg_value;
    use crate::parsed_line::ParsedLine;

    fn build(texts: &[(&str, &str)]) -> Chain {
        let mut b = Builder::new(AnalysisConfig::default());
        for (i, (m, o)) in texts.iter().enumerate() {
            b.build_line(&ParsedLine::new(i + 1, None, m.to_string(), o.to_string()))
                .unwrap();
        }
        b.into_chain()
    }

    #[test]
    fn mvi_then_mov_propagates_known_value() {
        let mut chain = build(&[("MVI", "A,5"), ("MOV", "B,A")]);
        compute_values(&mut chain).unwrap();
        let mov = chain.codetail.unwrap();
        let next = chain.next_effect(mov);
        assert_eq!(reg_value(chain.effect(next), REG_B), Some(5));
    }

    #[test]
    fn inr_increments_known_value() {
        let mut chain = build(&[("MVI", "A,5"), ("INR", "A")]);
        compute_values(&mut chain).unwrap();
        let inr = chain.codetail.unwrap();
        let next = chain.next_effect(inr);
        assert_eq!(reg_value(chain.effect(next), REG_A), Some(6));
    }

    #[test]
    fn xra_a_zeroes_accumulator_unconditionally() {
        let mut chain = build(&[("XRA", "A")]);
        compute_values(&mut chain).unwrap();
        let id = chain.codehead.unwrap();
        let next = chain.next_effect(id);
        assert_eq!(reg_value(chain.effect(next), REG_A), Some(0));
    }

    #[test]
    fn label_invalidated_effect_yields_unknown_values() {
        let mut b = Builder::new(AnalysisConfig::default());
        b.build_line(&ParsedLine::new(1, None, "MVI".to_string(), "A,5".to_string()))
            .unwrap();
        b.build_line(&ParsedLine::new(
            2,
            Some("top".to_string()),
            "MOV".to_string(),
            "B,A".to_string(),
        ))
        .unwrap();
        let mut chain = b.into_chain();
        compute_values(&mut chain).unwrap();
        let mov = chain.codetail.unwrap();
        let prev = chain.prev_effect(mov);
        assert!(!know_reg_value(chain.effect(prev), REG_A));
    }

    #[test]
    fn pop_below_zero_bias_is_a_negative_frame_bias_error() {
        let mut chain = build(&[("POP", "B")]);
        let err = compute_values(&mut chain).unwrap_err();
        assert!(matches!(err, CoreError::NegativeFrameBias { .. }));
    }
}
