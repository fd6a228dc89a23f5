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

//! `adjust_immed8`: forward pass substituting cheaper 8-bit equivalents once
//! known-value state is in place.

use crate::errors::CoreError;
use crate::ir::{find_reg_with_value, reg_value, Chain, InstrId};
use crate::opcode_table::{register_form_index, Mnemonic, OpFlags, OPCODES};
use crate::rewrite::retarget;
use crate::values::compute_effects;

/// Runs the four 8-bit substitutions in `spec.md` §4.5 over every
/// instruction, forward from `codehead`. Each instruction is visited at
/// most once.
///
/// Exact-value elimination/substitution is tried before the +-1 INR/DCR
/// fallback, which reorders the original's literal `if`/`else if` chain:
/// under the original's order an MVI whose prior value happens to be
/// target+1 takes the DCR branch before the substitution search ever runs,
/// which disagrees with this spec's own worked example of the rule
/// (substitution is the more general, at-least-as-cheap rewrite and should
/// win when both apply).
pub fn adjust_immed8(chain: &mut Chain) -> Result<(), CoreError> {
    let mut cursor = chain.codehead;
    while let Some(id) = cursor {
        // Read the next pointer before any possible deletion of `id`.
        let next_cursor = chain.next_instr(id);

        rewrite_one(chain, id)?;

        cursor = next_cursor;
    }
    Ok(())
}

fn rewrite_one(chain: &mut Chain, id: InstrId) -> Result<(), CoreError> {
    let (opinfo, dr, sr, addrconst) = {
        let instr = chain.instr(id);
        (instr.opinfo, instr.dr, instr.sr, instr.addrconst)
    };
    let flags = OPCODES[opinfo].flags;
    let prev = chain.prev_effect(id);

    // Redundant MOV dr,sr: both sides already hold the same known value.
    if flags.intersects(OpFlags::MOV) {
        if let (Some(dv), Some(sv)) = (reg_value(chain.effect(prev), dr), reg_value(chain.effect(prev), sr)) {
            if dv == sv {
                chain.delete(id);
            }
        }
        return Ok(());
    }

    // Redundant MVI r,k: the destination already holds exactly k.
    if flags.intersects(OpFlags::MVI) {
        if let Some(v) = reg_value(chain.effect(prev), dr) {
            let k = (addrconst & 0xFF) as u8;
            if v == k {
                chain.delete(id);
                return Ok(());
            }
        }
    }

    // Immediate-to-register substitution: ADI/ACI/... or a surviving MVI
    // whose constant happens to already sit in some tracked register. Tried
    // before the +-1 INR/DCR fallback below: a register already holding the
    // exact value is at least as cheap as an INR/DCR and is the more
    // general win (it also covers AOP immediates, which have no dest-
    // register-adjacency fallback of their own).
    let is_immed_aop = flags.intersects(OpFlags::IMMED) && flags.intersects(OpFlags::AOP);
    if is_immed_aop || flags.intersects(OpFlags::MVI) {
        if let Some(found) = find_reg_with_value(chain.effect(prev), addrconst) {
            if let Some(reg_idx) = register_form_index(opinfo) {
                let mnemonic = OPCODES[reg_idx].mnemonic;
                retarget(chain, id, mnemonic);
                chain.instr_mut(id).sr = found;
                compute_effects(chain, id)?;
                return Ok(());
            }
        }
    }

    // MVI fallback: no exact register match, but the destination's current
    // value is one off from the target.
    if flags.intersects(OpFlags::MVI) {
        if let Some(v) = reg_value(chain.effect(prev), dr) {
            let k = (addrconst & 0xFF) as u8;
            if v == k.wrapping_add(1) {
                retarget(chain, id, Mnemonic::Dcr);
                chain.instr_mut(id).sr = dr;
                compute_effects(chain, id)?;
            } else if v == k.wrapping_sub(1) {
                retarget(chain, id, Mnemonic::Inr);
                chain.instr_mut(id).sr = dr;
                compute_effects(chain, id)?;
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
    use crate::opcode_table::Mnemonic as M;
    use crate::parsed_line::ParsedLine;
    use crate::values::compute_values;

    // These tests exercise adjust_immed8 in isolation, the same way
    // liveness.rs and values.rs test only their own pass: compute_values
    // feeds it known-value state, but propagate_need does not run first, so
    // a rewrite candidate is never pre-empted by an unrelated dead-code
    // deletion. tests/integration_test.rs covers the full pipeline.
    fn run(texts: &[(&str, &str)]) -> Chain {
        let mut b = Builder::new(AnalysisConfig::default());
        for (i, (m, o)) in texts.iter().enumerate() {
            b.build_line(&ParsedLine::new(i + 1, None, m.to_string(), o.to_string()))
                .unwrap();
        }
        let mut chain = b.into_chain();
        compute_values(&mut chain).unwrap();
        adjust_immed8(&mut chain).unwrap();
        chain
    }

    fn mnemonics(chain: &Chain) -> Vec<M> {
        chain.iter().map(|id| chain.instr(id).mnemonic).collect()
    }

    #[test]
    fn second_identical_mvi_is_eliminated() {
        // Scenario 1: MVI A,5 ; MVI A,5 -> MVI A,5
        let chain = run(&[("MVI", "A,5"), ("MVI", "A,5")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi]);
    }

    #[test]
    fn mvi_matching_known_register_becomes_mov() {
        // Scenario 2: MVI A,5 ; MVI B,6 ; MVI B,5 -> ...; MOV B,A
        let chain = run(&[("MVI", "A,5"), ("MVI", "B,6"), ("MVI", "B,5")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi, M::Mvi, M::Mov]);
        let mov = chain.codetail.unwrap();
        assert_eq!(chain.instr(mov).dr, crate::regs::REG_B);
        assert_eq!(chain.instr(mov).sr, crate::regs::REG_A);
    }

    #[test]
    fn mvi_one_more_than_known_becomes_inr() {
        // Scenario 3: MVI A,5 ; MVI A,6 -> MVI A,5 ; INR A
        let chain = run(&[("MVI", "A,5"), ("MVI", "A,6")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi, M::Inr]);
    }

    #[test]
    fn mvi_one_less_than_known_becomes_dcr() {
        let chain = run(&[("MVI", "A,5"), ("MVI", "A,4")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi, M::Dcr]);
    }

    #[test]
    fn adi_matching_known_register_becomes_add() {
        let chain = run(&[("MVI", "B,5"), ("ADI", "5")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi, M::Add]);
        let add = chain.codetail.unwrap();
        assert_eq!(chain.instr(add).sr, crate::regs::REG_B);
    }

    #[test]
    fn unrelated_mvi_survives_untouched() {
        let chain = run(&[("MVI", "A,5"), ("MVI", "B,9")]);
        assert_eq!(mnemonics(&chain), vec![M::Mvi, M::Mvi]);
    }
}
