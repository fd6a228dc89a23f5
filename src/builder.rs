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

//! Builds the instruction/effect chain from classified input lines.

use crate::config::AnalysisConfig;
use crate::errors::CoreError;
use crate::ir::{invalidate_effect, set_pair_value, Chain, InstrId, Label};
use crate::opcode_table::{find_operation, OpFlags, OPCODES};
use crate::parsed_line::ParsedLine;
use crate::regs::*;

pub struct Builder {
    chain: Chain,
    config: AnalysisConfig,
}

impl Builder {
    pub fn new(config: AnalysisConfig) -> Self {
        Builder {
            chain: Chain::new(),
            config,
        }
    }

    pub fn into_chain(self) -> Chain {
        self.chain
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Builds and appends one instruction for `line`, returning its id.
    pub fn build_line(&mut self, line: &ParsedLine) -> Result<InstrId, CoreError> {
        if line.is_label_only() {
            return self.build_label_only(line);
        }

        let opinfo_idx =
            find_operation(&line.mnemonic).ok_or_else(|| CoreError::UnknownMnemonic {
                line: line.line,
                mnemonic: line.mnemonic.clone(),
            })?;
        let info = OPCODES[opinfo_idx];

        let id = self.chain.new_instruction(line.line, info.mnemonic, opinfo_idx);
        self.chain.instr_mut(id).raw_operand = line.operand_text.clone();

        if let Some(name) = &line.label {
            self.attach_label(id, name.clone(), line.line)?;
        }

        let prev = self.chain.prev_effect(id);
        let next = self.chain.next_effect(id);

        self.chain.effect_mut(prev).need |= info.imask;
        self.chain.effect_mut(next).set |= info.omask;

        if info.flags.intersects(OpFlags::RET) {
            // Implicit ABI contract: the registers a caller treats as
            // surviving a call, plus A as the conventional 8-bit return
            // value register, are needed at every return regardless of
            // what the table's static imask declares.
            self.chain.effect_mut(prev).need |= self.config.call_survivors | REGM_A;
        }

        let mut ops = Operands::new(&line.operand_text);

        if info.flags.intersects(OpFlags::MOV) {
            let (r, d) = ops.pair(line.line)?;
            let sr = decode_reg8m(r, line.line)?;
            let dr = decode_reg8m(d, line.line)?;
            if sr == dr && sr == MEM_HL {
                return Err(CoreError::SemanticError {
                    line: line.line,
                    reason: "invalid move".to_string(),
                });
            }
            self.chain.effect_mut(prev).need |= 1u16 << sr;
            self.chain.effect_mut(next).set |= 1u16 << dr;
            let instr = self.chain.instr_mut(id);
            instr.sr = sr;
            instr.dr = dr;
        }

        if info.flags.intersects(OpFlags::MVI) {
            let (r, d) = ops.pair(line.line)?;
            let dr = decode_reg8(r, line.line)?;
            let cv = decode_const(d, line.line)?;
            self.chain.effect_mut(next).set = 1u16 << dr;
            let instr = self.chain.instr_mut(id);
            instr.dr = dr;
            instr.addrconst = cv;
        }

        if info.flags.intersects(OpFlags::IMMED) {
            if info.flags.intersects(OpFlags::SPAIR) || info.flags.intersects(OpFlags::DPAIR) {
                let (p, c) = ops.pair(line.line)?;
                let pair = decode_pair(p, line.line)?;
                let cv = decode_const(c, line.line)?;
                if info.flags.intersects(OpFlags::SPAIR) {
                    self.chain.instr_mut(id).sr = pair;
                    let mask = pair_mask(pair).ok_or_else(|| invalid_pair_mask(line.line))?;
                    self.chain.effect_mut(prev).need |= mask;
                } else {
                    self.chain.instr_mut(id).dr = pair;
                    let mask = pair_mask(pair).ok_or_else(|| invalid_pair_mask(line.line))?;
                    self.chain.effect_mut(next).set |= mask;
                    if cv != CONST_UNKNOWN {
                        set_pair_value(self.chain.effect_mut(next), pair, cv as u16);
                    }
                }
                self.chain.instr_mut(id).addrconst = cv;
            }
            if info.flags.intersects(OpFlags::AOP) {
                let c = ops.rest(line.line)?;
                let cv = decode_const(c, line.line)?;
                let instr = self.chain.instr_mut(id);
                instr.sr = REG_A;
                instr.dr = REG_A;
                instr.addrconst = cv;
            }
        } else {
            if info.flags.intersects(OpFlags::DPAIR) {
                let p = ops.rest(line.line)?;
                let pair = decode_pair(p, line.line)?;
                self.chain.instr_mut(id).dr = pair;
                let mask = pair_mask(pair).ok_or_else(|| invalid_pair_mask(line.line))?;
                self.chain.effect_mut(next).set |= mask;
            } else if info.flags.intersects(OpFlags::SPAIR) {
                let p = ops.rest(line.line)?;
                let pair = decode_pair(p, line.line)?;
                self.chain.instr_mut(id).sr = pair;
                if line.mnemonic.eq_ignore_ascii_case("DAD") {
                    self.chain.instr_mut(id).dr = REG_H;
                }
                let mask = pair_mask(pair).ok_or_else(|| invalid_pair_mask(line.line))?;
                self.chain.effect_mut(prev).need |= mask;
            } else if info.flags.intersects(OpFlags::AOP) {
                let r = ops.rest(line.line)?;
                let sr = decode_reg8m(r, line.line)?;
                self.chain.instr_mut(id).dr = REG_A;
                self.chain.instr_mut(id).sr = sr;
                self.chain.effect_mut(prev).need |= 1u16 << sr;
            }
        }

        if info.flags.intersects(OpFlags::REGMOD) {
            let r = ops.rest(line.line)?;
            let reg = decode_reg8m(r, line.line)?;
            self.chain.effect_mut(next).set |= 1u16 << reg;
            self.chain.effect_mut(prev).need |= 1u16 << reg;
            let instr = self.chain.instr_mut(id);
            instr.dr = reg;
            instr.sr = reg;
        }

        if info.flags.intersects(OpFlags::PAIRMOD) {
            let p = ops.rest(line.line)?;
            let pair = decode_pair(p, line.line)?;
            let mask = pair_mask(pair).ok_or_else(|| invalid_pair_mask(line.line))?;
            self.chain.effect_mut(next).set |= mask;
            self.chain.effect_mut(prev).need |= mask;
            let instr = self.chain.instr_mut(id);
            instr.dr = pair;
            instr.sr = pair;
        }

        if info.flags.intersects(OpFlags::ADDR) {
            let a = ops.rest(line.line)?;
            let cv = decode_const(a, line.line)?;
            self.chain.instr_mut(id).addrconst = cv;
        }

        let declared_need = self.chain.effect(prev).need;
        let declared_set = self.chain.effect(next).set;
        {
            let instr = self.chain.instr_mut(id);
            instr.declared_need = declared_need;
            instr.declared_set = declared_set;
        }

        if info.flags.intersects(OpFlags::BRA)
            || info.flags.intersects(OpFlags::CALL)
            || info.flags.intersects(OpFlags::RET)
        {
            self.chain.effect_mut(next).set |= SIDEEFFECTM;
        }

        Ok(id)
    }

    fn build_label_only(&mut self, line: &ParsedLine) -> Result<InstrId, CoreError> {
        let nop_idx = find_operation("NOP").expect("NOP is always in the opcode table");
        let id = self.chain.new_instruction(line.line, OPCODES[nop_idx].mnemonic, nop_idx);
        let name = line
            .label
            .clone()
            .expect("build_label_only called without a label");
        self.attach_label(id, name, line.line)?;
        let prev = self.chain.prev_effect(id);
        let next = self.chain.next_effect(id);
        let declared_need = self.chain.effect(prev).need;
        let declared_set = self.chain.effect(next).set;
        let instr = self.chain.instr_mut(id);
        instr.declared_need = declared_need;
        instr.declared_set = declared_set;
        Ok(id)
    }

    fn attach_label(&mut self, id: InstrId, name: String, line: usize) -> Result<(), CoreError> {
        let _ = line;
        self.chain.instr_mut(id).label = Some(Label { name, spbias: None });
        let prev = self.chain.prev_effect(id);
        invalidate_effect(self.chain.effect_mut(prev));
        Ok(())
    }
}

fn invalid_pair_mask(line: usize) -> CoreError {
    CoreError::SemanticError {
        line,
        reason: "invalid pair to mask".to_string(),
    }
}

/// Splits operand text into comma/whitespace-delimited tokens, mirroring the
/// incremental `strtok` calls the grammar of each operand form expects.
struct Operands<'a> {
    rest: &'a str,
}

impl<'a> Operands<'a> {
    fn new(text: &'a str) -> Self {
        Operands { rest: text.trim() }
    }

    /// Takes `register, rest` for a two-operand comma form.
    fn pair(&mut self, line: usize) -> Result<(&'a str, &'a str), CoreError> {
        let comma = self.rest.find(',').ok_or_else(|| CoreError::ParseError {
            line,
            reason: "comma expected".to_string(),
        })?;
        let first = self.rest[..comma].trim();
        let second = self.rest[comma + 1..].trim();
        if second.is_empty() {
            return Err(CoreError::ParseError {
                line,
                reason: "operand expected after comma".to_string(),
            });
        }
        self.rest = "";
        Ok((first, second))
    }

    /// Takes the entire remaining operand text as a single token.
    fn rest(&mut self, line: usize) -> Result<&'a str, CoreError> {
        if self.rest.is_empty() {
            return Err(CoreError::ParseError {
                line,
                reason: "operand expected".to_string(),
            });
        }
        let out = self.rest;
        self.rest = "";
        Ok(out)
    }
}

fn decode_reg8(token: &str, line: usize) -> Result<u8, CoreError> {
    if token.len() != 1 {
        return Err(bad_reg8(line));
    }
    match token.chars().next().unwrap().to_ascii_uppercase() {
        'A' => Ok(REG_A),
        'B' => Ok(REG_B),
        'C' => Ok(REG_C),
        'D' => Ok(REG_D),
        'E' => Ok(REG_E),
        'H' => Ok(REG_H),
        'L' => Ok(REG_L),
        _ => Err(bad_reg8(line)),
    }
}

fn decode_reg8m(token: &str, line: usize) -> Result<u8, CoreError> {
    if token.len() == 1 && token.eq_ignore_ascii_case("m") {
        return Ok(MEM_HL);
    }
    decode_reg8(token, line)
}

fn decode_pair(token: &str, line: usize) -> Result<u8, CoreError> {
    if token.eq_ignore_ascii_case("PSW") {
        return Ok(REG_PSW);
    }
    if token.eq_ignore_ascii_case("SP") {
        return Ok(REG_SP);
    }
    if token.len() != 1 {
        return Err(bad_reg16(line));
    }
    match token.chars().next().unwrap().to_ascii_uppercase() {
        'B' => Ok(REG_B),
        'D' => Ok(REG_D),
        'H' => Ok(REG_H),
        _ => Err(bad_reg16(line)),
    }
}

fn decode_const(token: &str, line: usize) -> Result<i32, CoreError> {
    let (neg, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| CoreError::ParseError {
        line,
        reason: format!("'{token}' is not a valid constant"),
    })?;
    let value = if neg { -value } else { value };
    Ok(value as i32)
}

fn bad_reg8(line: usize) -> CoreError {
    CoreError::ParseError {
        line,
        reason: "expected a single 8-bit register letter".to_string(),
    }
}

fn bad_reg16(line: usize) -> CoreError {
    CoreError::ParseError {
        line,
        reason: "expected a register pair name".to_string(),
    }
}
