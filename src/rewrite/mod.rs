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

//! Peephole rewrite passes that run once liveness and value analysis have
//! populated the chain: swap known-value loads for cheaper equivalents and
//! fold constant-displacement 16-bit arithmetic into `INX`/`DEX` pairs.

pub mod immed16;
pub mod immed8;

pub use immed16::adjust_immed16;
pub use immed8::adjust_immed8;

use crate::ir::{Chain, InstrId};
use crate::opcode_table::{find_operation, Mnemonic};

/// Changes `id`'s opcode identity in place, leaving its operand fields and
/// the chain's edge state untouched — the caller is responsible for any
/// operand/value fixups the new shape requires.
pub(crate) fn retarget(chain: &mut Chain, id: InstrId, mnemonic: Mnemonic) {
    let idx = find_operation(mnemonic.as_str()).expect("rewrite target must be a real mnemonic");
    let instr = chain.instr_mut(id);
    instr.mnemonic = mnemonic;
    instr.opinfo = idx;
}

/// Splices a fresh instruction of `mnemonic` in right after `after`, for the
/// two-instruction expansions (`±2` pair deltas, register-sourced pair
/// loads) that a single opcode can't express.
pub(crate) fn insert_after(chain: &mut Chain, after: InstrId, mnemonic: Mnemonic) -> InstrId {
    let idx = find_operation(mnemonic.as_str()).expect("rewrite target must be a real mnemonic");
    chain.append_after(after, mnemonic, idx)
}
