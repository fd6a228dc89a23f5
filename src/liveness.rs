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

//! Backward liveness pass: computes live-in masks and deletes dead
//! instructions in a single walk from the tail.

use crate::ir::Chain;
use crate::regs::KEEPMASK;

/// Walks the chain from `codetail` to `codehead`. For each instruction,
/// either deletes it (no live output and nothing in `KEEPMASK`) or
/// propagates its live-out need back across it.
pub fn propagate_need(chain: &mut Chain) {
    let mut cursor = chain.codetail;
    while let Some(id) = cursor {
        let prev_cursor = chain.prev_instr(id);

        let next = chain.next_effect(id);
        let (need, set) = {
            let e = chain.effect(next);
            (e.need, e.set)
        };

        if (need & set) == 0 && (set & KEEPMASK) == 0 {
            chain.delete(id);
        } else {
            let prev = chain.prev_effect(id);
            chain.effect_mut(prev).need |= need & !set;
        }

        cursor = prev_cursor;
    }
}
