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

//! Analysis-wide configuration threaded explicitly through every pass,
//! rather than carried as process-wide mutable state.

use crate::regs::{REGM_D, REGM_E, REGM_H, REGM_L, REGM_SP};

/// ABI-dependent knobs the dataflow passes need but that the core itself has
/// no way to derive from the instruction stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Registers assumed live across `CALL`/`RET` boundaries regardless of
    /// the opcode table's declared `imask`/`omask` for the return
    /// instruction itself — i.e. registers the calling convention may carry
    /// a return value or frame pointer in. Defaults to `D|E|H|L|SP`,
    /// deliberately excluding `A`, matching a typical small-model 8085 C
    /// compiler's call/return convention; callers targeting a different ABI
    /// can override it.
    pub call_survivors: u16,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            call_survivors: REGM_D | REGM_E | REGM_H | REGM_L | REGM_SP,
        }
    }
}
