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

//! A peephole dataflow optimizer for 8085 assembly emitted by a C compiler
//! backend: liveness-driven dead code elimination, forward constant-value
//! propagation, and rewrite passes that fold known values into cheaper
//! instruction forms.

pub mod builder;
pub mod config;
pub mod emit;
pub mod errors;
pub mod ir;
pub mod line_classifier;
pub mod liveness;
pub mod opcode_table;
pub mod parsed_line;
pub mod regs;
pub mod rewrite;
pub mod values;

use config::AnalysisConfig;
use errors::CoreError;
use ir::Chain;

/// Runs the full pipeline over `source`: classify, build, liveness, value
/// propagation, then the two rewrite passes, in the order the original tool
/// runs them (`propagate_need` before `compute_values`, `adjust_immed8`
/// before `adjust_immed16`).
pub fn optimize(source: &str, config: AnalysisConfig) -> Result<Chain, CoreError> {
    let lines = line_classifier::classify(source);

    let mut builder = builder::Builder::new(config);
    for line in &lines {
        builder.build_line(line)?;
    }
    let mut chain = builder.into_chain();

    liveness::propagate_need(&mut chain);
    values::compute_values(&mut chain)?;
    rewrite::adjust_immed8(&mut chain)?;
    rewrite::adjust_immed16(&mut chain)?;

    Ok(chain)
}

/// Convenience wrapper over [`optimize`] that renders the result straight to
/// assembly text.
pub fn optimize_to_text(source: &str, config: AnalysisConfig) -> Result<String, CoreError> {
    let chain = optimize(source, config)?;
    Ok(emit::emit_text(&chain))
}
