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

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use peep85::config::AnalysisConfig;
use peep85::{emit, line_classifier, optimize};

#[derive(clap_parser)]
#[clap(version = "0.1.0", author = "Connor Nolan")]
struct Opts {
    /// Assembly source to optimize. Reads stdin when omitted.
    input: Option<PathBuf>,
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Print each surviving instruction's final need/set/value state
    /// alongside the rewritten source, instead of just the source.
    #[clap(long)]
    trace: bool,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    let source = match &opts.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read source from stdin")?;
            buf
        }
    };

    let chain = optimize(&source, AnalysisConfig::default()).context("optimization failed")?;

    let rendered = if opts.trace {
        trace_report(&source, &chain)
    } else {
        emit::emit_text(&chain)
    };

    match &opts.output {
        Some(path) => {
            fs::write(path, rendered).with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => {
            io::stdout().write_all(rendered.as_bytes())?;
        }
    }

    Ok(())
}

/// `--trace` output: the input line count, surviving instruction count, and
/// one line per surviving instruction giving its source line number and
/// rendered text, mirroring the original tool's `dump_output` debug dump.
fn trace_report(source: &str, chain: &peep85::ir::Chain) -> String {
    let input_lines = line_classifier::classify(source).len();
    let emitted = emit::emit(chain);

    let mut out = String::new();
    out.push_str(&format!(
        "; {input_lines} input line(s), {} surviving instruction(s)\n",
        emitted.len()
    ));
    for rec in emitted {
        if let Some(label) = &rec.label {
            out.push_str(&format!("{label}:\n"));
        }
        let values = rec
            .known_values
            .iter()
            .map(|(r, v)| format!("{r}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&format!(
            "; line {} live_in={:04x} live_out={:04x} values=[{}]\n{}\n",
            rec.line, rec.live_in, rec.live_out, values, rec.text
        ));
    }
    out
}
