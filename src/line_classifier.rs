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

//! Turns raw source lines into [`ParsedLine`] records: strips `!` comments,
//! pulls a leading `label:` off the front, and splits what remains into a
//! mnemonic and its operand text. Mirrors `parse_line` in the original tool,
//! minus the in-place C string surgery.

use crate::parsed_line::ParsedLine;

/// Classifies every line of `source`, numbering from 1. Blank lines, pure
/// comment lines, and lines consisting only of whitespace after comment
/// stripping are silently dropped, matching the original's `*x == 0 && !lab`
/// early return.
pub fn classify(source: &str) -> Vec<ParsedLine> {
    source
        .lines()
        .enumerate()
        .filter_map(|(i, raw)| classify_line(i + 1, raw))
        .collect()
}

/// Classifies a single line. Returns `None` for a line that carries neither
/// a label nor an instruction once its comment is stripped.
pub fn classify_line(line: usize, raw: &str) -> Option<ParsedLine> {
    // Strip a `!` comment. The original only honors the first `!` found
    // scanning left to right, with no quote-awareness; we match that.
    let code = match raw.find('!') {
        Some(idx) => &raw[..idx],
        None => raw,
    };

    // A label is a leading `name:` before any quote character — the
    // original stops its label scan at the first `'` or `"` so a quoted
    // colon (inside a string operand) is never mistaken for one.
    let scan_limit = code
        .find(|c| c == '\'' || c == '"')
        .unwrap_or(code.len());
    let (label, rest) = match code[..scan_limit].find(':') {
        Some(idx) => {
            let label = code[..idx].trim();
            (Some(label.to_string()), &code[idx + 1..])
        }
        None => (None, code),
    };

    let rest = rest.trim_start();
    if rest.is_empty() {
        return label.map(|l| ParsedLine::new(line, Some(l), String::new(), String::new()));
    }

    let (mnemonic, operand_text) = match rest.find(char::is_whitespace) {
        Some(idx) => (rest[..idx].to_string(), rest[idx..].trim_start().to_string()),
        None => (rest.trim_end().to_string(), String::new()),
    };

    Some(ParsedLine::new(line, label, mnemonic, operand_text.trim_end().to_string()))
}
