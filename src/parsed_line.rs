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

//! The record a line classifier hands to the IR builder: one already
//! comment-stripped, label-extracted source line.

/// One input record. `mnemonic`/`operand_text` are empty for a label-only
/// line — the builder attaches such a label to a synthetic `NOP`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub line: usize,
    pub label: Option<String>,
    pub mnemonic: String,
    pub operand_text: String,
}

impl ParsedLine {
    pub fn new(line: usize, label: Option<String>, mnemonic: String, operand_text: String) -> Self {
        ParsedLine {
            line,
            label,
            mnemonic,
            operand_text,
        }
    }

    pub fn is_label_only(&self) -> bool {
        self.mnemonic.is_empty()
    }
}
