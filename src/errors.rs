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

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("{line}: unknown operation '{mnemonic}'")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("{line}: {reason}")]
    ParseError { line: usize, reason: String },

    #[error("{line}: {reason}")]
    SemanticError { line: usize, reason: String },

    #[error("{line}: attempt to consume unknown value")]
    UnknownValueConsumed { line: usize },

    #[error("{line}: negative frame bias")]
    NegativeFrameBias { line: usize },

    #[error("out of memory allocating node")]
    Allocation,
}
