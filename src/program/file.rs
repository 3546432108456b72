//! JSON program files.
//!
//! A program file holds a name, the decoded instruction list and
//! optionally the register file to start from:
//!
//! ```json
//! {
//!     "name": "blink",
//!     "instructions": [
//!         { "op": "U", "operands": [{ "kind": "mem", "area": "I", "addr": { "byte": 0 }, "width": 1 }] },
//!         { "op": "=", "operands": [{ "kind": "mem", "area": "Q", "addr": { "byte": 0 }, "width": 1 }] }
//!     ]
//! }
//! ```
//!
//! Every instruction passes through the validating constructor while the
//! file is read.

use std::path::Path;
use serde::{Serialize, Deserialize};
use thiserror::Error;
use crate::cpu::{CpuState, Instruction, Operand};

/// A loaded program.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgramFile {
    /// Program name, for listings.
    #[serde(default)]
    pub name: String,
    /// The decoded instruction sequence.
    pub instructions: Vec<Instruction>,
    /// Register file to start from; cleared registers when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<CpuState>,
}

impl ProgramFile {
    pub fn new(name: &str, instructions: Vec<Instruction>) -> Self {
        Self { name: name.to_string(), instructions, initial_state: None }
    }

    /// Parse a program from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProgramError> {
        let program: Self = serde_json::from_str(text).map_err(|e| ProgramError::Parse {
            line: e.line(),
            message: e.to_string(),
        })?;
        program.check_labels();
        Ok(program)
    }

    pub fn to_json(&self) -> Result<String, ProgramError> {
        serde_json::to_string_pretty(self).map_err(|e| ProgramError::Io(e.to_string()))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Jumps past the end are legal (they end the cycle) but usually a
    /// mistake in the producing tool.
    fn check_labels(&self) {
        for (index, insn) in self.instructions.iter().enumerate() {
            if let Some(Operand::Label { target }) = insn.operand() {
                if *target > self.instructions.len() {
                    log::warn!(
                        "{}: instruction {:04} jumps to {}, past the end of the program",
                        self.name, index, target
                    );
                }
            }
        }
    }
}

/// Load a program file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<ProgramFile, ProgramError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| ProgramError::Io(format!("{}: {}", path.display(), e)))?;
    let mut program = ProgramFile::from_json(&text)?;
    if program.name.is_empty() {
        program.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
    log::debug!("Loaded {} ({} instructions)", program.name, program.len());
    Ok(program)
}

/// Save a program file to disk.
pub fn save_program<P: AsRef<Path>>(path: P, program: &ProgramFile) -> Result<(), ProgramError> {
    let text = program.to_json()?;
    std::fs::write(path.as_ref(), text).map_err(|e| ProgramError::Io(e.to_string()))
}

/// Errors that can occur while reading or writing program files.
#[derive(Debug, Clone, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
