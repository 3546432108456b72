//! STL listings.

use std::collections::BTreeSet;
use crate::config::Mnemonics;
use crate::cpu::{Instruction, Operand};

/// Render a program as an STL listing.
///
/// Each line carries the instruction index; indices targeted by a jump
/// are marked with `>`.
pub fn listing(name: &str, instructions: &[Instruction], mnemonics: Mnemonics) -> String {
    let targets: BTreeSet<usize> = instructions
        .iter()
        .filter(|insn| insn.opcode().is_jump())
        .filter_map(|insn| match insn.operand() {
            Some(Operand::Label { target }) => Some(*target),
            _ => None,
        })
        .collect();

    let mut output = String::new();
    output.push_str(&format!("// {}\n", if name.is_empty() { "(unnamed)" } else { name }));
    output.push_str(&format!("// {} instructions\n\n", instructions.len()));

    for (index, insn) in instructions.iter().enumerate() {
        let mark = if targets.contains(&index) { '>' } else { ' ' };
        output.push_str(&format!("{}{:04}: {}\n", mark, index, insn.display(mnemonics)));
    }
    if targets.contains(&instructions.len()) {
        output.push_str(&format!(">{:04}: (end)\n", instructions.len()));
    }

    output
}
