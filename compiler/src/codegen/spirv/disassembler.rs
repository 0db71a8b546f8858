//! Text form of a generated SPIR-V module
//!
//! One instruction per line, result first:
//!
//! ```text
//! %12 = OpIAdd %3 %10 %11
//! ```
//!
//! Enumerant operands are printed as plain numbers; the output is meant for
//! tests and debugging, not for reassembly.

use super::module::{Instruction, Operand, SpirvModule};
use std::fmt::Write;

/// Render a whole module, header comments included.
pub fn disassemble(module: &SpirvModule) -> String {
    let mut out = String::new();
    let (major, minor) = module.version;
    let _ = writeln!(out, "; SPIR-V {}.{}", major, minor);
    let _ = writeln!(out, "; Generator: {:#010x}", module.generator);
    let _ = writeln!(out, "; Bound: {}", module.id_bound);
    for instruction in module.instructions() {
        out.push_str(&format_instruction(instruction));
        out.push('\n');
    }
    out
}

/// Render a single instruction.
pub fn format_instruction(instruction: &Instruction) -> String {
    let mut line = String::new();
    if let Some(result) = instruction.result_id {
        let _ = write!(line, "%{} = ", result);
    }
    let _ = write!(line, "Op{:?}", instruction.op);
    if let Some(ty) = instruction.type_id {
        let _ = write!(line, " %{}", ty);
    }
    for operand in &instruction.operands {
        match operand {
            Operand::Id(id) => {
                let _ = write!(line, " %{}", id);
            }
            Operand::Literal(value) => {
                let _ = write!(line, " {}", value);
            }
            Operand::String(s) => {
                let _ = write!(line, " {:?}", s);
            }
        }
    }
    line
}
