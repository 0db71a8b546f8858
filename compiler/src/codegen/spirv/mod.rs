//! SPIR-V backend
//!
//! [`generate`] turns a validated IR module into a SPIR-V binary. The
//! [`SpirvModule`] it builds on the way is kept in the output so callers can
//! disassemble or inspect it.

mod instruction_lowering;

pub mod binary;
pub mod disassembler;
pub mod module;
pub mod printer;
pub mod validate;

pub use binary::BinaryWriter;
pub use disassembler::disassemble;
pub use module::{Instruction, Operand, SpirvModule};
pub use printer::{generate, Printer, SpirvOutput};
pub use validate::{SpirvVal, SpirvValidator, ToolUnavailable, ValidationOutcome};
