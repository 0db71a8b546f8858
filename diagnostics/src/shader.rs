//! Shader IR and backend diagnostic builders
//!
//! Helpers for the diagnostics the IR validator and the code generators
//! report. E5xxx come from code generation, E8xxx from external tooling and
//! E9xxx from broken IR invariants.

use crate::{Diagnostic, Location};

pub struct ShaderDiagnostics;

impl ShaderDiagnostics {
    pub fn missing_terminator(location: Location) -> Diagnostic {
        Diagnostic::error("block does not end with a terminator", location)
            .with_code("E9001")
            .with_help("every block must end in return, unreachable, or a region exit")
    }

    pub fn instruction_after_terminator(location: Location) -> Diagnostic {
        Diagnostic::error("instruction follows the block terminator", location)
            .with_code("E9002")
    }

    pub fn phi_arity(location: Location, target: u32, expected: usize, found: usize) -> Diagnostic {
        Diagnostic::error(
            format!(
                "branch to %b{} passes {} argument(s) but the block declares {} parameter(s)",
                target, found, expected
            ),
            location,
        )
        .with_code("E9003")
    }

    pub fn phi_type(
        location: Location,
        target: u32,
        index: usize,
        expected: &str,
        found: &str,
    ) -> Diagnostic {
        Diagnostic::error(
            format!(
                "argument {} to %b{} has type {}, but the parameter is {}",
                index, target, found, expected
            ),
            location,
        )
        .with_code("E9004")
    }

    pub fn operand_type(location: Location, instruction: &str, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("{}: {}", instruction, reason.into()), location)
            .with_code("E9005")
    }

    pub fn usage_inconsistent(location: Location, detail: impl Into<String>) -> Diagnostic {
        Diagnostic::error(
            format!("usage list out of sync: {}", detail.into()),
            location,
        )
        .with_code("E9006")
        .with_note("operands must be rewritten through the module so usages stay in step")
    }

    pub fn invalid_reference(location: Location, what: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("invalid reference: {}", what.into()), location)
            .with_code("E9007")
    }

    pub fn exit_escapes_region(location: Location, exit: &str, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("{}: {}", exit, reason.into()), location)
            .with_code("E9008")
    }

    pub fn invalid_switch(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("switch: {}", reason.into()), location)
            .with_code("E9009")
    }

    pub fn return_mismatch(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("return: {}", reason.into()), location)
            .with_code("E9010")
    }

    pub fn entry_point(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("entry point: {}", reason.into()), location)
            .with_code("E9011")
    }

    pub fn loop_structure(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("loop: {}", reason.into()), location)
            .with_code("E9012")
    }

    pub fn block_ownership(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(reason.into(), location)
            .with_code("E9013")
    }

    pub fn unsupported(location: Location, what: impl Into<String>) -> Diagnostic {
        Diagnostic::error(format!("unsupported by the SPIR-V backend: {}", what.into()), location)
            .with_code("E5001")
    }

    pub fn dynamic_composite_index(location: Location) -> Diagnostic {
        Diagnostic::error("dynamic index into a non-vector composite value", location)
            .with_code("E5002")
            .with_help("store the composite in a function variable and index through the pointer")
    }

    pub fn uniform_layout(location: Location, reason: impl Into<String>) -> Diagnostic {
        Diagnostic::error(
            format!("uniform buffer layout violation: {}", reason.into()),
            location,
        )
        .with_code("E5003")
        .with_help("uniform buffers need 16-byte aligned arrays and nested structures")
    }

    pub fn requires_version(location: Location, feature: &str, major: u8, minor: u8) -> Diagnostic {
        Diagnostic::error(
            format!("{} requires SPIR-V {}.{} or later", feature, major, minor),
            location,
        )
        .with_code("E5004")
    }

    pub fn missing_binding(location: Location, variable: &str) -> Diagnostic {
        Diagnostic::error(
            format!("resource variable '{}' has no binding point", variable),
            location,
        )
        .with_code("E5005")
    }

    pub fn external_validation(message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(message.into(), Location::module())
            .with_code("E8001")
            .with_note("the generated binary failed external validation; this is a generator defect")
    }

    pub fn validator_failed(message: impl Into<String>) -> Diagnostic {
        Diagnostic::error(message.into(), Location::module())
            .with_code("E8002")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phi_arity_message() {
        let diag = ShaderDiagnostics::phi_arity(Location::function("f").in_block(1), 4, 2, 1);
        assert_eq!(diag.code.as_deref(), Some("E9003"));
        assert!(diag.message.contains("%b4"));
        assert!(diag.message.contains("1 argument(s)"));
        assert!(diag.message.contains("2 parameter(s)"));
    }

    #[test]
    fn test_external_validation_is_module_level() {
        let diag = ShaderDiagnostics::external_validation("error: line 3: bad id");
        assert!(diag.location.is_module());
        assert_eq!(diag.code.as_deref(), Some("E8001"));
        assert_eq!(diag.notes.len(), 1);
    }
}
