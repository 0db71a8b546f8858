//! Error codes attached to shader diagnostics
//!
//! Codes are grouped by the stage that reports them:
//!
//! - E5000-E5999: the SPIR-V generator cannot express a construct
//! - E8000-E8999: an external tool rejected the output or could not run
//! - E9000-E9999: the IR broke an invariant some earlier pass owes
//!
//! The `diagnostics::shader` builders attach the code string; this table
//! holds the summary and help text behind each one, which `tincture explain`
//! prints.

use std::fmt;

/// Stage of the pipeline a code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Codegen,
    Tooling,
    Internal,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Codegen => "codegen",
            Stage::Tooling => "tooling",
            Stage::Internal => "internal",
        }
    }

    fn range(self) -> std::ops::RangeInclusive<u16> {
        match self {
            Stage::Codegen => 5000..=5999,
            Stage::Tooling => 8000..=8999,
            Stage::Internal => 9000..=9999,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub code: u16,
    pub stage: Stage,
    pub summary: &'static str,
    pub help: Option<&'static str>,
}

impl Entry {
    /// `E5003` style spelling.
    pub fn name(&self) -> String {
        code_name(self.code)
    }

    /// Internal codes point at a broken contract between passes rather than
    /// at the input module.
    pub fn is_internal(&self) -> bool {
        self.stage == Stage::Internal
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name(), self.stage.label(), self.summary)?;
        if let Some(help) = self.help {
            write!(f, "\n  help: {}", help)?;
        }
        Ok(())
    }
}

/// Sorted by code.
static TABLE: &[Entry] = &[
    Entry {
        code: 5001,
        stage: Stage::Codegen,
        summary: "Construct not supported by the SPIR-V backend",
        help: Some("Lower the construct in an earlier pass or target a different backend"),
    },
    Entry {
        code: 5002,
        stage: Stage::Codegen,
        summary: "Dynamic index into a non-vector composite value",
        help: Some("Spill the composite to a function variable and index through the pointer"),
    },
    Entry {
        code: 5003,
        stage: Stage::Codegen,
        summary: "Uniform buffer layout violation",
        help: Some("Uniform arrays need a 16-byte stride and nested structs a 16-byte offset"),
    },
    Entry {
        code: 5004,
        stage: Stage::Codegen,
        summary: "Feature requires a newer SPIR-V version",
        help: Some("Raise spirv_version in tincture.toml"),
    },
    Entry {
        code: 5005,
        stage: Stage::Codegen,
        summary: "Resource variable without a binding point",
        help: Some("Uniform, storage and handle variables need a group and binding"),
    },
    Entry {
        code: 8001,
        stage: Stage::Tooling,
        summary: "Generated binary rejected by the external validator",
        help: Some("This is a generator defect; please report it with the module that triggered it"),
    },
    Entry {
        code: 8002,
        stage: Stage::Tooling,
        summary: "External validator could not be run",
        help: Some("Install SPIRV-Tools or set spirv_val_path in tincture.toml"),
    },
    Entry {
        code: 9001,
        stage: Stage::Internal,
        summary: "Block has no terminator",
        help: Some("Every block must end in exactly one terminator instruction"),
    },
    Entry {
        code: 9002,
        stage: Stage::Internal,
        summary: "Instruction after terminator",
        help: None,
    },
    Entry {
        code: 9003,
        stage: Stage::Internal,
        summary: "Branch argument count does not match block parameters",
        help: Some("Each exit must pass one argument per parameter of the block it enters"),
    },
    Entry {
        code: 9004,
        stage: Stage::Internal,
        summary: "Branch argument type does not match block parameter",
        help: None,
    },
    Entry {
        code: 9005,
        stage: Stage::Internal,
        summary: "Operand type mismatch",
        help: Some("Insert an explicit construct or convert before the instruction"),
    },
    Entry {
        code: 9006,
        stage: Stage::Internal,
        summary: "Usage list out of sync with operands",
        help: Some("Rewrite operands through Module::set_operand so usages stay consistent"),
    },
    Entry {
        code: 9007,
        stage: Stage::Internal,
        summary: "Reference to a value, block or function that does not exist",
        help: None,
    },
    Entry {
        code: 9008,
        stage: Stage::Internal,
        summary: "Region exit used outside of its region",
        help: None,
    },
    Entry {
        code: 9009,
        stage: Stage::Internal,
        summary: "Malformed switch",
        help: Some("A switch needs exactly one default selector and an integer selector value"),
    },
    Entry {
        code: 9010,
        stage: Stage::Internal,
        summary: "Return value does not match the function return type",
        help: None,
    },
    Entry {
        code: 9011,
        stage: Stage::Internal,
        summary: "Invalid entry point metadata",
        help: Some("Compute entry points need a workgroup size and all entry points return void"),
    },
    Entry {
        code: 9012,
        stage: Stage::Internal,
        summary: "Malformed loop",
        help: None,
    },
    Entry {
        code: 9013,
        stage: Stage::Internal,
        summary: "Block belongs to a different function or region",
        help: None,
    },
];

/// All known codes, in ascending order.
pub fn all() -> &'static [Entry] {
    TABLE
}

pub fn lookup(code: u16) -> Option<&'static Entry> {
    TABLE
        .binary_search_by_key(&code, |entry| entry.code)
        .ok()
        .map(|index| &TABLE[index])
}

/// Look up `E5003`, `e5003` or a bare `5003`.
pub fn lookup_name(name: &str) -> Option<&'static Entry> {
    parse_code_name(name).and_then(lookup)
}

pub fn for_stage(stage: Stage) -> impl Iterator<Item = &'static Entry> {
    let range = stage.range();
    TABLE.iter().filter(move |entry| range.contains(&entry.code))
}

pub fn code_name(code: u16) -> String {
    format!("E{:04}", code)
}

pub fn parse_code_name(name: &str) -> Option<u16> {
    let digits = name
        .strip_prefix('E')
        .or_else(|| name.strip_prefix('e'))
        .unwrap_or(name);
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_sorted_and_unique() {
        assert!(TABLE.windows(2).all(|pair| pair[0].code < pair[1].code));
    }

    #[test]
    fn test_stage_matches_range() {
        for entry in all() {
            assert!(entry.stage.range().contains(&entry.code), "{}", entry.name());
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(9001).unwrap().summary, "Block has no terminator");
        assert_eq!(lookup_name("E5002").unwrap().code, 5002);
        assert_eq!(lookup_name("e5004").unwrap().code, 5004);
        assert_eq!(lookup_name("8001").unwrap().stage, Stage::Tooling);
        assert!(lookup(65535).is_none());
        assert!(lookup_name("INVALID").is_none());
    }

    #[test]
    fn test_codes_used_by_the_generator_exist() {
        for code in [5001, 5002, 5003, 5004, 5005, 8001, 8002] {
            assert!(lookup(code).is_some(), "missing {}", code_name(code));
        }
        assert!(for_stage(Stage::Internal).all(Entry::is_internal));
        assert_eq!(for_stage(Stage::Codegen).count(), 5);
    }

    #[test]
    fn test_display_includes_help() {
        let text = lookup(5005).unwrap().to_string();
        assert!(text.starts_with("E5005 (codegen): "));
        assert!(text.contains("help: "));
    }
}
