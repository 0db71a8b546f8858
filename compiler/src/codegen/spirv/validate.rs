//! External validation of generated binaries
//!
//! The generator does not re-implement the SPIR-V validation rules; it hands
//! the binary to `spirv-val` from SPIRV-Tools. A rejection is reported as a
//! generator defect with the tool's own message.

use super::binary::BinaryWriter;
use crate::config::GeneratorOptions;
use diagnostics::shader::ShaderDiagnostics;
use diagnostics::Diagnostics;
use spirv::Word;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Result of running a validator over a binary
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub ok: bool,
    pub diagnostics: Diagnostics,
}

impl ValidationOutcome {
    fn passed() -> Self {
        Self {
            ok: true,
            diagnostics: Diagnostics::new(),
        }
    }

    fn failed(diagnostic: diagnostics::Diagnostic) -> Self {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(diagnostic);
        Self {
            ok: false,
            diagnostics,
        }
    }
}

/// The validator binary could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolUnavailable {
    pub tool: PathBuf,
}

impl std::fmt::Display for ToolUnavailable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validator '{}' is not installed", self.tool.display())
    }
}

impl std::error::Error for ToolUnavailable {}

/// Anything that can judge a SPIR-V binary
pub trait SpirvValidator {
    fn validate(
        &self,
        words: &[Word],
        version: (u8, u8),
    ) -> Result<ValidationOutcome, ToolUnavailable>;
}

/// `spirv-val` from SPIRV-Tools, fed through stdin
#[derive(Debug, Clone)]
pub struct SpirvVal {
    path: PathBuf,
}

impl Default for SpirvVal {
    fn default() -> Self {
        Self::new("spirv-val")
    }
}

impl SpirvVal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The configured validator, or `spirv-val` from `PATH`.
    pub fn from_options(options: &GeneratorOptions) -> Self {
        options
            .spirv_val_path
            .as_ref()
            .map(|p| Self::new(p.clone()))
            .unwrap_or_default()
    }

    /// Check the tool with `--version`.
    pub fn is_available(&self) -> bool {
        Command::new(&self.path)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

impl SpirvValidator for SpirvVal {
    fn validate(
        &self,
        words: &[Word],
        version: (u8, u8),
    ) -> Result<ValidationOutcome, ToolUnavailable> {
        let (major, minor) = version;
        let spawned = Command::new(&self.path)
            .arg("--target-env")
            .arg(format!("spv{}.{}", major, minor))
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolUnavailable {
                    tool: self.path.clone(),
                });
            }
            Err(e) => {
                return Ok(ValidationOutcome::failed(ShaderDiagnostics::validator_failed(
                    format!("failed to run {}: {}", self.path.display(), e),
                )));
            }
        };

        let bytes = BinaryWriter::to_bytes(words);
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(&bytes) {
                log::warn!("writing to {} failed: {}", self.path.display(), e);
            }
        }
        let output = match child.wait_with_output() {
            Ok(output) => output,
            Err(e) => {
                return Ok(ValidationOutcome::failed(ShaderDiagnostics::validator_failed(
                    format!("{} did not finish: {}", self.path.display(), e),
                )));
            }
        };

        if output.status.success() {
            log::debug!("{} accepted {} words", self.path.display(), words.len());
            return Ok(ValidationOutcome::passed());
        }
        let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(stdout.trim());
        }
        if message.is_empty() {
            message = format!("{} exited with {}", self.path.display(), output.status);
        }
        Ok(ValidationOutcome::failed(ShaderDiagnostics::external_validation(message)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_unavailable() {
        let validator = SpirvVal::new("/nonexistent/tincture-spirv-val");
        assert!(!validator.is_available());
        let err = validator.validate(&[spirv::MAGIC_NUMBER], (1, 3)).unwrap_err();
        assert_eq!(err.tool, PathBuf::from("/nonexistent/tincture-spirv-val"));
    }

    #[test]
    fn test_from_options() {
        let mut options = GeneratorOptions::default();
        assert_eq!(SpirvVal::from_options(&options).path, PathBuf::from("spirv-val"));
        options.spirv_val_path = Some(PathBuf::from("/opt/bin/spirv-val"));
        assert_eq!(
            SpirvVal::from_options(&options).path,
            PathBuf::from("/opt/bin/spirv-val")
        );
    }
}
