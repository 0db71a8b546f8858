//! Generator options, loadable from a `tincture.toml` file.
//!
//! ```toml
//! [spirv]
//! version = "1.3"
//! emit-debug-names = true
//! zero-init-workgroup-memory = false
//! validate-ir = true
//! spirv-val-path = "/usr/local/bin/spirv-val"
//! ```

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Options that steer SPIR-V generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// SPIR-V version written to the module header, as (major, minor).
    pub spirv_version: (u8, u8),
    /// Emit OpName/OpMemberName for named values, functions and structs.
    pub emit_debug_names: bool,
    /// Give workgroup variables an OpConstantNull initializer.
    pub zero_init_workgroup_memory: bool,
    /// Run the IR validator before generating.
    pub validate_ir: bool,
    /// Explicit path to `spirv-val`; searched on PATH when unset.
    pub spirv_val_path: Option<PathBuf>,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            spirv_version: (1, 3),
            emit_debug_names: true,
            zero_init_workgroup_memory: false,
            validate_ir: true,
            spirv_val_path: None,
        }
    }
}

/// The raw TOML structure.
#[derive(Debug, Deserialize)]
struct RawConfig {
    spirv: Option<SpirvSection>,
}

/// `[spirv]` section.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SpirvSection {
    version: Option<String>,
    emit_debug_names: Option<bool>,
    zero_init_workgroup_memory: Option<bool>,
    validate_ir: Option<bool>,
    spirv_val_path: Option<PathBuf>,
}

/// Errors raised while loading generator options.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    InvalidVersion(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config: {}", e),
            ConfigError::Parse(e) => write!(f, "failed to parse config: {}", e),
            ConfigError::InvalidVersion(v) => {
                write!(f, "unsupported SPIR-V version '{}' (expected 1.0 to 1.6)", v)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl GeneratorOptions {
    /// Load options from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse options from TOML text; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;
        let mut options = Self::default();

        if let Some(spirv) = raw.spirv {
            if let Some(version) = spirv.version {
                options.spirv_version = parse_version(&version)?;
            }
            if let Some(v) = spirv.emit_debug_names {
                options.emit_debug_names = v;
            }
            if let Some(v) = spirv.zero_init_workgroup_memory {
                options.zero_init_workgroup_memory = v;
            }
            if let Some(v) = spirv.validate_ir {
                options.validate_ir = v;
            }
            options.spirv_val_path = spirv.spirv_val_path;
        }

        Ok(options)
    }

    /// The version word for the module header.
    pub fn version_word(&self) -> u32 {
        let (major, minor) = self.spirv_version;
        ((major as u32) << 16) | ((minor as u32) << 8)
    }

    pub fn supports(&self, major: u8, minor: u8) -> bool {
        self.spirv_version >= (major, minor)
    }
}

fn parse_version(text: &str) -> Result<(u8, u8), ConfigError> {
    let invalid = || ConfigError::InvalidVersion(text.to_string());
    let (major, minor) = text.trim().split_once('.').ok_or_else(invalid)?;
    let major: u8 = major.parse().map_err(|_| invalid())?;
    let minor: u8 = minor.parse().map_err(|_| invalid())?;
    if major != 1 || minor > 6 {
        return Err(invalid());
    }
    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GeneratorOptions::default();
        assert_eq!(options.spirv_version, (1, 3));
        assert_eq!(options.version_word(), 0x0001_0300);
        assert!(options.validate_ir);
        assert!(options.supports(1, 3));
        assert!(!options.supports(1, 4));
    }

    #[test]
    fn test_parse_full_section() {
        let options = GeneratorOptions::from_toml_str(
            r#"
            [spirv]
            version = "1.5"
            emit-debug-names = false
            zero-init-workgroup-memory = true
            validate-ir = false
            spirv-val-path = "/opt/spirv-val"
            "#,
        )
        .unwrap();
        assert_eq!(options.spirv_version, (1, 5));
        assert!(!options.emit_debug_names);
        assert!(options.zero_init_workgroup_memory);
        assert!(!options.validate_ir);
        assert_eq!(options.spirv_val_path, Some(PathBuf::from("/opt/spirv-val")));
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let options = GeneratorOptions::from_toml_str("").unwrap();
        assert_eq!(options, GeneratorOptions::default());
    }

    #[test]
    fn test_bad_version() {
        let err = GeneratorOptions::from_toml_str("[spirv]\nversion = \"2.0\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion(_)));
        let err = GeneratorOptions::from_toml_str("[spirv]\nversion = \"one\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVersion(_)));
    }
}
