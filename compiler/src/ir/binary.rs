//! Binary serialization of IR modules
//!
//! Modules are written to the `.tirb` format: a small header wrapped around
//! the serde-derived arena representation, encoded with `postcard`. Interner
//! lookup tables are not stored; they are rebuilt on load.
//!
//! JSON is accepted as a human-editable alternative.

use super::{Module, IR_VERSION};
use serde::{Deserialize, Serialize};
use std::path::Path;

const TIRB_MAGIC: &[u8; 4] = b"TIRB";

#[derive(Serialize, Deserialize)]
struct TirbFile {
    magic: [u8; 4],
    version: u32,
    producer: String,
    module: Module,
}

/// Errors that can occur while reading or writing serialized modules
#[derive(Debug)]
pub enum TirbError {
    Io(std::io::Error),
    Serialization(postcard::Error),
    Json(serde_json::Error),
    InvalidMagic,
    UnsupportedVersion(u32),
}

impl std::fmt::Display for TirbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TirbError::Io(e) => write!(f, "I/O error: {}", e),
            TirbError::Serialization(e) => write!(f, "Serialization error: {}", e),
            TirbError::Json(e) => write!(f, "JSON error: {}", e),
            TirbError::InvalidMagic => write!(f, "not a .tirb module (bad magic)"),
            TirbError::UnsupportedVersion(v) => write!(
                f,
                "unsupported IR version {} (expected {})",
                v, IR_VERSION
            ),
        }
    }
}

impl std::error::Error for TirbError {}

impl From<std::io::Error> for TirbError {
    fn from(e: std::io::Error) -> Self {
        TirbError::Io(e)
    }
}

impl From<postcard::Error> for TirbError {
    fn from(e: postcard::Error) -> Self {
        TirbError::Serialization(e)
    }
}

impl From<serde_json::Error> for TirbError {
    fn from(e: serde_json::Error) -> Self {
        TirbError::Json(e)
    }
}

/// Encode a module to `.tirb` bytes.
pub fn encode(module: &Module) -> Result<Vec<u8>, TirbError> {
    let file = TirbFile {
        magic: *TIRB_MAGIC,
        version: IR_VERSION,
        producer: env!("CARGO_PKG_VERSION").to_string(),
        module: module.clone(),
    };
    Ok(postcard::to_allocvec(&file)?)
}

/// Decode a module from `.tirb` bytes.
pub fn decode(bytes: &[u8]) -> Result<Module, TirbError> {
    if bytes.len() < TIRB_MAGIC.len() || &bytes[..TIRB_MAGIC.len()] != TIRB_MAGIC {
        return Err(TirbError::InvalidMagic);
    }
    let file: TirbFile = postcard::from_bytes(bytes)?;
    if file.version != IR_VERSION {
        return Err(TirbError::UnsupportedVersion(file.version));
    }
    let mut module = file.module;
    module.rebuild_indices();
    Ok(module)
}

pub fn to_json(module: &Module) -> Result<String, TirbError> {
    Ok(serde_json::to_string_pretty(module)?)
}

pub fn from_json(text: &str) -> Result<Module, TirbError> {
    let mut module: Module = serde_json::from_str(text)?;
    module.rebuild_indices();
    Ok(module)
}

/// Load a module, choosing the format from the file extension (`.json` or `.tirb`).
pub fn load(path: impl AsRef<Path>) -> Result<Module, TirbError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|e| e == "json") {
        from_json(&std::fs::read_to_string(path)?)
    } else {
        decode(&std::fs::read(path)?)
    }
}

/// Save a module, choosing the format from the file extension.
pub fn save(path: impl AsRef<Path>, module: &Module) -> Result<(), TirbError> {
    let path = path.as_ref();
    if path.extension().is_some_and(|e| e == "json") {
        std::fs::write(path, to_json(module)?)?;
    } else {
        std::fs::write(path, encode(module)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{dump, Builder, ConstantValue, Type};

    fn sample() -> Module {
        let mut b = Builder::new("sample");
        let i32_ty = b.types().i32();
        let f = b.function("double", i32_ty);
        let x = b.function_param(f, "x", i32_ty);
        let sum = b.add(i32_ty, x, x);
        b.return_(Some(sum));
        b.finish()
    }

    #[test]
    fn test_postcard_preserves_module() {
        let module = sample();
        let bytes = encode(&module).unwrap();
        assert_eq!(&bytes[..4], b"TIRB");
        let back = decode(&bytes).unwrap();
        assert_eq!(dump::disassemble(&module), dump::disassemble(&back));
    }

    #[test]
    fn test_lookups_rebuilt_after_decode() {
        let module = sample();
        let mut back = decode(&encode(&module).unwrap()).unwrap();
        let i32_ty = module.types().find(&Type::I32).unwrap();
        assert_eq!(back.types_mut().i32(), i32_ty);
        let before = back.value_count();
        // Interning an existing constant must not allocate a new value
        let a = back.constant_value(ConstantValue::I32(7));
        let b = back.constant_value(ConstantValue::I32(7));
        assert_eq!(a, b);
        assert_eq!(back.value_count(), before + 1);
        assert!(back.symbols().get("double").is_some());
    }

    #[test]
    fn test_bad_magic_rejected() {
        assert!(matches!(decode(b"NOPE...."), Err(TirbError::InvalidMagic)));
        assert!(matches!(decode(b""), Err(TirbError::InvalidMagic)));
    }

    #[test]
    fn test_json_round_trip() {
        let module = sample();
        let text = to_json(&module).unwrap();
        let back = from_json(&text).unwrap();
        assert_eq!(dump::disassemble(&module), dump::disassemble(&back));
    }
}
