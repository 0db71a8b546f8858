//! Tincture shader compiler core.
//!
//! A typed SSA-style shader IR with structured control-flow regions, an IR
//! validator, and a SPIR-V backend that turns validated modules into binary
//! words.

pub mod codegen;
pub mod config;
pub mod demos;
pub mod error_codes;
pub mod ir;
pub mod logging;

pub use config::GeneratorOptions;
pub use ir::{Builder, Module};
