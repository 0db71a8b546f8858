/// Code generation backends for Tincture
///
/// The SPIR-V backend is the only target: it consumes a validated IR
/// module and produces a binary ready for a Vulkan driver or `spirv-val`.
pub mod spirv;

pub use self::spirv::{
    disassemble, generate, BinaryWriter, SpirvModule, SpirvOutput, SpirvVal, SpirvValidator,
    ValidationOutcome,
};
