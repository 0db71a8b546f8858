//! Shader Intermediate Representation
//!
//! A typed, SSA-style IR for shader programs. Functions own blocks, blocks
//! own instructions, and structured control flow is expressed with `If`,
//! `Loop` and `Switch` regions whose merge blocks take block parameters in
//! place of phi instructions.
//!
//! Everything lives in arenas owned by [`Module`]; cross references are
//! plain indices, so rewrites never leave dangling pointers behind.

pub mod binary;
pub mod blocks;
pub mod builder;
pub mod constants;
pub mod dump;
pub mod functions;
pub mod instructions;
pub mod modules;
pub mod symbols;
pub mod types;
pub mod validation;
pub mod values;

pub use blocks::*;
pub use builder::*;
pub use constants::*;
pub use functions::*;
pub use instructions::*;
pub use modules::*;
pub use symbols::*;
pub use types::*;
pub use values::*;

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR version for compatibility checking of serialized modules
pub const IR_VERSION: u32 = 1;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn new(id: u32) -> Self {
                Self(id)
            }

            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a value (constant, instruction result or parameter)
    ValueId, "%"
);
arena_id!(
    /// Index of an instruction
    InstId, "inst"
);
arena_id!(
    /// Index of a block
    BlockId, "%b"
);
arena_id!(
    /// Index of a function
    FunctionId, "fn"
);
arena_id!(
    /// Canonical interned type
    TypeId, "ty"
);
arena_id!(
    /// Canonical interned constant value
    ConstantId, "const"
);
arena_id!(
    /// Interned name
    SymbolId, "sym"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display() {
        assert_eq!(format!("{}", ValueId::new(42)), "%42");
        assert_eq!(format!("{}", BlockId::new(3)), "%b3");
        assert_eq!(TypeId::new(7).index(), 7);
    }
}
