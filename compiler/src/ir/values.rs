//! SSA values
//!
//! Every value has a fixed type and a list of the operand slots that read
//! it. The list is only ever changed by the [`Module`](super::Module)
//! rewrite operations, so it always matches the live operands exactly.

use super::{BlockId, ConstantId, FunctionId, InstId, SymbolId, TypeId};
use serde::{Deserialize, Serialize};

/// Where a value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Constant(ConstantId),
    InstructionResult(InstId),
    /// Phi formal of a merge, body or continuing block
    BlockParam { block: BlockId, index: u32 },
    FunctionParam { function: FunctionId, index: u32 },
}

/// One operand slot that reads a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Usage {
    pub instruction: InstId,
    pub operand: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueData {
    pub ty: TypeId,
    pub kind: ValueKind,
    pub usages: Vec<Usage>,
    pub name: Option<SymbolId>,
}

impl ValueData {
    pub fn new(ty: TypeId, kind: ValueKind) -> Self {
        Self {
            ty,
            kind,
            usages: Vec::new(),
            name: None,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.kind, ValueKind::Constant(_))
    }

    pub fn constant(&self) -> Option<ConstantId> {
        match self.kind {
            ValueKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn is_used(&self) -> bool {
        !self.usages.is_empty()
    }
}
