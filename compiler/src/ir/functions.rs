//! IR Functions

use super::{BlockId, SymbolId, TypeId, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage of an entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineStage {
    Compute,
    Vertex,
    Fragment,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Compute => write!(f, "compute"),
            PipelineStage::Vertex => write!(f, "vertex"),
            PipelineStage::Fragment => write!(f, "fragment"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Function {
    pub name: SymbolId,
    pub return_type: TypeId,
    pub params: Vec<ValueId>,
    /// Entry block
    pub start: BlockId,
    /// Set for entry points
    pub stage: Option<PipelineStage>,
    /// Required for compute entry points
    pub workgroup_size: Option<[u32; 3]>,
}

impl Function {
    pub fn is_entry_point(&self) -> bool {
        self.stage.is_some()
    }
}
