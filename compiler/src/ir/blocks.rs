//! IR Blocks
//!
//! A block is an ordered list of instructions ending in exactly one
//! terminator. Blocks that can be entered with arguments (merge, loop body,
//! continuing) declare block parameters, which play the role of phi nodes.

use super::{FunctionId, InstId, ValueId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a block within its function's region tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockRole {
    /// First block of a function
    Entry,
    /// Module-scope variable declarations
    Root,
    True,
    False,
    Merge,
    Initializer,
    Body,
    Continuing,
    Case,
}

impl fmt::Display for BlockRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockRole::Entry => "entry",
            BlockRole::Root => "root",
            BlockRole::True => "true",
            BlockRole::False => "false",
            BlockRole::Merge => "merge",
            BlockRole::Initializer => "initializer",
            BlockRole::Body => "body",
            BlockRole::Continuing => "continuing",
            BlockRole::Case => "case",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub instructions: Vec<InstId>,
    /// Block parameters, in argument order
    pub params: Vec<ValueId>,
    /// Region instruction this block belongs to; `None` for entry and root blocks
    pub parent: Option<InstId>,
    pub function: Option<FunctionId>,
    /// Exits that branch into this block
    pub inbound: Vec<InstId>,
    pub role: BlockRole,
}

impl Block {
    pub fn new(role: BlockRole, parent: Option<InstId>, function: Option<FunctionId>) -> Self {
        Self {
            instructions: Vec::new(),
            params: Vec::new(),
            parent,
            function,
            inbound: Vec::new(),
            role,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn last(&self) -> Option<InstId> {
        self.instructions.last().copied()
    }
}
