//! IR Instructions
//!
//! A closed set of instruction kinds. Operands are stored in one flat list
//! per instruction; the layout of that list is fixed per kind:
//!
//! | kind | operands |
//! |---|---|
//! | `Binary` | `[lhs, rhs]` |
//! | `Unary`, `Bitcast`, `Convert`, `Load`, `Let`, `Swizzle` | `[value]` |
//! | `Construct`, `Call`, `UserCall` | `[args...]` |
//! | `Access` | `[object, indices...]` |
//! | `Store` | `[to, from]` |
//! | `Var` | `[initializer?]` |
//! | `If` | `[condition]` |
//! | `Switch` | `[selector]` |
//! | `Return` | `[value?]` |
//! | `ExitIf`, `ExitLoop`, `ExitSwitch`, `NextIteration`, `Continue` | `[args...]` |
//! | `BreakIf` | `[condition, next_iteration_args..., exit_args...]` |

use super::{BlockId, ConstantId, FunctionId, InstId, TypeId, ValueId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Equal
                | BinaryOp::NotEqual
                | BinaryOp::LessThan
                | BinaryOp::LessThanEqual
                | BinaryOp::GreaterThan
                | BinaryOp::GreaterThanEqual
        )
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::ShiftLeft | BinaryOp::ShiftRight)
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "sub",
            BinaryOp::Multiply => "mul",
            BinaryOp::Divide => "div",
            BinaryOp::Modulo => "mod",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::ShiftLeft => "shl",
            BinaryOp::ShiftRight => "shr",
            BinaryOp::Equal => "eq",
            BinaryOp::NotEqual => "neq",
            BinaryOp::LessThan => "lt",
            BinaryOp::LessThanEqual => "lte",
            BinaryOp::GreaterThan => "gt",
            BinaryOp::GreaterThanEqual => "gte",
        }
    }
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation
    Negation,
    /// Bitwise complement
    Complement,
    /// Logical not
    Not,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Negation => "negation",
            UnaryOp::Complement => "complement",
            UnaryOp::Not => "not",
        }
    }
}

/// Core builtin functions callable through `Call`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinFn {
    Abs,
    All,
    Any,
    Acos,
    Asin,
    Atan,
    Atan2,
    Ceil,
    Clamp,
    Cos,
    Cross,
    Distance,
    Dot,
    Exp,
    Exp2,
    Floor,
    Fma,
    Fract,
    InverseSqrt,
    Length,
    Log,
    Log2,
    Max,
    Min,
    Mix,
    Normalize,
    Pow,
    Select,
    Sign,
    Sin,
    Smoothstep,
    Sqrt,
    Step,
    Tan,
    Trunc,
    CountOneBits,
    ReverseBits,
    Transpose,
    Dpdx,
    Dpdy,
    Fwidth,
    WorkgroupBarrier,
    StorageBarrier,
    /// `[texture, sampler, coords]`
    TextureSample,
}

impl BuiltinFn {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinFn::Abs => "abs",
            BuiltinFn::All => "all",
            BuiltinFn::Any => "any",
            BuiltinFn::Acos => "acos",
            BuiltinFn::Asin => "asin",
            BuiltinFn::Atan => "atan",
            BuiltinFn::Atan2 => "atan2",
            BuiltinFn::Ceil => "ceil",
            BuiltinFn::Clamp => "clamp",
            BuiltinFn::Cos => "cos",
            BuiltinFn::Cross => "cross",
            BuiltinFn::Distance => "distance",
            BuiltinFn::Dot => "dot",
            BuiltinFn::Exp => "exp",
            BuiltinFn::Exp2 => "exp2",
            BuiltinFn::Floor => "floor",
            BuiltinFn::Fma => "fma",
            BuiltinFn::Fract => "fract",
            BuiltinFn::InverseSqrt => "inverseSqrt",
            BuiltinFn::Length => "length",
            BuiltinFn::Log => "log",
            BuiltinFn::Log2 => "log2",
            BuiltinFn::Max => "max",
            BuiltinFn::Min => "min",
            BuiltinFn::Mix => "mix",
            BuiltinFn::Normalize => "normalize",
            BuiltinFn::Pow => "pow",
            BuiltinFn::Select => "select",
            BuiltinFn::Sign => "sign",
            BuiltinFn::Sin => "sin",
            BuiltinFn::Smoothstep => "smoothstep",
            BuiltinFn::Sqrt => "sqrt",
            BuiltinFn::Step => "step",
            BuiltinFn::Tan => "tan",
            BuiltinFn::Trunc => "trunc",
            BuiltinFn::CountOneBits => "countOneBits",
            BuiltinFn::ReverseBits => "reverseBits",
            BuiltinFn::Transpose => "transpose",
            BuiltinFn::Dpdx => "dpdx",
            BuiltinFn::Dpdy => "dpdy",
            BuiltinFn::Fwidth => "fwidth",
            BuiltinFn::WorkgroupBarrier => "workgroupBarrier",
            BuiltinFn::StorageBarrier => "storageBarrier",
            BuiltinFn::TextureSample => "textureSample",
        }
    }

    /// Number of arguments the builtin takes.
    pub fn arity(self) -> usize {
        match self {
            BuiltinFn::WorkgroupBarrier | BuiltinFn::StorageBarrier => 0,
            BuiltinFn::Atan2
            | BuiltinFn::Cross
            | BuiltinFn::Distance
            | BuiltinFn::Dot
            | BuiltinFn::Max
            | BuiltinFn::Min
            | BuiltinFn::Pow
            | BuiltinFn::Step => 2,
            BuiltinFn::Clamp
            | BuiltinFn::Fma
            | BuiltinFn::Mix
            | BuiltinFn::Select
            | BuiltinFn::Smoothstep
            | BuiltinFn::TextureSample => 3,
            _ => 1,
        }
    }
}

/// Shader stage builtin variables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinValue {
    Position,
    VertexIndex,
    InstanceIndex,
    FrontFacing,
    FragDepth,
    SampleIndex,
    SampleMask,
    LocalInvocationId,
    LocalInvocationIndex,
    GlobalInvocationId,
    WorkgroupId,
    NumWorkgroups,
}

impl BuiltinValue {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinValue::Position => "position",
            BuiltinValue::VertexIndex => "vertex_index",
            BuiltinValue::InstanceIndex => "instance_index",
            BuiltinValue::FrontFacing => "front_facing",
            BuiltinValue::FragDepth => "frag_depth",
            BuiltinValue::SampleIndex => "sample_index",
            BuiltinValue::SampleMask => "sample_mask",
            BuiltinValue::LocalInvocationId => "local_invocation_id",
            BuiltinValue::LocalInvocationIndex => "local_invocation_index",
            BuiltinValue::GlobalInvocationId => "global_invocation_id",
            BuiltinValue::WorkgroupId => "workgroup_id",
            BuiltinValue::NumWorkgroups => "num_workgroups",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BindingPoint {
    pub group: u32,
    pub binding: u32,
}

/// Decorations of a module-scope variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarAttributes {
    pub binding: Option<BindingPoint>,
    pub builtin: Option<BuiltinValue>,
    pub location: Option<u32>,
}

impl VarAttributes {
    pub fn binding(group: u32, binding: u32) -> Self {
        Self {
            binding: Some(BindingPoint { group, binding }),
            ..Self::default()
        }
    }

    pub fn builtin(builtin: BuiltinValue) -> Self {
        Self {
            builtin: Some(builtin),
            ..Self::default()
        }
    }

    pub fn location(location: u32) -> Self {
        Self {
            location: Some(location),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseSelector {
    Default,
    Value(ConstantId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub selectors: Vec<CaseSelector>,
    pub block: BlockId,
}

impl SwitchCase {
    pub fn is_default(&self) -> bool {
        self.selectors.contains(&CaseSelector::Default)
    }
}

/// Instruction kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstructionKind {
    // === Values ===
    Binary(BinaryOp),
    Unary(UnaryOp),
    Bitcast,
    Convert,
    Construct,
    Access,
    Swizzle { indices: Vec<u32> },
    Load,
    Let,
    Var { attributes: VarAttributes },
    Call(BuiltinFn),
    UserCall(FunctionId),

    // === Side effects ===
    Store,
    Discard,

    // === Terminators ===
    Return,
    Unreachable,
    /// Leave the given `If` region
    ExitIf(InstId),
    /// Leave the given `Loop` region
    ExitLoop(InstId),
    /// Leave the given `Switch` region
    ExitSwitch(InstId),
    /// Branch back to the loop body from the initializer or continuing block
    NextIteration(InstId),
    /// Continuing-block terminator: exit the loop if the condition holds,
    /// otherwise start the next iteration
    BreakIf { loop_inst: InstId, num_next_iter: u32 },
    /// Jump from the loop body to the continuing block
    Continue(InstId),

    // === Regions ===
    If {
        true_block: BlockId,
        false_block: BlockId,
        merge: BlockId,
    },
    Loop {
        initializer: BlockId,
        body: BlockId,
        continuing: BlockId,
        merge: BlockId,
    },
    Switch {
        cases: Vec<SwitchCase>,
        merge: BlockId,
    },
}

impl InstructionKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstructionKind::Return
                | InstructionKind::Unreachable
                | InstructionKind::ExitIf(_)
                | InstructionKind::ExitLoop(_)
                | InstructionKind::ExitSwitch(_)
                | InstructionKind::NextIteration(_)
                | InstructionKind::BreakIf { .. }
                | InstructionKind::Continue(_)
        ) || self.is_region()
    }

    pub fn is_region(&self) -> bool {
        matches!(
            self,
            InstructionKind::If { .. } | InstructionKind::Loop { .. } | InstructionKind::Switch { .. }
        )
    }

    /// Terminators that pass arguments to the block parameters of their target.
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            InstructionKind::ExitIf(_)
                | InstructionKind::ExitLoop(_)
                | InstructionKind::ExitSwitch(_)
                | InstructionKind::NextIteration(_)
                | InstructionKind::BreakIf { .. }
                | InstructionKind::Continue(_)
        )
    }

    /// The region an exit refers to.
    pub fn exit_region(&self) -> Option<InstId> {
        match self {
            InstructionKind::ExitIf(r)
            | InstructionKind::ExitLoop(r)
            | InstructionKind::ExitSwitch(r)
            | InstructionKind::NextIteration(r)
            | InstructionKind::Continue(r) => Some(*r),
            InstructionKind::BreakIf { loop_inst, .. } => Some(*loop_inst),
            _ => None,
        }
    }

    pub fn has_side_effects(&self) -> bool {
        match self {
            InstructionKind::Store
            | InstructionKind::Discard
            | InstructionKind::Var { .. }
            | InstructionKind::UserCall(_) => true,
            InstructionKind::Call(f) => {
                matches!(f, BuiltinFn::WorkgroupBarrier | BuiltinFn::StorageBarrier)
            }
            kind => kind.is_terminator(),
        }
    }

    /// Child blocks of a region, in emission order (merge last).
    pub fn region_blocks(&self) -> SmallVec<[BlockId; 4]> {
        match self {
            InstructionKind::If {
                true_block,
                false_block,
                merge,
            } => SmallVec::from_slice(&[*true_block, *false_block, *merge]),
            InstructionKind::Loop {
                initializer,
                body,
                continuing,
                merge,
            } => SmallVec::from_slice(&[*initializer, *body, *continuing, *merge]),
            InstructionKind::Switch { cases, merge } => {
                let mut blocks: SmallVec<[BlockId; 4]> = cases.iter().map(|c| c.block).collect();
                blocks.push(*merge);
                blocks
            }
            _ => SmallVec::new(),
        }
    }

    pub fn merge_block(&self) -> Option<BlockId> {
        match self {
            InstructionKind::If { merge, .. }
            | InstructionKind::Loop { merge, .. }
            | InstructionKind::Switch { merge, .. } => Some(*merge),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstructionKind::Binary(op) => op.name(),
            InstructionKind::Unary(op) => op.name(),
            InstructionKind::Bitcast => "bitcast",
            InstructionKind::Convert => "convert",
            InstructionKind::Construct => "construct",
            InstructionKind::Access => "access",
            InstructionKind::Swizzle { .. } => "swizzle",
            InstructionKind::Load => "load",
            InstructionKind::Let => "let",
            InstructionKind::Var { .. } => "var",
            InstructionKind::Call(f) => f.name(),
            InstructionKind::UserCall(_) => "call",
            InstructionKind::Store => "store",
            InstructionKind::Discard => "discard",
            InstructionKind::Return => "ret",
            InstructionKind::Unreachable => "unreachable",
            InstructionKind::ExitIf(_) => "exit_if",
            InstructionKind::ExitLoop(_) => "exit_loop",
            InstructionKind::ExitSwitch(_) => "exit_switch",
            InstructionKind::NextIteration(_) => "next_iteration",
            InstructionKind::BreakIf { .. } => "break_if",
            InstructionKind::Continue(_) => "continue",
            InstructionKind::If { .. } => "if",
            InstructionKind::Loop { .. } => "loop",
            InstructionKind::Switch { .. } => "switch",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// An instruction in a block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub operands: SmallVec<[ValueId; 4]>,
    pub result: Option<ValueId>,
    /// Block the instruction was appended to
    pub block: BlockId,
    /// Cleared by `Module::remove_instruction`
    pub alive: bool,
}

impl Instruction {
    pub fn is_terminator(&self) -> bool {
        self.kind.is_terminator()
    }

    pub fn has_side_effects(&self) -> bool {
        self.kind.has_side_effects()
    }

    pub fn operand(&self, index: usize) -> Option<ValueId> {
        self.operands.get(index).copied()
    }

    /// Condition operand of `If` and `BreakIf`.
    pub fn condition(&self) -> Option<ValueId> {
        match self.kind {
            InstructionKind::If { .. } | InstructionKind::BreakIf { .. } => self.operand(0),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_classification() {
        assert!(InstructionKind::Return.is_terminator());
        assert!(InstructionKind::ExitIf(InstId(0)).is_terminator());
        assert!(InstructionKind::If {
            true_block: BlockId(1),
            false_block: BlockId(2),
            merge: BlockId(3)
        }
        .is_terminator());
        assert!(!InstructionKind::Store.is_terminator());
        assert!(!InstructionKind::Binary(BinaryOp::Add).is_terminator());
    }

    #[test]
    fn test_side_effects() {
        assert!(InstructionKind::Store.has_side_effects());
        assert!(InstructionKind::Call(BuiltinFn::WorkgroupBarrier).has_side_effects());
        assert!(!InstructionKind::Call(BuiltinFn::Sqrt).has_side_effects());
        assert!(!InstructionKind::Load.has_side_effects());
    }

    #[test]
    fn test_exit_region() {
        let brk = InstructionKind::BreakIf {
            loop_inst: InstId(4),
            num_next_iter: 1,
        };
        assert_eq!(brk.exit_region(), Some(InstId(4)));
        assert!(brk.is_exit());
        assert_eq!(InstructionKind::Return.exit_region(), None);
    }

    #[test]
    fn test_switch_default_detection() {
        let case = SwitchCase {
            selectors: vec![CaseSelector::Value(ConstantId(0)), CaseSelector::Default],
            block: BlockId(2),
        };
        assert!(case.is_default());
    }
}
