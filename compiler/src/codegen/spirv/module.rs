//! In-memory SPIR-V module
//!
//! Instructions are collected into the sections of the SPIR-V logical
//! layout as the printer discovers them; the binary writer concatenates the
//! sections in order.

use spirv::{Op, Word};

/// One instruction operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Id(Word),
    Literal(u32),
    String(String),
}

impl Operand {
    /// Number of words the operand occupies.
    pub fn word_count(&self) -> usize {
        match self {
            Operand::Id(_) | Operand::Literal(_) => 1,
            Operand::String(s) => s.len() / 4 + 1,
        }
    }

    fn push_words(&self, out: &mut Vec<Word>) {
        match self {
            Operand::Id(w) | Operand::Literal(w) => out.push(*w),
            Operand::String(s) => out.extend(string_to_words(s)),
        }
    }
}

/// Encode a literal string: UTF-8, nul terminated, padded to a word
/// boundary, little-endian within each word.
pub fn string_to_words(s: &str) -> Vec<Word> {
    let bytes = s.as_bytes();
    let mut words = Vec::with_capacity(bytes.len() / 4 + 1);
    for chunk in bytes.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words.push(u32::from_le_bytes(word));
    }
    if bytes.len() % 4 == 0 {
        // Terminator needs a word of its own
        words.push(0);
    }
    words
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub op: Op,
    pub type_id: Option<Word>,
    pub result_id: Option<Word>,
    pub operands: Vec<Operand>,
}

impl Instruction {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            type_id: None,
            result_id: None,
            operands: Vec::new(),
        }
    }

    pub fn with_type(mut self, id: Word) -> Self {
        self.type_id = Some(id);
        self
    }

    pub fn with_result(mut self, id: Word) -> Self {
        self.result_id = Some(id);
        self
    }

    pub fn id(mut self, id: Word) -> Self {
        self.operands.push(Operand::Id(id));
        self
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = Word>) -> Self {
        self.operands.extend(ids.into_iter().map(Operand::Id));
        self
    }

    pub fn literal(mut self, value: u32) -> Self {
        self.operands.push(Operand::Literal(value));
        self
    }

    pub fn literals(mut self, values: impl IntoIterator<Item = u32>) -> Self {
        self.operands.extend(values.into_iter().map(Operand::Literal));
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.operands.push(Operand::String(s.to_string()));
        self
    }

    /// Total word count, including the opcode word.
    pub fn word_count(&self) -> usize {
        1 + self.type_id.is_some() as usize
            + self.result_id.is_some() as usize
            + self.operands.iter().map(Operand::word_count).sum::<usize>()
    }

    pub fn push_words(&self, out: &mut Vec<Word>) {
        out.push(((self.word_count() as u32) << 16) | self.op as u32);
        out.extend(self.type_id);
        out.extend(self.result_id);
        for operand in &self.operands {
            operand.push_words(out);
        }
    }

    // === Common shapes ===

    pub fn capability(capability: spirv::Capability) -> Self {
        Self::new(Op::Capability).literal(capability as u32)
    }

    pub fn extension(name: &str) -> Self {
        Self::new(Op::Extension).string(name)
    }

    pub fn ext_inst_import(id: Word, name: &str) -> Self {
        Self::new(Op::ExtInstImport).with_result(id).string(name)
    }

    pub fn memory_model(addressing: spirv::AddressingModel, memory: spirv::MemoryModel) -> Self {
        Self::new(Op::MemoryModel)
            .literal(addressing as u32)
            .literal(memory as u32)
    }

    pub fn entry_point(
        model: spirv::ExecutionModel,
        function: Word,
        name: &str,
        interface: &[Word],
    ) -> Self {
        Self::new(Op::EntryPoint)
            .literal(model as u32)
            .id(function)
            .string(name)
            .ids(interface.iter().copied())
    }

    pub fn execution_mode(function: Word, mode: spirv::ExecutionMode, args: &[u32]) -> Self {
        Self::new(Op::ExecutionMode)
            .id(function)
            .literal(mode as u32)
            .literals(args.iter().copied())
    }

    pub fn name(target: Word, name: &str) -> Self {
        Self::new(Op::Name).id(target).string(name)
    }

    pub fn member_name(target: Word, member: u32, name: &str) -> Self {
        Self::new(Op::MemberName).id(target).literal(member).string(name)
    }

    pub fn decorate(target: Word, decoration: spirv::Decoration, args: &[u32]) -> Self {
        Self::new(Op::Decorate)
            .id(target)
            .literal(decoration as u32)
            .literals(args.iter().copied())
    }

    pub fn member_decorate(
        target: Word,
        member: u32,
        decoration: spirv::Decoration,
        args: &[u32],
    ) -> Self {
        Self::new(Op::MemberDecorate)
            .id(target)
            .literal(member)
            .literal(decoration as u32)
            .literals(args.iter().copied())
    }

    pub fn label(id: Word) -> Self {
        Self::new(Op::Label).with_result(id)
    }

    pub fn branch(target: Word) -> Self {
        Self::new(Op::Branch).id(target)
    }

    pub fn branch_conditional(condition: Word, true_label: Word, false_label: Word) -> Self {
        Self::new(Op::BranchConditional)
            .id(condition)
            .id(true_label)
            .id(false_label)
    }

    pub fn selection_merge(merge: Word) -> Self {
        Self::new(Op::SelectionMerge)
            .id(merge)
            .literal(spirv::SelectionControl::NONE.bits())
    }

    pub fn loop_merge(merge: Word, continuing: Word) -> Self {
        Self::new(Op::LoopMerge)
            .id(merge)
            .id(continuing)
            .literal(spirv::LoopControl::NONE.bits())
    }

    pub fn binary(op: Op, result_type: Word, id: Word, lhs: Word, rhs: Word) -> Self {
        Self::new(op)
            .with_type(result_type)
            .with_result(id)
            .id(lhs)
            .id(rhs)
    }

    pub fn unary(op: Op, result_type: Word, id: Word, value: Word) -> Self {
        Self::new(op).with_type(result_type).with_result(id).id(value)
    }

    pub fn load(result_type: Word, id: Word, pointer: Word) -> Self {
        Self::new(Op::Load)
            .with_type(result_type)
            .with_result(id)
            .id(pointer)
    }

    pub fn store(pointer: Word, value: Word) -> Self {
        Self::new(Op::Store).id(pointer).id(value)
    }
}

/// A SPIR-V module split into its logical-layout sections
#[derive(Debug, Clone, Default)]
pub struct SpirvModule {
    pub version: (u8, u8),
    pub generator: u32,
    pub id_bound: Word,
    pub capabilities: Vec<Instruction>,
    pub extensions: Vec<Instruction>,
    pub ext_inst_imports: Vec<Instruction>,
    pub memory_model: Vec<Instruction>,
    pub entry_points: Vec<Instruction>,
    pub execution_modes: Vec<Instruction>,
    /// `OpName` / `OpMemberName`
    pub debug: Vec<Instruction>,
    pub annotations: Vec<Instruction>,
    pub types_globals: Vec<Instruction>,
    pub functions: Vec<Instruction>,
}

impl SpirvModule {
    /// All instructions in logical-layout order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.capabilities
            .iter()
            .chain(&self.extensions)
            .chain(&self.ext_inst_imports)
            .chain(&self.memory_model)
            .chain(&self.entry_points)
            .chain(&self.execution_modes)
            .chain(&self.debug)
            .chain(&self.annotations)
            .chain(&self.types_globals)
            .chain(&self.functions)
    }

    pub fn count(&self, op: Op) -> usize {
        self.instructions().filter(|i| i.op == op).count()
    }

    pub fn has_capability(&self, capability: spirv::Capability) -> bool {
        self.capabilities
            .iter()
            .any(|i| i.operands.first() == Some(&Operand::Literal(capability as u32)))
    }
}
