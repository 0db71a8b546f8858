//! IR Modules
//!
//! The module owns every arena of the IR: values, instructions, blocks and
//! functions, plus the type, constant and symbol interners. All cross
//! references are indices into these arenas.
//!
//! Operand lists must only be changed through [`Module::set_operand`],
//! [`Module::replace_all_uses_with`] and [`Module::remove_instruction`];
//! these keep the per-value usage lists and per-block inbound lists in sync.

use super::{
    Block, BlockId, BlockRole, ConstantId, ConstantManager, ConstantValue, Function, FunctionId,
    InstId, Instruction, InstructionKind, SymbolId, SymbolTable, TypeId, TypeManager, Usage,
    ValueData, ValueId, ValueKind,
};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::ops::Range;

/// Target of a branching terminator and the operand slice passed to it.
pub type BranchTarget = (BlockId, Range<usize>);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    types: TypeManager,
    constants: ConstantManager,
    symbols: SymbolTable,
    values: Vec<ValueData>,
    instructions: Vec<Instruction>,
    blocks: Vec<Block>,
    functions: Vec<Function>,
    root_block: BlockId,
    #[serde(skip)]
    constant_values: FxHashMap<ConstantId, ValueId>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypeManager::new(),
            constants: ConstantManager::new(),
            symbols: SymbolTable::new(),
            values: Vec::new(),
            instructions: Vec::new(),
            blocks: vec![Block::new(BlockRole::Root, None, None)],
            functions: Vec::new(),
            root_block: BlockId(0),
            constant_values: FxHashMap::default(),
        }
    }

    // === Interners ===

    pub fn types(&self) -> &TypeManager {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeManager {
        &mut self.types
    }

    pub fn constants(&self) -> &ConstantManager {
        &self.constants
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Intern a constant without creating a value for it.
    pub fn intern_constant(&mut self, value: ConstantValue) -> ConstantId {
        self.constants.get(&mut self.types, value)
    }

    /// Intern a constant and return the value that refers to it. Equal
    /// constants share one value.
    pub fn constant_value(&mut self, value: ConstantValue) -> ValueId {
        let id = self.constants.get(&mut self.types, value);
        if let Some(&v) = self.constant_values.get(&id) {
            return v;
        }
        let ty = self.constants.resolve(id).ty;
        let v = self.add_value(ValueData::new(ty, ValueKind::Constant(id)));
        self.constant_values.insert(id, v);
        v
    }

    // === Arenas ===

    pub fn functions(&self) -> impl Iterator<Item = (FunctionId, &Function)> {
        self.functions
            .iter()
            .enumerate()
            .map(|(i, f)| (FunctionId(i as u32), f))
    }

    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        match self.functions.get(id.index()) {
            Some(f) => f,
            None => panic!("internal compiler error: unknown function {}", id),
        }
    }

    pub fn try_function(&self, id: FunctionId) -> Option<&Function> {
        self.functions.get(id.index())
    }

    pub(crate) fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        match self.functions.get_mut(id.index()) {
            Some(f) => f,
            None => panic!("internal compiler error: unknown function {}", id),
        }
    }

    pub fn function_by_name(&self, name: &str) -> Option<FunctionId> {
        let sym = self.symbols.get(name)?;
        self.functions()
            .find(|(_, f)| f.name == sym)
            .map(|(id, _)| id)
    }

    pub fn function_name(&self, id: FunctionId) -> &str {
        self.symbols.name(self.function(id).name)
    }

    pub fn value(&self, id: ValueId) -> &ValueData {
        match self.values.get(id.index()) {
            Some(v) => v,
            None => panic!("internal compiler error: unknown value {}", id),
        }
    }

    pub fn try_value(&self, id: ValueId) -> Option<&ValueData> {
        self.values.get(id.index())
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn value_type(&self, id: ValueId) -> TypeId {
        self.value(id).ty
    }

    pub fn instruction(&self, id: InstId) -> &Instruction {
        match self.instructions.get(id.index()) {
            Some(i) => i,
            None => panic!("internal compiler error: unknown instruction {}", id),
        }
    }

    pub fn try_instruction(&self, id: InstId) -> Option<&Instruction> {
        self.instructions.get(id.index())
    }

    pub(crate) fn instruction_mut(&mut self, id: InstId) -> &mut Instruction {
        match self.instructions.get_mut(id.index()) {
            Some(i) => i,
            None => panic!("internal compiler error: unknown instruction {}", id),
        }
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        match self.blocks.get(id.index()) {
            Some(b) => b,
            None => panic!("internal compiler error: unknown block {}", id),
        }
    }

    pub fn try_block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> &mut Block {
        match self.blocks.get_mut(id.index()) {
            Some(b) => b,
            None => panic!("internal compiler error: unknown block {}", id),
        }
    }

    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockId(i as u32), b))
    }

    /// Block holding module-scope variables
    pub fn root_block(&self) -> BlockId {
        self.root_block
    }

    // === Construction ===

    pub(crate) fn add_value(&mut self, data: ValueData) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(data);
        id
    }

    pub(crate) fn add_block(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub(crate) fn add_function(&mut self, function: Function) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.functions.push(function);
        id
    }

    /// Append an instruction to `block`. A result value of type `result_ty`
    /// is created when given. Usages of every operand and inbound edges of
    /// every branch target are recorded.
    pub(crate) fn append_instruction(
        &mut self,
        block: BlockId,
        kind: InstructionKind,
        operands: &[ValueId],
        result_ty: Option<TypeId>,
    ) -> InstId {
        let id = InstId(self.instructions.len() as u32);
        for (i, &operand) in operands.iter().enumerate() {
            if operand.index() >= self.values.len() {
                panic!(
                    "internal compiler error: operand {} of {} refers to unknown value {}",
                    i,
                    kind.name(),
                    operand
                );
            }
            self.values[operand.index()].usages.push(Usage {
                instruction: id,
                operand: i as u32,
            });
        }
        let result = result_ty
            .map(|ty| self.add_value(ValueData::new(ty, ValueKind::InstructionResult(id))));
        self.instructions.push(Instruction {
            kind,
            operands: SmallVec::from_slice(operands),
            result,
            block,
            alive: true,
        });
        self.block_mut(block).instructions.push(id);
        for (target, _) in self.branch_targets(id) {
            self.block_mut(target).inbound.push(id);
        }
        id
    }

    pub(crate) fn add_block_param(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        let index = self.block(block).params.len() as u32;
        let value = self.add_value(ValueData::new(ty, ValueKind::BlockParam { block, index }));
        self.block_mut(block).params.push(value);
        value
    }

    // === Rewrites ===

    /// Replace operand `index` of `inst`, moving the usage record from the
    /// old value to the new one.
    pub fn set_operand(&mut self, inst: InstId, index: usize, value: ValueId) {
        if value.index() >= self.values.len() {
            panic!("internal compiler error: set_operand with unknown value {}", value);
        }
        let old = match self.instruction(inst).operand(index) {
            Some(old) => old,
            None => panic!(
                "internal compiler error: {} has no operand {}",
                inst, index
            ),
        };
        let usage = Usage {
            instruction: inst,
            operand: index as u32,
        };
        self.values[old.index()].usages.retain(|u| *u != usage);
        self.values[value.index()].usages.push(usage);
        self.instruction_mut(inst).operands[index] = value;
    }

    /// Rewrite every use of `old` to `new`.
    pub fn replace_all_uses_with(&mut self, old: ValueId, new: ValueId) {
        if old == new {
            return;
        }
        let usages = std::mem::take(&mut self.values[old.index()].usages);
        for usage in usages {
            self.instruction_mut(usage.instruction).operands[usage.operand as usize] = new;
            self.values[new.index()].usages.push(usage);
        }
    }

    /// Detach an instruction from its block. Its result must be unused.
    pub fn remove_instruction(&mut self, inst: InstId) {
        let data = self.instruction(inst);
        if !data.alive {
            return;
        }
        if let Some(result) = data.result {
            if self.value(result).is_used() {
                panic!(
                    "internal compiler error: removing {} whose result {} is still used",
                    inst, result
                );
            }
        }
        let block = data.block;
        let operands = data.operands.clone();
        for (i, operand) in operands.iter().enumerate() {
            let usage = Usage {
                instruction: inst,
                operand: i as u32,
            };
            self.values[operand.index()].usages.retain(|u| *u != usage);
        }
        for (target, _) in self.branch_targets(inst) {
            self.block_mut(target).inbound.retain(|i| *i != inst);
        }
        self.block_mut(block).instructions.retain(|i| *i != inst);
        self.instruction_mut(inst).alive = false;
    }

    // === Queries ===

    /// Blocks a terminator branches to, with the range of its operands that
    /// become the block arguments.
    pub fn branch_targets(&self, inst: InstId) -> SmallVec<[BranchTarget; 2]> {
        let data = self.instruction(inst);
        let n = data.operands.len();
        let mut targets = SmallVec::new();
        let region = |r: InstId| self.try_instruction(r).map(|i| &i.kind);
        match &data.kind {
            InstructionKind::ExitIf(r) | InstructionKind::ExitLoop(r) | InstructionKind::ExitSwitch(r) => {
                if let Some(merge) = region(*r).and_then(|k| k.merge_block()) {
                    targets.push((merge, 0..n));
                }
            }
            InstructionKind::NextIteration(r) => {
                if let Some(InstructionKind::Loop { body, .. }) = region(*r) {
                    targets.push((*body, 0..n));
                }
            }
            InstructionKind::Continue(r) => {
                if let Some(InstructionKind::Loop { continuing, .. }) = region(*r) {
                    targets.push((*continuing, 0..n));
                }
            }
            InstructionKind::BreakIf {
                loop_inst,
                num_next_iter,
            } => {
                if let Some(InstructionKind::Loop { body, merge, .. }) = region(*loop_inst) {
                    let split = (1 + *num_next_iter as usize).min(n);
                    targets.push((*body, 1.min(n)..split));
                    targets.push((*merge, split..n));
                }
            }
            _ => {}
        }
        targets
    }

    /// The terminator of `block`, if its last instruction is one.
    pub fn terminator(&self, block: BlockId) -> Option<InstId> {
        let last = self.block(block).last()?;
        self.instruction(last).is_terminator().then_some(last)
    }

    /// Innermost region enclosing `block`, together with the role the path
    /// to it enters by. Merge blocks sit at the nesting level of the block
    /// that opened their region.
    pub fn enclosing_region(&self, block: BlockId) -> Option<(InstId, BlockRole)> {
        let mut current = block;
        loop {
            let data = self.try_block(current)?;
            let parent = data.parent?;
            if data.role == BlockRole::Merge {
                current = self.try_instruction(parent)?.block;
                continue;
            }
            return Some((parent, data.role));
        }
    }

    /// All regions enclosing `block`, innermost first.
    pub fn region_path(&self, block: BlockId) -> Vec<(InstId, BlockRole)> {
        let mut path = Vec::new();
        let mut current = block;
        while let Some((region, role)) = self.enclosing_region(current) {
            path.push((region, role));
            current = self.instruction(region).block;
        }
        path
    }

    pub fn name_of(&self, value: ValueId) -> Option<&str> {
        self.try_value(value)?
            .name
            .map(|sym| self.symbols.name(sym))
    }

    /// Give a value a debug name, made unique within the module.
    pub fn set_name(&mut self, value: ValueId, name: &str) -> SymbolId {
        let sym = self.symbols.new_symbol(name);
        if let Some(v) = self.values.get_mut(value.index()) {
            v.name = Some(sym);
        }
        sym
    }

    /// Rebuild interner lookups and the constant value cache after
    /// deserialization.
    pub(crate) fn rebuild_indices(&mut self) {
        self.types.rebuild_lookup();
        self.constants.rebuild_lookup();
        self.symbols.rebuild_lookup();
        self.constant_values.clear();
        for (i, value) in self.values.iter().enumerate() {
            if let ValueKind::Constant(c) = value.kind {
                self.constant_values.entry(c).or_insert(ValueId(i as u32));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, Builder};

    #[test]
    fn test_constant_values_are_shared() {
        let mut module = Module::new("test");
        let a = module.constant_value(ConstantValue::I32(1));
        let b = module.constant_value(ConstantValue::I32(1));
        let c = module.constant_value(ConstantValue::I32(2));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_set_operand_moves_usage() {
        let mut b = Builder::new("test");
        let i32_ty = b.types().i32();
        b.function("f", i32_ty);
        let one = b.const_i32(1);
        let two = b.const_i32(2);
        let three = b.const_i32(3);
        let sum = b.binary(BinaryOp::Add, i32_ty, one, two);
        b.return_(Some(sum));
        let inst = match b.module.value(sum).kind {
            ValueKind::InstructionResult(i) => i,
            _ => unreachable!(),
        };

        b.module.set_operand(inst, 1, three);
        assert!(b.module.value(two).usages.is_empty());
        assert_eq!(
            b.module.value(three).usages,
            vec![Usage {
                instruction: inst,
                operand: 1
            }]
        );
    }

    #[test]
    fn test_replace_all_uses_with() {
        let mut b = Builder::new("test");
        let i32_ty = b.types().i32();
        b.function("f", i32_ty);
        let one = b.const_i32(1);
        let two = b.const_i32(2);
        let sum = b.binary(BinaryOp::Add, i32_ty, one, one);
        b.return_(Some(sum));

        b.module.replace_all_uses_with(one, two);
        assert!(b.module.value(one).usages.is_empty());
        assert_eq!(b.module.value(two).usages.len(), 2);
    }

    #[test]
    fn test_remove_instruction_clears_usages() {
        let mut b = Builder::new("test");
        let i32_ty = b.types().i32();
        let f = b.function("f", i32_ty);
        let one = b.const_i32(1);
        let dead = b.binary(BinaryOp::Add, i32_ty, one, one);
        b.return_(Some(one));
        let inst = match b.module.value(dead).kind {
            ValueKind::InstructionResult(i) => i,
            _ => unreachable!(),
        };
        let start = b.module.function(f).start;
        assert_eq!(b.module.block(start).instructions.len(), 2);

        b.module.remove_instruction(inst);
        assert_eq!(b.module.block(start).instructions.len(), 1);
        assert_eq!(b.module.value(one).usages.len(), 1);
        assert!(!b.module.instruction(inst).alive);
    }

    #[test]
    fn test_exit_records_inbound() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let cond = b.const_bool(true);
        let region = b.if_(cond);
        let exit = b.with_block(region.true_block, |b| b.exit_if(region.inst, &[]));
        assert_eq!(b.module.block(region.merge).inbound, vec![exit]);
        assert_eq!(b.module.enclosing_region(region.true_block), Some((region.inst, BlockRole::True)));
    }
}
