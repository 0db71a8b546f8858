//! IR Builder
//!
//! The builder is the only supported way to construct IR. It keeps an
//! insertion point (current function and block) and provides one factory per
//! instruction kind. Region factories (`if_`, `loop_`, `switch`) allocate the
//! child blocks of the region, terminate the current block with the region
//! instruction and move the insertion point to the region's merge block.
//!
//! Passing ids that do not belong to the module, or building without an
//! insertion point, is a contract violation and panics.

use tracing::{debug, trace};

use super::{
    Access, AddressSpace, BinaryOp, Block, BlockId, BlockRole, BuiltinFn, CaseSelector,
    ConstantValue, Function, FunctionId, InstId, InstructionKind, Module, PipelineStage,
    SwitchCase, TypeId, TypeManager, UnaryOp, ValueData, ValueId, ValueKind, VarAttributes,
};

/// Blocks of an `If` region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfRegion {
    pub inst: InstId,
    pub true_block: BlockId,
    pub false_block: BlockId,
    pub merge: BlockId,
}

/// Blocks of a `Loop` region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRegion {
    pub inst: InstId,
    /// Only emitted when it ends in a terminator
    pub initializer: BlockId,
    pub body: BlockId,
    pub continuing: BlockId,
    pub merge: BlockId,
}

/// A `Switch` region; cases are added with [`Builder::case`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRegion {
    pub inst: InstId,
    pub merge: BlockId,
}

/// IR builder for constructing shader modules
pub struct Builder {
    /// The module being built
    pub module: Module,

    /// Function being built
    current_function: Option<FunctionId>,

    /// Insertion block
    current_block: Option<BlockId>,
}

impl Builder {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self::from_module(Module::new(module_name))
    }

    /// Continue building into an existing module.
    pub fn from_module(module: Module) -> Self {
        Self {
            module,
            current_function: None,
            current_block: None,
        }
    }

    /// Finish the current function, if any, and hand out the module.
    pub fn finish(mut self) -> Module {
        if self.current_function.is_some() {
            self.finish_function();
        }
        self.module
    }

    pub fn types(&mut self) -> &mut TypeManager {
        self.module.types_mut()
    }

    // === Functions ===

    /// Start a new function and place the insertion point in its entry block.
    /// A function still under construction is finished first.
    pub fn function(&mut self, name: &str, return_type: TypeId) -> FunctionId {
        if self.current_function.is_some() {
            self.finish_function();
        }
        let sym = self.module.symbols_mut().new_symbol(name);
        let id = FunctionId(self.module.function_count() as u32);
        let start = self.module.add_block(Block::new(BlockRole::Entry, None, Some(id)));
        let created = self.module.add_function(Function {
            name: sym,
            return_type,
            params: Vec::new(),
            start,
            stage: None,
            workgroup_size: None,
        });
        debug_assert_eq!(created, id);
        debug!("Started function {} ({})", name, id);
        self.current_function = Some(id);
        self.current_block = Some(start);
        id
    }

    /// Start a new entry point returning void.
    pub fn entry_point(
        &mut self,
        name: &str,
        stage: PipelineStage,
        workgroup_size: Option<[u32; 3]>,
    ) -> FunctionId {
        let void = self.types().void();
        let id = self.function(name, void);
        let function = self.module.function_mut(id);
        function.stage = Some(stage);
        function.workgroup_size = workgroup_size;
        id
    }

    /// Append a parameter to `function`.
    pub fn function_param(&mut self, function: FunctionId, name: &str, ty: TypeId) -> ValueId {
        let index = self.module.function(function).params.len() as u32;
        let value = self
            .module
            .add_value(ValueData::new(ty, ValueKind::FunctionParam { function, index }));
        self.module.set_name(value, name);
        self.module.function_mut(function).params.push(value);
        value
    }

    /// Fill in terminators the structure implies. Empty merge blocks are
    /// unreachable and become `unreachable`. An empty branch of an `If` or
    /// case of a `Switch` exits its region, and an empty loop body continues,
    /// as long as the target block takes no arguments. Anything else left
    /// unterminated is reported by the validator.
    pub fn finish_function(&mut self) {
        let Some(function) = self.current_function.take() else {
            return;
        };
        self.current_block = None;

        let empty: Vec<(BlockId, BlockRole, Option<InstId>)> = self
            .module
            .blocks()
            .filter(|(_, b)| b.function == Some(function) && b.is_empty())
            .map(|(id, b)| (id, b.role, b.parent))
            .collect();
        for (block, role, parent) in empty {
            match (role, parent) {
                (BlockRole::Merge, _) => {
                    trace!("Sealing unreachable merge {}", block);
                    self.module
                        .append_instruction(block, InstructionKind::Unreachable, &[], None);
                }
                (BlockRole::True | BlockRole::False, Some(if_inst)) => {
                    self.seal_without_args(block, if_inst, InstructionKind::ExitIf(if_inst));
                }
                (BlockRole::Case, Some(switch_inst)) => {
                    self.seal_without_args(
                        block,
                        switch_inst,
                        InstructionKind::ExitSwitch(switch_inst),
                    );
                }
                (BlockRole::Body, Some(loop_inst)) => {
                    self.seal_without_args(block, loop_inst, InstructionKind::Continue(loop_inst));
                }
                _ => {}
            }
        }
        debug!("Finished function {}", self.module.function_name(function));
    }

    /// Terminate `block` with `exit` if the block `exit` jumps to takes no
    /// parameters.
    fn seal_without_args(&mut self, block: BlockId, region: InstId, exit: InstructionKind) {
        let target = match (&exit, &self.module.instruction(region).kind) {
            (InstructionKind::Continue(_), InstructionKind::Loop { continuing, .. }) => {
                Some(*continuing)
            }
            (_, kind) => kind.merge_block(),
        };
        if target.is_some_and(|t| self.module.block(t).params.is_empty()) {
            trace!("Sealing empty {} with {}", block, exit.name());
            self.module.append_instruction(block, exit, &[], None);
        }
    }

    pub fn current_function(&self) -> Option<FunctionId> {
        self.current_function
    }

    // === Insertion point ===

    pub fn set_insertion_point(&mut self, block: BlockId) {
        if self.module.try_block(block).is_none() {
            panic!("internal compiler error: insertion point {} does not exist", block);
        }
        self.current_block = Some(block);
    }

    pub fn insertion_point(&self) -> Option<BlockId> {
        self.current_block
    }

    /// Run `f` with the insertion point at `block`, then restore it.
    pub fn with_block<R>(&mut self, block: BlockId, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.current_block;
        self.set_insertion_point(block);
        let result = f(self);
        self.current_block = saved;
        result
    }

    /// Run `f` with the insertion point at the module root block.
    pub fn with_root<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let root = self.module.root_block();
        self.with_block(root, f)
    }

    fn block_or_ice(&self) -> BlockId {
        match self.current_block {
            Some(b) => b,
            None => panic!("internal compiler error: no insertion point"),
        }
    }

    fn append(
        &mut self,
        kind: InstructionKind,
        operands: &[ValueId],
        result_ty: Option<TypeId>,
    ) -> InstId {
        let block = self.block_or_ice();
        if let Some(term) = self.module.terminator(block) {
            panic!(
                "internal compiler error: appending {} to {} after its terminator {}",
                kind.name(),
                block,
                term
            );
        }
        trace!("{}: {}", block, kind.name());
        self.module.append_instruction(block, kind, operands, result_ty)
    }

    fn append_value(&mut self, kind: InstructionKind, operands: &[ValueId], ty: TypeId) -> ValueId {
        let inst = self.append(kind, operands, Some(ty));
        match self.module.instruction(inst).result {
            Some(v) => v,
            None => panic!("internal compiler error: {} produced no result", inst),
        }
    }

    fn new_block(&mut self, role: BlockRole, parent: InstId) -> BlockId {
        let owner = self.module.instruction(parent).block;
        let function = self.module.block(owner).function;
        self.module.add_block(Block::new(role, Some(parent), function))
    }

    // === Constants ===

    pub fn constant(&mut self, value: ConstantValue) -> ValueId {
        self.module.constant_value(value)
    }

    pub fn const_i32(&mut self, v: i32) -> ValueId {
        self.constant(ConstantValue::I32(v))
    }

    pub fn const_u32(&mut self, v: u32) -> ValueId {
        self.constant(ConstantValue::U32(v))
    }

    pub fn const_f32(&mut self, v: f32) -> ValueId {
        self.constant(ConstantValue::f32(v))
    }

    pub fn const_bool(&mut self, v: bool) -> ValueId {
        self.constant(ConstantValue::Bool(v))
    }

    pub fn zero(&mut self, ty: TypeId) -> ValueId {
        self.constant(ConstantValue::Zero(ty))
    }

    // === Values ===

    pub fn binary(&mut self, op: BinaryOp, ty: TypeId, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.append_value(InstructionKind::Binary(op), &[lhs, rhs], ty)
    }

    pub fn add(&mut self, ty: TypeId, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Add, ty, lhs, rhs)
    }

    pub fn multiply(&mut self, ty: TypeId, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.binary(BinaryOp::Multiply, ty, lhs, rhs)
    }

    pub fn less_than(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let bool_ty = self.types().bool();
        self.binary(BinaryOp::LessThan, bool_ty, lhs, rhs)
    }

    pub fn equal(&mut self, lhs: ValueId, rhs: ValueId) -> ValueId {
        let bool_ty = self.types().bool();
        self.binary(BinaryOp::Equal, bool_ty, lhs, rhs)
    }

    pub fn unary(&mut self, op: UnaryOp, ty: TypeId, value: ValueId) -> ValueId {
        self.append_value(InstructionKind::Unary(op), &[value], ty)
    }

    pub fn bitcast(&mut self, ty: TypeId, value: ValueId) -> ValueId {
        self.append_value(InstructionKind::Bitcast, &[value], ty)
    }

    pub fn convert(&mut self, ty: TypeId, value: ValueId) -> ValueId {
        self.append_value(InstructionKind::Convert, &[value], ty)
    }

    pub fn construct(&mut self, ty: TypeId, args: &[ValueId]) -> ValueId {
        self.append_value(InstructionKind::Construct, args, ty)
    }

    /// Index into a composite. When `object` is a pointer, `ty` must be a
    /// pointer to the element.
    pub fn access(&mut self, ty: TypeId, object: ValueId, indices: &[ValueId]) -> ValueId {
        let mut operands = Vec::with_capacity(indices.len() + 1);
        operands.push(object);
        operands.extend_from_slice(indices);
        self.append_value(InstructionKind::Access, &operands, ty)
    }

    pub fn swizzle(&mut self, ty: TypeId, value: ValueId, indices: &[u32]) -> ValueId {
        self.append_value(
            InstructionKind::Swizzle {
                indices: indices.to_vec(),
            },
            &[value],
            ty,
        )
    }

    /// Load through a pointer; the result has the pointer's store type.
    pub fn load(&mut self, from: ValueId) -> ValueId {
        let ptr_ty = self.module.value_type(from);
        let ty = match self.module.types().pointee(ptr_ty) {
            Some((_, store, _)) => store,
            None => panic!(
                "internal compiler error: load from non-pointer {} of type {}",
                from,
                self.module.types().name(ptr_ty)
            ),
        };
        self.append_value(InstructionKind::Load, &[from], ty)
    }

    pub fn store(&mut self, to: ValueId, from: ValueId) -> InstId {
        self.append(InstructionKind::Store, &[to, from], None)
    }

    /// Function-scope variable of pointer type `ptr_ty`.
    pub fn var(&mut self, ptr_ty: TypeId, initializer: Option<ValueId>) -> ValueId {
        self.var_with(ptr_ty, initializer, VarAttributes::default())
    }

    pub fn var_with(
        &mut self,
        ptr_ty: TypeId,
        initializer: Option<ValueId>,
        attributes: VarAttributes,
    ) -> ValueId {
        let operands: Vec<ValueId> = initializer.into_iter().collect();
        self.append_value(InstructionKind::Var { attributes }, &operands, ptr_ty)
    }

    /// Module-scope variable in the root block, named `name`.
    pub fn global_var(
        &mut self,
        name: &str,
        space: AddressSpace,
        store: TypeId,
        access: Access,
        attributes: VarAttributes,
    ) -> ValueId {
        let ptr_ty = self.types().ptr(space, store, access);
        let var = self.with_root(|b| b.var_with(ptr_ty, None, attributes));
        self.module.set_name(var, name);
        var
    }

    /// Named alias of `value`.
    pub fn let_(&mut self, name: &str, value: ValueId) -> ValueId {
        let ty = self.module.value_type(value);
        let result = self.append_value(InstructionKind::Let, &[value], ty);
        self.module.set_name(result, name);
        result
    }

    /// Call a core builtin. Returns `None` for builtins without a result.
    pub fn call(&mut self, ty: TypeId, builtin: BuiltinFn, args: &[ValueId]) -> Option<ValueId> {
        if self.module.types().is_void(ty) {
            self.append(InstructionKind::Call(builtin), args, None);
            None
        } else {
            Some(self.append_value(InstructionKind::Call(builtin), args, ty))
        }
    }

    /// Call a function of this module. Returns `None` for void functions.
    pub fn user_call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId> {
        let ty = self.module.function(function).return_type;
        if self.module.types().is_void(ty) {
            self.append(InstructionKind::UserCall(function), args, None);
            None
        } else {
            Some(self.append_value(InstructionKind::UserCall(function), args, ty))
        }
    }

    pub fn discard(&mut self) -> InstId {
        self.append(InstructionKind::Discard, &[], None)
    }

    // === Terminators ===

    pub fn return_(&mut self, value: Option<ValueId>) -> InstId {
        let operands: Vec<ValueId> = value.into_iter().collect();
        self.append(InstructionKind::Return, &operands, None)
    }

    pub fn unreachable(&mut self) -> InstId {
        self.append(InstructionKind::Unreachable, &[], None)
    }

    pub fn exit_if(&mut self, if_inst: InstId, args: &[ValueId]) -> InstId {
        self.append(InstructionKind::ExitIf(if_inst), args, None)
    }

    pub fn exit_loop(&mut self, loop_inst: InstId, args: &[ValueId]) -> InstId {
        self.append(InstructionKind::ExitLoop(loop_inst), args, None)
    }

    pub fn exit_switch(&mut self, switch_inst: InstId, args: &[ValueId]) -> InstId {
        self.append(InstructionKind::ExitSwitch(switch_inst), args, None)
    }

    pub fn next_iteration(&mut self, loop_inst: InstId, args: &[ValueId]) -> InstId {
        self.append(InstructionKind::NextIteration(loop_inst), args, None)
    }

    /// Exit the loop with `exit_args` when `condition` is true, otherwise
    /// iterate again with `next_args`.
    pub fn break_if(
        &mut self,
        loop_inst: InstId,
        condition: ValueId,
        next_args: &[ValueId],
        exit_args: &[ValueId],
    ) -> InstId {
        let mut operands = Vec::with_capacity(1 + next_args.len() + exit_args.len());
        operands.push(condition);
        operands.extend_from_slice(next_args);
        operands.extend_from_slice(exit_args);
        self.append(
            InstructionKind::BreakIf {
                loop_inst,
                num_next_iter: next_args.len() as u32,
            },
            &operands,
            None,
        )
    }

    pub fn continue_(&mut self, loop_inst: InstId, args: &[ValueId]) -> InstId {
        self.append(InstructionKind::Continue(loop_inst), args, None)
    }

    // === Regions ===

    fn patch_region(&mut self, inst: InstId, kind: InstructionKind) {
        self.module.instruction_mut(inst).kind = kind;
    }

    pub fn if_(&mut self, condition: ValueId) -> IfRegion {
        // Blocks need the instruction id as parent, so the instruction is
        // appended first and patched with its blocks afterwards.
        let placeholder = InstructionKind::If {
            true_block: BlockId(u32::MAX),
            false_block: BlockId(u32::MAX),
            merge: BlockId(u32::MAX),
        };
        let inst = self.append(placeholder, &[condition], None);
        let true_block = self.new_block(BlockRole::True, inst);
        let false_block = self.new_block(BlockRole::False, inst);
        let merge = self.new_block(BlockRole::Merge, inst);
        self.patch_region(
            inst,
            InstructionKind::If {
                true_block,
                false_block,
                merge,
            },
        );
        debug!("if {}: true {}, false {}, merge {}", inst, true_block, false_block, merge);
        self.current_block = Some(merge);
        IfRegion {
            inst,
            true_block,
            false_block,
            merge,
        }
    }

    pub fn loop_(&mut self) -> LoopRegion {
        let placeholder = InstructionKind::Loop {
            initializer: BlockId(u32::MAX),
            body: BlockId(u32::MAX),
            continuing: BlockId(u32::MAX),
            merge: BlockId(u32::MAX),
        };
        let inst = self.append(placeholder, &[], None);
        let initializer = self.new_block(BlockRole::Initializer, inst);
        let body = self.new_block(BlockRole::Body, inst);
        let continuing = self.new_block(BlockRole::Continuing, inst);
        let merge = self.new_block(BlockRole::Merge, inst);
        self.patch_region(
            inst,
            InstructionKind::Loop {
                initializer,
                body,
                continuing,
                merge,
            },
        );
        debug!(
            "loop {}: init {}, body {}, continuing {}, merge {}",
            inst, initializer, body, continuing, merge
        );
        self.current_block = Some(merge);
        LoopRegion {
            inst,
            initializer,
            body,
            continuing,
            merge,
        }
    }

    pub fn switch(&mut self, selector: ValueId) -> SwitchRegion {
        let placeholder = InstructionKind::Switch {
            cases: Vec::new(),
            merge: BlockId(u32::MAX),
        };
        let inst = self.append(placeholder, &[selector], None);
        let merge = self.new_block(BlockRole::Merge, inst);
        self.patch_region(
            inst,
            InstructionKind::Switch {
                cases: Vec::new(),
                merge,
            },
        );
        debug!("switch {}: merge {}", inst, merge);
        self.current_block = Some(merge);
        SwitchRegion { inst, merge }
    }

    /// Add a case to a switch and return its block.
    pub fn case(&mut self, region: SwitchRegion, selectors: &[CaseSelector]) -> BlockId {
        let block = self.new_block(BlockRole::Case, region.inst);
        match &mut self.module.instruction_mut(region.inst).kind {
            InstructionKind::Switch { cases, .. } => cases.push(SwitchCase {
                selectors: selectors.to_vec(),
                block,
            }),
            other => panic!(
                "internal compiler error: case added to {} which is not a switch",
                other.name()
            ),
        }
        block
    }

    /// Selector matching the `i32` value `v`.
    pub fn case_i32(&mut self, v: i32) -> CaseSelector {
        CaseSelector::Value(self.module.intern_constant(ConstantValue::I32(v)))
    }

    /// Declare a block parameter of type `ty`.
    pub fn block_param(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        if self.module.try_block(block).is_none() {
            panic!("internal compiler error: block param on unknown block {}", block);
        }
        self.module.add_block_param(block, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::validation::validate_module;

    #[test]
    fn test_if_moves_insertion_point_to_merge() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let cond = b.const_bool(true);
        let region = b.if_(cond);
        assert_eq!(b.insertion_point(), Some(region.merge));
        assert_eq!(b.module.block(region.merge).role, BlockRole::Merge);
        assert_eq!(b.module.block(region.true_block).parent, Some(region.inst));
    }

    #[test]
    fn test_finish_function_seals_blocks() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let cond = b.const_bool(true);
        let region = b.if_(cond);
        b.with_block(region.true_block, |b| b.return_(None));
        b.return_(None);
        let module = b.finish();

        // False block falls through to the merge
        let false_term = module.terminator(region.false_block).unwrap();
        assert_eq!(
            module.instruction(false_term).kind,
            InstructionKind::ExitIf(region.inst)
        );
        assert!(module.terminator(region.merge).is_some());
    }

    #[test]
    fn test_empty_merge_becomes_unreachable() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let cond = b.const_bool(true);
        let region = b.if_(cond);
        b.with_block(region.true_block, |b| b.return_(None));
        b.with_block(region.false_block, |b| b.return_(None));
        let module = b.finish();

        let term = module.terminator(region.merge).unwrap();
        assert_eq!(module.instruction(term).kind, InstructionKind::Unreachable);
    }

    #[test]
    fn test_empty_true_block_exits_if() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let cond = b.const_bool(false);
        let region = b.if_(cond);
        b.with_block(region.false_block, |b| b.return_(None));
        b.return_(None);
        let module = b.finish();

        let term = module.terminator(region.true_block).unwrap();
        assert_eq!(module.instruction(term).kind, InstructionKind::ExitIf(region.inst));
        assert!(validate_module(&module).is_ok());
    }

    #[test]
    fn test_empty_branch_stays_open_when_merge_takes_values() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        let i32_ty = b.types().i32();
        b.function("f", void);
        let cond = b.const_bool(true);
        let region = b.if_(cond);
        b.block_param(region.merge, i32_ty);
        let one = b.const_i32(1);
        b.with_block(region.false_block, |b| b.exit_if(region.inst, &[one]));
        b.return_(None);
        let module = b.finish();

        assert!(module.terminator(region.true_block).is_none());
        let err = validate_module(&module).unwrap_err();
        assert!(err.has_code("E9001"));
    }

    #[test]
    fn test_empty_case_exits_switch() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let sel = b.const_i32(1);
        let region = b.switch(sel);
        let c1 = b.constant(ConstantValue::I32(1));
        let k1 = b.module.value(c1).constant().unwrap();
        let empty = b.case(region, &[CaseSelector::Value(k1)]);
        let default = b.case(region, &[CaseSelector::Default]);
        b.with_block(default, |b| b.exit_switch(region.inst, &[]));
        b.return_(None);
        let module = b.finish();

        let term = module.terminator(empty).unwrap();
        assert_eq!(module.instruction(term).kind, InstructionKind::ExitSwitch(region.inst));
        assert!(validate_module(&module).is_ok());
    }

    #[test]
    fn test_empty_body_continues() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let region = b.loop_();
        let stop = b.const_bool(true);
        b.with_block(region.continuing, |b| b.break_if(region.inst, stop, &[], &[]));
        b.return_(None);
        let module = b.finish();

        let term = module.terminator(region.body).unwrap();
        assert_eq!(module.instruction(term).kind, InstructionKind::Continue(region.inst));
        assert!(validate_module(&module).is_ok());
    }

    #[test]
    fn test_load_takes_store_type() {
        let mut b = Builder::new("test");
        let i32_ty = b.types().i32();
        let ptr = b.types().ptr(AddressSpace::Function, i32_ty, Access::ReadWrite);
        b.function("f", i32_ty);
        let var = b.var(ptr, None);
        let loaded = b.load(var);
        assert_eq!(b.module.value_type(loaded), i32_ty);
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_append_after_terminator_panics() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        b.return_(None);
        b.return_(None);
    }

    #[test]
    #[should_panic(expected = "internal compiler error")]
    fn test_no_insertion_point_panics() {
        let mut b = Builder::new("test");
        b.const_i32(1);
        b.unreachable();
    }

    #[test]
    fn test_break_if_operand_layout() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        let i32_ty = b.types().i32();
        b.function("f", void);
        let region = b.loop_();
        let exit_param = b.block_param(region.merge, i32_ty);
        let one = b.const_i32(1);
        let cond = b.const_bool(false);
        let brk = b.with_block(region.continuing, |b| b.break_if(region.inst, cond, &[], &[one]));
        let targets = b.module.branch_targets(brk);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0], (region.body, 1..1));
        assert_eq!(targets[1], (region.merge, 1..2));
        assert_eq!(b.module.value(exit_param).ty, i32_ty);
    }

    #[test]
    fn test_switch_cases() {
        let mut b = Builder::new("test");
        let void = b.types().void();
        b.function("f", void);
        let sel = b.const_i32(2);
        let region = b.switch(sel);
        let c1 = b.constant(ConstantValue::I32(1));
        let k1 = b.module.value(c1).constant().unwrap();
        let case_a = b.case(region, &[CaseSelector::Value(k1)]);
        let case_b = b.case(region, &[CaseSelector::Default]);
        match &b.module.instruction(region.inst).kind {
            InstructionKind::Switch { cases, merge } => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].block, case_a);
                assert_eq!(cases[1].block, case_b);
                assert_eq!(*merge, region.merge);
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }
}
