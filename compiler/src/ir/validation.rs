//! IR Validation
//!
//! Checks the structural invariants the SPIR-V generator relies on:
//! terminators, usage lists, operand types, block argument lists, region
//! exits and entry point metadata. Every problem is reported; validation
//! does not stop at the first error.

use super::{
    Access, AddressSpace, BinaryOp, BlockId, BlockRole, CaseSelector, ConstantValue, FunctionId,
    InstId, InstructionKind, Module, PipelineStage, Type, TypeId, UnaryOp, ValueId, ValueKind,
};
use diagnostics::{shader::ShaderDiagnostics, Diagnostics, Location};
use fxhash::FxHashSet;
use tracing::debug;

/// Validate a whole module.
pub fn validate_module(module: &Module) -> Result<(), Diagnostics> {
    let mut ctx = ValidationContext::new(module);
    ctx.validate();
    if ctx.diagnostics.has_errors() {
        debug!(
            "Validation of module '{}' found {} problem(s)",
            module.name,
            ctx.diagnostics.len()
        );
        Err(ctx.diagnostics)
    } else {
        Ok(())
    }
}

struct ValidationContext<'m> {
    module: &'m Module,
    diagnostics: Diagnostics,
    current_function: Option<FunctionId>,
}

impl<'m> ValidationContext<'m> {
    fn new(module: &'m Module) -> Self {
        Self {
            module,
            diagnostics: Diagnostics::new(),
            current_function: None,
        }
    }

    fn location(&self, block: Option<BlockId>, inst: Option<InstId>) -> Location {
        let mut loc = match self.current_function {
            Some(f) => Location::function(self.module.function_name(f)),
            None => Location::module(),
        };
        if let Some(b) = block {
            loc = loc.in_block(b.0);
        }
        if let Some(i) = inst {
            loc = loc.at_instruction(i.0);
        }
        loc
    }

    fn type_name(&self, ty: TypeId) -> String {
        match self.module.types().try_resolve(ty) {
            Some(_) => self.module.types().name(ty),
            None => format!("<invalid {}>", ty),
        }
    }

    fn validate(&mut self) {
        let module = self.module;
        // Every later check resolves types and constants freely
        if !self.validate_references() {
            return;
        }
        self.validate_root();
        let functions: Vec<FunctionId> = module.functions().map(|(id, _)| id).collect();
        for function in functions {
            self.current_function = Some(function);
            self.validate_function(function);
        }
        self.current_function = None;
        self.validate_usages();
    }

    // === Interned references ===

    /// Check that every type and constant id stored in the module resolves.
    /// Returns false when something dangles.
    fn validate_references(&mut self) -> bool {
        let module = self.module;
        let types = module.types();
        let constants = module.constants();
        let before = self.diagnostics.len();

        for (id, ty) in types.iter() {
            for inner in referenced_types(ty) {
                if types.try_resolve(inner).is_none() {
                    self.dangling(
                        Location::module(),
                        format!("{} refers to unknown {}", id, inner),
                    );
                }
            }
        }

        for (id, constant) in constants.iter() {
            if types.try_resolve(constant.ty).is_none() {
                self.dangling(
                    Location::module(),
                    format!("constant {} has unknown {}", id, constant.ty),
                );
            }
            let elements = match &constant.value {
                ConstantValue::Composite { elements, .. } => elements.clone(),
                ConstantValue::Splat { element, .. } => vec![*element],
                _ => Vec::new(),
            };
            for element in elements {
                if constants.try_resolve(element).is_none() {
                    self.dangling(
                        Location::module(),
                        format!("constant {} has unknown element {}", id, element),
                    );
                }
            }
        }

        for index in 0..module.value_count() {
            let value = ValueId(index as u32);
            let data = module.value(value);
            if types.try_resolve(data.ty).is_none() {
                self.dangling(
                    Location::module(),
                    format!("{} has unknown {}", value, data.ty),
                );
            }
            if let ValueKind::Constant(constant) = data.kind {
                if constants.try_resolve(constant).is_none() {
                    self.dangling(
                        Location::module(),
                        format!("{} refers to unknown constant {}", value, constant),
                    );
                }
            }
        }

        for (id, function) in module.functions() {
            if types.try_resolve(function.return_type).is_none() {
                self.dangling(
                    Location::function(module.function_name(id)),
                    format!("return type {}", function.return_type),
                );
            }
        }

        for index in 0..module.instruction_count() {
            let inst = InstId(index as u32);
            let InstructionKind::Switch { cases, .. } = &module.instruction(inst).kind else {
                continue;
            };
            for case in cases {
                for selector in &case.selectors {
                    if let CaseSelector::Value(constant) = selector {
                        if constants.try_resolve(*constant).is_none() {
                            self.dangling(
                                Location::module().at_instruction(inst.0),
                                format!("case selector {}", constant),
                            );
                        }
                    }
                }
            }
        }

        self.diagnostics.len() == before
    }

    fn dangling(&mut self, location: Location, what: String) {
        self.diagnostics.push(ShaderDiagnostics::invalid_reference(location, what));
    }

    // === Module scope ===

    fn validate_root(&mut self) {
        let module = self.module;
        let root = module.root_block();
        for &inst in &module.block(root).instructions {
            let data = module.instruction(inst);
            let loc = self.location(Some(root), Some(inst));
            if !matches!(data.kind, InstructionKind::Var { .. }) {
                self.diagnostics.push(ShaderDiagnostics::operand_type(
                    loc,
                    data.kind.name(),
                    "only variable declarations may appear at module scope",
                ));
                continue;
            }
            self.validate_instruction(root, inst);
        }
    }

    // === Functions ===

    fn validate_function(&mut self, id: FunctionId) {
        let module = self.module;
        let function = module.function(id);
        let types = module.types();

        if let Some(stage) = function.stage {
            if !types.is_void(function.return_type) {
                self.diagnostics.push(ShaderDiagnostics::entry_point(
                    self.location(None, None),
                    format!("{} entry point must return void", stage),
                ));
            }
            match (stage, function.workgroup_size) {
                (PipelineStage::Compute, None) => {
                    self.diagnostics.push(ShaderDiagnostics::entry_point(
                        self.location(None, None),
                        "compute entry point has no workgroup size",
                    ));
                }
                (PipelineStage::Compute, Some(size)) if size.contains(&0) => {
                    self.diagnostics.push(ShaderDiagnostics::entry_point(
                        self.location(None, None),
                        format!("workgroup size {:?} has a zero dimension", size),
                    ));
                }
                (PipelineStage::Vertex | PipelineStage::Fragment, Some(_)) => {
                    self.diagnostics.push(ShaderDiagnostics::entry_point(
                        self.location(None, None),
                        format!("{} entry point cannot have a workgroup size", stage),
                    ));
                }
                _ => {}
            }
            if !function.params.is_empty() {
                self.diagnostics.push(ShaderDiagnostics::entry_point(
                    self.location(None, None),
                    "entry points take no parameters; use input variables",
                ));
            }
        } else if function.workgroup_size.is_some() {
            self.diagnostics.push(ShaderDiagnostics::entry_point(
                self.location(None, None),
                "workgroup size on a function that is not an entry point",
            ));
        }

        for (index, &param) in function.params.iter().enumerate() {
            let ok = module.try_value(param).is_some_and(|v| {
                v.kind
                    == ValueKind::FunctionParam {
                        function: id,
                        index: index as u32,
                    }
            });
            if !ok {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    self.location(None, None),
                    format!("parameter {} is not a parameter of this function", param),
                ));
            }
        }

        match module.try_block(function.start) {
            Some(start) if start.function == Some(id) && start.role == BlockRole::Entry => {}
            _ => {
                self.diagnostics.push(ShaderDiagnostics::block_ownership(
                    self.location(Some(function.start), None),
                    "start block is not the entry block of this function",
                ));
                return;
            }
        }

        let blocks: Vec<BlockId> = self
            .module
            .blocks()
            .filter(|(_, b)| b.function == Some(id))
            .map(|(bid, _)| bid)
            .collect();
        for block in blocks {
            self.validate_block(block);
        }
    }

    // === Blocks ===

    fn validate_block(&mut self, block: BlockId) {
        let module = self.module;
        let data = module.block(block);

        for (index, &param) in data.params.iter().enumerate() {
            let ok = module.try_value(param).is_some_and(|v| {
                v.kind
                    == ValueKind::BlockParam {
                        block,
                        index: index as u32,
                    }
            });
            if !ok {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    self.location(Some(block), None),
                    format!("{} is not parameter {} of this block", param, index),
                ));
            }
        }
        if !data.params.is_empty()
            && !matches!(
                data.role,
                BlockRole::Merge | BlockRole::Body | BlockRole::Continuing
            )
        {
            self.diagnostics.push(ShaderDiagnostics::block_ownership(
                self.location(Some(block), None),
                format!("{} block cannot have parameters", data.role),
            ));
        }

        if data.is_empty() {
            // An empty initializer is absent; an empty continuing is a plain back edge.
            if !matches!(data.role, BlockRole::Initializer | BlockRole::Continuing) {
                self.diagnostics
                    .push(ShaderDiagnostics::missing_terminator(self.location(Some(block), None)));
            }
            return;
        }

        let count = data.instructions.len();
        for (position, &inst) in data.instructions.iter().enumerate() {
            let Some(instruction) = module.try_instruction(inst) else {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    self.location(Some(block), None),
                    format!("instruction {}", inst),
                ));
                continue;
            };
            if !instruction.alive || instruction.block != block {
                self.diagnostics.push(ShaderDiagnostics::block_ownership(
                    self.location(Some(block), Some(inst)),
                    format!("{} is not a live instruction of this block", inst),
                ));
                continue;
            }
            let is_last = position + 1 == count;
            if instruction.is_terminator() && !is_last {
                self.diagnostics.push(ShaderDiagnostics::instruction_after_terminator(
                    self.location(Some(block), Some(inst)),
                ));
            }
            if is_last && !instruction.is_terminator() {
                self.diagnostics
                    .push(ShaderDiagnostics::missing_terminator(self.location(Some(block), None)));
            }
            self.validate_instruction(block, inst);
        }
    }

    // === Instructions ===

    fn validate_instruction(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let data = module.instruction(inst);
        let loc = self.location(Some(block), Some(inst));

        let mut valid_refs = true;
        for &operand in &data.operands {
            if module.try_value(operand).is_none() {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    loc.clone(),
                    format!("operand {} of {}", operand, data.kind.name()),
                ));
                valid_refs = false;
            }
        }
        if let Some(result) = data.result {
            let ok = module
                .try_value(result)
                .is_some_and(|v| v.kind == ValueKind::InstructionResult(inst));
            if !ok {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    loc.clone(),
                    format!("result {} of {}", result, data.kind.name()),
                ));
                valid_refs = false;
            }
        }
        if !valid_refs {
            return;
        }

        if let Err(reason) = self.check_operand_types(block, inst) {
            self.diagnostics.push(ShaderDiagnostics::operand_type(
                loc.clone(),
                data.kind.name(),
                reason,
            ));
        }

        match &data.kind {
            InstructionKind::Return => self.check_return(block, inst),
            InstructionKind::If { .. } | InstructionKind::Loop { .. } => {
                self.check_region_blocks(block, inst);
                if matches!(data.kind, InstructionKind::Loop { .. }) {
                    self.check_loop(block, inst);
                }
            }
            InstructionKind::Switch { .. } => {
                self.check_region_blocks(block, inst);
                self.check_switch(block, inst);
            }
            kind if kind.is_exit() => {
                self.check_exit(block, inst);
                self.check_block_args(block, inst);
            }
            _ => {}
        }
    }

    fn ty(&self, value: ValueId) -> TypeId {
        self.module.value_type(value)
    }

    fn expect_operands(&self, inst: InstId, count: usize) -> Result<(), String> {
        let found = self.module.instruction(inst).operands.len();
        if found != count {
            return Err(format!("expected {} operand(s), found {}", count, found));
        }
        Ok(())
    }

    fn result_type(&self, inst: InstId) -> Result<TypeId, String> {
        match self.module.instruction(inst).result {
            Some(r) => Ok(self.ty(r)),
            None => Err("instruction has no result".to_string()),
        }
    }

    fn check_operand_types(&self, block: BlockId, inst: InstId) -> Result<(), String> {
        let module = self.module;
        let types = module.types();
        let data = module.instruction(inst);
        let ops = &data.operands;

        match &data.kind {
            InstructionKind::Binary(op) => {
                self.expect_operands(inst, 2)?;
                let res = self.result_type(inst)?;
                self.check_binary(*op, self.ty(ops[0]), self.ty(ops[1]), res)
            }
            InstructionKind::Unary(op) => {
                self.expect_operands(inst, 1)?;
                let res = self.result_type(inst)?;
                let operand = self.ty(ops[0]);
                if res != operand {
                    return Err(format!(
                        "result {} differs from operand {}",
                        self.type_name(res),
                        self.type_name(operand)
                    ));
                }
                let ok = match op {
                    UnaryOp::Negation => {
                        types.is_float_scalar_or_vector(operand)
                            || types.is_signed_integer_scalar_or_vector(operand)
                    }
                    UnaryOp::Complement => types.is_integer_scalar_or_vector(operand),
                    UnaryOp::Not => types.is_bool_scalar_or_vector(operand),
                };
                if !ok {
                    return Err(format!("{} of {}", op.name(), self.type_name(operand)));
                }
                Ok(())
            }
            InstructionKind::Bitcast | InstructionKind::Convert => {
                self.expect_operands(inst, 1)?;
                let res = self.result_type(inst)?;
                let operand = self.ty(ops[0]);
                let scalar_like = |t: TypeId| {
                    types.is_numeric_scalar_or_vector(t) || types.is_bool_scalar_or_vector(t)
                };
                if !scalar_like(res) || !scalar_like(operand) {
                    return Err(format!(
                        "cannot convert {} to {}",
                        self.type_name(operand),
                        self.type_name(res)
                    ));
                }
                if types.vector_width(res) != types.vector_width(operand) {
                    return Err(format!(
                        "component count of {} and {} differ",
                        self.type_name(operand),
                        self.type_name(res)
                    ));
                }
                if matches!(data.kind, InstructionKind::Bitcast)
                    && (types.is_bool_scalar_or_vector(res)
                        || types.is_bool_scalar_or_vector(operand))
                {
                    return Err("bitcast of bool".to_string());
                }
                Ok(())
            }
            InstructionKind::Construct => {
                let res = self.result_type(inst)?;
                self.check_construct(res, ops)
            }
            InstructionKind::Access => {
                if ops.len() < 2 {
                    return Err("access needs an object and at least one index".to_string());
                }
                let res = self.result_type(inst)?;
                self.check_access(ops[0], &ops[1..], res)
            }
            InstructionKind::Swizzle { indices } => {
                self.expect_operands(inst, 1)?;
                let res = self.result_type(inst)?;
                let operand = self.ty(ops[0]);
                let Some(width) = types.vector_width(operand) else {
                    return Err(format!("swizzle of non-vector {}", self.type_name(operand)));
                };
                if indices.is_empty() || indices.len() > 4 {
                    return Err(format!("swizzle of {} components", indices.len()));
                }
                if let Some(bad) = indices.iter().find(|&&i| i >= width) {
                    return Err(format!("component {} out of range for {}", bad, self.type_name(operand)));
                }
                let elem = types.scalar_of(operand);
                let expected = if indices.len() == 1 {
                    elem
                } else {
                    match types.find(&Type::Vector {
                        elem,
                        width: indices.len() as u32,
                    }) {
                        Some(t) => t,
                        None => return Err("swizzle result type was never interned".to_string()),
                    }
                };
                if res != expected {
                    return Err(format!(
                        "result {} should be {}",
                        self.type_name(res),
                        self.type_name(expected)
                    ));
                }
                Ok(())
            }
            InstructionKind::Load => {
                self.expect_operands(inst, 1)?;
                let res = self.result_type(inst)?;
                let ptr = self.ty(ops[0]);
                let Some((_, store, access)) = types.pointee(ptr) else {
                    return Err(format!("load from non-pointer {}", self.type_name(ptr)));
                };
                if access == Access::Write {
                    return Err("load through a write-only pointer".to_string());
                }
                if store != res {
                    return Err(format!(
                        "loaded {} from pointer to {}",
                        self.type_name(res),
                        self.type_name(store)
                    ));
                }
                Ok(())
            }
            InstructionKind::Store => {
                self.expect_operands(inst, 2)?;
                let ptr = self.ty(ops[0]);
                let value = self.ty(ops[1]);
                let Some((_, store, access)) = types.pointee(ptr) else {
                    return Err(format!("store to non-pointer {}", self.type_name(ptr)));
                };
                if access == Access::Read {
                    return Err("store through a read-only pointer".to_string());
                }
                if store != value {
                    return Err(format!(
                        "stored {} into pointer to {}",
                        self.type_name(value),
                        self.type_name(store)
                    ));
                }
                Ok(())
            }
            InstructionKind::Let => {
                self.expect_operands(inst, 1)?;
                let res = self.result_type(inst)?;
                if res != self.ty(ops[0]) {
                    return Err("let changes the type of its value".to_string());
                }
                Ok(())
            }
            InstructionKind::Var { .. } => {
                let res = self.result_type(inst)?;
                let Some((space, store, _)) = types.pointee(res) else {
                    return Err(format!("variable of non-pointer type {}", self.type_name(res)));
                };
                let at_root = block == module.root_block();
                if at_root == (space == AddressSpace::Function) {
                    return Err(format!(
                        "{} variable declared in the wrong scope",
                        space
                    ));
                }
                if ops.len() > 1 {
                    return Err("variable takes at most one initializer".to_string());
                }
                if let Some(&init) = ops.first() {
                    if self.ty(init) != store {
                        return Err(format!(
                            "initializer of type {} for variable of {}",
                            self.type_name(self.ty(init)),
                            self.type_name(store)
                        ));
                    }
                }
                Ok(())
            }
            InstructionKind::Call(builtin) => {
                if ops.len() != builtin.arity() {
                    return Err(format!(
                        "{} takes {} argument(s), found {}",
                        builtin.name(),
                        builtin.arity(),
                        ops.len()
                    ));
                }
                Ok(())
            }
            InstructionKind::UserCall(callee) => {
                let Some(function) = module.try_function(*callee) else {
                    return Err(format!("call of unknown function {}", callee));
                };
                if function.is_entry_point() {
                    return Err("entry points cannot be called".to_string());
                }
                if ops.len() != function.params.len() {
                    return Err(format!(
                        "{} takes {} argument(s), found {}",
                        module.function_name(*callee),
                        function.params.len(),
                        ops.len()
                    ));
                }
                for (i, (&arg, &param)) in ops.iter().zip(&function.params).enumerate() {
                    if self.ty(arg) != self.ty(param) {
                        return Err(format!(
                            "argument {} is {}, expected {}",
                            i,
                            self.type_name(self.ty(arg)),
                            self.type_name(self.ty(param))
                        ));
                    }
                }
                match data.result {
                    Some(r) if self.ty(r) != function.return_type => {
                        Err("call result type differs from the return type".to_string())
                    }
                    None if !types.is_void(function.return_type) => {
                        Err("call of a value-returning function has no result".to_string())
                    }
                    _ => Ok(()),
                }
            }
            InstructionKind::If { .. } => {
                self.expect_operands(inst, 1)?;
                let cond = self.ty(ops[0]);
                if !matches!(types.resolve(cond), Type::Bool) {
                    return Err(format!("condition is {}, not bool", self.type_name(cond)));
                }
                Ok(())
            }
            InstructionKind::BreakIf { .. } => {
                let Some(&cond) = ops.first() else {
                    return Err("break_if without a condition".to_string());
                };
                if !matches!(types.resolve(self.ty(cond)), Type::Bool) {
                    return Err(format!(
                        "condition is {}, not bool",
                        self.type_name(self.ty(cond))
                    ));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn check_binary(&self, op: BinaryOp, lhs: TypeId, rhs: TypeId, res: TypeId) -> Result<(), String> {
        let module = self.module;
        let types = module.types();
        let mismatch = || {
            format!(
                "{} {} {} -> {}",
                self.type_name(lhs),
                op.name(),
                self.type_name(rhs),
                self.type_name(res)
            )
        };

        if op.is_comparison() {
            if lhs != rhs {
                return Err(mismatch());
            }
            let comparable = types.is_numeric_scalar_or_vector(lhs)
                || (matches!(op, BinaryOp::Equal | BinaryOp::NotEqual)
                    && types.is_bool_scalar_or_vector(lhs));
            if !comparable
                || !types.is_bool_scalar_or_vector(res)
                || types.vector_width(res) != types.vector_width(lhs)
            {
                return Err(mismatch());
            }
            return Ok(());
        }

        if op.is_shift() {
            let ok = types.is_integer_scalar_or_vector(lhs)
                && types.is_unsigned_integer_scalar_or_vector(rhs)
                && types.vector_width(lhs) == types.vector_width(rhs)
                && res == lhs;
            return if ok { Ok(()) } else { Err(mismatch()) };
        }

        if matches!(op, BinaryOp::And | BinaryOp::Or | BinaryOp::Xor) {
            let ok = lhs == rhs
                && res == lhs
                && (types.is_integer_scalar_or_vector(lhs)
                    || (op != BinaryOp::Xor && types.is_bool_scalar_or_vector(lhs)));
            return if ok { Ok(()) } else { Err(mismatch()) };
        }

        if op == BinaryOp::Multiply {
            if let Some(expected) = self.matrix_product(lhs, rhs) {
                return if expected == res { Ok(()) } else { Err(mismatch()) };
            }
        }

        // Vector * scalar broadcasts the scalar; other arithmetic does not.
        if op == BinaryOp::Multiply && types.is_vector(lhs) != types.is_vector(rhs) {
            let (vector, scalar) = if types.is_vector(lhs) { (lhs, rhs) } else { (rhs, lhs) };
            let ok = types.is_numeric_scalar_or_vector(vector)
                && types.scalar_of(vector) == scalar
                && res == vector;
            return if ok { Ok(()) } else { Err(mismatch()) };
        }
        let ok = lhs == rhs && res == lhs && types.is_numeric_scalar_or_vector(lhs);
        if !ok {
            if types.is_vector(lhs) != types.is_vector(rhs) {
                return Err(format!(
                    "{}; splat the scalar with an explicit construct first",
                    mismatch()
                ));
            }
            return Err(mismatch());
        }
        Ok(())
    }

    /// Result type of a product involving a float matrix, if the shapes allow it.
    fn matrix_product(&self, lhs: TypeId, rhs: TypeId) -> Option<TypeId> {
        let module = self.module;
        let types = module.types();
        let shape = |t: TypeId| match types.resolve(t) {
            Type::Matrix { column, columns } => {
                Some((*column, *columns, types.vector_width(*column).unwrap_or(0)))
            }
            _ => None,
        };
        match (shape(lhs), shape(rhs)) {
            // mat * vec: vector width must equal the column count
            (Some((column, columns, _)), None) if types.is_vector(rhs) => {
                (types.vector_width(rhs) == Some(columns)
                    && types.scalar_of(rhs) == types.scalar_of(lhs))
                .then_some(column)
            }
            // vec * mat: vector width must equal the row count
            (None, Some((column, columns, rows))) if types.is_vector(lhs) => {
                if types.vector_width(lhs) != Some(rows) || types.scalar_of(lhs) != types.scalar_of(column) {
                    return None;
                }
                types.find(&Type::Vector {
                    elem: types.scalar_of(column),
                    width: columns,
                })
            }
            (Some((lcol, lcols, _)), Some((rcol, rcols, rrows))) => {
                if lcols != rrows || types.scalar_of(lcol) != types.scalar_of(rcol) {
                    return None;
                }
                types.find(&Type::Matrix {
                    column: lcol,
                    columns: rcols,
                })
            }
            (Some(_), None) if types.scalar_of(lhs) == rhs => Some(lhs),
            (None, Some(_)) if types.scalar_of(rhs) == lhs => Some(rhs),
            _ => None,
        }
    }

    fn check_construct(&self, res: TypeId, args: &[ValueId]) -> Result<(), String> {
        let module = self.module;
        let types = module.types();
        if args.is_empty() {
            return Ok(());
        }
        let arg_types: Vec<TypeId> = args.iter().map(|&a| self.ty(a)).collect();
        match types.resolve(res) {
            Type::Vector { elem, width } => {
                let mut components = 0;
                for &t in &arg_types {
                    if t == *elem {
                        components += 1;
                    } else if types.is_vector(t) && types.scalar_of(t) == *elem {
                        components += types.vector_width(t).unwrap_or(0);
                    } else {
                        return Err(format!(
                            "{} argument for {}",
                            self.type_name(t),
                            self.type_name(res)
                        ));
                    }
                }
                // A single scalar is an explicit splat
                if components != *width && !(args.len() == 1 && arg_types[0] == *elem) {
                    return Err(format!(
                        "{} components supplied for {}",
                        components,
                        self.type_name(res)
                    ));
                }
                Ok(())
            }
            Type::Matrix { column, columns } => {
                if args.len() != *columns as usize || arg_types.iter().any(|t| t != column) {
                    return Err(format!("matrix {} needs {} column vectors", self.type_name(res), columns));
                }
                Ok(())
            }
            Type::Array { elem, count } => {
                if *count != Some(args.len() as u32) || arg_types.iter().any(|t| t != elem) {
                    return Err(format!("wrong elements for {}", self.type_name(res)));
                }
                Ok(())
            }
            Type::Struct { members, .. } => {
                if members.len() != args.len() {
                    return Err(format!(
                        "{} has {} members, {} supplied",
                        self.type_name(res),
                        members.len(),
                        args.len()
                    ));
                }
                for (member, &t) in members.iter().zip(&arg_types) {
                    if member.ty != t {
                        return Err(format!(
                            "member '{}' is {}, argument is {}",
                            member.name,
                            self.type_name(member.ty),
                            self.type_name(t)
                        ));
                    }
                }
                Ok(())
            }
            _ if args.len() == 1 && arg_types[0] == res => Ok(()),
            _ => Err(format!("cannot construct {}", self.type_name(res))),
        }
    }

    fn check_access(&self, object: ValueId, indices: &[ValueId], res: TypeId) -> Result<(), String> {
        let module = self.module;
        let types = module.types();
        let object_ty = self.ty(object);
        let (mut current, pointer) = match types.pointee(object_ty) {
            Some((space, store, access)) => (store, Some((space, access))),
            None => (object_ty, None),
        };
        for &index in indices {
            let index_ty = self.ty(index);
            if !matches!(types.resolve(index_ty), Type::I32 | Type::U32) {
                return Err(format!("index of type {}", self.type_name(index_ty)));
            }
            let constant = self
                .module
                .value(index)
                .constant()
                .and_then(|c| module.constants().as_integer(c));
            if types.is_struct(current) && constant.is_none() {
                return Err("structure members must be selected by a constant".to_string());
            }
            if let (Some(c), Some(count)) = (constant, types.element_count(current)) {
                if c < 0 || c >= count as i64 {
                    return Err(format!("index {} out of bounds for {}", c, self.type_name(current)));
                }
            }
            current = match types.element_type(current, constant.map(|c| c as u32)) {
                Some(t) => t,
                None => return Err(format!("cannot index into {}", self.type_name(current))),
            };
        }
        let expected = match pointer {
            Some((space, access)) => types.find(&Type::Pointer {
                space,
                store: current,
                access,
            }),
            None => Some(current),
        };
        if expected != Some(res) {
            return Err(format!(
                "result {} does not match the accessed element {}",
                self.type_name(res),
                self.type_name(current)
            ));
        }
        Ok(())
    }

    fn check_return(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let Some(function) = self.current_function else {
            return;
        };
        let ret = module.function(function).return_type;
        let data = module.instruction(inst);
        let loc = self.location(Some(block), Some(inst));
        let types = module.types();
        match (data.operands.first(), types.is_void(ret)) {
            (None, true) => {}
            (Some(_), true) => self.diagnostics.push(ShaderDiagnostics::return_mismatch(
                loc,
                "void function returns a value",
            )),
            (None, false) => self.diagnostics.push(ShaderDiagnostics::return_mismatch(
                loc,
                format!("missing return value of type {}", self.type_name(ret)),
            )),
            (Some(&v), false) if self.ty(v) != ret => {
                self.diagnostics.push(ShaderDiagnostics::return_mismatch(
                    loc,
                    format!(
                        "returns {}, function returns {}",
                        self.type_name(self.ty(v)),
                        self.type_name(ret)
                    ),
                ))
            }
            _ => {}
        }
    }

    // === Regions ===

    fn check_region_blocks(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let data = module.instruction(inst);
        let function = module.block(block).function;
        for child in data.kind.region_blocks() {
            let ok = self
                .module
                .try_block(child)
                .is_some_and(|b| b.parent == Some(inst) && b.function == function);
            if !ok {
                self.diagnostics.push(ShaderDiagnostics::block_ownership(
                    self.location(Some(block), Some(inst)),
                    format!("{} does not belong to this {}", child, data.kind.name()),
                ));
            }
        }
    }

    fn check_loop(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let InstructionKind::Loop {
            initializer,
            body,
            continuing,
            ..
        } = module.instruction(inst).kind
        else {
            return;
        };
        let (Some(init), Some(body_block), Some(cont)) = (
            module.try_block(initializer),
            module.try_block(body),
            module.try_block(continuing),
        ) else {
            return;
        };
        let loc = self.location(Some(block), Some(inst));
        if !body_block.params.is_empty() && init.is_empty() {
            self.diagnostics.push(ShaderDiagnostics::loop_structure(
                loc.clone(),
                "loop body has parameters but no initializer to supply them",
            ));
        }
        if !cont.params.is_empty() && cont.is_empty() {
            self.diagnostics.push(ShaderDiagnostics::loop_structure(
                loc,
                "continuing block has parameters but no instructions",
            ));
        }
    }

    fn check_switch(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let data = module.instruction(inst);
        let InstructionKind::Switch { cases, .. } = &data.kind else {
            return;
        };
        let loc = self.location(Some(block), Some(inst));
        let types = module.types();
        let Some(&selector) = data.operands.first() else {
            self.diagnostics
                .push(ShaderDiagnostics::invalid_switch(loc, "missing selector"));
            return;
        };
        let selector_ty = self.ty(selector);
        if !matches!(types.resolve(selector_ty), Type::I32 | Type::U32) {
            self.diagnostics.push(ShaderDiagnostics::invalid_switch(
                loc.clone(),
                format!("selector is {}, not an integer scalar", self.type_name(selector_ty)),
            ));
        }

        let defaults = cases
            .iter()
            .flat_map(|c| &c.selectors)
            .filter(|s| matches!(s, CaseSelector::Default))
            .count();
        if defaults != 1 {
            self.diagnostics.push(ShaderDiagnostics::invalid_switch(
                loc.clone(),
                format!("expected exactly one default selector, found {}", defaults),
            ));
        }

        let mut seen = FxHashSet::default();
        for selector in cases.iter().flat_map(|c| &c.selectors) {
            let CaseSelector::Value(c) = selector else {
                continue;
            };
            let Some(constant) = module.constants().try_resolve(*c) else {
                self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                    loc.clone(),
                    format!("case selector {}", c),
                ));
                continue;
            };
            if constant.ty != selector_ty {
                self.diagnostics.push(ShaderDiagnostics::invalid_switch(
                    loc.clone(),
                    format!(
                        "case value of type {} for selector of type {}",
                        self.type_name(constant.ty),
                        self.type_name(selector_ty)
                    ),
                ));
            }
            if !seen.insert(*c) {
                self.diagnostics.push(ShaderDiagnostics::invalid_switch(
                    loc.clone(),
                    format!(
                        "duplicate case value {}",
                        module.constants().display(types, *c)
                    ),
                ));
            }
        }
    }

    // === Exits ===

    fn check_exit(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let data = module.instruction(inst);
        let loc = self.location(Some(block), Some(inst));
        let name = data.kind.name();
        let Some(region) = data.kind.exit_region() else {
            return;
        };
        let Some(region_data) = module.try_instruction(region) else {
            self.diagnostics.push(ShaderDiagnostics::invalid_reference(
                loc,
                format!("region {}", region),
            ));
            return;
        };

        let expected_kind = match &data.kind {
            InstructionKind::ExitIf(_) => matches!(region_data.kind, InstructionKind::If { .. }),
            InstructionKind::ExitSwitch(_) => {
                matches!(region_data.kind, InstructionKind::Switch { .. })
            }
            _ => matches!(region_data.kind, InstructionKind::Loop { .. }),
        };
        if !expected_kind {
            self.diagnostics.push(ShaderDiagnostics::exit_escapes_region(
                loc,
                name,
                format!("{} is a {}", region, region_data.kind.name()),
            ));
            return;
        }

        let path = module.region_path(block);
        let position = path.iter().position(|(r, _)| *r == region);
        let Some(position) = position else {
            self.diagnostics.push(ShaderDiagnostics::exit_escapes_region(
                loc,
                name,
                format!("not inside {}", region),
            ));
            return;
        };
        let role = path[position].1;
        let crossed = &path[..position];
        let crosses_only = |allowed: &dyn Fn(&InstructionKind) -> bool| {
            crossed
                .iter()
                .all(|(r, _)| allowed(&module.instruction(*r).kind))
        };
        let is_if = |k: &InstructionKind| matches!(k, InstructionKind::If { .. });
        let is_if_or_switch = |k: &InstructionKind| {
            matches!(k, InstructionKind::If { .. } | InstructionKind::Switch { .. })
        };

        let problem = match &data.kind {
            InstructionKind::ExitIf(_) => {
                (position != 0).then(|| "exit_if must be directly inside its if".to_string())
            }
            InstructionKind::ExitLoop(_) => {
                if role != BlockRole::Body {
                    Some(format!("exit_loop from the {} block", role))
                } else if !crosses_only(&is_if) {
                    Some("exit_loop may only cross if regions".to_string())
                } else {
                    None
                }
            }
            InstructionKind::ExitSwitch(_) => (!crosses_only(&is_if))
                .then(|| "exit_switch may only cross if regions".to_string()),
            InstructionKind::Continue(_) => {
                if role != BlockRole::Body {
                    Some(format!("continue from the {} block", role))
                } else if !crosses_only(&is_if_or_switch) {
                    Some("continue may only cross if and switch regions".to_string())
                } else {
                    None
                }
            }
            InstructionKind::NextIteration(_) => {
                if position != 0 || !matches!(role, BlockRole::Initializer | BlockRole::Continuing) {
                    Some("next_iteration must end the initializer or continuing block".to_string())
                } else {
                    None
                }
            }
            InstructionKind::BreakIf { .. } => (position != 0 || role != BlockRole::Continuing)
                .then(|| "break_if must end the continuing block".to_string()),
            _ => None,
        };
        if let Some(reason) = problem {
            self.diagnostics
                .push(ShaderDiagnostics::exit_escapes_region(loc, name, reason));
        }
    }

    fn check_block_args(&mut self, block: BlockId, inst: InstId) {
        let module = self.module;
        let data = module.instruction(inst);
        for (target, range) in module.branch_targets(inst) {
            let Some(target_block) = module.try_block(target) else {
                continue;
            };
            let args = data.operands.get(range.clone()).unwrap_or(&[]);
            let params = &target_block.params;
            let loc = self.location(Some(block), Some(inst));
            if args.len() != params.len() {
                self.diagnostics.push(ShaderDiagnostics::phi_arity(
                    loc,
                    target.0,
                    params.len(),
                    args.len(),
                ));
                continue;
            }
            for (index, (&arg, &param)) in args.iter().zip(params).enumerate() {
                let (arg_ty, param_ty) = (self.ty(arg), self.ty(param));
                if arg_ty != param_ty {
                    self.diagnostics.push(ShaderDiagnostics::phi_type(
                        loc.clone(),
                        target.0,
                        index,
                        &self.type_name(param_ty),
                        &self.type_name(arg_ty),
                    ));
                }
            }
        }
    }

    // === Usages ===

    fn validate_usages(&mut self) {
        let module = self.module;
        for index in 0..module.instruction_count() {
            let inst = InstId(index as u32);
            let data = module.instruction(inst);
            if !data.alive {
                continue;
            }
            for (slot, &operand) in data.operands.iter().enumerate() {
                let Some(value) = module.try_value(operand) else {
                    continue;
                };
                let recorded = value
                    .usages
                    .iter()
                    .any(|u| u.instruction == inst && u.operand == slot as u32);
                if !recorded {
                    self.diagnostics.push(ShaderDiagnostics::usage_inconsistent(
                        Location::module().at_instruction(inst.0),
                        format!("operand {} ({}) is missing from its usage list", slot, operand),
                    ));
                }
            }
        }
        for index in 0..module.value_count() {
            let value_id = ValueId(index as u32);
            let value = module.value(value_id);
            for usage in &value.usages {
                let ok = module.try_instruction(usage.instruction).is_some_and(|i| {
                    i.alive && i.operands.get(usage.operand as usize) == Some(&value_id)
                });
                if !ok {
                    self.diagnostics.push(ShaderDiagnostics::usage_inconsistent(
                        Location::module().at_instruction(usage.instruction.0),
                        format!(
                            "{} records a use in operand {} that does not read it",
                            value_id, usage.operand
                        ),
                    ));
                }
            }
        }
    }
}

/// Type ids a type key points at.
fn referenced_types(ty: &Type) -> Vec<TypeId> {
    match ty {
        Type::Vector { elem, .. } | Type::Array { elem, .. } => vec![*elem],
        Type::Matrix { column, .. } => vec![*column],
        Type::Atomic(inner) | Type::SampledImage(inner) => vec![*inner],
        Type::Pointer { store, .. } => vec![*store],
        Type::SampledTexture { sampled, .. } | Type::MultisampledTexture { sampled, .. } => {
            vec![*sampled]
        }
        Type::Struct { members, .. } => members.iter().map(|m| m.ty).collect(),
        _ => Vec::new(),
    }
}
