//! Instruction lowering for IR → SPIR-V
//!
//! Value-producing instructions are translated here; control flow and
//! variables live in the printer itself. Opcodes are picked from the operand
//! types, so one IR `Binary(Add)` becomes `OpIAdd` or `OpFAdd` as needed.

use super::module::Instruction;
use super::printer::Printer;
use crate::ir::{BinaryOp, BuiltinFn, InstId, InstructionKind, Type, TypeId, UnaryOp, ValueId};
use diagnostics::shader::ShaderDiagnostics;
use spirv::{GLOp, Op, Word};

/// `Workgroup` execution and memory scope
const SCOPE_WORKGROUP: u32 = spirv::Scope::Workgroup as u32;

impl Printer<'_> {
    /// Lower a value-producing instruction or a builtin call.
    pub(super) fn lower_value(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        match &data.kind {
            InstructionKind::Binary(op) => self.lower_binary_op(inst, *op),
            InstructionKind::Unary(op) => self.lower_unary_op(inst, *op),
            InstructionKind::Bitcast => self.lower_bitcast(inst),
            InstructionKind::Convert => self.lower_convert(inst),
            InstructionKind::Construct => self.lower_construct(inst),
            InstructionKind::Access => self.lower_access(inst),
            InstructionKind::Swizzle { indices } => self.lower_swizzle(inst, indices),
            InstructionKind::Load => {
                let Some((ty, id, _)) = self.result(inst) else {
                    return;
                };
                let pointer = self.value_id(data.operands[0]);
                self.body.push(Instruction::load(ty, id, pointer));
            }
            InstructionKind::Let => {
                if let Some(result) = data.result {
                    let value = self.value_id(data.operands[0]);
                    self.alias(result, value);
                }
            }
            InstructionKind::Call(builtin) => self.lower_builtin(inst, *builtin),
            InstructionKind::UserCall(callee) => {
                let return_type = self.type_id(ir.function(*callee).return_type);
                let id = match data.result {
                    Some(result) => self.value_id(result),
                    None => self.fresh_id(),
                };
                let function = self.function_id(*callee);
                let args = self.operand_ids(&data.operands);
                self.body.push(
                    Instruction::new(Op::FunctionCall)
                        .with_type(return_type)
                        .with_result(id)
                        .id(function)
                        .ids(args),
                );
            }
            kind => self.unsupported(inst, format!("instruction '{}'", kind.name())),
        }
    }

    /// Result type id, result id and IR result type of `inst`.
    fn result(&mut self, inst: InstId) -> Option<(Word, Word, TypeId)> {
        let result = self.ir.instruction(inst).result?;
        let ty = self.ir.value_type(result);
        let type_id = self.type_id(ty);
        let id = self.value_id(result);
        Some((type_id, id, ty))
    }

    fn operand_ids(&mut self, operands: &[ValueId]) -> Vec<Word> {
        operands.iter().map(|&v| self.value_id(v)).collect()
    }

    // === Arithmetic ===

    fn lower_binary_op(&mut self, inst: InstId, op: BinaryOp) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let (lhs, rhs) = (data.operands[0], data.operands[1]);
        let lhs_ty = ir.value_type(lhs);
        let rhs_ty = ir.value_type(rhs);
        let Some((ty, id, result_ty)) = self.result(inst) else {
            return;
        };
        let l = self.value_id(lhs);
        let r = self.value_id(rhs);

        if op == BinaryOp::Multiply {
            if let Some(instruction) = self.lower_product(ty, id, (lhs_ty, l), (rhs_ty, r)) {
                self.body.push(instruction);
                return;
            }
        }
        if matches!(op, BinaryOp::Add | BinaryOp::Subtract) && self.types.is_matrix(lhs_ty) {
            self.lower_matrix_columnwise(op, result_ty, id, l, r);
            return;
        }

        // Integer vector * scalar has no dedicated opcode
        let (l, r) = match (self.types.is_vector(lhs_ty), self.types.is_vector(rhs_ty)) {
            (true, false) => (l, self.splat(result_ty, r)),
            (false, true) => (self.splat(result_ty, l), r),
            _ => (l, r),
        };
        let opcode = self.binary_opcode(op, lhs_ty);
        self.body.push(Instruction::binary(opcode, ty, id, l, r));
    }

    /// Broadcast `scalar` to every component of `vector`.
    fn splat(&mut self, vector: TypeId, scalar: Word) -> Word {
        let width = self.types.vector_width(vector).unwrap_or(1);
        let vector_ty = self.type_id(vector);
        let id = self.fresh_id();
        self.body.push(
            Instruction::new(Op::CompositeConstruct)
                .with_type(vector_ty)
                .with_result(id)
                .ids(std::iter::repeat(scalar).take(width as usize)),
        );
        id
    }

    /// Products with a matrix or scalar operand have dedicated opcodes.
    fn lower_product(
        &self,
        ty: Word,
        id: Word,
        (lhs_ty, l): (TypeId, Word),
        (rhs_ty, r): (TypeId, Word),
    ) -> Option<Instruction> {
        let types = &self.types;
        let (op, a, b) = match (
            types.is_matrix(lhs_ty),
            types.is_matrix(rhs_ty),
            types.is_vector(lhs_ty),
            types.is_vector(rhs_ty),
        ) {
            (true, true, _, _) => (Op::MatrixTimesMatrix, l, r),
            (true, false, _, true) => (Op::MatrixTimesVector, l, r),
            (false, true, true, _) => (Op::VectorTimesMatrix, l, r),
            (true, false, _, false) => (Op::MatrixTimesScalar, l, r),
            (false, true, false, _) => (Op::MatrixTimesScalar, r, l),
            (false, false, true, false) if types.is_float_scalar_or_vector(lhs_ty) => {
                (Op::VectorTimesScalar, l, r)
            }
            (false, false, false, true) if types.is_float_scalar_or_vector(rhs_ty) => {
                (Op::VectorTimesScalar, r, l)
            }
            _ => return None,
        };
        Some(Instruction::binary(op, ty, id, a, b))
    }

    /// Matrix addition and subtraction, one column at a time.
    fn lower_matrix_columnwise(&mut self, op: BinaryOp, matrix: TypeId, id: Word, l: Word, r: Word) {
        let Type::Matrix { column, columns } = self.types.resolve(matrix).clone() else {
            return;
        };
        let column_ty = self.type_id(column);
        let matrix_ty = self.type_id(matrix);
        let opcode = if op == BinaryOp::Add {
            Op::FAdd
        } else {
            Op::FSub
        };
        let mut results = Vec::with_capacity(columns as usize);
        for index in 0..columns {
            let a = self.fresh_id();
            let b = self.fresh_id();
            let c = self.fresh_id();
            self.body.push(
                Instruction::new(Op::CompositeExtract)
                    .with_type(column_ty)
                    .with_result(a)
                    .id(l)
                    .literal(index),
            );
            self.body.push(
                Instruction::new(Op::CompositeExtract)
                    .with_type(column_ty)
                    .with_result(b)
                    .id(r)
                    .literal(index),
            );
            self.body.push(Instruction::binary(opcode, column_ty, c, a, b));
            results.push(c);
        }
        self.body.push(
            Instruction::new(Op::CompositeConstruct)
                .with_type(matrix_ty)
                .with_result(id)
                .ids(results),
        );
    }

    /// Opcode for a component-wise binary operator over `operand`.
    pub(super) fn binary_opcode(&self, op: BinaryOp, operand: TypeId) -> Op {
        let types = &self.types;
        let float = types.is_float_scalar_or_vector(operand) || types.is_float_matrix(operand);
        let signed = types.is_signed_integer_scalar_or_vector(operand);
        let boolean = types.is_bool_scalar_or_vector(operand);
        let pick = |f: Op, s: Op, u: Op| {
            if float {
                f
            } else if signed {
                s
            } else {
                u
            }
        };
        match op {
            BinaryOp::Add => pick(Op::FAdd, Op::IAdd, Op::IAdd),
            BinaryOp::Subtract => pick(Op::FSub, Op::ISub, Op::ISub),
            BinaryOp::Multiply => pick(Op::FMul, Op::IMul, Op::IMul),
            BinaryOp::Divide => pick(Op::FDiv, Op::SDiv, Op::UDiv),
            BinaryOp::Modulo => pick(Op::FRem, Op::SRem, Op::UMod),
            BinaryOp::And if boolean => Op::LogicalAnd,
            BinaryOp::And => Op::BitwiseAnd,
            BinaryOp::Or if boolean => Op::LogicalOr,
            BinaryOp::Or => Op::BitwiseOr,
            BinaryOp::Xor => Op::BitwiseXor,
            BinaryOp::ShiftLeft => Op::ShiftLeftLogical,
            BinaryOp::ShiftRight if signed => Op::ShiftRightArithmetic,
            BinaryOp::ShiftRight => Op::ShiftRightLogical,
            BinaryOp::Equal if boolean => Op::LogicalEqual,
            BinaryOp::Equal => pick(Op::FOrdEqual, Op::IEqual, Op::IEqual),
            BinaryOp::NotEqual if boolean => Op::LogicalNotEqual,
            BinaryOp::NotEqual => pick(Op::FOrdNotEqual, Op::INotEqual, Op::INotEqual),
            BinaryOp::LessThan => pick(Op::FOrdLessThan, Op::SLessThan, Op::ULessThan),
            BinaryOp::LessThanEqual => pick(
                Op::FOrdLessThanEqual,
                Op::SLessThanEqual,
                Op::ULessThanEqual,
            ),
            BinaryOp::GreaterThan => {
                pick(Op::FOrdGreaterThan, Op::SGreaterThan, Op::UGreaterThan)
            }
            BinaryOp::GreaterThanEqual => pick(
                Op::FOrdGreaterThanEqual,
                Op::SGreaterThanEqual,
                Op::UGreaterThanEqual,
            ),
        }
    }

    fn lower_unary_op(&mut self, inst: InstId, op: UnaryOp) {
        let operand = self.ir.instruction(inst).operands[0];
        let Some((ty, id, result_ty)) = self.result(inst) else {
            return;
        };
        let value = self.value_id(operand);
        let opcode = match op {
            UnaryOp::Negation if self.types.is_float_scalar_or_vector(result_ty) => Op::FNegate,
            UnaryOp::Negation => Op::SNegate,
            UnaryOp::Complement => Op::Not,
            UnaryOp::Not => Op::LogicalNot,
        };
        self.body.push(Instruction::unary(opcode, ty, id, value));
    }

    // === Conversions ===

    fn lower_bitcast(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let (Some(result), operand) = (data.result, data.operands[0]) else {
            return;
        };
        let from = ir.value_type(operand);
        let to = ir.value_type(result);
        let value = self.value_id(operand);
        if self.canonical_type(from) == self.canonical_type(to) {
            self.alias(result, value);
            return;
        }
        let ty = self.type_id(to);
        let id = self.value_id(result);
        self.body
            .push(Instruction::unary(Op::Bitcast, ty, id, value));
    }

    fn lower_convert(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let (Some(result), operand) = (data.result, data.operands[0]) else {
            return;
        };
        let from = ir.value_type(operand);
        let to = ir.value_type(result);
        let value = self.value_id(operand);
        if from == to {
            self.alias(result, value);
            return;
        }
        let ty = self.type_id(to);
        let id = self.value_id(result);

        let types = &self.types;
        let (from_float, from_signed, from_bool) = (
            types.is_float_scalar_or_vector(from),
            types.is_signed_integer_scalar_or_vector(from),
            types.is_bool_scalar_or_vector(from),
        );
        let (to_float, to_signed, to_bool) = (
            types.is_float_scalar_or_vector(to),
            types.is_signed_integer_scalar_or_vector(to),
            types.is_bool_scalar_or_vector(to),
        );

        if to_bool {
            // Compare against zero
            let zero = self.null_id(from);
            let opcode = if from_float {
                Op::FUnordNotEqual
            } else {
                Op::INotEqual
            };
            self.body.push(Instruction::binary(opcode, ty, id, value, zero));
            return;
        }
        if from_bool {
            let one = self.one_id(to);
            let zero = self.null_id(to);
            self.body.push(
                Instruction::new(Op::Select)
                    .with_type(ty)
                    .with_result(id)
                    .id(value)
                    .id(one)
                    .id(zero),
            );
            return;
        }

        let opcode = match (from_float, to_float) {
            (true, true) => Op::FConvert,
            (true, false) if to_signed => Op::ConvertFToS,
            (true, false) => Op::ConvertFToU,
            (false, true) if from_signed => Op::ConvertSToF,
            (false, true) => Op::ConvertUToF,
            // Same-width integers only differ in signedness
            (false, false) => Op::Bitcast,
        };
        self.body.push(Instruction::unary(opcode, ty, id, value));
    }

    fn lower_construct(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let Some(result) = data.result else {
            return;
        };
        let result_ty = ir.value_type(result);

        if data.operands.is_empty() {
            let zero = self.null_id(result_ty);
            self.alias(result, zero);
            return;
        }
        if data.operands.len() == 1 && ir.value_type(data.operands[0]) == result_ty {
            let value = self.value_id(data.operands[0]);
            self.alias(result, value);
            return;
        }

        let ty = self.type_id(result_ty);
        let id = self.value_id(result);
        let args = self.operand_ids(&data.operands);
        let all_scalar = data
            .operands
            .iter()
            .all(|&v| self.types.is_scalar(ir.value_type(v)));

        let constituents = match self.types.resolve(result_ty).clone() {
            // Splat
            Type::Vector { width, .. } if args.len() == 1 && all_scalar => {
                vec![args[0]; width as usize]
            }
            // Column vectors from scalars
            Type::Matrix { column, columns }
                if all_scalar && args.len() > columns as usize =>
            {
                let rows = self.types.vector_width(column).unwrap_or(1) as usize;
                let column_ty = self.type_id(column);
                let mut columns_ids = Vec::with_capacity(columns as usize);
                for chunk in args.chunks(rows) {
                    let column_id = self.fresh_id();
                    self.body.push(
                        Instruction::new(Op::CompositeConstruct)
                            .with_type(column_ty)
                            .with_result(column_id)
                            .ids(chunk.iter().copied()),
                    );
                    columns_ids.push(column_id);
                }
                columns_ids
            }
            _ => args,
        };
        self.body.push(
            Instruction::new(Op::CompositeConstruct)
                .with_type(ty)
                .with_result(id)
                .ids(constituents),
        );
    }

    // === Composites ===

    fn lower_access(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let object = data.operands[0];
        let indices = &data.operands[1..];
        let object_ty = ir.value_type(object);
        let Some((ty, id, _)) = self.result(inst) else {
            return;
        };
        let base = self.value_id(object);

        if self.types.is_pointer(object_ty) {
            let indices = self.operand_ids(indices);
            self.body.push(
                Instruction::new(Op::AccessChain)
                    .with_type(ty)
                    .with_result(id)
                    .id(base)
                    .ids(indices),
            );
            return;
        }

        let literals: Vec<Option<u32>> = indices
            .iter()
            .map(|&index| {
                ir.value(index)
                    .constant()
                    .and_then(|c| self.constants.as_integer(c))
                    .map(|v| v as u32)
            })
            .collect();

        if let Some(literals) = literals.iter().copied().collect::<Option<Vec<u32>>>() {
            self.body.push(
                Instruction::new(Op::CompositeExtract)
                    .with_type(ty)
                    .with_result(id)
                    .id(base)
                    .literals(literals),
            );
            return;
        }

        // Only the last index may be dynamic, and only into a vector
        let (last, prefix) = match literals.split_last() {
            Some((None, prefix)) if prefix.iter().all(Option::is_some) => (indices.len() - 1, prefix),
            _ => {
                self.push_diagnostic(ShaderDiagnostics::dynamic_composite_index(
                    self.location(inst),
                ));
                return;
            }
        };
        let prefix: Vec<u32> = prefix.iter().flatten().copied().collect();
        let mut vector_ty = object_ty;
        for &index in &prefix {
            match self.types.element_type(vector_ty, Some(index)) {
                Some(elem) => vector_ty = elem,
                None => break,
            }
        }
        if !self.types.is_vector(vector_ty) {
            self.push_diagnostic(ShaderDiagnostics::dynamic_composite_index(
                self.location(inst),
            ));
            return;
        }

        let vector = if prefix.is_empty() {
            base
        } else {
            let vector_type_id = self.type_id(vector_ty);
            let vector = self.fresh_id();
            self.body.push(
                Instruction::new(Op::CompositeExtract)
                    .with_type(vector_type_id)
                    .with_result(vector)
                    .id(base)
                    .literals(prefix),
            );
            vector
        };
        let index = self.value_id(indices[last]);
        self.body.push(Instruction::binary(
            Op::VectorExtractDynamic,
            ty,
            id,
            vector,
            index,
        ));
    }

    fn lower_swizzle(&mut self, inst: InstId, indices: &[u32]) {
        let vector = self.ir.instruction(inst).operands[0];
        let Some((ty, id, _)) = self.result(inst) else {
            return;
        };
        let value = self.value_id(vector);
        let instruction = if let [index] = indices {
            Instruction::new(Op::CompositeExtract)
                .with_type(ty)
                .with_result(id)
                .id(value)
                .literal(*index)
        } else {
            Instruction::new(Op::VectorShuffle)
                .with_type(ty)
                .with_result(id)
                .id(value)
                .id(value)
                .literals(indices.iter().copied())
        };
        self.body.push(instruction);
    }

    // === Builtins ===

    fn lower_builtin(&mut self, inst: InstId, builtin: BuiltinFn) {
        let ir = self.ir;
        let data = ir.instruction(inst);

        match builtin {
            BuiltinFn::WorkgroupBarrier | BuiltinFn::StorageBarrier => {
                // AcquireRelease plus WorkgroupMemory or UniformMemory
                let semantics = if builtin == BuiltinFn::WorkgroupBarrier {
                    0x108
                } else {
                    0x48
                };
                let scope = self.u32_constant(SCOPE_WORKGROUP);
                let semantics = self.u32_constant(semantics);
                self.body.push(
                    Instruction::new(Op::ControlBarrier)
                        .id(scope)
                        .id(scope)
                        .id(semantics),
                );
                return;
            }
            BuiltinFn::TextureSample => {
                self.lower_texture_sample(inst);
                return;
            }
            _ => {}
        }

        let Some((ty, id, result_ty)) = self.result(inst) else {
            self.unsupported(inst, format!("{} without a result", builtin.name()));
            return;
        };
        let args = self.operand_ids(&data.operands);
        let arg_ty = data
            .operands
            .first()
            .map_or(result_ty, |&v| ir.value_type(v));
        let float = self.types.is_float_scalar_or_vector(arg_ty);
        let signed = self.types.is_signed_integer_scalar_or_vector(arg_ty);
        let pick = |f: GLOp, s: GLOp, u: GLOp| {
            if float {
                f
            } else if signed {
                s
            } else {
                u
            }
        };

        let ext = match builtin {
            BuiltinFn::Abs if !float && !signed => {
                // Unsigned abs is the identity
                if let Some(result) = data.result {
                    self.alias(result, args[0]);
                }
                return;
            }
            BuiltinFn::Abs => pick(GLOp::FAbs, GLOp::SAbs, GLOp::SAbs),
            BuiltinFn::Acos => GLOp::Acos,
            BuiltinFn::Asin => GLOp::Asin,
            BuiltinFn::Atan => GLOp::Atan,
            BuiltinFn::Atan2 => GLOp::Atan2,
            BuiltinFn::Ceil => GLOp::Ceil,
            BuiltinFn::Clamp => pick(GLOp::FClamp, GLOp::SClamp, GLOp::UClamp),
            BuiltinFn::Cos => GLOp::Cos,
            BuiltinFn::Cross => GLOp::Cross,
            BuiltinFn::Distance => GLOp::Distance,
            BuiltinFn::Exp => GLOp::Exp,
            BuiltinFn::Exp2 => GLOp::Exp2,
            BuiltinFn::Floor => GLOp::Floor,
            BuiltinFn::Fma => GLOp::Fma,
            BuiltinFn::Fract => GLOp::Fract,
            BuiltinFn::InverseSqrt => GLOp::InverseSqrt,
            BuiltinFn::Length => GLOp::Length,
            BuiltinFn::Log => GLOp::Log,
            BuiltinFn::Log2 => GLOp::Log2,
            BuiltinFn::Max => pick(GLOp::FMax, GLOp::SMax, GLOp::UMax),
            BuiltinFn::Min => pick(GLOp::FMin, GLOp::SMin, GLOp::UMin),
            BuiltinFn::Mix => GLOp::FMix,
            BuiltinFn::Normalize => GLOp::Normalize,
            BuiltinFn::Pow => GLOp::Pow,
            BuiltinFn::Sign if float || signed => pick(GLOp::FSign, GLOp::SSign, GLOp::SSign),
            BuiltinFn::Sin => GLOp::Sin,
            BuiltinFn::Smoothstep => GLOp::SmoothStep,
            BuiltinFn::Sqrt => GLOp::Sqrt,
            BuiltinFn::Step => GLOp::Step,
            BuiltinFn::Tan => GLOp::Tan,
            BuiltinFn::Trunc => GLOp::Trunc,
            _ => {
                self.lower_core_builtin(inst, builtin, (ty, id, result_ty), arg_ty, args);
                return;
            }
        };

        let set = self.glsl_std_450();
        self.body.push(
            Instruction::new(Op::ExtInst)
                .with_type(ty)
                .with_result(id)
                .id(set)
                .literal(ext as u32)
                .ids(args),
        );
    }

    /// Builtins with a core SPIR-V instruction.
    fn lower_core_builtin(
        &mut self,
        inst: InstId,
        builtin: BuiltinFn,
        (ty, id, result_ty): (Word, Word, TypeId),
        arg_ty: TypeId,
        args: Vec<Word>,
    ) {
        let opcode = match builtin {
            BuiltinFn::All | BuiltinFn::Any if self.types.is_scalar(arg_ty) => {
                if let Some(result) = self.ir.instruction(inst).result {
                    self.alias(result, args[0]);
                }
                return;
            }
            BuiltinFn::All => Op::All,
            BuiltinFn::Any => Op::Any,
            BuiltinFn::Dot if self.types.is_float_scalar_or_vector(arg_ty) => Op::Dot,
            BuiltinFn::CountOneBits => Op::BitCount,
            BuiltinFn::ReverseBits => Op::BitReverse,
            BuiltinFn::Transpose => Op::Transpose,
            BuiltinFn::Dpdx => Op::DPdx,
            BuiltinFn::Dpdy => Op::DPdy,
            BuiltinFn::Fwidth => Op::Fwidth,
            BuiltinFn::Select => {
                let condition = self.ir.instruction(inst).operands[2];
                let scalar_condition = self.types.is_scalar(self.ir.value_type(condition));
                self.lower_select(ty, id, result_ty, scalar_condition, &args);
                return;
            }
            _ => {
                self.unsupported(
                    inst,
                    format!(
                        "{} on {}",
                        builtin.name(),
                        self.types.name(arg_ty)
                    ),
                );
                return;
            }
        };
        self.body.push(
            Instruction::new(opcode)
                .with_type(ty)
                .with_result(id)
                .ids(args),
        );
    }

    /// `select(f, t, cond)` picks `t` where `cond` holds.
    fn lower_select(
        &mut self,
        ty: Word,
        id: Word,
        result_ty: TypeId,
        scalar_condition: bool,
        args: &[Word],
    ) {
        let (f, t, mut condition) = (args[0], args[1], args[2]);
        // Before 1.4 a vector select needs a vector condition
        if let Some(width) = self.types.vector_width(result_ty) {
            if scalar_condition && !self.options.supports(1, 4) {
                let bool_ty = self.types.bool();
                let bvec = self.types.vec(bool_ty, width);
                let bvec_id = self.type_id(bvec);
                let splat = self.fresh_id();
                self.body.push(
                    Instruction::new(Op::CompositeConstruct)
                        .with_type(bvec_id)
                        .with_result(splat)
                        .ids(std::iter::repeat(condition).take(width as usize)),
                );
                condition = splat;
            }
        }
        self.body.push(
            Instruction::new(Op::Select)
                .with_type(ty)
                .with_result(id)
                .id(condition)
                .id(t)
                .id(f),
        );
    }

    fn lower_texture_sample(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let texture_ty = ir.value_type(data.operands[0]);
        let image = self.canonical_type(texture_ty);
        if !matches!(self.types.resolve(image), Type::SampledTexture { .. }) {
            self.unsupported(
                inst,
                format!("textureSample on {}", self.types.name(texture_ty)),
            );
            return;
        }
        let Some((ty, id, result_ty)) = self.result(inst) else {
            return;
        };
        let args = self.operand_ids(&data.operands);
        let sampled_image = self.types.sampled_image(image);
        let sampled_image_ty = self.type_id(sampled_image);
        let combined = self.fresh_id();
        self.body.push(Instruction::binary(
            Op::SampledImage,
            sampled_image_ty,
            combined,
            args[0],
            args[1],
        ));

        if self.types.is_vector(result_ty) {
            self.body.push(Instruction::binary(
                Op::ImageSampleImplicitLod,
                ty,
                id,
                combined,
                args[2],
            ));
            return;
        }
        // Depth textures sample a vec4 and keep the first component
        let f32 = self.types.f32();
        let vec4 = self.types.vec4(f32);
        let vec4_ty = self.type_id(vec4);
        let texel = self.fresh_id();
        self.body.push(Instruction::binary(
            Op::ImageSampleImplicitLod,
            vec4_ty,
            texel,
            combined,
            args[2],
        ));
        self.body.push(
            Instruction::new(Op::CompositeExtract)
                .with_type(ty)
                .with_result(id)
                .id(texel)
                .literal(0),
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::codegen::spirv::{generate, SpirvModule};
    use crate::config::GeneratorOptions;
    use crate::ir::{Access, AddressSpace, BuiltinFn, Builder, Module};
    use spirv::Op;

    fn lower(module: &Module, spirv_version: (u8, u8)) -> SpirvModule {
        let options = GeneratorOptions {
            spirv_version,
            validate_ir: false,
            ..GeneratorOptions::default()
        };
        generate(module, &options).unwrap().module
    }

    #[test]
    fn test_vector_times_scalar() {
        let mut b = Builder::new("scale");
        let f32_ty = b.types().f32();
        let vec3 = b.types().vec3(f32_ty);
        let f = b.function("scale", vec3);
        let v = b.function_param(f, "v", vec3);
        let s = b.function_param(f, "s", f32_ty);
        let scaled = b.multiply(vec3, s, v);
        b.return_(Some(scaled));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::VectorTimesScalar), 1);
        assert_eq!(spirv.count(Op::FMul), 0);
    }

    #[test]
    fn test_integer_vector_times_scalar_splats() {
        let mut b = Builder::new("scale");
        let i32_ty = b.types().i32();
        let ivec2 = b.types().vec2(i32_ty);
        let f = b.function("scale", ivec2);
        let v = b.function_param(f, "v", ivec2);
        let s = b.function_param(f, "s", i32_ty);
        let scaled = b.multiply(ivec2, v, s);
        b.return_(Some(scaled));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::VectorTimesScalar), 0);
        assert_eq!(spirv.count(Op::CompositeConstruct), 1);
        assert_eq!(spirv.count(Op::IMul), 1);
    }

    #[test]
    fn test_matrix_add_is_columnwise() {
        let mut b = Builder::new("matrix");
        let f32_ty = b.types().f32();
        let mat = b.types().mat(f32_ty, 3, 3);
        let f = b.function("sum", mat);
        let x = b.function_param(f, "x", mat);
        let y = b.function_param(f, "y", mat);
        let sum = b.add(mat, x, y);
        b.return_(Some(sum));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::FAdd), 3);
        assert_eq!(spirv.count(Op::CompositeExtract), 6);
        assert_eq!(spirv.count(Op::CompositeConstruct), 1);
    }

    #[test]
    fn test_bool_conversions() {
        let mut b = Builder::new("convert");
        let f32_ty = b.types().f32();
        let bool_ty = b.types().bool();
        let f = b.function("roundtrip", f32_ty);
        let x = b.function_param(f, "x", f32_ty);
        let as_bool = b.convert(bool_ty, x);
        let back = b.convert(f32_ty, as_bool);
        b.return_(Some(back));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::FUnordNotEqual), 1);
        assert_eq!(spirv.count(Op::Select), 1);
    }

    #[test]
    fn test_dynamic_index_into_array_value_is_rejected() {
        let mut b = Builder::new("dynamic");
        let f32_ty = b.types().f32();
        let i32_ty = b.types().i32();
        let array = b.types().array(f32_ty, 4);
        let f = b.function("pick", f32_ty);
        let values = b.function_param(f, "values", array);
        let index = b.function_param(f, "index", i32_ty);
        let picked = b.access(f32_ty, values, &[index]);
        b.return_(Some(picked));
        let options = GeneratorOptions {
            validate_ir: false,
            ..GeneratorOptions::default()
        };
        let err = generate(&b.finish(), &options).unwrap_err();
        assert!(err.has_code("E5002"));
    }

    #[test]
    fn test_dynamic_index_into_vector() {
        let mut b = Builder::new("dynamic");
        let f32_ty = b.types().f32();
        let u32_ty = b.types().u32();
        let vec4 = b.types().vec4(f32_ty);
        let f = b.function("pick", f32_ty);
        let v = b.function_param(f, "v", vec4);
        let index = b.function_param(f, "index", u32_ty);
        let picked = b.access(f32_ty, v, &[index]);
        b.return_(Some(picked));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::VectorExtractDynamic), 1);
    }

    #[test]
    fn test_vector_select_splats_condition_before_1_4() {
        let build = || {
            let mut b = Builder::new("select");
            let f32_ty = b.types().f32();
            let bool_ty = b.types().bool();
            let vec2 = b.types().vec2(f32_ty);
            let f = b.function("choose", vec2);
            let x = b.function_param(f, "x", vec2);
            let y = b.function_param(f, "y", vec2);
            let c = b.function_param(f, "c", bool_ty);
            let chosen = b.call(vec2, BuiltinFn::Select, &[x, y, c]);
            b.return_(chosen);
            b.finish()
        };
        let old = lower(&build(), (1, 3));
        assert_eq!(old.count(Op::CompositeConstruct), 1);
        assert_eq!(old.count(Op::Select), 1);
        let new = lower(&build(), (1, 4));
        assert_eq!(new.count(Op::CompositeConstruct), 0);
    }

    #[test]
    fn test_glsl_import_declared_once() {
        let mut b = Builder::new("glsl");
        let f32_ty = b.types().f32();
        let f = b.function("f", f32_ty);
        let x = b.function_param(f, "x", f32_ty);
        let s = b.call(f32_ty, BuiltinFn::Sqrt, &[x]).unwrap();
        let c = b.call(f32_ty, BuiltinFn::Floor, &[s]).unwrap();
        b.return_(Some(c));
        let spirv = lower(&b.finish(), (1, 3));
        assert_eq!(spirv.count(Op::ExtInstImport), 1);
        assert_eq!(spirv.count(Op::ExtInst), 2);
    }

    #[test]
    fn test_workgroup_barrier() {
        let mut b = Builder::new("barrier");
        let void = b.types().void();
        let i32_ty = b.types().i32();
        b.global_var(
            "shared",
            AddressSpace::Workgroup,
            i32_ty,
            Access::ReadWrite,
            Default::default(),
        );
        b.function("sync", void);
        b.call(void, BuiltinFn::WorkgroupBarrier, &[]);
        b.return_(None);
        let spirv = lower(&b.finish(), (1, 3));
        let barrier = spirv
            .instructions()
            .find(|i| i.op == Op::ControlBarrier)
            .unwrap();
        assert_eq!(barrier.operands.len(), 3);
        // Execution and memory scope share one constant
        assert_eq!(barrier.operands[0], barrier.operands[1]);
    }
}
