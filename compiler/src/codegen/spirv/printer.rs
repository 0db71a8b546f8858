//! SPIR-V generator
//!
//! Walks a validated [`Module`] in structured order and emits one SPIR-V
//! block per IR block. Block parameters become `OpPhi`s keyed by the label of
//! the block that holds each exit. Loop body parameters live in an extra
//! header block which also carries the `OpLoopMerge`.
//!
//! Result ids are handed out lazily: a value gets its id the first time it
//! is referenced, which lets header phis name values of the continuing block
//! before that block has been emitted.

use super::binary::{BinaryWriter, GENERATOR_WORD};
use super::module::{Instruction, SpirvModule};
use crate::config::GeneratorOptions;
use crate::ir::validation::validate_module;
use crate::ir::{
    Access, AddressSpace, BlockId, BlockRole, BuiltinValue, CaseSelector, ConstantId,
    ConstantManager, ConstantValue, FunctionId, InstId, InstructionKind, Module, PipelineStage,
    SamplerKind, TextureDimension, Type, TypeId, TypeManager, ValueId, ValueKind,
};
use diagnostics::shader::ShaderDiagnostics;
use diagnostics::{Diagnostic, Diagnostics, Location};
use fxhash::{FxHashMap, FxHashSet};
use indexmap::IndexSet;
use spirv::{Capability, Decoration, Op, StorageClass, Word};
use tracing::{debug, trace};

/// Result of a successful generation
#[derive(Debug, Clone)]
pub struct SpirvOutput {
    /// The encoded binary
    pub words: Vec<Word>,
    /// The sectioned module the binary was written from
    pub module: SpirvModule,
}

/// Generate a SPIR-V binary for `module`.
pub fn generate(module: &Module, options: &GeneratorOptions) -> Result<SpirvOutput, Diagnostics> {
    Printer::new(module, options).generate()
}

/// Function signature keyed on SPIR-V type ids
type FunctionTypeKey = (Word, Vec<Word>);

/// A module-scope variable emitted from the root block
#[derive(Debug, Clone)]
struct GlobalVar {
    value: ValueId,
    id: Word,
    space: AddressSpace,
    builtin: Option<BuiltinValue>,
    /// Integer-typed input with a location; needs `Flat` in fragment shaders
    flat_candidate: bool,
}

pub struct Printer<'m> {
    pub(super) ir: &'m Module,
    pub(super) options: &'m GeneratorOptions,

    /// Working copies of the interners; canonicalisation adds entries
    pub(super) types: TypeManager,
    pub(super) constants: ConstantManager,

    spirv: SpirvModule,
    next_id: Word,
    diagnostics: Diagnostics,

    /// Written out in first-use order once generation finishes
    capabilities: IndexSet<Capability>,
    extensions: IndexSet<&'static str>,
    glsl_std_450: Option<Word>,

    /// Keyed on both the original and the canonical type
    type_ids: FxHashMap<TypeId, Word>,
    constant_ids: FxHashMap<ConstantId, Word>,
    /// Keyed on the SPIR-V type id
    undef_ids: FxHashMap<Word, Word>,
    function_type_ids: FxHashMap<FunctionTypeKey, Word>,
    function_ids: FxHashMap<FunctionId, Word>,

    /// IR value to SPIR-V id; aliases share ids
    values: FxHashMap<ValueId, Word>,
    labels: FxHashMap<BlockId, Word>,
    /// Header label of every loop region
    loop_headers: FxHashMap<InstId, Word>,
    /// Blocks emitted with their contents; exits in them are real predecessors
    live_blocks: FxHashSet<BlockId>,
    globals: Vec<GlobalVar>,
    flat_decorated: FxHashSet<Word>,

    /// `OpVariable`s of the function being emitted
    function_vars: Vec<Instruction>,
    /// Instructions of the function being emitted, from its first label on
    pub(super) body: Vec<Instruction>,
}

impl<'m> Printer<'m> {
    pub fn new(ir: &'m Module, options: &'m GeneratorOptions) -> Self {
        Self {
            ir,
            options,
            types: ir.types().clone(),
            constants: ir.constants().clone(),
            spirv: SpirvModule::default(),
            next_id: 1,
            diagnostics: Diagnostics::new(),
            capabilities: IndexSet::new(),
            extensions: IndexSet::new(),
            glsl_std_450: None,
            type_ids: FxHashMap::default(),
            constant_ids: FxHashMap::default(),
            undef_ids: FxHashMap::default(),
            function_type_ids: FxHashMap::default(),
            function_ids: FxHashMap::default(),
            values: FxHashMap::default(),
            labels: FxHashMap::default(),
            loop_headers: FxHashMap::default(),
            live_blocks: FxHashSet::default(),
            globals: Vec::new(),
            flat_decorated: FxHashSet::default(),
            function_vars: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Validate the module and emit the whole SPIR-V binary.
    ///
    /// Nothing partial is returned: any diagnostic raised while walking the
    /// module fails the whole generation.
    pub fn generate(mut self) -> Result<SpirvOutput, Diagnostics> {
        let ir = self.ir;
        if self.options.validate_ir {
            validate_module(ir)?;
        }
        let (major, minor) = self.options.spirv_version;
        log::info!(
            "generating SPIR-V {}.{} for module '{}' ({} functions)",
            major,
            minor,
            ir.name,
            ir.function_count()
        );

        self.capability(Capability::Shader);
        self.spirv.memory_model.push(Instruction::memory_model(
            spirv::AddressingModel::Logical,
            spirv::MemoryModel::GLSL450,
        ));

        self.emit_root();
        let functions: Vec<FunctionId> = ir.functions().map(|(id, _)| id).collect();
        for function in functions {
            self.emit_function(function);
        }

        if self.diagnostics.has_errors() {
            return Err(self.diagnostics);
        }

        self.spirv.capabilities = self
            .capabilities
            .iter()
            .map(|&c| Instruction::capability(c))
            .collect();
        self.spirv.extensions = self
            .extensions
            .iter()
            .map(|name| Instruction::extension(name))
            .collect();
        self.spirv.version = self.options.spirv_version;
        self.spirv.generator = GENERATOR_WORD;
        self.spirv.id_bound = self.next_id;
        let words = BinaryWriter::write(&self.spirv);
        log::info!(
            "generated {} words, id bound {}",
            words.len(),
            self.spirv.id_bound
        );
        Ok(SpirvOutput {
            words,
            module: self.spirv,
        })
    }

    // === Ids and module-level declarations ===

    pub(super) fn fresh_id(&mut self) -> Word {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub(super) fn capability(&mut self, capability: Capability) {
        self.capabilities.insert(capability);
    }

    pub(super) fn extension(&mut self, name: &'static str) {
        self.extensions.insert(name);
    }

    /// Id of the `GLSL.std.450` import, declared on first use.
    pub(super) fn glsl_std_450(&mut self) -> Word {
        if let Some(id) = self.glsl_std_450 {
            return id;
        }
        let id = self.fresh_id();
        self.spirv
            .ext_inst_imports
            .push(Instruction::ext_inst_import(id, "GLSL.std.450"));
        self.glsl_std_450 = Some(id);
        id
    }

    fn debug_name(&mut self, target: Word, name: &str) {
        if self.options.emit_debug_names && !name.is_empty() {
            self.spirv.debug.push(Instruction::name(target, name));
        }
    }

    fn decorate(&mut self, target: Word, decoration: Decoration, args: &[u32]) {
        self.spirv
            .annotations
            .push(Instruction::decorate(target, decoration, args));
    }

    pub(super) fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub(super) fn location(&self, inst: InstId) -> Location {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let location = match ir.block(data.block).function {
            Some(function) => Location::function(ir.function_name(function)),
            None => Location::module(),
        };
        location.in_block(data.block.0).at_instruction(inst.0)
    }

    pub(super) fn unsupported(&mut self, inst: InstId, what: impl Into<String>) {
        let diagnostic = ShaderDiagnostics::unsupported(self.location(inst), what);
        self.push_diagnostic(diagnostic);
    }

    // === Types ===

    /// Map a type onto the one it shares a SPIR-V declaration with.
    ///
    /// Atomics are their inner type, depth textures are sampled `f32`
    /// textures, comparison samplers are plain samplers, and pointer access
    /// modes are not represented.
    pub(super) fn canonical_type(&mut self, ty: TypeId) -> TypeId {
        match self.types.resolve(ty).clone() {
            Type::Atomic(inner) => self.canonical_type(inner),
            Type::DepthTexture { dim } => {
                let f32 = self.types.f32();
                self.types.sampled_texture(dim, f32)
            }
            Type::Sampler(SamplerKind::Comparison) => self.types.sampler(SamplerKind::Sampler),
            Type::Pointer { space, store, .. } => {
                let store = self.canonical_type(store);
                self.types.ptr(space, store, Access::ReadWrite)
            }
            Type::Array { elem, count } => {
                let canonical = self.canonical_type(elem);
                if canonical == elem {
                    ty
                } else {
                    self.types.get(Type::Array {
                        elem: canonical,
                        count,
                    })
                }
            }
            Type::Struct {
                name,
                members,
                block,
            } => {
                let mut changed = false;
                let mut canonical_members = members;
                for member in &mut canonical_members {
                    let canonical = self.canonical_type(member.ty);
                    changed |= canonical != member.ty;
                    member.ty = canonical;
                }
                if !changed {
                    return ty;
                }
                self.types.get(Type::Struct {
                    name,
                    members: canonical_members,
                    block,
                })
            }
            Type::SampledImage(image) => {
                let image = self.canonical_type(image);
                self.types.sampled_image(image)
            }
            _ => ty,
        }
    }

    /// SPIR-V id of a type, declaring it and everything it references on
    /// first use.
    pub(super) fn type_id(&mut self, ty: TypeId) -> Word {
        if let Some(&id) = self.type_ids.get(&ty) {
            return id;
        }
        let canonical = self.canonical_type(ty);
        let id = match self.type_ids.get(&canonical) {
            Some(&id) => id,
            None => {
                let id = self.declare_type(canonical);
                self.type_ids.insert(canonical, id);
                id
            }
        };
        self.type_ids.insert(ty, id);
        id
    }

    fn declare_type(&mut self, ty: TypeId) -> Word {
        let declaration = match self.types.resolve(ty).clone() {
            Type::Void => Instruction::new(Op::TypeVoid),
            Type::Bool => Instruction::new(Op::TypeBool),
            Type::I32 => Instruction::new(Op::TypeInt).literal(32).literal(1),
            Type::U32 => Instruction::new(Op::TypeInt).literal(32).literal(0),
            Type::F32 => Instruction::new(Op::TypeFloat).literal(32),
            Type::F16 => {
                self.capability(Capability::Float16);
                Instruction::new(Op::TypeFloat).literal(16)
            }
            Type::Vector { elem, width } => {
                let elem = self.type_id(elem);
                Instruction::new(Op::TypeVector).id(elem).literal(width)
            }
            Type::Matrix { column, columns } => {
                let column = self.type_id(column);
                Instruction::new(Op::TypeMatrix).id(column).literal(columns)
            }
            Type::Array { elem, count } => {
                let elem = self.type_id(elem);
                match count {
                    Some(count) => {
                        let length = self.u32_constant(count);
                        Instruction::new(Op::TypeArray).id(elem).id(length)
                    }
                    None => Instruction::new(Op::TypeRuntimeArray).id(elem),
                }
            }
            Type::Atomic(inner) => return self.type_id(inner),
            Type::Pointer { space, store, .. } => {
                let store = self.type_id(store);
                Instruction::new(Op::TypePointer)
                    .literal(storage_class(space) as u32)
                    .id(store)
            }
            Type::Struct { ref members, .. } => {
                let member_ids: Vec<Word> = members.iter().map(|m| self.type_id(m.ty)).collect();
                Instruction::new(Op::TypeStruct).ids(member_ids)
            }
            Type::Sampler(_) => Instruction::new(Op::TypeSampler),
            Type::SampledTexture { dim, sampled } => self.image_type(sampled, dim, false, 1, None),
            Type::MultisampledTexture { dim, sampled } => {
                self.image_type(sampled, dim, true, 1, None)
            }
            Type::DepthTexture { dim } => {
                let f32 = self.types.f32();
                self.image_type(f32, dim, false, 1, None)
            }
            Type::StorageTexture { dim, format, .. } => {
                let channel = match format.channel_kind() {
                    1 => self.types.i32(),
                    2 => self.types.u32(),
                    _ => self.types.f32(),
                };
                self.image_type(channel, dim, false, 2, Some(format))
            }
            Type::SampledImage(image) => {
                let image = self.type_id(image);
                Instruction::new(Op::TypeSampledImage).id(image)
            }
        };

        let id = self.fresh_id();
        trace!("declaring {} as %{}", self.types.name(ty), id);
        self.spirv.types_globals.push(declaration.with_result(id));
        self.decorate_type(ty, id);
        id
    }

    fn image_type(
        &mut self,
        sampled: TypeId,
        dim: TextureDimension,
        multisampled: bool,
        sampled_mode: u32,
        format: Option<crate::ir::TexelFormat>,
    ) -> Instruction {
        let storage = sampled_mode == 2;
        let (spirv_dim, arrayed) = match dim {
            TextureDimension::D1 => {
                self.capability(if storage {
                    Capability::Image1D
                } else {
                    Capability::Sampled1D
                });
                (spirv::Dim::Dim1D, 0)
            }
            TextureDimension::D2 => (spirv::Dim::Dim2D, 0),
            TextureDimension::D2Array => (spirv::Dim::Dim2D, 1),
            TextureDimension::D3 => (spirv::Dim::Dim3D, 0),
            TextureDimension::Cube => (spirv::Dim::DimCube, 0),
            TextureDimension::CubeArray => {
                self.capability(if storage {
                    Capability::ImageCubeArray
                } else {
                    Capability::SampledCubeArray
                });
                (spirv::Dim::DimCube, 1)
            }
        };
        let format = match format {
            Some(format) => self.image_format(format),
            None => spirv::ImageFormat::Unknown,
        };
        let sampled = self.type_id(sampled);
        Instruction::new(Op::TypeImage)
            .id(sampled)
            .literal(spirv_dim as u32)
            .literal(0)
            .literal(arrayed)
            .literal(multisampled as u32)
            .literal(sampled_mode)
            .literal(format as u32)
    }

    fn image_format(&mut self, format: crate::ir::TexelFormat) -> spirv::ImageFormat {
        use crate::ir::TexelFormat as F;
        use spirv::ImageFormat as I;
        let image_format = match format {
            F::Rgba8Unorm => I::Rgba8,
            F::Rgba8Snorm => I::Rgba8Snorm,
            F::Rgba8Uint => I::Rgba8ui,
            F::Rgba8Sint => I::Rgba8i,
            F::Rgba16Uint => I::Rgba16ui,
            F::Rgba16Sint => I::Rgba16i,
            F::Rgba16Float => I::Rgba16f,
            F::R32Uint => I::R32ui,
            F::R32Sint => I::R32i,
            F::R32Float => I::R32f,
            F::Rg32Uint => I::Rg32ui,
            F::Rg32Sint => I::Rg32i,
            F::Rg32Float => I::Rg32f,
            F::Rgba32Uint => I::Rgba32ui,
            F::Rgba32Sint => I::Rgba32i,
            F::Rgba32Float => I::Rgba32f,
        };
        if matches!(format, F::Rg32Uint | F::Rg32Sint | F::Rg32Float) {
            self.capability(Capability::StorageImageExtendedFormats);
        }
        image_format
    }

    /// Layout decorations and member names of a freshly declared type.
    fn decorate_type(&mut self, ty: TypeId, id: Word) {
        match self.types.resolve(ty).clone() {
            Type::Array { .. } => {
                if let Some(stride) = self.types.array_stride(ty) {
                    self.decorate(id, Decoration::ArrayStride, &[stride]);
                }
            }
            Type::Struct {
                name,
                members,
                block,
            } => {
                let offsets = self.types.member_offsets(ty);
                for (index, member) in members.iter().enumerate() {
                    let index = index as u32;
                    let offset = offsets.get(index as usize).copied().unwrap_or(0);
                    self.spirv.annotations.push(Instruction::member_decorate(
                        id,
                        index,
                        Decoration::Offset,
                        &[offset],
                    ));
                    if let Some(stride) = self.matrix_stride(member.ty) {
                        self.spirv.annotations.push(Instruction::member_decorate(
                            id,
                            index,
                            Decoration::ColMajor,
                            &[],
                        ));
                        self.spirv.annotations.push(Instruction::member_decorate(
                            id,
                            index,
                            Decoration::MatrixStride,
                            &[stride],
                        ));
                    }
                    if self.options.emit_debug_names {
                        self.spirv
                            .debug
                            .push(Instruction::member_name(id, index, &member.name));
                    }
                }
                self.debug_name(id, &name);
                if block {
                    self.decorate(id, Decoration::Block, &[]);
                }
            }
            _ => {}
        }
    }

    /// Column stride of a matrix, looking through arrays of matrices.
    fn matrix_stride(&self, ty: TypeId) -> Option<u32> {
        match self.types.resolve(ty) {
            Type::Matrix { column, .. } => {
                let layout = self.types.layout(*column)?;
                Some(layout.size.div_ceil(layout.align) * layout.align)
            }
            Type::Array { elem, .. } => self.matrix_stride(*elem),
            _ => None,
        }
    }

    fn function_type(&mut self, return_type: Word, params: Vec<Word>) -> Word {
        let key = (return_type, params);
        if let Some(&id) = self.function_type_ids.get(&key) {
            return id;
        }
        let id = self.fresh_id();
        self.spirv.types_globals.push(
            Instruction::new(Op::TypeFunction)
                .with_result(id)
                .id(return_type)
                .ids(key.1.iter().copied()),
        );
        self.function_type_ids.insert(key, id);
        id
    }

    // === Constants ===

    pub(super) fn constant_id(&mut self, constant: ConstantId) -> Word {
        if let Some(&id) = self.constant_ids.get(&constant) {
            return id;
        }
        let data = self.constants.resolve(constant).clone();
        let ty = self.type_id(data.ty);
        let declaration = match data.value {
            ConstantValue::Bool(true) => Instruction::new(Op::ConstantTrue),
            ConstantValue::Bool(false) => Instruction::new(Op::ConstantFalse),
            ConstantValue::I32(v) => Instruction::new(Op::Constant).literal(v as u32),
            ConstantValue::U32(v) => Instruction::new(Op::Constant).literal(v),
            ConstantValue::F32(bits) => Instruction::new(Op::Constant).literal(bits),
            ConstantValue::F16(bits) => Instruction::new(Op::Constant).literal(bits as u32),
            ConstantValue::Composite { ref elements, .. } => {
                let ids: Vec<Word> = elements.iter().map(|&e| self.constant_id(e)).collect();
                Instruction::new(Op::ConstantComposite).ids(ids)
            }
            ConstantValue::Splat { element, count, .. } => {
                let element = self.constant_id(element);
                Instruction::new(Op::ConstantComposite)
                    .ids(std::iter::repeat(element).take(count as usize))
            }
            ConstantValue::Zero(_) => Instruction::new(Op::ConstantNull),
        };
        let id = self.fresh_id();
        self.spirv
            .types_globals
            .push(declaration.with_type(ty).with_result(id));
        self.constant_ids.insert(constant, id);
        id
    }

    pub(super) fn u32_constant(&mut self, value: u32) -> Word {
        let constant = self.constants.get(&mut self.types, ConstantValue::U32(value));
        self.constant_id(constant)
    }

    /// The zero value of `ty`.
    pub(super) fn null_id(&mut self, ty: TypeId) -> Word {
        let constant = self.constants.get(&mut self.types, ConstantValue::Zero(ty));
        self.constant_id(constant)
    }

    /// One in every component of a numeric scalar or vector type.
    pub(super) fn one_id(&mut self, ty: TypeId) -> Word {
        let scalar = self.types.scalar_of(ty);
        let one = match self.types.resolve(scalar) {
            Type::I32 => ConstantValue::I32(1),
            Type::U32 => ConstantValue::U32(1),
            Type::F16 => ConstantValue::F16(0x3c00),
            Type::Bool => ConstantValue::Bool(true),
            _ => ConstantValue::f32(1.0),
        };
        let mut constant = self.constants.get(&mut self.types, one);
        if let Some(width) = self.types.vector_width(ty) {
            constant = self.constants.get(
                &mut self.types,
                ConstantValue::Splat {
                    ty,
                    element: constant,
                    count: width,
                },
            );
        }
        self.constant_id(constant)
    }

    fn undef(&mut self, ty: Word) -> Word {
        if let Some(&id) = self.undef_ids.get(&ty) {
            return id;
        }
        let id = self.fresh_id();
        self.spirv
            .types_globals
            .push(Instruction::new(Op::Undef).with_type(ty).with_result(id));
        self.undef_ids.insert(ty, id);
        id
    }

    // === Values, labels and functions ===

    /// SPIR-V id of an IR value, allocated on first reference.
    pub(super) fn value_id(&mut self, value: ValueId) -> Word {
        if let Some(&id) = self.values.get(&value) {
            return id;
        }
        let id = match self.ir.value(value).kind {
            ValueKind::Constant(constant) => self.constant_id(constant),
            _ => self.fresh_id(),
        };
        self.values.insert(value, id);
        id
    }

    /// Make `result` stand for the existing id `id`.
    ///
    /// A result that was already referenced ahead of its definition keeps its
    /// own id and receives a copy instead.
    pub(super) fn alias(&mut self, result: ValueId, id: Word) {
        match self.values.get(&result) {
            Some(&existing) => {
                let ty = self.type_id(self.ir.value_type(result));
                self.body
                    .push(Instruction::unary(Op::CopyObject, ty, existing, id));
            }
            None => {
                self.values.insert(result, id);
            }
        }
    }

    fn label(&mut self, block: BlockId) -> Word {
        if let Some(&id) = self.labels.get(&block) {
            return id;
        }
        let id = self.fresh_id();
        self.labels.insert(block, id);
        id
    }

    fn loop_header(&mut self, region: InstId) -> Word {
        if let Some(&id) = self.loop_headers.get(&region) {
            return id;
        }
        let id = self.fresh_id();
        self.loop_headers.insert(region, id);
        id
    }

    pub(super) fn function_id(&mut self, function: FunctionId) -> Word {
        if let Some(&id) = self.function_ids.get(&function) {
            return id;
        }
        let id = self.fresh_id();
        self.function_ids.insert(function, id);
        id
    }

    // === Root block ===

    fn emit_root(&mut self) {
        let ir = self.ir;
        for &inst in &ir.block(ir.root_block()).instructions {
            self.emit_global_var(inst);
        }
    }

    fn emit_global_var(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let (InstructionKind::Var { attributes }, Some(result)) = (&data.kind, data.result) else {
            self.unsupported(inst, "non-variable instruction at module scope");
            return;
        };
        let ptr_ty = ir.value_type(result);
        let Some((space, store, access)) = self.types.pointee(ptr_ty) else {
            self.unsupported(inst, "module-scope variable of non-pointer type");
            return;
        };
        let name = ir.name_of(result).unwrap_or_default().to_string();
        let display_name = if name.is_empty() {
            result.to_string()
        } else {
            name.clone()
        };
        let location = self.location(inst);

        if space.needs_binding() && attributes.binding.is_none() {
            self.push_diagnostic(ShaderDiagnostics::missing_binding(location, &display_name));
            return;
        }
        if space == AddressSpace::Storage && !self.options.supports(1, 3) {
            self.push_diagnostic(ShaderDiagnostics::requires_version(
                location,
                "storage buffers",
                1,
                3,
            ));
            return;
        }
        if space == AddressSpace::Uniform {
            if let Err(reason) = self.types.check_uniform_layout(store) {
                self.push_diagnostic(ShaderDiagnostics::uniform_layout(location, reason));
                return;
            }
        }
        let is_block = matches!(self.types.resolve(store), Type::Struct { block: true, .. });
        if matches!(
            space,
            AddressSpace::Uniform | AddressSpace::Storage | AddressSpace::PushConstant
        ) && !is_block
        {
            self.unsupported(
                inst,
                format!(
                    "{} variable '{}' whose store type {} is not a block structure",
                    space,
                    display_name,
                    self.types.name(store)
                ),
            );
            return;
        }

        let ptr = self.type_id(ptr_ty);
        let id = self.fresh_id();
        let mut variable = Instruction::new(Op::Variable)
            .with_type(ptr)
            .with_result(id)
            .literal(storage_class(space) as u32);
        if let Some(&init) = data.operands.first() {
            variable = variable.id(self.value_id(init));
        } else if space == AddressSpace::Workgroup && self.options.zero_init_workgroup_memory {
            variable = variable.id(self.null_id(store));
        }
        self.spirv.types_globals.push(variable);

        if let Some(binding) = attributes.binding {
            self.decorate(id, Decoration::DescriptorSet, &[binding.group]);
            self.decorate(id, Decoration::Binding, &[binding.binding]);
        }
        if let Some(builtin) = attributes.builtin {
            let spirv_builtin = self.builtin(builtin, space);
            self.decorate(id, Decoration::BuiltIn, &[spirv_builtin as u32]);
        }
        if let Some(loc) = attributes.location {
            self.decorate(id, Decoration::Location, &[loc]);
        }
        if space == AddressSpace::Storage && access == Access::Read {
            self.decorate(id, Decoration::NonWritable, &[]);
        }
        self.debug_name(id, &name);

        trace!("module-scope {} variable {} is %{}", space, display_name, id);
        self.values.insert(result, id);
        self.globals.push(GlobalVar {
            value: result,
            id,
            space,
            builtin: attributes.builtin,
            flat_candidate: space == AddressSpace::Input
                && attributes.location.is_some()
                && self.types.is_integer_scalar_or_vector(store),
        });
    }

    fn builtin(&mut self, builtin: BuiltinValue, space: AddressSpace) -> spirv::BuiltIn {
        use spirv::BuiltIn;
        match builtin {
            BuiltinValue::Position if space == AddressSpace::Input => BuiltIn::FragCoord,
            BuiltinValue::Position => BuiltIn::Position,
            BuiltinValue::VertexIndex => BuiltIn::VertexIndex,
            BuiltinValue::InstanceIndex => BuiltIn::InstanceIndex,
            BuiltinValue::FrontFacing => BuiltIn::FrontFacing,
            BuiltinValue::FragDepth => BuiltIn::FragDepth,
            BuiltinValue::SampleIndex => {
                self.capability(Capability::SampleRateShading);
                BuiltIn::SampleId
            }
            BuiltinValue::SampleMask => BuiltIn::SampleMask,
            BuiltinValue::LocalInvocationId => BuiltIn::LocalInvocationId,
            BuiltinValue::LocalInvocationIndex => BuiltIn::LocalInvocationIndex,
            BuiltinValue::GlobalInvocationId => BuiltIn::GlobalInvocationId,
            BuiltinValue::WorkgroupId => BuiltIn::WorkgroupId,
            BuiltinValue::NumWorkgroups => BuiltIn::NumWorkgroups,
        }
    }

    // === Functions ===

    fn emit_function(&mut self, function_id: FunctionId) {
        let ir = self.ir;
        let function = ir.function(function_id);
        let name = ir.function_name(function_id);
        debug!("emitting function {}", name);

        self.function_vars.clear();
        self.body.clear();

        let id = self.function_id(function_id);
        let return_type = self.type_id(function.return_type);
        let param_types: Vec<Word> = function
            .params
            .iter()
            .map(|&p| self.type_id(ir.value_type(p)))
            .collect();
        let signature = self.function_type(return_type, param_types);
        self.debug_name(id, name);

        let mut header = vec![Instruction::new(Op::Function)
            .with_type(return_type)
            .with_result(id)
            .literal(spirv::FunctionControl::NONE.bits())
            .id(signature)];
        for &param in &function.params {
            let ty = self.type_id(ir.value_type(param));
            let param_id = self.value_id(param);
            header.push(
                Instruction::new(Op::FunctionParameter)
                    .with_type(ty)
                    .with_result(param_id),
            );
            if let Some(param_name) = ir.name_of(param) {
                self.debug_name(param_id, param_name);
            }
        }

        self.emit_block(function.start);

        let mut body = std::mem::take(&mut self.body);
        let vars = std::mem::take(&mut self.function_vars);
        // Variables directly follow the first label
        let split = body.len().min(1);
        body.splice(split..split, vars);

        self.spirv.functions.extend(header);
        self.spirv.functions.extend(body);
        self.spirv.functions.push(Instruction::new(Op::FunctionEnd));

        if let Some(stage) = function.stage {
            self.emit_entry_point(function_id, id, stage, function.workgroup_size);
        }
    }

    /// Functions reachable from `entry` through calls, `entry` included.
    fn reachable_functions(&self, entry: FunctionId) -> FxHashSet<FunctionId> {
        let ir = self.ir;
        let mut seen = FxHashSet::default();
        let mut stack = vec![entry];
        while let Some(function) = stack.pop() {
            if !seen.insert(function) {
                continue;
            }
            for (_, block) in ir.blocks().filter(|(_, b)| b.function == Some(function)) {
                for &inst in &block.instructions {
                    if let InstructionKind::UserCall(callee) = ir.instruction(inst).kind {
                        stack.push(callee);
                    }
                }
            }
        }
        seen
    }

    fn emit_entry_point(
        &mut self,
        function: FunctionId,
        id: Word,
        stage: PipelineStage,
        workgroup_size: Option<[u32; 3]>,
    ) {
        let ir = self.ir;
        let reachable = self.reachable_functions(function);
        // Since 1.4 the interface lists every global the entry point uses
        let all_globals = self.options.supports(1, 4);

        let mut interface = Vec::new();
        let mut flat = Vec::new();
        let mut depth_replacing = false;
        for global in &self.globals {
            if !all_globals && !global.space.is_io() {
                continue;
            }
            let used = ir.value(global.value).usages.iter().any(|usage| {
                let block = ir.instruction(usage.instruction).block;
                ir.block(block)
                    .function
                    .is_some_and(|f| reachable.contains(&f))
            });
            if !used {
                continue;
            }
            interface.push(global.id);
            if global.builtin == Some(BuiltinValue::FragDepth) {
                depth_replacing = true;
            }
            if stage == PipelineStage::Fragment && global.flat_candidate {
                flat.push(global.id);
            }
        }

        let model = match stage {
            PipelineStage::Compute => spirv::ExecutionModel::GLCompute,
            PipelineStage::Vertex => spirv::ExecutionModel::Vertex,
            PipelineStage::Fragment => spirv::ExecutionModel::Fragment,
        };
        let name = ir.function_name(function);
        debug!(
            "entry point {} ({}) with {} interface variables",
            name,
            stage,
            interface.len()
        );
        self.spirv
            .entry_points
            .push(Instruction::entry_point(model, id, name, &interface));

        match stage {
            PipelineStage::Compute => {
                let [x, y, z] = workgroup_size.unwrap_or([1, 1, 1]);
                self.spirv.execution_modes.push(Instruction::execution_mode(
                    id,
                    spirv::ExecutionMode::LocalSize,
                    &[x, y, z],
                ));
            }
            PipelineStage::Fragment => {
                self.spirv.execution_modes.push(Instruction::execution_mode(
                    id,
                    spirv::ExecutionMode::OriginUpperLeft,
                    &[],
                ));
                if depth_replacing {
                    self.spirv.execution_modes.push(Instruction::execution_mode(
                        id,
                        spirv::ExecutionMode::DepthReplacing,
                        &[],
                    ));
                }
            }
            PipelineStage::Vertex => {}
        }

        for var in flat {
            if self.flat_decorated.insert(var) {
                self.decorate(var, Decoration::Flat, &[]);
            }
        }
    }

    // === Blocks ===

    fn has_live_inbound(&self, block: BlockId) -> bool {
        let ir = self.ir;
        ir.block(block).inbound.iter().any(|&exit| {
            let data = ir.instruction(exit);
            data.alive && self.live_blocks.contains(&data.block)
        })
    }

    fn emit_block(&mut self, block: BlockId) {
        let ir = self.ir;
        let data = ir.block(block);
        let label = self.label(block);
        self.body.push(Instruction::label(label));

        if matches!(data.role, BlockRole::Merge | BlockRole::Continuing) {
            if !self.has_live_inbound(block) {
                trace!("{} has no live predecessors", block);
                self.body.push(Instruction::new(Op::Unreachable));
                return;
            }
            let phis = self.block_phis(block, None);
            self.body.extend(phis);
        }

        self.live_blocks.insert(block);
        for &inst in &data.instructions {
            self.emit_instruction(inst);
        }
    }

    /// One `OpPhi` per parameter of `target`, with an incoming pair for every
    /// live exit into it. `undef_from` adds an `OpUndef` input from a
    /// predecessor that has no IR exit.
    fn block_phis(&mut self, target: BlockId, undef_from: Option<Word>) -> Vec<Instruction> {
        let ir = self.ir;
        let data = ir.block(target);
        if data.params.is_empty() {
            return Vec::new();
        }

        // (predecessor label, arguments)
        let mut incoming: Vec<(Word, &[ValueId])> = Vec::new();
        for &exit in &data.inbound {
            let inst = ir.instruction(exit);
            if !inst.alive || !self.live_blocks.contains(&inst.block) {
                continue;
            }
            let Some((_, range)) = ir
                .branch_targets(exit)
                .into_iter()
                .find(|(block, _)| *block == target)
            else {
                continue;
            };
            let predecessor = self.label(inst.block);
            incoming.push((predecessor, &inst.operands[range]));
        }

        let mut phis = Vec::with_capacity(data.params.len());
        for (index, &param) in data.params.iter().enumerate() {
            let ty = self.type_id(ir.value_type(param));
            let id = self.value_id(param);
            let mut pairs: Vec<(Word, Word)> = Vec::with_capacity(incoming.len() + 1);
            for &(predecessor, args) in &incoming {
                let value = match args.get(index) {
                    Some(&arg) => self.value_id(arg),
                    None => self.undef(ty),
                };
                pairs.push((predecessor, value));
            }
            if let Some(predecessor) = undef_from {
                let undef = self.undef(ty);
                pairs.push((predecessor, undef));
            }
            pairs.sort_by_key(|&(predecessor, _)| predecessor);

            let mut phi = Instruction::new(Op::Phi).with_type(ty).with_result(id);
            for (predecessor, value) in pairs {
                phi = phi.id(value).id(predecessor);
            }
            phis.push(phi);
        }
        phis
    }

    fn emit_instruction(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        trace!("lowering {} ({})", inst, data.kind.name());
        match &data.kind {
            InstructionKind::If { .. } => self.emit_if(inst),
            InstructionKind::Loop { .. } => self.emit_loop(inst),
            InstructionKind::Switch { .. } => self.emit_switch(inst),
            InstructionKind::Var { .. } => self.emit_function_var(inst),
            InstructionKind::Store => {
                let pointer = self.value_id(data.operands[0]);
                let value = self.value_id(data.operands[1]);
                self.body.push(Instruction::store(pointer, value));
            }
            InstructionKind::Discard => {
                self.capability(Capability::DemoteToHelperInvocation);
                if !self.options.supports(1, 6) {
                    self.extension("SPV_EXT_demote_to_helper_invocation");
                }
                self.body
                    .push(Instruction::new(Op::DemoteToHelperInvocation));
            }
            InstructionKind::Return => match data.operands.first() {
                Some(&value) => {
                    let value = self.value_id(value);
                    self.body.push(Instruction::new(Op::ReturnValue).id(value));
                }
                None => self.body.push(Instruction::new(Op::Return)),
            },
            InstructionKind::Unreachable => self.body.push(Instruction::new(Op::Unreachable)),
            InstructionKind::ExitIf(region)
            | InstructionKind::ExitLoop(region)
            | InstructionKind::ExitSwitch(region) => {
                match ir.instruction(*region).kind.merge_block() {
                    Some(merge) => {
                        let merge = self.label(merge);
                        self.body.push(Instruction::branch(merge));
                    }
                    None => self.unsupported(inst, "exit of an instruction that is not a region"),
                }
            }
            InstructionKind::NextIteration(region) => {
                let header = self.loop_header(*region);
                self.body.push(Instruction::branch(header));
            }
            InstructionKind::Continue(region) => match ir.instruction(*region).kind {
                InstructionKind::Loop { continuing, .. } => {
                    let continuing = self.label(continuing);
                    self.body.push(Instruction::branch(continuing));
                }
                _ => self.unsupported(inst, "continue outside of a loop"),
            },
            InstructionKind::BreakIf { loop_inst, .. } => match ir.instruction(*loop_inst).kind {
                InstructionKind::Loop { merge, .. } => {
                    let condition = self.value_id(data.operands[0]);
                    let merge = self.label(merge);
                    let header = self.loop_header(*loop_inst);
                    self.body
                        .push(Instruction::branch_conditional(condition, merge, header));
                }
                _ => self.unsupported(inst, "break_if outside of a loop"),
            },
            _ => self.lower_value(inst),
        }
    }

    fn emit_function_var(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let Some(result) = data.result else {
            return;
        };
        let ptr_ty = ir.value_type(result);
        let Some((_, store, _)) = self.types.pointee(ptr_ty) else {
            self.unsupported(inst, "variable of non-pointer type");
            return;
        };
        let ptr = self.type_id(ptr_ty);
        let id = self.value_id(result);
        let mut variable = Instruction::new(Op::Variable)
            .with_type(ptr)
            .with_result(id)
            .literal(StorageClass::Function as u32);
        match data.operands.first() {
            Some(&init) => {
                let init = self.value_id(init);
                self.body.push(Instruction::store(id, init));
            }
            // Function variables start out zeroed
            None => variable = variable.id(self.null_id(store)),
        }
        self.function_vars.push(variable);
        if let Some(name) = ir.name_of(result) {
            self.debug_name(id, name);
        }
    }

    // === Regions ===

    fn emit_if(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let InstructionKind::If {
            true_block,
            false_block,
            merge,
        } = data.kind
        else {
            return;
        };
        debug!("emitting if {}", inst);

        let condition = self.value_id(data.operands[0]);
        let true_label = self.label(true_block);
        let false_label = self.label(false_block);
        let merge_label = self.label(merge);
        self.body.push(Instruction::selection_merge(merge_label));
        self.body.push(Instruction::branch_conditional(
            condition,
            true_label,
            false_label,
        ));

        self.emit_block(true_block);
        self.emit_block(false_block);
        self.emit_block(merge);
    }

    fn emit_loop(&mut self, inst: InstId) {
        let ir = self.ir;
        let InstructionKind::Loop {
            initializer,
            body,
            continuing,
            merge,
        } = ir.instruction(inst).kind
        else {
            return;
        };
        debug!("emitting loop {}", inst);

        let header = self.loop_header(inst);
        let has_initializer = !ir.block(initializer).is_empty();
        if has_initializer {
            let initializer_label = self.label(initializer);
            self.body.push(Instruction::branch(initializer_label));
            self.emit_block(initializer);
        } else {
            self.body.push(Instruction::branch(header));
        }

        self.body.push(Instruction::label(header));
        // Header phis go here once every predecessor is known
        let phi_position = self.body.len();
        let merge_label = self.label(merge);
        let continuing_label = self.label(continuing);
        let body_label = self.label(body);
        self.body
            .push(Instruction::loop_merge(merge_label, continuing_label));
        self.body.push(Instruction::branch(body_label));

        self.emit_block(body);

        let continuing_live =
            !ir.block(continuing).is_empty() && self.has_live_inbound(continuing);
        if continuing_live {
            self.emit_block(continuing);
        } else {
            // Plain back edge
            self.body.push(Instruction::label(continuing_label));
            self.body.push(Instruction::branch(header));
        }

        let undef_from = (!continuing_live).then_some(continuing_label);
        let phis = self.block_phis(body, undef_from);
        self.body.splice(phi_position..phi_position, phis);

        self.emit_block(merge);
    }

    fn emit_switch(&mut self, inst: InstId) {
        let ir = self.ir;
        let data = ir.instruction(inst);
        let InstructionKind::Switch { cases, merge } = &data.kind else {
            return;
        };
        debug!("emitting switch {} with {} cases", inst, cases.len());

        let selector = self.value_id(data.operands[0]);
        let merge_label = self.label(*merge);
        let mut default = None;
        let mut targets = Vec::new();
        for case in cases {
            let label = self.label(case.block);
            for selector in &case.selectors {
                match selector {
                    CaseSelector::Default => default = Some(label),
                    CaseSelector::Value(constant) => {
                        let literal = self
                            .constants
                            .as_integer(*constant)
                            .map_or(0, |v| v as u32);
                        targets.push((literal, label));
                    }
                }
            }
        }

        let mut switch = Instruction::new(Op::Switch)
            .id(selector)
            .id(default.unwrap_or(merge_label));
        for (literal, label) in targets {
            switch = switch.literal(literal).id(label);
        }
        self.body.push(Instruction::selection_merge(merge_label));
        self.body.push(switch);

        for case in cases {
            self.emit_block(case.block);
        }
        self.emit_block(*merge);
    }
}

fn storage_class(space: AddressSpace) -> StorageClass {
    match space {
        AddressSpace::Function => StorageClass::Function,
        AddressSpace::Private => StorageClass::Private,
        AddressSpace::Workgroup => StorageClass::Workgroup,
        AddressSpace::Uniform => StorageClass::Uniform,
        AddressSpace::Storage => StorageClass::StorageBuffer,
        AddressSpace::Handle => StorageClass::UniformConstant,
        AddressSpace::Input => StorageClass::Input,
        AddressSpace::Output => StorageClass::Output,
        AddressSpace::PushConstant => StorageClass::PushConstant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::spirv::module::Operand;
    use crate::demos;
    use crate::ir::{Builder, StructMember, VarAttributes};

    fn generate_default(module: &Module) -> SpirvModule {
        match generate(module, &GeneratorOptions::default()) {
            Ok(output) => output.module,
            Err(diagnostics) => {
                let messages: Vec<String> = diagnostics.iter().map(|d| d.to_string()).collect();
                panic!("generation failed: {:?}", messages)
            }
        }
    }

    fn id_operands(inst: &Instruction) -> Vec<Word> {
        inst.operands
            .iter()
            .filter_map(|o| match o {
                Operand::Id(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn find(spirv: &SpirvModule, op: Op) -> Vec<&Instruction> {
        spirv.instructions().filter(|i| i.op == op).collect()
    }

    #[test]
    fn test_add_function_and_entry_point() {
        let spirv = generate_default(&demos::add());
        assert_eq!(spirv.count(Op::IAdd), 1);
        assert_eq!(spirv.count(Op::Function), 2);
        assert_eq!(spirv.count(Op::FunctionCall), 1);
        assert_eq!(spirv.count(Op::EntryPoint), 1);
        // i32 is declared once no matter how often it is referenced
        assert_eq!(spirv.count(Op::TypeInt), 1);
        assert!(spirv.has_capability(Capability::Shader));

        let mode = find(&spirv, Op::ExecutionMode)[0];
        assert_eq!(
            &mode.operands[1..],
            &[
                Operand::Literal(spirv::ExecutionMode::LocalSize as u32),
                Operand::Literal(1),
                Operand::Literal(1),
                Operand::Literal(1)
            ]
        );
    }

    #[test]
    fn test_if_merge_becomes_phi() {
        let spirv = generate_default(&demos::if_merge());
        let phis = find(&spirv, Op::Phi);
        assert_eq!(phis.len(), 1);
        // Two (value, predecessor) pairs
        assert_eq!(phis[0].operands.len(), 4);
        assert_eq!(spirv.count(Op::SelectionMerge), 1);
        assert_eq!(spirv.count(Op::BranchConditional), 1);

        let ret = find(&spirv, Op::ReturnValue)[0];
        assert_eq!(id_operands(ret), vec![phis[0].result_id.unwrap_or_default()]);
    }

    #[test]
    fn test_loop_header_phi_names_continuing_value() {
        let spirv = generate_default(&demos::loop_with_break());
        assert_eq!(spirv.count(Op::LoopMerge), 1);

        let phis = find(&spirv, Op::Phi);
        // Header (i), continuing (j) and merge (result)
        assert_eq!(phis.len(), 3);

        let increment = find(&spirv, Op::IAdd)[0];
        let increment_id = increment.result_id.unwrap_or_default();
        let header_phi = phis
            .iter()
            .find(|p| p.operands.len() == 4)
            .expect("header phi with two incoming edges");
        assert!(id_operands(header_phi).contains(&increment_id));
        // The phi is emitted before the value it names
        let functions = &spirv.functions;
        let phi_pos = functions
            .iter()
            .position(|i| i.result_id == header_phi.result_id)
            .unwrap();
        let add_pos = functions
            .iter()
            .position(|i| i.result_id == Some(increment_id))
            .unwrap();
        assert!(phi_pos < add_pos);
    }

    #[test]
    fn test_all_paths_diverge_merge_is_unreachable() {
        let spirv = generate_default(&demos::all_paths_diverge());
        assert_eq!(spirv.count(Op::ReturnValue), 2);
        assert_eq!(spirv.count(Op::Phi), 0);
        let functions = &spirv.functions;
        let unreachable = functions
            .iter()
            .position(|i| i.op == Op::Unreachable)
            .expect("merge sealed with OpUnreachable");
        assert_eq!(functions[unreachable - 1].op, Op::Label);
    }

    #[test]
    fn test_switch_multi_selector_cases() {
        let spirv = generate_default(&demos::switch_multi_selector());
        let switch = find(&spirv, Op::Switch)[0];
        // selector, default, then four (literal, label) pairs
        assert_eq!(switch.operands.len(), 10);
        let literals: Vec<u32> = switch
            .operands
            .iter()
            .filter_map(|o| match o {
                Operand::Literal(v) => Some(*v),
                _ => None,
            })
            .collect();
        assert_eq!(literals, vec![1, 3, 2, 4]);

        // `default` shares its block with `case 2`
        let default = &switch.operands[1];
        let case_two = &switch.operands[7];
        assert_eq!(default, case_two);

        let phis = find(&spirv, Op::Phi);
        assert_eq!(phis.len(), 1);
        assert_eq!(phis[0].operands.len(), 6);
    }

    #[test]
    fn test_nested_diverging_regions_in_loop() {
        let spirv = generate_default(&demos::nested_diverging_loop());
        assert_eq!(spirv.count(Op::LoopMerge), 1);
        assert_eq!(spirv.count(Op::SelectionMerge), 2);
        assert_eq!(spirv.count(Op::Phi), 0);
        assert_eq!(spirv.count(Op::ReturnValue), 3);
        // Inner and outer merges
        assert_eq!(spirv.count(Op::Unreachable), 2);
    }

    #[test]
    fn test_compute_shader_resources() {
        let spirv = generate_default(&demos::compute_double());
        assert_eq!(spirv.count(Op::ControlBarrier), 1);
        assert_eq!(spirv.count(Op::AccessChain), 1);
        assert_eq!(spirv.count(Op::FMul), 1);
        assert_eq!(spirv.count(Op::TypeRuntimeArray), 1);

        let decorations: Vec<u32> = find(&spirv, Op::Decorate)
            .iter()
            .filter_map(|d| match d.operands.get(1) {
                Some(Operand::Literal(v)) => Some(*v),
                _ => None,
            })
            .collect();
        for expected in [
            Decoration::Block,
            Decoration::DescriptorSet,
            Decoration::Binding,
            Decoration::BuiltIn,
            Decoration::ArrayStride,
        ] {
            assert!(
                decorations.contains(&(expected as u32)),
                "missing {:?}",
                expected
            );
        }

        // Before 1.4 only the builtin input is part of the interface
        let entry = find(&spirv, Op::EntryPoint)[0];
        assert_eq!(id_operands(entry).len(), 2);
    }

    #[test]
    fn test_interface_lists_all_globals_from_1_4() {
        let options = GeneratorOptions {
            spirv_version: (1, 4),
            ..GeneratorOptions::default()
        };
        let output = generate(&demos::compute_double(), &options).unwrap();
        let entry = find(&output.module, Op::EntryPoint)[0];
        // function id plus buffer and gid
        assert_eq!(id_operands(entry).len(), 3);
        assert_eq!(output.words[1], 0x0001_0400);
    }

    #[test]
    fn test_fragment_discard_and_sampling() {
        let spirv = generate_default(&demos::fragment_textured());
        assert!(spirv.has_capability(Capability::DemoteToHelperInvocation));
        assert_eq!(spirv.extensions.len(), 1);
        assert_eq!(spirv.count(Op::DemoteToHelperInvocation), 1);
        assert_eq!(spirv.count(Op::SampledImage), 1);
        assert_eq!(spirv.count(Op::ImageSampleImplicitLod), 1);

        let modes: Vec<&Operand> = find(&spirv, Op::ExecutionMode)
            .iter()
            .map(|m| &m.operands[1])
            .collect();
        assert_eq!(
            modes,
            vec![&Operand::Literal(spirv::ExecutionMode::OriginUpperLeft as u32)]
        );
    }

    #[test]
    fn test_demote_is_core_in_1_6() {
        let options = GeneratorOptions {
            spirv_version: (1, 6),
            ..GeneratorOptions::default()
        };
        let output = generate(&demos::fragment_textured(), &options).unwrap();
        assert!(output.module.extensions.is_empty());
    }

    #[test]
    fn test_missing_binding_is_reported() {
        let mut b = Builder::new("unbound");
        let f32_ty = b.types().f32();
        let block = b
            .types()
            .block_struct("Params", vec![StructMember::new("scale", f32_ty)]);
        let params = b.global_var(
            "params",
            AddressSpace::Uniform,
            block,
            Access::Read,
            VarAttributes::default(),
        );
        b.entry_point("main", PipelineStage::Compute, Some([1, 1, 1]));
        b.load(params);
        b.return_(None);
        let module = b.finish();

        let options = GeneratorOptions {
            validate_ir: false,
            ..GeneratorOptions::default()
        };
        let err = generate(&module, &options).unwrap_err();
        assert!(err.has_code("E5005"));
    }

    #[test]
    fn test_storage_buffer_needs_1_3() {
        let options = GeneratorOptions {
            spirv_version: (1, 0),
            ..GeneratorOptions::default()
        };
        let err = generate(&demos::compute_double(), &options).unwrap_err();
        assert!(err.has_code("E5004"));
    }

    #[test]
    fn test_canonical_types_share_declarations() {
        let mut b = Builder::new("dedup");
        let i32_ty = b.types().i32();
        let atomic = b.types().atomic(i32_ty);
        let depth = b.types().depth_texture(TextureDimension::D2);
        let f32_ty = b.types().f32();
        let sampled = b.types().sampled_texture(TextureDimension::D2, f32_ty);
        let comparison = b.types().sampler(SamplerKind::Comparison);
        let plain = b.types().sampler(SamplerKind::Sampler);
        let read = b.types().ptr(AddressSpace::Storage, i32_ty, Access::Read);
        let read_write = b.types().ptr(AddressSpace::Storage, i32_ty, Access::ReadWrite);
        let module = b.finish();

        let options = GeneratorOptions::default();
        let mut printer = Printer::new(&module, &options);
        assert_eq!(printer.type_id(atomic), printer.type_id(i32_ty));
        assert_eq!(printer.type_id(depth), printer.type_id(sampled));
        assert_eq!(printer.type_id(comparison), printer.type_id(plain));
        assert_eq!(printer.type_id(read), printer.type_id(read_write));
        // i32, f32, image, sampler and pointer
        assert_eq!(printer.spirv.types_globals.len(), 5);
    }

    #[test]
    fn test_function_var_defaults_to_zero() {
        let mut b = Builder::new("vars");
        let i32_ty = b.types().i32();
        let ptr = b.types().ptr(AddressSpace::Function, i32_ty, Access::ReadWrite);
        b.function("f", i32_ty);
        let zeroed = b.var(ptr, None);
        let five = b.const_i32(5);
        let initialised = b.var(ptr, Some(five));
        let a = b.load(zeroed);
        let c = b.load(initialised);
        let sum = b.add(i32_ty, a, c);
        b.return_(Some(sum));
        let module = b.finish();

        let options = GeneratorOptions {
            validate_ir: false,
            ..GeneratorOptions::default()
        };
        let spirv = generate(&module, &options).unwrap().module;
        let variables = find(&spirv, Op::Variable);
        assert_eq!(variables.len(), 2);
        // Variables follow the first label
        assert_eq!(spirv.functions[1].op, Op::Label);
        assert_eq!(spirv.functions[2].op, Op::Variable);
        // The zero of a scalar is the literal constant, not OpConstantNull
        assert_eq!(spirv.count(Op::ConstantNull), 0);
        let zero = find(&spirv, Op::Constant)
            .into_iter()
            .find(|c| c.operands == vec![Operand::Literal(0)])
            .and_then(|c| c.result_id)
            .unwrap();
        assert_eq!(id_operands(variables[0]), vec![zero]);
        assert!(id_operands(variables[1]).is_empty());
        assert_eq!(spirv.count(Op::Store), 1);
    }

    #[test]
    fn test_debug_names_can_be_disabled() {
        let options = GeneratorOptions {
            emit_debug_names: false,
            ..GeneratorOptions::default()
        };
        let spirv = generate(&demos::if_merge(), &options).unwrap().module;
        assert_eq!(spirv.count(Op::Name), 0);
        assert_eq!(spirv.count(Op::MemberName), 0);

        let named = generate_default(&demos::if_merge());
        assert!(named.count(Op::Name) > 0);
    }

    #[test]
    fn test_every_demo_generates() {
        for (name, module) in demos::all() {
            let output = generate(&module, &GeneratorOptions::default());
            assert!(output.is_ok(), "demo '{}' failed to generate", name);
            let words = output.unwrap().words;
            assert_eq!(words[0], spirv::MAGIC_NUMBER);
        }
    }
}
