//! IR Type System
//!
//! Shader types are interned: every structurally distinct type is stored once
//! in the [`TypeManager`] and referred to by its [`TypeId`]. Child types are
//! themselves `TypeId`s, so the derived `Eq`/`Hash` on [`Type`] is structural
//! equality and two ids are equal exactly when the types are.

use super::TypeId;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Memory region a pointer refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressSpace {
    Function,
    Private,
    Workgroup,
    Uniform,
    Storage,
    /// Textures and samplers
    Handle,
    /// Shader stage inputs
    Input,
    /// Shader stage outputs
    Output,
    PushConstant,
}

impl AddressSpace {
    /// Module-scope resources that need a binding point.
    pub fn needs_binding(self) -> bool {
        matches!(
            self,
            AddressSpace::Uniform | AddressSpace::Storage | AddressSpace::Handle
        )
    }

    pub fn is_io(self) -> bool {
        matches!(self, AddressSpace::Input | AddressSpace::Output)
    }
}

impl fmt::Display for AddressSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressSpace::Function => "function",
            AddressSpace::Private => "private",
            AddressSpace::Workgroup => "workgroup",
            AddressSpace::Uniform => "uniform",
            AddressSpace::Storage => "storage",
            AddressSpace::Handle => "handle",
            AddressSpace::Input => "__in",
            AddressSpace::Output => "__out",
            AddressSpace::PushConstant => "push_constant",
        };
        write!(f, "{}", name)
    }
}

/// Access mode of a pointer or storage texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
            Access::ReadWrite => write!(f, "read_write"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureDimension {
    D1,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

impl fmt::Display for TextureDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextureDimension::D1 => "1d",
            TextureDimension::D2 => "2d",
            TextureDimension::D2Array => "2d_array",
            TextureDimension::D3 => "3d",
            TextureDimension::Cube => "cube",
            TextureDimension::CubeArray => "cube_array",
        };
        write!(f, "{}", name)
    }
}

/// Texel formats usable with storage textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TexelFormat {
    Rgba8Unorm,
    Rgba8Snorm,
    Rgba8Uint,
    Rgba8Sint,
    Rgba16Uint,
    Rgba16Sint,
    Rgba16Float,
    R32Uint,
    R32Sint,
    R32Float,
    Rg32Uint,
    Rg32Sint,
    Rg32Float,
    Rgba32Uint,
    Rgba32Sint,
    Rgba32Float,
}

impl TexelFormat {
    pub fn name(self) -> &'static str {
        match self {
            TexelFormat::Rgba8Unorm => "rgba8unorm",
            TexelFormat::Rgba8Snorm => "rgba8snorm",
            TexelFormat::Rgba8Uint => "rgba8uint",
            TexelFormat::Rgba8Sint => "rgba8sint",
            TexelFormat::Rgba16Uint => "rgba16uint",
            TexelFormat::Rgba16Sint => "rgba16sint",
            TexelFormat::Rgba16Float => "rgba16float",
            TexelFormat::R32Uint => "r32uint",
            TexelFormat::R32Sint => "r32sint",
            TexelFormat::R32Float => "r32float",
            TexelFormat::Rg32Uint => "rg32uint",
            TexelFormat::Rg32Sint => "rg32sint",
            TexelFormat::Rg32Float => "rg32float",
            TexelFormat::Rgba32Uint => "rgba32uint",
            TexelFormat::Rgba32Sint => "rgba32sint",
            TexelFormat::Rgba32Float => "rgba32float",
        }
    }

    /// Scalar channel kind of the format: 0 float, 1 signed, 2 unsigned.
    pub fn channel_kind(self) -> u8 {
        match self {
            TexelFormat::Rgba8Uint
            | TexelFormat::Rgba16Uint
            | TexelFormat::R32Uint
            | TexelFormat::Rg32Uint
            | TexelFormat::Rgba32Uint => 2,
            TexelFormat::Rgba8Sint
            | TexelFormat::Rgba16Sint
            | TexelFormat::R32Sint
            | TexelFormat::Rg32Sint
            | TexelFormat::Rgba32Sint => 1,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SamplerKind {
    Sampler,
    Comparison,
}

/// A member of a structure type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StructMember {
    pub name: String,
    pub ty: TypeId,
    /// Explicit `@align` override
    pub align: Option<u32>,
    /// Explicit `@size` override
    pub size: Option<u32>,
}

impl StructMember {
    pub fn new(name: impl Into<String>, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            ty,
            align: None,
            size: None,
        }
    }

    pub fn with_align(mut self, align: u32) -> Self {
        self.align = Some(align);
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

/// Structural type key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Bool,
    I32,
    U32,
    F32,
    F16,
    Vector {
        elem: TypeId,
        width: u32,
    },
    /// `columns` column vectors of type `column`
    Matrix {
        column: TypeId,
        columns: u32,
    },
    /// `count` is `None` for runtime-sized arrays
    Array {
        elem: TypeId,
        count: Option<u32>,
    },
    Atomic(TypeId),
    Pointer {
        space: AddressSpace,
        store: TypeId,
        access: Access,
    },
    Struct {
        name: String,
        members: Vec<StructMember>,
        /// Wrapper struct of a uniform/storage buffer (`Block` decoration)
        block: bool,
    },
    Sampler(SamplerKind),
    SampledTexture {
        dim: TextureDimension,
        sampled: TypeId,
    },
    MultisampledTexture {
        dim: TextureDimension,
        sampled: TypeId,
    },
    DepthTexture {
        dim: TextureDimension,
    },
    StorageTexture {
        dim: TextureDimension,
        format: TexelFormat,
        access: Access,
    },
    /// Combined image and sampler, produced when sampling
    SampledImage(TypeId),
}

/// Size and alignment of a host-shareable type, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub size: u32,
    pub align: u32,
}

fn round_up(align: u32, value: u32) -> u32 {
    if align == 0 {
        return value;
    }
    value.div_ceil(align) * align
}

/// Interner for shader types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeManager {
    types: Vec<Type>,
    #[serde(skip)]
    lookup: FxHashMap<Type, TypeId>,
}

impl TypeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id for `ty`, allocating it on first use.
    pub fn get(&mut self, ty: Type) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    /// Id of `ty` if it has been interned already.
    pub fn find(&self, ty: &Type) -> Option<TypeId> {
        self.lookup.get(ty).copied()
    }

    /// The type behind `id`.
    ///
    /// Panics on an id from a different interner; ids are only minted here.
    pub fn resolve(&self, id: TypeId) -> &Type {
        match self.types.get(id.index()) {
            Some(ty) => ty,
            None => panic!("internal compiler error: unknown type id {}", id),
        }
    }

    pub fn try_resolve(&self, id: TypeId) -> Option<&Type> {
        self.types.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &Type)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, ty)| (TypeId(i as u32), ty))
    }

    /// Rebuild the structural lookup table after deserialization.
    pub(crate) fn rebuild_lookup(&mut self) {
        self.lookup = self
            .types
            .iter()
            .enumerate()
            .map(|(i, ty)| (ty.clone(), TypeId(i as u32)))
            .collect();
    }

    // === Constructors ===

    pub fn void(&mut self) -> TypeId {
        self.get(Type::Void)
    }

    pub fn bool(&mut self) -> TypeId {
        self.get(Type::Bool)
    }

    pub fn i32(&mut self) -> TypeId {
        self.get(Type::I32)
    }

    pub fn u32(&mut self) -> TypeId {
        self.get(Type::U32)
    }

    pub fn f32(&mut self) -> TypeId {
        self.get(Type::F32)
    }

    pub fn f16(&mut self) -> TypeId {
        self.get(Type::F16)
    }

    pub fn vec(&mut self, elem: TypeId, width: u32) -> TypeId {
        self.get(Type::Vector { elem, width })
    }

    pub fn vec2(&mut self, elem: TypeId) -> TypeId {
        self.vec(elem, 2)
    }

    pub fn vec3(&mut self, elem: TypeId) -> TypeId {
        self.vec(elem, 3)
    }

    pub fn vec4(&mut self, elem: TypeId) -> TypeId {
        self.vec(elem, 4)
    }

    /// `mat<columns>x<rows><elem>`
    pub fn mat(&mut self, elem: TypeId, columns: u32, rows: u32) -> TypeId {
        let column = self.vec(elem, rows);
        self.get(Type::Matrix { column, columns })
    }

    pub fn array(&mut self, elem: TypeId, count: u32) -> TypeId {
        self.get(Type::Array {
            elem,
            count: Some(count),
        })
    }

    pub fn runtime_array(&mut self, elem: TypeId) -> TypeId {
        self.get(Type::Array { elem, count: None })
    }

    pub fn atomic(&mut self, inner: TypeId) -> TypeId {
        self.get(Type::Atomic(inner))
    }

    pub fn ptr(&mut self, space: AddressSpace, store: TypeId, access: Access) -> TypeId {
        self.get(Type::Pointer {
            space,
            store,
            access,
        })
    }

    pub fn structure(&mut self, name: impl Into<String>, members: Vec<StructMember>) -> TypeId {
        self.get(Type::Struct {
            name: name.into(),
            members,
            block: false,
        })
    }

    /// Structure used as the store type of a uniform or storage buffer.
    pub fn block_struct(&mut self, name: impl Into<String>, members: Vec<StructMember>) -> TypeId {
        self.get(Type::Struct {
            name: name.into(),
            members,
            block: true,
        })
    }

    pub fn sampler(&mut self, kind: SamplerKind) -> TypeId {
        self.get(Type::Sampler(kind))
    }

    pub fn sampled_texture(&mut self, dim: TextureDimension, sampled: TypeId) -> TypeId {
        self.get(Type::SampledTexture { dim, sampled })
    }

    pub fn multisampled_texture(&mut self, dim: TextureDimension, sampled: TypeId) -> TypeId {
        self.get(Type::MultisampledTexture { dim, sampled })
    }

    pub fn depth_texture(&mut self, dim: TextureDimension) -> TypeId {
        self.get(Type::DepthTexture { dim })
    }

    pub fn storage_texture(
        &mut self,
        dim: TextureDimension,
        format: TexelFormat,
        access: Access,
    ) -> TypeId {
        self.get(Type::StorageTexture {
            dim,
            format,
            access,
        })
    }

    pub fn sampled_image(&mut self, image: TypeId) -> TypeId {
        self.get(Type::SampledImage(image))
    }

    // === Queries ===

    /// The scalar at the bottom of a scalar, vector or matrix type.
    pub fn scalar_of(&self, id: TypeId) -> TypeId {
        match self.resolve(id) {
            Type::Vector { elem, .. } => *elem,
            Type::Matrix { column, .. } => self.scalar_of(*column),
            _ => id,
        }
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Void)
    }

    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(
            self.resolve(id),
            Type::Bool | Type::I32 | Type::U32 | Type::F32 | Type::F16
        )
    }

    pub fn is_vector(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Vector { .. })
    }

    pub fn is_matrix(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Matrix { .. })
    }

    pub fn is_pointer(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Pointer { .. })
    }

    fn scalar_or_vector_is(&self, id: TypeId, pred: impl Fn(&Type) -> bool) -> bool {
        match self.resolve(id) {
            Type::Vector { elem, .. } => pred(self.resolve(*elem)),
            ty => pred(ty),
        }
    }

    pub fn is_bool_scalar_or_vector(&self, id: TypeId) -> bool {
        self.scalar_or_vector_is(id, |t| matches!(t, Type::Bool))
    }

    pub fn is_float_scalar_or_vector(&self, id: TypeId) -> bool {
        self.scalar_or_vector_is(id, |t| matches!(t, Type::F32 | Type::F16))
    }

    pub fn is_signed_integer_scalar_or_vector(&self, id: TypeId) -> bool {
        self.scalar_or_vector_is(id, |t| matches!(t, Type::I32))
    }

    pub fn is_unsigned_integer_scalar_or_vector(&self, id: TypeId) -> bool {
        self.scalar_or_vector_is(id, |t| matches!(t, Type::U32))
    }

    pub fn is_integer_scalar_or_vector(&self, id: TypeId) -> bool {
        self.scalar_or_vector_is(id, |t| matches!(t, Type::I32 | Type::U32))
    }

    pub fn is_numeric_scalar_or_vector(&self, id: TypeId) -> bool {
        self.is_integer_scalar_or_vector(id) || self.is_float_scalar_or_vector(id)
    }

    pub fn is_float_matrix(&self, id: TypeId) -> bool {
        self.is_matrix(id) && self.is_float_scalar_or_vector(self.scalar_of(id))
    }

    /// Width of a vector type, `None` for everything else.
    pub fn vector_width(&self, id: TypeId) -> Option<u32> {
        match self.resolve(id) {
            Type::Vector { width, .. } => Some(*width),
            _ => None,
        }
    }

    /// Store type and address space of a pointer type.
    pub fn pointee(&self, id: TypeId) -> Option<(AddressSpace, TypeId, Access)> {
        match self.resolve(id) {
            Type::Pointer {
                space,
                store,
                access,
            } => Some((*space, *store, *access)),
            _ => None,
        }
    }

    /// Type of element `index` of a composite; `index` is ignored for
    /// homogeneous composites.
    pub fn element_type(&self, id: TypeId, index: Option<u32>) -> Option<TypeId> {
        match self.resolve(id) {
            Type::Vector { elem, .. } | Type::Array { elem, .. } => Some(*elem),
            Type::Matrix { column, .. } => Some(*column),
            Type::Struct { members, .. } => {
                index.and_then(|i| members.get(i as usize).map(|m| m.ty))
            }
            _ => None,
        }
    }

    /// Number of elements of a fixed-size composite.
    pub fn element_count(&self, id: TypeId) -> Option<u32> {
        match self.resolve(id) {
            Type::Vector { width, .. } => Some(*width),
            Type::Matrix { columns, .. } => Some(*columns),
            Type::Array { count, .. } => *count,
            Type::Struct { members, .. } => Some(members.len() as u32),
            _ => None,
        }
    }

    pub fn is_struct(&self, id: TypeId) -> bool {
        matches!(self.resolve(id), Type::Struct { .. })
    }

    // === Layout ===

    /// Host-shareable layout of `id`, `None` for opaque types.
    pub fn layout(&self, id: TypeId) -> Option<Layout> {
        let layout = match self.resolve(id) {
            Type::Bool | Type::I32 | Type::U32 | Type::F32 => Layout { size: 4, align: 4 },
            Type::F16 => Layout { size: 2, align: 2 },
            Type::Atomic(inner) => self.layout(*inner)?,
            Type::Vector { elem, width } => {
                let scalar = self.layout(*elem)?;
                let align = if *width == 2 { 2 } else { 4 } * scalar.size;
                Layout {
                    size: width * scalar.size,
                    align,
                }
            }
            Type::Matrix { column, columns } => {
                let col = self.layout(*column)?;
                Layout {
                    size: columns * round_up(col.align, col.size),
                    align: col.align,
                }
            }
            Type::Array { elem, count } => {
                let stride = self.array_stride(id)?;
                let elem = self.layout(*elem)?;
                Layout {
                    size: count.unwrap_or(1) * stride,
                    align: elem.align,
                }
            }
            Type::Struct { members, .. } => {
                let mut offset = 0;
                let mut align = 1;
                for member in members {
                    let member_layout = self.member_layout(member)?;
                    offset = round_up(member_layout.align, offset) + member_layout.size;
                    align = align.max(member_layout.align);
                }
                Layout {
                    size: round_up(align, offset),
                    align,
                }
            }
            _ => return None,
        };
        Some(layout)
    }

    fn member_layout(&self, member: &StructMember) -> Option<Layout> {
        let natural = self.layout(member.ty)?;
        Some(Layout {
            size: member.size.unwrap_or(natural.size),
            align: member.align.unwrap_or(natural.align),
        })
    }

    /// Element stride of an array type: element size rounded up to its alignment.
    pub fn array_stride(&self, id: TypeId) -> Option<u32> {
        match self.resolve(id) {
            Type::Array { elem, .. } => {
                let elem = self.layout(*elem)?;
                Some(round_up(elem.align, elem.size))
            }
            _ => None,
        }
    }

    /// Byte offset of every member of a struct type.
    pub fn member_offsets(&self, id: TypeId) -> Vec<u32> {
        let Type::Struct { members, .. } = self.resolve(id) else {
            return Vec::new();
        };
        let mut offsets = Vec::with_capacity(members.len());
        let mut offset = 0;
        for member in members {
            let layout = self.member_layout(member).unwrap_or(Layout { size: 0, align: 1 });
            offset = round_up(layout.align, offset);
            offsets.push(offset);
            offset += layout.size;
        }
        offsets
    }

    /// Check the extra rules a uniform buffer store type must obey.
    pub fn check_uniform_layout(&self, id: TypeId) -> Result<(), String> {
        match self.resolve(id) {
            Type::Array { elem, .. } => {
                let stride = self.array_stride(id).unwrap_or(0);
                if stride % 16 != 0 {
                    return Err(format!(
                        "array stride of {} is {} bytes, not a multiple of 16",
                        self.name(id),
                        stride
                    ));
                }
                self.check_uniform_layout(*elem)
            }
            Type::Struct { members, .. } => {
                let offsets = self.member_offsets(id);
                for (i, member) in members.iter().enumerate() {
                    if self.is_struct(member.ty) && offsets[i] % 16 != 0 {
                        return Err(format!(
                            "member '{}' of {} is a structure at offset {}, not a multiple of 16",
                            member.name,
                            self.name(id),
                            offsets[i]
                        ));
                    }
                    if i > 0 && self.is_struct(members[i - 1].ty) {
                        let prev_size = self.layout(members[i - 1].ty).map_or(0, |l| l.size);
                        let min = offsets[i - 1] + round_up(16, prev_size);
                        if offsets[i] < min {
                            return Err(format!(
                                "member '{}' of {} must start at offset {} or later",
                                member.name,
                                self.name(id),
                                min
                            ));
                        }
                    }
                    self.check_uniform_layout(member.ty)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Human-readable name, in WGSL spelling.
    pub fn name(&self, id: TypeId) -> String {
        match self.resolve(id) {
            Type::Void => "void".to_string(),
            Type::Bool => "bool".to_string(),
            Type::I32 => "i32".to_string(),
            Type::U32 => "u32".to_string(),
            Type::F32 => "f32".to_string(),
            Type::F16 => "f16".to_string(),
            Type::Vector { elem, width } => format!("vec{}<{}>", width, self.name(*elem)),
            Type::Matrix { column, columns } => {
                let rows = self.vector_width(*column).unwrap_or(0);
                format!(
                    "mat{}x{}<{}>",
                    columns,
                    rows,
                    self.name(self.scalar_of(*column))
                )
            }
            Type::Array { elem, count } => match count {
                Some(n) => format!("array<{}, {}>", self.name(*elem), n),
                None => format!("array<{}>", self.name(*elem)),
            },
            Type::Atomic(inner) => format!("atomic<{}>", self.name(*inner)),
            Type::Pointer {
                space,
                store,
                access,
            } => format!("ptr<{}, {}, {}>", space, self.name(*store), access),
            Type::Struct { name, .. } => name.clone(),
            Type::Sampler(SamplerKind::Sampler) => "sampler".to_string(),
            Type::Sampler(SamplerKind::Comparison) => "sampler_comparison".to_string(),
            Type::SampledTexture { dim, sampled } => {
                format!("texture_{}<{}>", dim, self.name(*sampled))
            }
            Type::MultisampledTexture { dim, sampled } => {
                format!("texture_multisampled_{}<{}>", dim, self.name(*sampled))
            }
            Type::DepthTexture { dim } => format!("texture_depth_{}", dim),
            Type::StorageTexture {
                dim,
                format,
                access,
            } => format!("texture_storage_{}<{}, {}>", dim, format.name(), access),
            Type::SampledImage(image) => format!("sampled_image<{}>", self.name(*image)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_idempotent() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let a = types.vec4(f32_ty);
        let b = types.vec(f32_ty, 4);
        assert_eq!(a, b);
        assert_eq!(types.f32(), f32_ty);

        let c = types.vec3(f32_ty);
        assert_ne!(a, c);
    }

    #[test]
    fn test_distinct_keys_distinct_ids() {
        let mut types = TypeManager::new();
        let i32_ty = types.i32();
        let u32_ty = types.u32();
        let keys = vec![
            Type::Array { elem: i32_ty, count: Some(4) },
            Type::Array { elem: i32_ty, count: Some(5) },
            Type::Array { elem: i32_ty, count: None },
            Type::Array { elem: u32_ty, count: Some(4) },
            Type::Pointer { space: AddressSpace::Function, store: i32_ty, access: Access::ReadWrite },
            Type::Pointer { space: AddressSpace::Private, store: i32_ty, access: Access::ReadWrite },
            Type::Pointer { space: AddressSpace::Storage, store: i32_ty, access: Access::Read },
            Type::Pointer { space: AddressSpace::Storage, store: i32_ty, access: Access::ReadWrite },
        ];
        let ids: Vec<TypeId> = keys.iter().cloned().map(|k| types.get(k)).collect();
        for (i, ki) in keys.iter().enumerate() {
            for (j, kj) in keys.iter().enumerate() {
                assert_eq!(ids[i] == ids[j], ki == kj, "keys {:?} and {:?}", ki, kj);
            }
        }
        // Second round returns the same ids
        for (key, id) in keys.into_iter().zip(&ids) {
            assert_eq!(types.get(key), *id);
        }
    }

    #[test]
    fn test_vector_and_matrix_layout() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let v2 = types.vec2(f32_ty);
        let v3 = types.vec3(f32_ty);
        assert_eq!(types.layout(v2), Some(Layout { size: 8, align: 8 }));
        assert_eq!(types.layout(v3), Some(Layout { size: 12, align: 16 }));

        let m3 = types.mat(f32_ty, 3, 3);
        assert_eq!(types.layout(m3), Some(Layout { size: 48, align: 16 }));
        let m2 = types.mat(f32_ty, 4, 2);
        assert_eq!(types.layout(m2), Some(Layout { size: 32, align: 8 }));
    }

    #[test]
    fn test_array_stride_rounds_to_alignment() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let v3 = types.vec3(f32_ty);
        let arr = types.array(v3, 4);
        assert_eq!(types.array_stride(arr), Some(16));
        assert_eq!(types.layout(arr).unwrap().size, 64);

        let scalars = types.array(f32_ty, 3);
        assert_eq!(types.array_stride(scalars), Some(4));
    }

    #[test]
    fn test_struct_member_offsets() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let u32_ty = types.u32();
        let v3 = types.vec3(f32_ty);
        let s = types.structure(
            "S",
            vec![
                StructMember::new("a", u32_ty),
                StructMember::new("b", v3),
                StructMember::new("c", f32_ty),
                StructMember::new("d", u32_ty).with_align(16),
            ],
        );
        assert_eq!(types.member_offsets(s), vec![0, 16, 28, 32]);
        assert_eq!(types.layout(s), Some(Layout { size: 48, align: 16 }));
    }

    #[test]
    fn test_uniform_layout_rules() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let v4 = types.vec4(f32_ty);

        let bad_array = types.array(f32_ty, 4);
        let bad = types.block_struct("Bad", vec![StructMember::new("xs", bad_array)]);
        assert!(types.check_uniform_layout(bad).is_err());

        let good_array = types.array(v4, 4);
        let good = types.block_struct("Good", vec![StructMember::new("xs", good_array)]);
        assert!(types.check_uniform_layout(good).is_ok());

        let inner = types.structure("Inner", vec![StructMember::new("x", f32_ty)]);
        let follows = types.block_struct(
            "Outer",
            vec![StructMember::new("s", inner), StructMember::new("y", f32_ty)],
        );
        let err = types.check_uniform_layout(follows).unwrap_err();
        assert!(err.contains("'y'"));
    }

    #[test]
    fn test_type_names() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let i32_ty = types.i32();
        let m = types.mat(f32_ty, 2, 3);
        assert_eq!(types.name(m), "mat2x3<f32>");
        let p = types.ptr(AddressSpace::Function, i32_ty, Access::ReadWrite);
        assert_eq!(types.name(p), "ptr<function, i32, read_write>");
        let rt = types.runtime_array(i32_ty);
        assert_eq!(types.name(rt), "array<i32>");
        let st = types.storage_texture(TextureDimension::D2, TexelFormat::Rgba8Unorm, Access::Write);
        assert_eq!(types.name(st), "texture_storage_2d<rgba8unorm, write>");
    }

    #[test]
    fn test_rebuild_lookup_after_serde() {
        let mut types = TypeManager::new();
        let f32_ty = types.f32();
        let v = types.vec2(f32_ty);
        let json = serde_json::to_string(&types).unwrap();
        let mut back: TypeManager = serde_json::from_str(&json).unwrap();
        back.rebuild_lookup();
        assert_eq!(back.find(&Type::Vector { elem: f32_ty, width: 2 }), Some(v));
    }
}
