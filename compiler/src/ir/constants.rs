//! Constant interning
//!
//! Constants are deduplicated the same way as types: scalars by value
//! (floats by bit pattern, so `-0.0` and `0.0` stay distinct), composites by
//! their element ids.

use super::{ConstantId, Type, TypeId, TypeManager};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Structural key of a constant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstantValue {
    Bool(bool),
    I32(i32),
    U32(u32),
    /// IEEE-754 bit pattern
    F32(u32),
    /// IEEE-754 binary16 bit pattern
    F16(u16),
    Composite {
        ty: TypeId,
        elements: Vec<ConstantId>,
    },
    /// Composite whose elements are all `element`
    Splat {
        ty: TypeId,
        element: ConstantId,
        count: u32,
    },
    /// Zero value of any constructible type
    Zero(TypeId),
}

impl ConstantValue {
    pub fn f32(value: f32) -> Self {
        ConstantValue::F32(value.to_bits())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub value: ConstantValue,
    pub ty: TypeId,
}

/// Interner for constant values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConstantManager {
    constants: Vec<Constant>,
    #[serde(skip)]
    lookup: FxHashMap<ConstantValue, ConstantId>,
}

impl ConstantManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id for `value`. Scalar types are interned into `types` as needed.
    pub fn get(&mut self, types: &mut TypeManager, value: ConstantValue) -> ConstantId {
        let value = self.canonicalize(types, value);
        if let Some(&id) = self.lookup.get(&value) {
            return id;
        }
        let ty = match &value {
            ConstantValue::Bool(_) => types.bool(),
            ConstantValue::I32(_) => types.i32(),
            ConstantValue::U32(_) => types.u32(),
            ConstantValue::F32(_) => types.f32(),
            ConstantValue::F16(_) => types.f16(),
            ConstantValue::Composite { ty, .. }
            | ConstantValue::Splat { ty, .. }
            | ConstantValue::Zero(ty) => *ty,
        };
        let id = ConstantId(self.constants.len() as u32);
        self.constants.push(Constant {
            value: value.clone(),
            ty,
        });
        self.lookup.insert(value, id);
        id
    }

    /// Give every value a single key. Composites whose elements are all
    /// bit-zero become `Zero`, other uniform composites become splats, and the
    /// zero of a scalar type becomes that scalar.
    fn canonicalize(&mut self, types: &mut TypeManager, value: ConstantValue) -> ConstantValue {
        match value {
            ConstantValue::Composite { ty, elements }
                if !elements.is_empty() && elements.iter().all(|&e| self.is_null(e)) =>
            {
                ConstantValue::Zero(ty)
            }
            ConstantValue::Composite { ty, elements }
                if elements.len() > 1 && elements.iter().all(|e| *e == elements[0]) =>
            {
                ConstantValue::Splat {
                    ty,
                    element: elements[0],
                    count: elements.len() as u32,
                }
            }
            ConstantValue::Splat { ty, element, .. } if self.is_null(element) => {
                ConstantValue::Zero(ty)
            }
            ConstantValue::Splat { ty, element, count: 1 } => ConstantValue::Composite {
                ty,
                elements: vec![element],
            },
            ConstantValue::Zero(ty) => match types.resolve(ty) {
                Type::Bool => ConstantValue::Bool(false),
                Type::I32 => ConstantValue::I32(0),
                Type::U32 => ConstantValue::U32(0),
                Type::F32 => ConstantValue::F32(0),
                Type::F16 => ConstantValue::F16(0),
                _ => ConstantValue::Zero(ty),
            },
            other => other,
        }
    }

    /// All bits zero. Unlike [`is_zero`](Self::is_zero), `-0.0` does not count.
    fn is_null(&self, id: ConstantId) -> bool {
        match self.try_resolve(id).map(|c| &c.value) {
            Some(ConstantValue::Bool(b)) => !b,
            Some(ConstantValue::I32(v)) => *v == 0,
            Some(ConstantValue::U32(v)) => *v == 0,
            Some(ConstantValue::F32(bits)) => *bits == 0,
            Some(ConstantValue::F16(bits)) => *bits == 0,
            Some(ConstantValue::Zero(_)) => true,
            _ => false,
        }
    }

    pub fn resolve(&self, id: ConstantId) -> &Constant {
        match self.constants.get(id.index()) {
            Some(c) => c,
            None => panic!("internal compiler error: unknown constant id {}", id),
        }
    }

    pub fn try_resolve(&self, id: ConstantId) -> Option<&Constant> {
        self.constants.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConstantId, &Constant)> {
        self.constants
            .iter()
            .enumerate()
            .map(|(i, c)| (ConstantId(i as u32), c))
    }

    /// Integer value of a scalar integer constant, as used by switch selectors.
    pub fn as_integer(&self, id: ConstantId) -> Option<i64> {
        match self.resolve(id).value {
            ConstantValue::I32(v) => Some(v as i64),
            ConstantValue::U32(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn is_zero(&self, id: ConstantId) -> bool {
        match &self.resolve(id).value {
            ConstantValue::Bool(b) => !b,
            ConstantValue::I32(v) => *v == 0,
            ConstantValue::U32(v) => *v == 0,
            ConstantValue::F32(bits) => f32::from_bits(*bits) == 0.0,
            ConstantValue::F16(bits) => *bits & 0x7fff == 0,
            ConstantValue::Zero(_) => true,
            ConstantValue::Splat { element, .. } => self.is_zero(*element),
            ConstantValue::Composite { elements, .. } => elements.iter().all(|e| self.is_zero(*e)),
        }
    }

    /// Short textual form used by the IR disassembler.
    pub fn display(&self, types: &TypeManager, id: ConstantId) -> String {
        let constant = self.resolve(id);
        match &constant.value {
            ConstantValue::Bool(b) => b.to_string(),
            ConstantValue::I32(v) => format!("{}i", v),
            ConstantValue::U32(v) => format!("{}u", v),
            ConstantValue::F32(bits) => format!("{:?}f", f32::from_bits(*bits)),
            ConstantValue::F16(bits) => format!("0x{:04x}h", bits),
            ConstantValue::Composite { elements, .. } => {
                let parts: Vec<String> = elements.iter().map(|e| self.display(types, *e)).collect();
                format!("{}({})", types.name(constant.ty), parts.join(", "))
            }
            ConstantValue::Splat { element, .. } => {
                format!("{}({})", types.name(constant.ty), self.display(types, *element))
            }
            ConstantValue::Zero(ty) => format!("{}()", types.name(*ty)),
        }
    }

    pub(crate) fn rebuild_lookup(&mut self) {
        self.lookup = self
            .constants
            .iter()
            .enumerate()
            .map(|(i, c)| (c.value.clone(), ConstantId(i as u32)))
            .collect();
    }
}
