//! Laws the IR upholds for every module the builder produces.

use compiler::demos;
use compiler::ir::validation::validate_module;
use compiler::ir::{
    binary, Access, AddressSpace, Builder, ConstantId, ConstantValue, Module, StructMember, Type,
    TypeId, ValueId,
};

/// Every recorded usage points at an operand holding the value, and every
/// operand has a usage record.
fn assert_usages_consistent(module: &Module) {
    for index in 0..module.value_count() {
        let value = ValueId(index as u32);
        for usage in &module.value(value).usages {
            let inst = module.instruction(usage.instruction);
            if !inst.alive {
                continue;
            }
            assert_eq!(
                inst.operands.get(usage.operand as usize),
                Some(&value),
                "{}: stale usage of {}",
                module.name,
                value
            );
        }
    }
    for index in 0..module.instruction_count() {
        let id = compiler::ir::InstId(index as u32);
        let inst = module.instruction(id);
        if !inst.alive {
            continue;
        }
        for (operand, &value) in inst.operands.iter().enumerate() {
            let recorded = module
                .value(value)
                .usages
                .iter()
                .any(|u| u.instruction == id && u.operand as usize == operand);
            assert!(recorded, "{}: {} operand {} not recorded", module.name, id, operand);
        }
    }
}

#[test]
fn test_demo_usages_are_consistent() {
    for (_, module) in demos::all() {
        assert_usages_consistent(&module);
    }
}

#[test]
fn test_replace_all_uses_keeps_usages_consistent() {
    for (name, mut module) in demos::all() {
        // Swap every use of the first used i32 constant with a fresh one
        let Some(old) = (0..module.value_count())
            .map(|i| ValueId(i as u32))
            .find(|&v| module.value(v).is_constant() && module.value(v).is_used())
        else {
            continue;
        };
        let ty = module.value_type(old);
        let replacement = module.constant_value(ConstantValue::Zero(ty));
        if replacement == old {
            continue;
        }
        let uses = module.value(old).usages.len();
        module.replace_all_uses_with(old, replacement);
        assert!(!module.value(old).is_used(), "{}", name);
        assert!(module.value(replacement).usages.len() >= uses, "{}", name);
        assert_usages_consistent(&module);
    }
}

#[test]
fn test_type_interning_is_idempotent() {
    let mut b = Builder::new("types");
    let types = b.types();
    let f32_ty = types.f32();
    for width in 2..=4 {
        let first = types.vec(f32_ty, width);
        for _ in 0..8 {
            assert_eq!(types.vec(f32_ty, width), first);
        }
        let mat = types.mat(f32_ty, width, width);
        assert_eq!(types.mat(f32_ty, width, width), mat);
        assert_ne!(mat, first);
    }
    let read = types.ptr(AddressSpace::Storage, f32_ty, Access::Read);
    let write = types.ptr(AddressSpace::Storage, f32_ty, Access::ReadWrite);
    // Access is part of a pointer's identity in the IR
    assert_ne!(read, write);
    assert!(matches!(types.resolve(read), Type::Pointer { .. }));
}

#[test]
fn test_constant_interning() {
    let mut b = Builder::new("constants");
    for v in [-3, 0, 1, i32::MAX] {
        assert_eq!(b.const_i32(v), b.const_i32(v));
    }
    assert_ne!(b.const_i32(1), b.const_u32(1));
    assert_ne!(b.const_f32(0.0), b.const_f32(-0.0));
    assert_eq!(b.const_f32(f32::NAN), b.const_f32(f32::NAN));
}

/// `ids[i] == ids[j]` exactly when `meanings[i] == meanings[j]`.
fn assert_interning_law<T: PartialEq + std::fmt::Debug>(entries: &[(&str, T)]) {
    for (i, (meaning_a, id_a)) in entries.iter().enumerate() {
        for (meaning_b, id_b) in &entries[i + 1..] {
            assert_eq!(
                meaning_a == meaning_b,
                id_a == id_b,
                "{} ({:?}) vs {} ({:?})",
                meaning_a,
                id_a,
                meaning_b,
                id_b
            );
        }
    }
}

#[test]
fn test_type_interning_law() {
    let mut b = Builder::new("types");
    let types = b.types();
    let f32_ty = types.f32();
    let i32_ty = types.i32();
    let fields = || vec![StructMember::new("a", f32_ty), StructMember::new("b", i32_ty)];

    let entries: Vec<(&str, TypeId)> = vec![
        ("f32", f32_ty),
        ("f32", types.get(Type::F32)),
        ("i32", i32_ty),
        ("u32", types.u32()),
        ("vec3<f32>", types.vec3(f32_ty)),
        ("vec3<f32>", types.vec(f32_ty, 3)),
        ("vec3<f32>", types.get(Type::Vector { elem: f32_ty, width: 3 })),
        ("vec4<f32>", types.vec4(f32_ty)),
        ("vec3<i32>", types.vec3(i32_ty)),
        ("mat3x3<f32>", types.mat(f32_ty, 3, 3)),
        ("mat3x3<f32>", types.mat(f32_ty, 3, 3)),
        ("mat4x3<f32>", types.mat(f32_ty, 4, 3)),
        ("array<f32, 4>", types.array(f32_ty, 4)),
        ("array<f32, 4>", types.get(Type::Array { elem: f32_ty, count: Some(4) })),
        ("array<f32, 5>", types.array(f32_ty, 5)),
        ("array<f32>", types.runtime_array(f32_ty)),
        ("S", types.structure("S", fields())),
        ("S", types.structure("S", fields())),
        ("T", types.structure("T", fields())),
        ("ptr<storage, f32, read>", types.ptr(AddressSpace::Storage, f32_ty, Access::Read)),
        ("ptr<storage, f32, read>", types.ptr(AddressSpace::Storage, f32_ty, Access::Read)),
        ("ptr<storage, f32, read_write>", types.ptr(AddressSpace::Storage, f32_ty, Access::ReadWrite)),
        ("ptr<private, f32, read_write>", types.ptr(AddressSpace::Private, f32_ty, Access::ReadWrite)),
    ];
    assert_interning_law(&entries);
}

#[test]
fn test_constant_interning_law() {
    let mut b = Builder::new("constants");
    let f32_ty = b.types().f32();
    let i32_ty = b.types().i32();
    let u32_ty = b.types().u32();
    let bool_ty = b.types().bool();
    let vec2 = b.types().vec2(f32_ty);
    let vec3 = b.types().vec3(f32_ty);
    let ivec3 = b.types().vec3(i32_ty);
    let pair = b.types().array(vec3, 2);

    let module = &mut b.module;
    let mut get = |value: ConstantValue| -> ConstantId { module.intern_constant(value) };
    let f0 = get(ConstantValue::f32(0.0));
    let f1 = get(ConstantValue::f32(1.0));
    let neg0 = get(ConstantValue::f32(-0.0));
    let i0 = get(ConstantValue::I32(0));
    let zero_vec3 = get(ConstantValue::Zero(vec3));
    let spelled_vec3 = get(ConstantValue::Composite { ty: vec3, elements: vec![f0, f0, f0] });

    let entries: Vec<(&str, ConstantId)> = vec![
        ("0.0", f0),
        ("0.0", get(ConstantValue::Zero(f32_ty))),
        ("-0.0", neg0),
        ("1.0", f1),
        ("0i", i0),
        ("0i", get(ConstantValue::Zero(i32_ty))),
        ("0u", get(ConstantValue::U32(0))),
        ("0u", get(ConstantValue::Zero(u32_ty))),
        ("false", get(ConstantValue::Bool(false))),
        ("false", get(ConstantValue::Zero(bool_ty))),
        ("vec3(0)", zero_vec3),
        ("vec3(0)", spelled_vec3),
        ("vec3(0)", get(ConstantValue::Splat { ty: vec3, element: f0, count: 3 })),
        ("vec3(-0)", get(ConstantValue::Composite { ty: vec3, elements: vec![neg0, neg0, neg0] })),
        ("vec3(1)", get(ConstantValue::Composite { ty: vec3, elements: vec![f1, f1, f1] })),
        ("vec3(1)", get(ConstantValue::Splat { ty: vec3, element: f1, count: 3 })),
        ("vec3(1, 0, 1)", get(ConstantValue::Composite { ty: vec3, elements: vec![f1, f0, f1] })),
        ("vec2(0)", get(ConstantValue::Zero(vec2))),
        ("vec2(0)", get(ConstantValue::Splat { ty: vec2, element: f0, count: 2 })),
        ("ivec3(0)", get(ConstantValue::Zero(ivec3))),
        ("ivec3(0)", get(ConstantValue::Composite { ty: ivec3, elements: vec![i0, i0, i0] })),
        ("pair(0)", get(ConstantValue::Zero(pair))),
        ("pair(0)", get(ConstantValue::Composite { ty: pair, elements: vec![zero_vec3, spelled_vec3] })),
    ];
    assert_interning_law(&entries);
}

#[test]
fn test_decoded_demos_stay_valid() {
    for (name, module) in demos::all() {
        let bytes = binary::encode(&module).unwrap();
        let decoded = binary::decode(&bytes).unwrap();
        assert!(validate_module(&decoded).is_ok(), "{}", name);
        assert_usages_consistent(&decoded);

        let json = binary::to_json(&module).unwrap();
        let from_json = binary::from_json(&json).unwrap();
        assert_eq!(from_json.value_count(), module.value_count(), "{}", name);
    }
}

#[test]
fn test_loaded_module_with_unknown_type_is_rejected() {
    let text = binary::to_json(&demos::add()).unwrap();
    let key = "\"return_type\": ";
    let start = text.find(key).unwrap() + key.len();
    let end = start + text[start..].find(|c: char| !c.is_ascii_digit()).unwrap();
    let patched = format!("{}999{}", &text[..start], &text[end..]);
    let module = binary::from_json(&patched).unwrap();

    let err = validate_module(&module).unwrap_err();
    assert!(err.has_code("E9007"));
    assert!(compiler::codegen::generate(&module, &Default::default()).is_err());
}

#[test]
fn test_decode_rejects_bad_magic() {
    assert!(binary::decode(b"nope").is_err());
    assert!(binary::decode(&[]).is_err());
}
