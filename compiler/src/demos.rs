//! Sample modules
//!
//! Small but complete shaders built through the [`Builder`]. They double as
//! fixtures for the tests and benches and are written out by
//! `tincture demo`.

use crate::ir::{
    Access, AddressSpace, BinaryOp, Builder, BuiltinFn, BuiltinValue, CaseSelector, FunctionId,
    Module, PipelineStage, SamplerKind, StructMember, TextureDimension, VarAttributes,
};

/// Every demo, by file stem.
pub fn all() -> Vec<(&'static str, Module)> {
    vec![
        ("add", add()),
        ("if_merge", if_merge()),
        ("loop_break", loop_with_break()),
        ("diverge", all_paths_diverge()),
        ("switch", switch_multi_selector()),
        ("nested_diverge", nested_diverging_loop()),
        ("compute", compute_double()),
        ("fragment", fragment_textured()),
    ]
}

/// Compute entry point `main` that stores `callee(args...)` into a private
/// variable.
fn call_from_main(b: &mut Builder, callee: FunctionId, args: &[i32]) {
    let i32_ty = b.types().i32();
    let result = b.global_var(
        "result",
        AddressSpace::Private,
        i32_ty,
        Access::ReadWrite,
        VarAttributes::default(),
    );
    b.entry_point("main", PipelineStage::Compute, Some([1, 1, 1]));
    let args: Vec<_> = args.iter().map(|&v| b.const_i32(v)).collect();
    if let Some(value) = b.user_call(callee, &args) {
        b.store(result, value);
    }
    b.return_(None);
}

/// `fn foo(a: i32, b: i32) -> i32 { return a + b; }`
pub fn add() -> Module {
    let mut b = Builder::new("add");
    let i32_ty = b.types().i32();
    let foo = b.function("foo", i32_ty);
    let x = b.function_param(foo, "a", i32_ty);
    let y = b.function_param(foo, "b", i32_ty);
    let sum = b.add(i32_ty, x, y);
    b.return_(Some(sum));
    call_from_main(&mut b, foo, &[1, 2]);
    b.finish()
}

/// `if (cond) { x = 10 } else { x = 20 }; return x;`
pub fn if_merge() -> Module {
    let mut b = Builder::new("if_merge");
    let i32_ty = b.types().i32();
    let bool_ty = b.types().bool();
    let pick = b.function("pick", i32_ty);
    let cond = b.function_param(pick, "cond", bool_ty);
    let region = b.if_(cond);
    let x = b.block_param(region.merge, i32_ty);
    b.module.set_name(x, "x");
    b.with_block(region.true_block, |b| {
        let ten = b.const_i32(10);
        b.exit_if(region.inst, &[ten]);
    });
    b.with_block(region.false_block, |b| {
        let twenty = b.const_i32(20);
        b.exit_if(region.inst, &[twenty]);
    });
    b.return_(Some(x));

    let result = b.global_var(
        "result",
        AddressSpace::Private,
        i32_ty,
        Access::ReadWrite,
        VarAttributes::default(),
    );
    b.entry_point("main", PipelineStage::Compute, Some([1, 1, 1]));
    let yes = b.const_bool(true);
    if let Some(value) = b.user_call(pick, &[yes]) {
        b.store(result, value);
    }
    b.return_(None);
    b.finish()
}

/// Count up from zero until `i >= n`, then return `i`.
///
/// The merge is only reachable through the conditional `exit_loop` in the
/// body; the continuing block increments the counter.
pub fn loop_with_break() -> Module {
    let mut b = Builder::new("loop_break");
    let i32_ty = b.types().i32();
    let count = b.function("count_to", i32_ty);
    let n = b.function_param(count, "n", i32_ty);

    let region = b.loop_();
    let i = b.block_param(region.body, i32_ty);
    b.module.set_name(i, "i");
    let j = b.block_param(region.continuing, i32_ty);
    let result = b.block_param(region.merge, i32_ty);

    b.with_block(region.initializer, |b| {
        let zero = b.const_i32(0);
        b.next_iteration(region.inst, &[zero]);
    });
    let bool_ty = b.types().bool();
    b.with_block(region.body, |b| {
        let done = b.binary(BinaryOp::GreaterThanEqual, bool_ty, i, n);
        let check = b.if_(done);
        b.with_block(check.true_block, |b| {
            b.exit_loop(region.inst, &[i]);
        });
        b.continue_(region.inst, &[i]);
    });
    b.with_block(region.continuing, |b| {
        let one = b.const_i32(1);
        let next = b.add(i32_ty, j, one);
        b.next_iteration(region.inst, &[next]);
    });
    b.return_(Some(result));

    call_from_main(&mut b, count, &[4]);
    b.finish()
}

/// Both branches return, so the merge is unreachable.
pub fn all_paths_diverge() -> Module {
    let mut b = Builder::new("diverge");
    let i32_ty = b.types().i32();
    let bool_ty = b.types().bool();
    let f = b.function("choose", i32_ty);
    let cond = b.function_param(f, "cond", bool_ty);
    let region = b.if_(cond);
    b.with_block(region.true_block, |b| {
        let one = b.const_i32(1);
        b.return_(Some(one));
    });
    b.with_block(region.false_block, |b| {
        let two = b.const_i32(2);
        b.return_(Some(two));
    });
    // The merge stays empty and is sealed with `unreachable`
    b.finish_function();

    let result = b.global_var(
        "result",
        AddressSpace::Private,
        i32_ty,
        Access::ReadWrite,
        VarAttributes::default(),
    );
    b.entry_point("main", PipelineStage::Compute, Some([1, 1, 1]));
    let yes = b.const_bool(false);
    if let Some(value) = b.user_call(f, &[yes]) {
        b.store(result, value);
    }
    b.return_(None);
    b.finish()
}

/// `switch x { case 1, 3: 10; case 2, default: 20; case 4: 30 }`
pub fn switch_multi_selector() -> Module {
    let mut b = Builder::new("switch");
    let i32_ty = b.types().i32();
    let f = b.function("classify", i32_ty);
    let x = b.function_param(f, "x", i32_ty);
    let region = b.switch(x);
    let r = b.block_param(region.merge, i32_ty);

    let cases: [(&[i32], bool, i32); 3] = [(&[1, 3], false, 10), (&[2], true, 20), (&[4], false, 30)];
    for (values, default, result) in cases {
        let mut selectors: Vec<CaseSelector> = values
            .iter()
            .map(|&v| b.case_i32(v))
            .collect();
        if default {
            selectors.push(CaseSelector::Default);
        }
        let block = b.case(region, &selectors);
        b.with_block(block, |b| {
            let value = b.const_i32(result);
            b.exit_switch(region.inst, &[value]);
        });
    }
    b.return_(Some(r));

    call_from_main(&mut b, f, &[3]);
    b.finish()
}

/// A loop whose body holds an `if` with diverging nested `if`s:
///
/// ```text
/// loop {
///     if a { if b { return 1 } else { return 2 } } else { break }
/// }
/// return 3
/// ```
pub fn nested_diverging_loop() -> Module {
    let mut b = Builder::new("nested_diverge");
    let i32_ty = b.types().i32();
    let bool_ty = b.types().bool();
    let f = b.function("nested", i32_ty);
    let a = b.function_param(f, "a", bool_ty);
    let c = b.function_param(f, "b", bool_ty);

    let region = b.loop_();
    b.with_block(region.body, |b| {
        let outer = b.if_(a);
        b.with_block(outer.true_block, |b| {
            let inner = b.if_(c);
            b.with_block(inner.true_block, |b| {
                let one = b.const_i32(1);
                b.return_(Some(one));
            });
            b.with_block(inner.false_block, |b| {
                let two = b.const_i32(2);
                b.return_(Some(two));
            });
        });
        b.with_block(outer.false_block, |b| {
            b.exit_loop(region.inst, &[]);
        });
    });
    let three = b.const_i32(3);
    b.return_(Some(three));

    let result = b.global_var(
        "result",
        AddressSpace::Private,
        i32_ty,
        Access::ReadWrite,
        VarAttributes::default(),
    );
    b.entry_point("main", PipelineStage::Compute, Some([1, 1, 1]));
    let yes = b.const_bool(true);
    let no = b.const_bool(false);
    if let Some(value) = b.user_call(f, &[yes, no]) {
        b.store(result, value);
    }
    b.return_(None);
    b.finish()
}

/// `data[id.x] = data[id.x] * 2.0` over a runtime-sized storage buffer.
pub fn compute_double() -> Module {
    let mut b = Builder::new("compute");
    let f32_ty = b.types().f32();
    let u32_ty = b.types().u32();
    let uvec3 = b.types().vec3(u32_ty);
    let data = b.types().runtime_array(f32_ty);
    let buffer_ty = b
        .types()
        .block_struct("Buffer", vec![StructMember::new("data", data)]);

    let buffer = b.global_var(
        "buffer",
        AddressSpace::Storage,
        buffer_ty,
        Access::ReadWrite,
        VarAttributes::binding(0, 0),
    );
    let gid = b.global_var(
        "gid",
        AddressSpace::Input,
        uvec3,
        Access::Read,
        VarAttributes::builtin(BuiltinValue::GlobalInvocationId),
    );

    b.entry_point("main", PipelineStage::Compute, Some([64, 1, 1]));
    let id = b.load(gid);
    let index = b.swizzle(u32_ty, id, &[0]);
    let zero = b.const_u32(0);
    let elem_ptr = b.types().ptr(AddressSpace::Storage, f32_ty, Access::ReadWrite);
    let ptr = b.access(elem_ptr, buffer, &[zero, index]);
    let value = b.load(ptr);
    let two = b.const_f32(2.0);
    let doubled = b.multiply(f32_ty, value, two);
    b.store(ptr, doubled);
    let void = b.types().void();
    b.call(void, BuiltinFn::StorageBarrier, &[]);
    b.return_(None);
    b.finish()
}

/// Sample a texture and discard nearly transparent fragments.
pub fn fragment_textured() -> Module {
    let mut b = Builder::new("fragment");
    let f32_ty = b.types().f32();
    let vec2 = b.types().vec2(f32_ty);
    let vec4 = b.types().vec4(f32_ty);
    let texture_ty = b.types().sampled_texture(TextureDimension::D2, f32_ty);
    let sampler_ty = b.types().sampler(SamplerKind::Sampler);

    let texture = b.global_var(
        "tex",
        AddressSpace::Handle,
        texture_ty,
        Access::Read,
        VarAttributes::binding(0, 0),
    );
    let sampler = b.global_var(
        "samp",
        AddressSpace::Handle,
        sampler_ty,
        Access::Read,
        VarAttributes::binding(0, 1),
    );
    let uv_in = b.global_var(
        "uv",
        AddressSpace::Input,
        vec2,
        Access::Read,
        VarAttributes::location(0),
    );
    let color_out = b.global_var(
        "color",
        AddressSpace::Output,
        vec4,
        Access::ReadWrite,
        VarAttributes::location(0),
    );

    b.entry_point("main", PipelineStage::Fragment, None);
    let t = b.load(texture);
    let s = b.load(sampler);
    let uv = b.load(uv_in);
    if let Some(color) = b.call(vec4, BuiltinFn::TextureSample, &[t, s, uv]) {
        let alpha = b.swizzle(f32_ty, color, &[3]);
        let threshold = b.const_f32(0.5);
        let transparent = b.less_than(alpha, threshold);
        let region = b.if_(transparent);
        b.with_block(region.true_block, |b| {
            b.discard();
            b.exit_if(region.inst, &[]);
        });
        b.store(color_out, color);
    }
    b.return_(None);
    b.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::validation::validate_module;

    #[test]
    fn test_all_demos_validate() {
        for (name, module) in all() {
            if let Err(diagnostics) = validate_module(&module) {
                let messages: Vec<String> =
                    diagnostics.iter().map(|d| d.message.clone()).collect();
                panic!("demo '{}' is invalid: {:?}", name, messages);
            }
        }
    }

    #[test]
    fn test_demo_names_are_unique() {
        let names: Vec<&str> = all().iter().map(|(n, _)| *n).collect();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), names.len());
    }
}
