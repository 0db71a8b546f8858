//! End-to-end generation of the sample modules, parsed back with rspirv.

use compiler::codegen::{disassemble, generate, BinaryWriter};
use compiler::config::GeneratorOptions;
use compiler::demos;
use compiler::ir::{binary, Builder, CaseSelector, ConstantValue, Module};
use rspirv::binary::Disassemble;
use rspirv::dr::{self, load_words};
use spirv::Op;

fn parse(module: &Module, options: &GeneratorOptions) -> dr::Module {
    let output = match generate(module, options) {
        Ok(output) => output,
        Err(diagnostics) => {
            for d in diagnostics.iter() {
                eprintln!("{}", d);
            }
            panic!("generation of '{}' failed", module.name);
        }
    };
    load_words(&output.words).expect("rspirv parses the binary")
}

fn count_ops(module: &dr::Module, op: Op) -> usize {
    module
        .functions
        .iter()
        .flat_map(|f| f.blocks.iter())
        .flat_map(|b| b.instructions.iter())
        .filter(|i| i.class.opcode == op)
        .count()
}

#[test]
fn test_every_demo_parses() {
    let options = GeneratorOptions::default();
    for (name, module) in demos::all() {
        let parsed = parse(&module, &options);
        let header = parsed.header.as_ref().expect("module header");
        assert_eq!(header.version(), (1, 3), "{}", name);
        assert_eq!(parsed.entry_points.len(), 1, "{}", name);
        assert!(
            parsed.functions.iter().all(|f| !f.blocks.is_empty()),
            "{} has a function without blocks",
            name
        );
    }
}

#[test]
fn test_add_round_trip() {
    let parsed = parse(&demos::add(), &GeneratorOptions::default());
    assert_eq!(parsed.functions.len(), 2);
    assert_eq!(count_ops(&parsed, Op::IAdd), 1);
    assert_eq!(count_ops(&parsed, Op::FunctionCall), 1);

    let text = parsed.disassemble();
    assert!(text.contains("OpEntryPoint GLCompute"));
    assert!(text.contains("\"main\""));
}

#[test]
fn test_loop_blocks_are_structured() {
    let parsed = parse(&demos::loop_with_break(), &GeneratorOptions::default());
    let count_to = &parsed.functions[0];
    // The header carries the merge instruction right before its branch
    let header = count_to
        .blocks
        .iter()
        .find(|b| b.instructions.iter().any(|i| i.class.opcode == Op::LoopMerge))
        .expect("loop header block");
    let ops: Vec<Op> = header.instructions.iter().map(|i| i.class.opcode).collect();
    assert_eq!(ops.first(), Some(&Op::Phi));
    assert_eq!(&ops[ops.len() - 2..], &[Op::LoopMerge, Op::Branch]);
}

#[test]
fn test_every_block_has_one_terminator() {
    let options = GeneratorOptions::default();
    let terminators = [
        Op::Branch,
        Op::BranchConditional,
        Op::Switch,
        Op::Return,
        Op::ReturnValue,
        Op::Unreachable,
        Op::Kill,
    ];
    for (name, module) in demos::all() {
        let parsed = parse(&module, &options);
        for block in parsed.functions.iter().flat_map(|f| f.blocks.iter()) {
            let count = block
                .instructions
                .iter()
                .filter(|i| terminators.contains(&i.class.opcode))
                .count();
            assert_eq!(count, 1, "block in '{}' has {} terminators", name, count);
            let last = block.instructions.last().map(|i| i.class.opcode);
            assert!(last.is_some_and(|op| terminators.contains(&op)), "{}", name);
        }
    }
}

#[test]
fn test_generation_is_deterministic() {
    let options = GeneratorOptions::default();
    for (name, module) in demos::all() {
        let first = generate(&module, &options).unwrap().words;
        let second = generate(&module, &options).unwrap().words;
        assert_eq!(first, second, "{}", name);
    }
}

#[test]
fn test_decoded_module_generates_same_binary() {
    let options = GeneratorOptions::default();
    let module = demos::switch_multi_selector();
    let bytes = binary::encode(&module).unwrap();
    let decoded = binary::decode(&bytes).unwrap();
    assert_eq!(
        generate(&module, &options).unwrap().words,
        generate(&decoded, &options).unwrap().words
    );
}

#[test]
fn test_disassembly_mentions_phi() {
    let output = generate(&demos::if_merge(), &GeneratorOptions::default()).unwrap();
    let text = disassemble(&output.module);
    assert!(text.starts_with("; SPIR-V 1.3"));
    assert!(text.contains("OpPhi"));
    assert_eq!(BinaryWriter::write(&output.module), output.words);
}

#[test]
fn test_validation_errors_block_generation() {
    let mut b = Builder::new("broken");
    let void = b.types().void();
    b.function("f", void);
    // No terminator
    let module = b.finish();
    let err = generate(&module, &GeneratorOptions::default()).unwrap_err();
    assert!(err.has_code("E9001"));
}

fn count_declarations(module: &dr::Module, op: Op) -> usize {
    module
        .types_global_values
        .iter()
        .filter(|i| i.class.opcode == op)
        .count()
}

#[test]
fn test_repeated_constants_are_declared_once() {
    let mut b = Builder::new("dedup");
    let i32_ty = b.types().i32();
    let f32_ty = b.types().f32();
    let vec3 = b.types().vec3(f32_ty);

    b.function("sum", i32_ty);
    let mut acc = b.const_i32(7);
    for _ in 0..5 {
        let seven = b.const_i32(7);
        acc = b.add(i32_ty, acc, seven);
    }
    b.return_(Some(acc));

    b.function("origin", vec3);
    let null = b.zero(vec3);
    let f0 = b.module.intern_constant(ConstantValue::f32(0.0));
    let spelled_out = b.constant(ConstantValue::Composite {
        ty: vec3,
        elements: vec![f0, f0, f0],
    });
    let sum = b.add(vec3, null, spelled_out);
    b.return_(Some(sum));
    let module = b.finish();

    let options = GeneratorOptions::default();
    let output = generate(&module, &options).unwrap();
    let parsed = load_words(&output.words).unwrap();

    let sevens = parsed
        .types_global_values
        .iter()
        .filter(|i| i.class.opcode == Op::Constant)
        .filter(|i| i.operands == vec![dr::Operand::LiteralBit32(7)])
        .count();
    assert_eq!(sevens, 1);
    assert_eq!(count_declarations(&parsed, Op::ConstantNull), 1);
    assert_eq!(count_declarations(&parsed, Op::ConstantComposite), 0);
    assert_eq!(count_ops(&parsed, Op::IAdd), 5);
}

#[test]
fn test_empty_branches_and_cases_generate() {
    let mut b = Builder::new("empty_arms");
    let void = b.types().void();
    b.function("f", void);
    let selector = b.const_i32(1);
    let region = b.switch(selector);
    let one = b.case_i32(1);
    b.case(region, &[one]);
    let default = b.case(region, &[CaseSelector::Default]);
    b.with_block(default, |b| b.exit_switch(region.inst, &[]));

    let zero = b.const_i32(0);
    let positive = b.less_than(zero, selector);
    let branch = b.if_(positive);
    b.with_block(branch.false_block, |b| b.exit_if(branch.inst, &[]));
    b.return_(None);
    let module = b.finish();

    let parsed = parse(&module, &GeneratorOptions::default());
    assert_eq!(count_ops(&parsed, Op::Switch), 1);
    assert_eq!(count_ops(&parsed, Op::BranchConditional), 1);
}
