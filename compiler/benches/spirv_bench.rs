//! Benchmarks for SPIR-V generation throughput

use compiler::codegen::generate;
use compiler::config::GeneratorOptions;
use compiler::demos;
use compiler::ir::{binary, Builder, Module, ValueId};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

/// A function with `count` sequential `if`s, each merging one value that
/// feeds the next condition.
fn build_if_chain(count: usize) -> Module {
    let mut b = Builder::new("if_chain");
    let i32_ty = b.types().i32();
    let f = b.function("chain", i32_ty);
    let mut acc = b.function_param(f, "x", i32_ty);

    for i in 0..count {
        let limit = b.const_i32(i as i32);
        let cond = b.less_than(acc, limit);
        let region = b.if_(cond);
        let merged = b.block_param(region.merge, i32_ty);
        let current = acc;
        b.with_block(region.true_block, |b| {
            let one = b.const_i32(1);
            let next = b.add(i32_ty, current, one);
            b.exit_if(region.inst, &[next]);
        });
        b.with_block(region.false_block, |b| {
            b.exit_if(region.inst, &[current]);
        });
        acc = merged;
    }
    b.return_(Some(acc));
    b.finish()
}

/// `depth` nested loops, each leaving when `cond` holds.
fn build_nested_loops(depth: usize) -> Module {
    let mut b = Builder::new("nested_loops");
    let void = b.types().void();
    let bool_ty = b.types().bool();
    let f = b.function("nest", void);
    let cond = b.function_param(f, "cond", bool_ty);
    nest(&mut b, depth, cond);
    b.return_(None);
    b.finish()
}

fn nest(b: &mut Builder, depth: usize, cond: ValueId) {
    let region = b.loop_();
    b.with_block(region.body, |b| {
        let check = b.if_(cond);
        b.with_block(check.true_block, |b| {
            b.exit_loop(region.inst, &[]);
        });
        if depth > 1 {
            nest(b, depth - 1, cond);
        }
        b.continue_(region.inst, &[]);
    });
}

fn benchmark_if_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("if_chain");
    let options = GeneratorOptions::default();

    for count in [10, 100, 1000].iter() {
        let module = build_if_chain(*count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &module, |b, module| {
            b.iter(|| {
                let output = generate(black_box(module), &options).unwrap();
                black_box(output.words);
            });
        });
    }

    group.finish();
}

fn benchmark_nested_loops(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_loops");
    let options = GeneratorOptions {
        validate_ir: false,
        ..GeneratorOptions::default()
    };

    for depth in [4, 16, 64].iter() {
        let module = build_nested_loops(*depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &module, |b, module| {
            b.iter(|| {
                let output = generate(black_box(module), &options).unwrap();
                black_box(output.words);
            });
        });
    }

    group.finish();
}

fn benchmark_demos(c: &mut Criterion) {
    let options = GeneratorOptions::default();
    let modules = demos::all();

    c.bench_function("generate_demos", |b| {
        b.iter(|| {
            for (_, module) in &modules {
                black_box(generate(black_box(module), &options).unwrap());
            }
        });
    });

    c.bench_function("tirb_round_trip", |b| {
        b.iter(|| {
            for (_, module) in &modules {
                let bytes = binary::encode(black_box(module)).unwrap();
                black_box(binary::decode(&bytes).unwrap());
            }
        });
    });
}

criterion_group!(
    benches,
    benchmark_if_chain,
    benchmark_nested_loops,
    benchmark_demos
);

criterion_main!(benches);
