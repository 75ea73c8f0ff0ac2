//! Performance benchmarks for the Decaf build pipeline.
//!
//! - Ingestion: JSON syntax tree to the strict AST
//! - Build: resolution, type checking and code generation
//! - Register pressure: deep expressions under a small register pool
//!
//! ## Profiling with Puffin
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use decaf::{CompilerOptions, Program, ProgramBuilder, Unit};
use decaf_ast::{BinaryOp, IncDecOp};
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// A chain of `classes` classes, each overriding `step` and looping over a
/// counter, plus a `Main` that drives the last one.
fn class_chain(classes: usize) -> Program {
    let mut b = ProgramBuilder::new();
    for i in 0..classes {
        let count = b.field("count", "int");
        let fields = if i == 0 { vec![count] } else { vec![] };

        let decl = b.var("j", "int");
        let j = b.ident("j");
        let zero = b.int(0);
        let init = b.assign(j, zero);
        let j = b.ident("j");
        let n = b.ident("n");
        let cond = b.binary(BinaryOp::Less, j, n);
        let j = b.ident("j");
        let inc = b.inc_dec(IncDecOp::Increment, false, j);
        let update = b.expr_stmt(inc);
        let count = b.ident("count");
        let bump = b.inc_dec(IncDecOp::Increment, true, count);
        let body = b.expr_stmt(bump);
        let for_stmt = b.for_stmt(Some(init), Some(cond), Some(update), body);
        let count = b.ident("count");
        let ret = b.ret(Some(count));
        let body = b.block(vec![decl, for_stmt, ret]);
        let step = b.method("step", "int", &[("n", "int")], body);

        let parent = (i > 0).then(|| format!("C{}", i - 1));
        b.class(&format!("C{}", i), parent.as_deref(), fields, vec![step]);
    }

    let decl = b.var("c", &format!("C{}", classes - 1));
    let c = b.ident("c");
    let object = b.new_object(&format!("C{}", classes - 1));
    let assign = b.assign(c, object);
    let c = b.ident("c");
    let ten = b.int(10);
    let call = b.call(Some(c), "step", vec![ten]);
    let print = b.print(call);
    let body = b.block(vec![decl, assign, print]);
    let main = b.method("main", "void", &[], body).into_static();
    b.class("Main", None, vec![], vec![main]);
    b.finish()
}

/// `print(1 + (2 + (3 + ...)))` nested `depth` deep.
fn deep_expression(depth: i32) -> Program {
    let mut b = ProgramBuilder::new();
    let mut expr = b.int(depth);
    for v in (1..depth).rev() {
        let lhs = b.int(v);
        expr = b.binary(BinaryOp::Add, lhs, expr);
    }
    let print = b.print(expr);
    let body = b.block(vec![print]);
    let main = b.method("main", "void", &[], body).into_static();
    b.class("Main", None, vec![], vec![main]);
    b.finish()
}

fn ingestion_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");
    for name in ["hello_world.json", "animals.json", "counter.json"] {
        let path = format!("{}/test_programs/{}", env!("CARGO_MANIFEST_DIR"), name);
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &text, |b, text| {
            b.iter(|| black_box(Unit::from_json(black_box(text)).is_ok()));
        });
    }
    group.finish();
}

fn build_benchmarks(c: &mut Criterion) {
    setup_profiler();

    let mut group = c.benchmark_group("build/class_chain");
    for classes in [10, 100, 500] {
        let unit = Unit::new(class_chain(classes));
        group.throughput(Throughput::Elements(classes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(classes), &unit, |b, unit| {
            b.iter(|| {
                let artifact = unit.build();
                end_profiling_frame();
                black_box(artifact.map(|a| a.listing().len()).unwrap_or(0))
            });
        });
    }
    group.finish();
}

fn register_pressure_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("build/register_pressure");
    let program = deep_expression(200);
    for registers in [3, 8, 32] {
        let unit = Unit::new(program.clone())
            .with_options(CompilerOptions::new().with_register_count(registers));
        group.bench_with_input(BenchmarkId::from_parameter(registers), &unit, |b, unit| {
            b.iter(|| black_box(unit.build().map(|a| a.listing().len()).unwrap_or(0)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    ingestion_benchmarks,
    build_benchmarks,
    register_pressure_benchmarks
);
criterion_main!(benches);
