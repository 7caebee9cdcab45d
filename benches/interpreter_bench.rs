//! Benchmark for interpreter execution.

use criterion::{criterion_group, criterion_main, Criterion};
use spindle_lang::interpreter::Interpreter;
use spindle_lang::parser::parse_expr;
use std::hint::black_box;

fn benchmark_nested_arithmetic(c: &mut Criterion) {
    c.bench_function("nested arithmetic (* (+ 2 3) (- 10 4))", |b| {
        b.iter(|| {
            let (asg, root_id) = parse_expr("(* (+ 2 3) (- 10 4))").unwrap();
            let mut interpreter = Interpreter::new();
            black_box(interpreter.execute(&asg, root_id).unwrap())
        });
    });
}

fn benchmark_times_loop(c: &mut Criterion) {
    let (asg, root_id) = parse_expr("(do (let i 0) (times 1000 (set i (+ i 1))) i)").unwrap();
    c.bench_function("times loop 1000", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new();
            black_box(interpreter.execute(&asg, root_id).unwrap())
        });
    });
}

fn benchmark_recursion(c: &mut Criterion) {
    c.bench_function("recursive fib 15", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new();
            black_box(
                interpreter
                    .eval_source("(fn fib (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))) (fib 15)")
                    .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    benchmark_nested_arithmetic,
    benchmark_times_loop,
    benchmark_recursion
);
criterion_main!(benches);
