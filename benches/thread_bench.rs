//! Benchmark for thread spawn and join.

use criterion::{criterion_group, criterion_main, Criterion};
use spindle_lang::config::RuntimeConfig;
use spindle_lang::interpreter::Interpreter;
use spindle_lang::thread::{spawn, ThreadHandle};
use spindle_lang::value::Value;
use std::hint::black_box;

fn benchmark_spawn_join_native(c: &mut Criterion) {
    let config = RuntimeConfig::default();
    c.bench_function("spawn + join (host closure)", |b| {
        b.iter(|| {
            let handle = ThreadHandle::spawn_with(&config, || Ok(Value::Int(1))).unwrap();
            black_box(handle.join())
        });
    });
}

fn benchmark_spawn_join_lambda(c: &mut Criterion) {
    let f = Interpreter::new()
        .eval_source("(lambda (x) (times 100 (set x (+ x 1))) x)")
        .unwrap();
    c.bench_function("spawn + join (counting lambda)", |b| {
        b.iter(|| {
            let handle = spawn(&f, vec![Value::Int(0)]).unwrap();
            black_box(handle.join())
        });
    });
}

fn benchmark_fan_out(c: &mut Criterion) {
    c.bench_function("script fan-out 8 threads", |b| {
        b.iter(|| {
            let mut interpreter = Interpreter::new();
            black_box(
                interpreter
                    .eval_source(
                        "(let f (lambda (n) (times 50 (set n (+ n 1))) n))
                         (let ts (array (thread f 1) (thread f 2) (thread f 3) (thread f 4)
                                        (thread f 5) (thread f 6) (thread f 7) (thread f 8)))
                         (let sum 0)
                         (let i 0)
                         (while (< i (length ts))
                           (set sum (+ sum (thread-join (index ts i))))
                           (set i (+ i 1)))
                         sum",
                    )
                    .unwrap(),
            )
        });
    });
}

criterion_group!(
    benches,
    benchmark_spawn_join_native,
    benchmark_spawn_join_lambda,
    benchmark_fan_out
);
criterion_main!(benches);
