//! Resolution benchmarks.
//!
//! - Registration: parsing and indexing declaration source
//! - Cached calls: resolving a key that already has an entity
//! - Fresh calls: deduction, ranking and instantiation of a new key

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use templar::prelude::*;

const SOURCE: &str = "
    namespace bench {
        template<class T> T twice(T value);
        int twice(int value);
        template<typename T, typename U> struct Pair { T first; U second; T get_first() const; };
        template<typename T> struct Pair<T, int> { T only; };
        template<typename... Args> int count(Args&&... args);
        struct Meters { Meters(double v); };
        double length(Meters m);
    }
";

fn registration_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");
    group.bench_function("prelude", |b| {
        b.iter(|| black_box(Engine::new().map(|engine| engine.cached_instances())));
    });
    group.bench_function("source", |b| {
        b.iter_batched(
            || Engine::new().unwrap(),
            |engine| black_box(engine.register_source(black_box(SOURCE)).map(|decls| decls.len())),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn cached_benchmarks(c: &mut Criterion) {
    let engine = Engine::new().unwrap();
    engine.register_source(SOURCE).unwrap();
    let float = [Value::Float(1.0)];
    let mixed = [Value::Int(1), Value::Float(2.0), Value::str("three")];
    engine.resolve_call("bench", "twice", &[], &float).unwrap();
    engine.resolve_call("bench", "count", &[], &mixed).unwrap();

    let mut group = c.benchmark_group("cached");
    group.bench_function("function_template", |b| {
        b.iter(|| black_box(engine.resolve_call("bench", black_box("twice"), &[], &float)));
    });
    group.bench_function("variadic_pack", |b| {
        b.iter(|| black_box(engine.resolve_call("bench", black_box("count"), &[], &mixed)));
    });
    group.bench_function("class_template", |b| {
        b.iter(|| black_box(engine.resolve_class(black_box("bench::Pair<double,char>"), &[])));
    });
    group.bench_function("user_conversion", |b| {
        b.iter(|| black_box(engine.resolve_call("bench", "length", &[], &float)));
    });
    group.finish();
}

fn fresh_benchmarks(c: &mut Criterion) {
    let setup = || {
        let engine = Engine::new().unwrap();
        engine.register_source(SOURCE).unwrap();
        engine
    };

    let mut group = c.benchmark_group("fresh");
    group.bench_function("function_template", |b| {
        b.iter_batched(
            setup,
            |engine| black_box(engine.resolve_call("bench", "twice", &[], &[Value::Float(1.0)]).map(|e| e.handle())),
            BatchSize::SmallInput,
        );
    });
    group.bench_function("partial_specialization", |b| {
        b.iter_batched(
            setup,
            |engine| black_box(engine.resolve_class("bench::Pair<double,int>", &[]).map(|e| e.handle())),
            BatchSize::SmallInput,
        );
    });
    group.bench_function("explicit_arguments", |b| {
        let args = [TemplateArg::from("std::vector<double>"), TemplateArg::from("int")];
        b.iter_batched(
            setup,
            |engine| black_box(engine.resolve_class("bench::Pair", &args).map(|e| e.handle())),
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(benches, registration_benchmarks, cached_benchmarks, fresh_benchmarks);
criterion_main!(benches);
