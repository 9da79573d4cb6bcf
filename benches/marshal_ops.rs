//! Benchmarks for the marshalling hot paths.

use candle_core::{DType, Device, Tensor};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use slang_marshal::{LaunchConfig, LoadedModule, Registry, StaticModule, Value};
use std::hint::black_box;

fn module() -> StaticModule {
    StaticModule::builder("bench")
        .type_info("Array_float_16", [("type", "float"), ("size", "16")])
        .type_info("_VectorStorage_float_16", [("data", "Array_float_16")])
        .type_info(
            "Array__VectorStorage_float_16_64",
            [("type", "_VectorStorage_float_16"), ("size", "64")],
        )
        .type_info("_MatrixStorage_4x4", [("data", "Array_float_16")])
        .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "AtomicAdd")])
        .build()
}

/// Benchmark adapter resolution, cold and cached.
fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    // Fresh module each iteration: registry lookup + reflection + nested types
    group.bench_function("cold_nested", |b| {
        b.iter(|| {
            let loaded = LoadedModule::new(module());
            black_box(loaded.resolve("Array__VectorStorage_float_16_64").unwrap())
        })
    });

    // Cache hit (every kernel call after the first)
    group.bench_function("cached", |b| {
        let loaded = LoadedModule::new(module());
        loaded.resolve("Array__VectorStorage_float_16_64").unwrap();
        b.iter(|| black_box(loaded.resolve(black_box("Array__VectorStorage_float_16_64")).unwrap()))
    });

    group.bench_function("registry_lookup", |b| {
        let registry = Registry::new();
        b.iter(|| black_box(registry.lookup(black_box("_MatrixStorage_4x4")).unwrap()))
    });

    group.finish();
}

/// Benchmark value conversion.
fn bench_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("conversion");
    let loaded = LoadedModule::new(module());

    let vector = Value::tuple((0..16i32).map(f64::from));
    let array_of_vectors = Value::list((0..64i32).map(|_| Value::tuple((0..16i32).map(f64::from))));
    let cases = [
        ("_VectorStorage_float_16", 16, vector),
        ("Array__VectorStorage_float_16_64", 1024, array_of_vectors),
    ];
    for (type_name, leaves, input) in &cases {
        group.bench_with_input(BenchmarkId::new("nested", leaves), input, |b, input| {
            b.iter(|| black_box(loaded.convert(type_name, black_box(input)).unwrap()))
        });
    }

    group.bench_function("matrix_4x4", |b| {
        let input = Value::tuple((0..4).map(|r| Value::tuple((0..4).map(|c| r * 4 + c))));
        b.iter(|| black_box(loaded.convert("_MatrixStorage_4x4", black_box(&input)).unwrap()))
    });

    group.bench_function("diff_view_synthesized_grad", |b| {
        let input = Value::from(Tensor::zeros(1024, DType::F32, &Device::Cpu).unwrap());
        b.iter(|| black_box(loaded.convert("DiffTensorView", black_box(&input)).unwrap()))
    });

    group.finish();
}

/// Benchmark launch arithmetic.
fn bench_launch_dims(c: &mut Criterion) {
    let config = LaunchConfig::default();
    c.bench_function("launch_dims", |b| {
        b.iter(|| black_box(config.launch_dims(black_box(1_000_000)).unwrap()))
    });
}

criterion_group!(benches, bench_resolution, bench_conversion, bench_launch_dims);
criterion_main!(benches);
