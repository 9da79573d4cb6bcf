// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Integration tests for slang-marshal.
//!
//! These tests drive the public API the way a host does: build a module from
//! reflection tables, resolve adapters by type name, convert values and run
//! differentiable kernel calls.

use candle_core::{DType, Device, Tensor};
use slang_marshal::{
    AdapterKind, DiffKernelOp, DiffTensorView, LaunchConfig, LoadedModule, MarshalError, Pass,
    RecordingKernel, Registry, StaticModule, StorageShape, ValidatableConfig, Value,
};
use std::sync::Arc;

fn shapes_module() -> StaticModule {
    StaticModule::builder("shapes")
        .type_info("Array_float_4", [("type", "float"), ("size", "4")])
        .type_info("Array_float_3", [("type", "float"), ("size", "3")])
        .type_info("_VectorStorage_float_3", [("data", "Array_float_3")])
        .type_info("_MatrixStorage_2x3", [("data", "Array_float_6")])
        .type_info(
            "Array__VectorStorage_float_3_2",
            [("type", "_VectorStorage_float_3"), ("size", "2")],
        )
        .type_info(
            "DiffTensorView",
            [("primal", "TensorView"), ("diff", "AtomicAdd")],
        )
        .type_info("Array_DiffTensorView_2", [("type", "DiffTensorView"), ("size", "2")])
        .build()
}

fn tensor(n: usize) -> Tensor {
    Tensor::zeros(n, DType::F32, &Device::Cpu).unwrap()
}

// ============================================================================
// Array Tests
// ============================================================================

#[test]
fn test_array_of_scalars() {
    let loaded = LoadedModule::new(shapes_module());
    let out = loaded
        .convert("Array_float_4", &Value::tuple([1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    assert_eq!(out, Value::tuple([1.0, 2.0, 3.0, 4.0]));
}

#[test]
fn test_array_list_normalized_to_tuple() {
    let loaded = LoadedModule::new(shapes_module());
    let out = loaded
        .convert("Array_float_4", &Value::list([1.0, 2.0, 3.0, 4.0]))
        .unwrap();
    assert!(matches!(out, Value::Tuple(_)));
}

#[test]
fn test_array_length_mismatch() {
    let loaded = LoadedModule::new(shapes_module());
    for len in [0, 3, 5] {
        let input = Value::list(vec![1.0; len]);
        let err = loaded.convert("Array_float_4", &input).unwrap_err();
        assert!(
            matches!(err, MarshalError::LengthMismatch { expected: 4, actual, .. } if actual == len),
            "unexpected error for length {len}: {err}"
        );
    }
}

#[test]
fn test_array_of_vectors() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::list([Value::tuple([1, 2, 3]), Value::list([4, 5, 6])]);
    let out = loaded.convert("Array__VectorStorage_float_3_2", &input).unwrap();

    let expected = Value::tuple([
        Value::tuple([Value::tuple([1, 2, 3])]),
        Value::tuple([Value::tuple([4, 5, 6])]),
    ]);
    assert_eq!(out, expected);
}

#[test]
fn test_array_of_diff_views() {
    let loaded = LoadedModule::new(shapes_module());
    let (a, ga, b) = (tensor(4), tensor(4), tensor(4));
    let input = Value::tuple([
        Value::from(DiffTensorView::new(a.clone(), ga.clone())),
        Value::from(b.clone()),
    ]);

    let out = loaded.convert("Array_DiffTensorView_2", &input).unwrap();
    let items = out.as_tuple().unwrap();
    assert_eq!(items[0], Value::tuple([Value::from(a), Value::tuple([ga])]));
    assert_eq!(items[1].as_tuple().unwrap()[0], Value::from(b));
}

// ============================================================================
// Vector and Matrix Tests
// ============================================================================

#[test]
fn test_vector_wraps_array() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::tuple([1.0, 2.0, 3.0]);
    let array = loaded.convert("Array_float_3", &input).unwrap();
    let vector = loaded.convert("_VectorStorage_float_3", &input).unwrap();
    assert_eq!(vector, Value::Tuple(vec![array]));
}

#[test]
fn test_vector_propagates_array_errors() {
    let loaded = LoadedModule::new(shapes_module());
    let err = loaded
        .convert("_VectorStorage_float_3", &Value::tuple([1.0, 2.0]))
        .unwrap_err();
    assert!(matches!(err, MarshalError::LengthMismatch { .. }));
}

#[test]
fn test_matrix_2x3() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::tuple([Value::tuple([1, 2, 3]), Value::tuple([4, 5, 6])]);
    let out = loaded.convert("_MatrixStorage_2x3", &input).unwrap();
    assert_eq!(out, Value::tuple([Value::tuple([1, 2, 3, 4, 5, 6])]));
}

#[test]
fn test_matrix_bad_row_length() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::tuple([Value::tuple([1, 2]), Value::tuple([4, 5])]);
    assert!(matches!(
        loaded.convert("_MatrixStorage_2x3", &input),
        Err(MarshalError::UnsupportedShape { .. })
    ));
}

#[test]
fn test_matrix_row_count_not_enforced() {
    let loaded = LoadedModule::new(shapes_module());
    let one_row = Value::tuple([Value::tuple([1, 2, 3])]);
    let out = loaded.convert("_MatrixStorage_2x3", &one_row).unwrap();
    assert_eq!(out, Value::tuple([Value::tuple([1, 2, 3])]));
}

#[test]
fn test_matrix_unparseable_name() {
    let module = StaticModule::builder("m")
        .type_info("_MatrixStorage_float", [("data", "Array_float_6")])
        .build();
    let loaded = LoadedModule::new(module);
    assert!(matches!(
        loaded.resolve("_MatrixStorage_float"),
        Err(MarshalError::UnparseableTypeName(_))
    ));
}

// ============================================================================
// Differentiable View Tests
// ============================================================================

#[test]
fn test_diff_view_bare_tensor() {
    let loaded = LoadedModule::new(shapes_module());
    let b = tensor(8);
    let out = loaded.convert("DiffTensorView", &Value::from(b.clone())).unwrap();

    let items = out.as_tuple().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], Value::from(b.clone()));
    let g = items[1].as_tuple().unwrap()[0].as_tensor().unwrap();
    assert_eq!(g.elem_count(), 1);
    assert!(g.device().same_device(b.device()));
}

#[test]
fn test_diff_view_fresh_gradient_each_call() {
    let loaded = LoadedModule::new(shapes_module());
    let b = Value::from(tensor(8));

    let first = loaded.convert("DiffTensorView", &b).unwrap();
    let second = loaded.convert("DiffTensorView", &b).unwrap();
    let grad = |v: &Value| v.as_tuple().unwrap()[1].as_tuple().unwrap()[0].clone();
    assert_ne!(grad(&first), grad(&second));
}

#[test]
fn test_diff_view_idempotent_on_pairs() {
    let loaded = LoadedModule::new(shapes_module());
    let view = DiffTensorView::new(tensor(3), tensor(3));

    let once = loaded.convert("DiffTensorView", &Value::from(view)).unwrap();
    let twice = loaded.convert("DiffTensorView", &once).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_diff_view_rejects_long_tuple() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::tuple([tensor(1), tensor(1), tensor(1)]);
    assert!(matches!(
        loaded.convert("DiffTensorView", &input),
        Err(MarshalError::UnsupportedShape { .. })
    ));
}

#[test]
fn test_diff_view_non_atomic_is_passthrough() {
    let module = StaticModule::builder("m")
        .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "TensorView")])
        .build();
    let loaded = LoadedModule::new(module);

    let id = loaded.resolve("DiffTensorView").unwrap();
    assert_eq!(
        loaded.adapter(id).unwrap().storage_shape(),
        StorageShape::Passthrough
    );
    let input = Value::tuple([tensor(1), tensor(1), tensor(1)]);
    assert_eq!(loaded.convert_with(id, &input).unwrap(), input);
}

#[test]
fn test_diff_view_requires_two_fields() {
    let module = StaticModule::builder("m")
        .type_info("DiffTensorView", [("primal", "TensorView")])
        .build();
    let loaded = LoadedModule::new(module);
    assert!(matches!(
        loaded.resolve("DiffTensorView"),
        Err(MarshalError::InvalidTypeInfo { .. })
    ));
}

// ============================================================================
// Registry and Cache Tests
// ============================================================================

#[test]
fn test_second_resolution_skips_reflection() {
    let loaded = LoadedModule::new(shapes_module());
    let input = Value::tuple([1.0, 2.0, 3.0, 4.0]);

    let first = loaded.convert("Array_float_4", &input).unwrap();
    let queries = loaded.module().query_count();
    assert!(queries > 0);

    let second = loaded.convert("Array_float_4", &input).unwrap();
    assert_eq!(first, second);
    assert_eq!(loaded.module().query_count(), queries);
}

#[test]
fn test_modules_have_separate_caches() {
    let a = LoadedModule::new(shapes_module());
    let b = LoadedModule::new(
        StaticModule::builder("other")
            .type_info("Array_float_4", [("type", "int"), ("size", "2")])
            .build(),
    );

    assert!(a.convert("Array_float_4", &Value::tuple([1, 2, 3, 4])).is_ok());
    assert!(matches!(
        b.convert("Array_float_4", &Value::tuple([1, 2, 3, 4])),
        Err(MarshalError::LengthMismatch { expected: 2, .. })
    ));
}

#[test]
fn test_missing_type_info() {
    let loaded = LoadedModule::new(StaticModule::builder("empty").build());
    assert!(matches!(
        loaded.resolve("Array_float_4"),
        Err(MarshalError::MissingTypeInfo { .. })
    ));
}

#[test]
fn test_no_adapter_found() {
    let loaded = LoadedModule::new(shapes_module());
    assert!(matches!(
        loaded.resolve("FooVectorStorage_Bar"),
        Err(MarshalError::NoAdapterFound(_))
    ));
}

#[test]
fn test_custom_registry_pattern() {
    let mut registry = Registry::new();
    registry.register("*_Storage", AdapterKind::Vector);

    let module = StaticModule::builder("m")
        .type_info("Array_float_2", [("type", "float"), ("size", "2")])
        .type_info("Point_Storage", [("data", "Array_float_2")])
        .build();
    let loaded = LoadedModule::with_registry(module, Arc::new(registry));

    let out = loaded.convert("Point_Storage", &Value::list([1.0, 2.0])).unwrap();
    assert_eq!(out, Value::tuple([Value::tuple([1.0, 2.0])]));
}

// ============================================================================
// Differentiable Kernel Tests
// ============================================================================

#[test]
fn test_forward_backward_round() {
    let kernel = Arc::new(RecordingKernel::new(
        "bezier2D",
        [
            ("t", "DiffTensorView"),
            ("control_pts", "DiffTensorView"),
            ("output", "DiffTensorView"),
        ],
    ));
    let module = StaticModule::builder("bezier")
        .type_info(
            "DiffTensorView",
            [("primal", "TensorView"), ("diff", "AtomicAdd")],
        )
        .kernel(Arc::clone(&kernel))
        .build();
    let loaded = LoadedModule::new(module);

    let op = DiffKernelOp::new(&loaded, "bezier2D", ["t", "control_pts"])
        .with_output("output", |inputs: &[Tensor]| {
            Ok(Tensor::zeros(
                (inputs[0].dim(0)?, inputs[1].dim(1)?),
                DType::F32,
                inputs[0].device(),
            )?)
        })
        .with_launch_config(LaunchConfig::default());

    let t = Tensor::zeros(100, DType::F32, &Device::Cpu).unwrap();
    let control_pts = Tensor::zeros((20, 2), DType::F32, &Device::Cpu).unwrap();
    let (outputs, ctx) = op.forward(&[t.clone(), control_pts.clone()]).unwrap();
    let grads = op.backward(&ctx, &[outputs[0].ones_like().unwrap()]).unwrap();

    assert_eq!(outputs[0].dims(), &[100, 2]);
    assert_eq!(grads[0].dims(), t.dims());
    assert_eq!(grads[1].dims(), control_pts.dims());

    let launches = kernel.launches();
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[0].pass, Pass::Forward);
    assert_eq!(launches[1].pass, Pass::Backward);
    for launch in &launches {
        assert_eq!(launch.dims.block, (1, 1, 1));
        assert_eq!(launch.dims.grid, (1024, 1, 1));
    }
}

#[test]
fn test_marshal_failure_aborts_launch() {
    let kernel = Arc::new(RecordingKernel::new(
        "fit",
        [("weights", "Array_float_4"), ("output", "DiffTensorView")],
    ));
    let module = StaticModule::builder("m")
        .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "AtomicAdd")])
        .kernel(Arc::clone(&kernel))
        .build();
    let loaded = LoadedModule::new(module);

    let op = DiffKernelOp::new(&loaded, "fit", ["weights"])
        .with_output("output", |inputs: &[Tensor]| Ok(inputs[0].zeros_like()?));
    let err = op.forward(&[tensor(4)]).unwrap_err();

    // Array_float_4 has no reflection in this module.
    assert!(matches!(err, MarshalError::MissingTypeInfo { .. }));
    assert!(kernel.launches().is_empty());
}

#[test]
fn test_oversized_tensor_named_by_argument() {
    let kernel = Arc::new(RecordingKernel::new(
        "fit",
        [("t", "DiffTensorView"), ("control_pts", "TensorView")],
    ));
    let module = StaticModule::builder("m")
        .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "AtomicAdd")])
        .kernel(Arc::clone(&kernel))
        .build();
    let loaded = LoadedModule::new(module);

    let six_d = Tensor::zeros(vec![1usize, 1, 1, 1, 1, 2], DType::F32, &Device::Cpu).unwrap();
    let args = [
        ("t".to_string(), Value::from(tensor(4))),
        ("control_pts".to_string(), Value::from(six_d.clone())),
    ]
    .into_iter()
    .collect();
    let err = loaded.marshal(loaded.kernel("fit").unwrap(), &args).unwrap_err();
    assert!(matches!(
        &err,
        MarshalError::UnsupportedShape { type_name, .. } if type_name == "control_pts"
    ));

    let args = [
        ("t".to_string(), Value::from(six_d)),
        ("control_pts".to_string(), Value::from(tensor(4))),
    ]
    .into_iter()
    .collect();
    let err = loaded.marshal(loaded.kernel("fit").unwrap(), &args).unwrap_err();
    assert!(matches!(
        &err,
        MarshalError::UnsupportedShape { type_name, .. } if type_name == "t"
    ));
}

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_launch_config_from_env() {
    std::env::set_var("SLANG_MARSHAL_THREADS_PER_BLOCK", "256");
    let config = LaunchConfig::from_env();
    std::env::remove_var("SLANG_MARSHAL_THREADS_PER_BLOCK");

    assert_eq!(config.threads_per_block, 256);
    assert!(config.validate().is_ok());
    assert_eq!(config.launch_dims(256).unwrap().block, (2, 1, 1));
}
