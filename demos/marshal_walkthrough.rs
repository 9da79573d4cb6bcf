//! Example: Marshalling Walkthrough
//!
//! Builds a module from reflection tables, converts nested values, and runs a
//! forward/backward pair against a recording kernel.
//!
//! Run with:
//! ```bash
//! RUST_LOG=slang_marshal=debug cargo run --example marshal_walkthrough
//! ```

use candle_core::{DType, Device, Tensor};
use slang_marshal::{
    init_logging, DiffKernelOp, LoadedModule, LogConfig, RecordingKernel, Result, StaticModule,
    Value,
};
use std::sync::Arc;

fn main() -> Result<()> {
    init_logging(&LogConfig::development());

    let kernel = Arc::new(RecordingKernel::new(
        "bezier2D",
        [
            ("t", "DiffTensorView"),
            ("control_pts", "DiffTensorView"),
            ("output", "DiffTensorView"),
        ],
    ));
    let module = StaticModule::builder("bezier")
        .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "AtomicAdd")])
        .type_info("Array_float_3", [("type", "float"), ("size", "3")])
        .type_info("_VectorStorage_float_3", [("data", "Array_float_3")])
        .type_info("_MatrixStorage_2x3", [("data", "Array_float_6")])
        .kernel(Arc::clone(&kernel))
        .build();
    let loaded = LoadedModule::new(module);

    println!("=== Value conversion ===\n");

    let vector = loaded.convert("_VectorStorage_float_3", &Value::list([1.0, 2.0, 3.0]))?;
    println!("_VectorStorage_float_3 <- [1, 2, 3]        => {vector}");

    let matrix = Value::tuple([Value::tuple([1, 2, 3]), Value::tuple([4, 5, 6])]);
    let flat = loaded.convert("_MatrixStorage_2x3", &matrix)?;
    println!("_MatrixStorage_2x3     <- {matrix} => {flat}");

    match loaded.convert("_VectorStorage_float_3", &Value::list([1.0, 2.0])) {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("_VectorStorage_float_3 <- [1, 2]           => error: {e}"),
    }

    println!("\n=== Differentiable call ===\n");

    let op = DiffKernelOp::new(&loaded, "bezier2D", ["t", "control_pts"]).with_output(
        "output",
        |inputs: &[Tensor]| {
            Ok(Tensor::zeros(
                (inputs[0].dim(0)?, inputs[1].dim(1)?),
                DType::F32,
                inputs[0].device(),
            )?)
        },
    );

    let t = Tensor::arange(0f32, 100f32, &Device::Cpu)?.affine(0.01, 0.0)?;
    let control_pts = Tensor::rand(0f32, 1f32, (20, 2), &Device::Cpu)?;
    let (outputs, ctx) = op.forward(&[t, control_pts])?;
    let grads = op.backward(&ctx, &[outputs[0].ones_like()?])?;

    println!("output shape:       {:?}", outputs[0].dims());
    println!("grad control_pts:   {:?}", grads[1].dims());
    for launch in kernel.launches() {
        println!(
            "launch {:?}: block={:?} grid={:?} args={}",
            launch.pass,
            launch.dims.block,
            launch.dims.grid,
            launch.args.len()
        );
    }

    Ok(())
}
