// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Differentiable kernel calls.
//!
//! [`DiffKernelOp`] wraps one kernel entry point as a differentiable operation
//! with a forward and a backward half, ready to be plugged into an autograd
//! engine's custom-function hook:
//!
//! - **forward** allocates the outputs, marshals inputs and outputs by the
//!   kernel's reflected parameter types and launches the primal kernel
//! - **backward** pairs every tensor with a gradient buffer, launches the
//!   reverse-mode kernel and returns the input gradients
//!
//! Both halves launch `1 + n / 1024` groups of 1024 threads, where `n` is the
//! leading dimension of the first input.
//!
//! ## Example
//!
//! ```rust
//! use candle_core::{DType, Device, Tensor};
//! use slang_marshal::{DiffKernelOp, LoadedModule, RecordingKernel, StaticModule};
//!
//! let module = StaticModule::builder("bezier")
//!     .type_info("DiffTensorView", [("primal", "TensorView"), ("diff", "AtomicAdd")])
//!     .kernel(RecordingKernel::new(
//!         "bezier2D",
//!         [("t", "DiffTensorView"), ("control_pts", "DiffTensorView"), ("output", "DiffTensorView")],
//!     ))
//!     .build();
//! let loaded = LoadedModule::new(module);
//!
//! let op = DiffKernelOp::new(&loaded, "bezier2D", ["t", "control_pts"]).with_output(
//!     "output",
//!     |inputs: &[Tensor]| Ok(Tensor::zeros((inputs[0].dim(0)?, inputs[1].dim(1)?), DType::F32, inputs[0].device())?),
//! );
//!
//! let t = Tensor::zeros(100, DType::F32, &Device::Cpu)?;
//! let control_pts = Tensor::zeros((20, 2), DType::F32, &Device::Cpu)?;
//! let (outputs, ctx) = op.forward(&[t, control_pts])?;
//! assert_eq!(outputs[0].dims(), &[100, 2]);
//!
//! let grads = op.backward(&ctx, &[outputs[0].ones_like()?])?;
//! assert_eq!(grads[1].dims(), &[20, 2]);
//! # Ok::<(), slang_marshal::MarshalError>(())
//! ```

use crate::config::LaunchConfig;
use crate::error::{MarshalError, Result};
use crate::module::LoadedModule;
use crate::traits::{KernelArgs, Pass, ShaderModule};
use crate::value::{DiffTensorView, Value};
use candle_core::Tensor;

/// Allocates one output tensor from the forward inputs.
pub type OutputAllocator = Box<dyn Fn(&[Tensor]) -> Result<Tensor> + Send + Sync>;

/// Tensors saved by [`DiffKernelOp::forward`] for the backward pass.
#[derive(Debug, Clone)]
pub struct ForwardContext {
    inputs: Vec<Tensor>,
    outputs: Vec<Tensor>,
}

impl ForwardContext {
    /// Forward inputs.
    #[must_use]
    pub fn inputs(&self) -> &[Tensor] {
        &self.inputs
    }

    /// Forward outputs.
    #[must_use]
    pub fn outputs(&self) -> &[Tensor] {
        &self.outputs
    }
}

/// A kernel entry point exposed as a differentiable operation.
pub struct DiffKernelOp<'m, M> {
    module: &'m LoadedModule<M>,
    kernel: String,
    inputs: Vec<String>,
    outputs: Vec<(String, OutputAllocator)>,
    launch_config: LaunchConfig,
}

impl<'m, M: ShaderModule> DiffKernelOp<'m, M> {
    /// Operation calling `kernel` with the named inputs, in order.
    pub fn new<I, S>(module: &'m LoadedModule<M>, kernel: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module,
            kernel: kernel.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
            outputs: Vec::new(),
            launch_config: LaunchConfig::default(),
        }
    }

    /// Add an output parameter, allocated from the inputs on every forward call.
    #[must_use]
    pub fn with_output<F>(mut self, name: impl Into<String>, allocate: F) -> Self
    where
        F: Fn(&[Tensor]) -> Result<Tensor> + Send + Sync + 'static,
    {
        self.outputs.push((name.into(), Box::new(allocate)));
        self
    }

    /// Override the launch configuration.
    #[must_use]
    pub fn with_launch_config(mut self, config: LaunchConfig) -> Self {
        self.launch_config = config;
        self
    }

    /// Run the primal kernel.
    ///
    /// Returns the output tensors and the context needed by
    /// [`DiffKernelOp::backward`].
    ///
    /// # Errors
    ///
    /// Fails without launching if the input count is wrong, the kernel is
    /// missing, or any argument fails to marshal. Launch failures propagate.
    pub fn forward(&self, inputs: &[Tensor]) -> Result<(Vec<Tensor>, ForwardContext)> {
        if inputs.len() != self.inputs.len() {
            return Err(MarshalError::length_mismatch(
                format!("{} inputs", self.kernel),
                self.inputs.len(),
                inputs.len(),
            ));
        }

        let outputs = self
            .outputs
            .iter()
            .map(|(_, allocate)| allocate(inputs))
            .collect::<Result<Vec<_>>>()?;

        let args: KernelArgs = self
            .inputs
            .iter()
            .zip(inputs)
            .chain(self.outputs.iter().map(|(name, _)| name).zip(&outputs))
            .map(|(name, t)| (name.clone(), Value::Tensor(t.clone())))
            .collect();

        self.launch(Pass::Forward, &args, leading_dim(inputs))?;

        let ctx = ForwardContext {
            inputs: inputs.to_vec(),
            outputs: outputs.clone(),
        };
        Ok((outputs, ctx))
    }

    /// Run the reverse-mode kernel.
    ///
    /// Every input is paired with a fresh zero gradient buffer and every output
    /// with its incoming gradient, so every parameter the kernel reads must be
    /// a differentiable view. Returns the input gradients in input order.
    ///
    /// The kernel may overwrite `grad_outputs` while propagating; clone them
    /// first if they are needed afterwards.
    ///
    /// # Errors
    ///
    /// Fails without launching if the gradient count is wrong, the kernel is
    /// missing, or any argument fails to marshal. A parameter whose type only
    /// takes a plain tensor fails with `UnsupportedShape`. Launch failures
    /// propagate.
    pub fn backward(&self, ctx: &ForwardContext, grad_outputs: &[Tensor]) -> Result<Vec<Tensor>> {
        if grad_outputs.len() != ctx.outputs.len() {
            return Err(MarshalError::length_mismatch(
                format!("{} output gradients", self.kernel),
                ctx.outputs.len(),
                grad_outputs.len(),
            ));
        }

        let grad_inputs = ctx
            .inputs
            .iter()
            .map(Tensor::zeros_like)
            .collect::<candle_core::Result<Vec<_>>>()?;

        let args: KernelArgs = self
            .inputs
            .iter()
            .zip(ctx.inputs.iter().zip(&grad_inputs))
            .chain(
                self.outputs
                    .iter()
                    .map(|(name, _)| name)
                    .zip(ctx.outputs.iter().zip(grad_outputs)),
            )
            .map(|(name, (primal, grad))| {
                let view = DiffTensorView::new(primal.clone(), grad.clone());
                (name.clone(), Value::DiffView(view))
            })
            .collect();

        self.launch(Pass::Backward, &args, leading_dim(&ctx.inputs))?;
        Ok(grad_inputs)
    }

    fn launch(&self, pass: Pass, args: &KernelArgs, elements: usize) -> Result<()> {
        let kernel = self.module.kernel(&self.kernel)?;
        let marshalled = self.module.marshal(kernel, args)?;
        let dims = self.launch_config.launch_dims(elements)?;

        tracing::debug!(
            target: "slang_marshal::launch",
            kernel = %self.kernel,
            pass = ?pass,
            elements,
            block = ?dims.block,
            grid = ?dims.grid,
            "Launching kernel"
        );

        kernel.launch(pass, &marshalled, dims)
    }
}

/// Leading dimension of the first input, or its element count for scalars.
fn leading_dim(inputs: &[Tensor]) -> usize {
    inputs
        .first()
        .map_or(0, |t| t.dims().first().copied().unwrap_or_else(|| t.elem_count()))
}
