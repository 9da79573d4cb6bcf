// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! # slang-marshal
//!
//! Argument marshalling between compiled GPU shader kernels and Candle tensors,
//! with forward/backward dispatch for differentiable kernels.
//!
//! A compiled kernel declares each parameter by a reflected type name. Hosts
//! pass whatever is convenient (a tensor, a tuple, a list, a differentiable
//! view) and this crate converts it, recursively, to the exact layout the
//! kernel expects:
//!
//! | Type name | Accepted input | Kernel layout |
//! |-----------|----------------|---------------|
//! | `DiffTensorView` | view, `(p,)`, `(p, g)`, tensor | `(p, (g,))` |
//! | `Array_*` | tuple or list of N | N-tuple of converted elements |
//! | `_VectorStorage_*` | as the wrapped array | `(array,)` |
//! | `_MatrixStorage_RxC` | R tuples of C | `((flattened,),)` |
//!
//! ## Modules
//!
//! - [`value`] - host values and differentiable views
//! - [`adapter`] - per-type conversion rules
//! - [`registry`] - type-name patterns mapped to adapter kinds
//! - [`module`] - compiled module handle owning the adapter cache
//! - [`reflection`] - `__typeinfo__` queries
//! - [`tensor_view`] - kernel tensor view limits and byte strides
//! - [`traits`] - shader module and kernel seams
//! - [`static_module`] - in-memory module and recording kernel
//! - [`function`] - differentiable forward/backward kernel calls
//! - [`config`] - launch configuration
//! - [`logging`] - subscriber setup
//! - [`error`] - error types
//!
//! ## Quick Start
//!
//! ```rust
//! use slang_marshal::{LoadedModule, StaticModule, Value};
//!
//! let module = StaticModule::builder("shapes")
//!     .type_info("_MatrixStorage_2x3", [("data", "Array_float_6")])
//!     .build();
//! let loaded = LoadedModule::new(module);
//!
//! let m = Value::tuple([Value::tuple([1, 2, 3]), Value::tuple([4, 5, 6])]);
//! let out = loaded.convert("_MatrixStorage_2x3", &m)?;
//! assert_eq!(out, Value::tuple([Value::tuple([1, 2, 3, 4, 5, 6])]));
//! # Ok::<(), slang_marshal::MarshalError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cuda` - Enable Candle's CUDA backend

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod function;
pub mod logging;
pub mod module;
pub mod reflection;
pub mod registry;
pub mod static_module;
pub mod tensor_view;
pub mod traits;
pub mod value;

pub use adapter::{Adapter, AdapterId, AdapterKind, StorageShape};
pub use config::{LaunchConfig, LaunchDims};
pub use error::{MarshalError, Result};
pub use function::{DiffKernelOp, ForwardContext};
pub use logging::{init_logging, LogConfig};
pub use module::LoadedModule;
pub use reflection::{query_type_info, TypeDescriptor, TypeInfo};
pub use registry::{Registry, TypePattern};
pub use static_module::{LaunchRecord, RecordingKernel, StaticModule};
pub use tensor_view::TensorViewDesc;
pub use traits::{Kernel, KernelArgs, KernelParam, Pass, ShaderModule, ValidatableConfig};
pub use value::{DiffTensorView, Value};
