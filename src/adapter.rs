// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Adapters: per-type conversion from host values to kernel storage layout.
//!
//! An [`Adapter`] is built once per reflected type and converts any accepted
//! host [`Value`] into the canonical storage value for that type:
//!
//! | Kind | Canonical value |
//! |------|-----------------|
//! | differentiable view | `(primal, (gradient,))` |
//! | array of N | `(converted_0, ..., converted_{N-1})` |
//! | vector | `(array_converted,)` |
//! | matrix R x C | `((flattened R*C values),)` |
//! | scalar, tensor view | unchanged |
//!
//! Composite adapters refer to their element adapters by [`AdapterId`], an
//! index into the arena owned by [`crate::LoadedModule`]. Conversion is
//! deterministic; the only side effect is allocating a one-element gradient
//! buffer when a differentiable view is given no gradient.

use crate::error::{MarshalError, Result};
use crate::reflection::TypeDescriptor;
use crate::tensor_view::TensorViewDesc;
use crate::value::Value;
use candle_core::Tensor;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix marking the atomic-accumulation gradient storage convention.
pub const ATOMIC_GRAD_PREFIX: &str = "AtomicAdd";

static MATRIX_DIMS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x(\d+)").expect("matrix dimension pattern is valid"));

/// The closed set of adapter kinds a type name can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Primal tensor plus gradient buffer.
    DiffTensorView,
    /// Fixed-length array with a reflected element type and size.
    Array,
    /// Storage struct wrapping one array field.
    Vector,
    /// Storage struct holding a flattened `RxC` matrix.
    Matrix,
    /// Raw tensor, checked against the kernel tensor view limits.
    TensorView,
    /// Scalars and anything else passed through unchanged.
    Passthrough,
}

impl AdapterKind {
    /// Whether building this kind of adapter needs reflected type info.
    #[must_use]
    pub fn needs_reflection(self) -> bool {
        matches!(self, Self::DiffTensorView | Self::Array | Self::Vector | Self::Matrix)
    }
}

/// Index of an adapter within a module's adapter arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterId(pub(crate) usize);

impl AdapterId {
    /// Position in the arena.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Structural tag of an adapter's canonical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape {
    /// `(primal, (gradient,))`.
    DiffPair,
    /// A tuple.
    Tuple,
    /// The input value, unchanged.
    Passthrough,
}

/// A resolved adapter for one concrete type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Adapter {
    /// Value passed through unchanged.
    Passthrough {
        /// Type this adapter was resolved for.
        type_name: String,
    },
    /// Tensor passed through after checking it fits a kernel tensor view.
    TensorView {
        /// Type this adapter was resolved for.
        type_name: String,
    },
    /// Differentiable view.
    DiffTensorView {
        /// Type this adapter was resolved for.
        type_name: String,
        /// Whether the gradient field uses atomic accumulation. Other
        /// conventions pass values through unchanged.
        atomic: bool,
    },
    /// Fixed-length array.
    Array {
        /// Type this adapter was resolved for.
        type_name: String,
        /// Adapter for each element.
        element: AdapterId,
        /// Declared element count.
        size: usize,
    },
    /// Vector storage wrapping an array.
    Vector {
        /// Type this adapter was resolved for.
        type_name: String,
        /// Adapter for the embedded `data` array.
        array: AdapterId,
    },
    /// Matrix storage.
    Matrix {
        /// Type this adapter was resolved for.
        type_name: String,
        /// Row count parsed from the type name.
        rows: usize,
        /// Column count parsed from the type name.
        cols: usize,
    },
}

/// Parse `RxC` from a matrix storage type name.
///
/// # Errors
///
/// Returns `UnparseableTypeName` if the name has no `RxC` group or either
/// dimension is zero.
pub fn parse_matrix_dims(type_name: &str) -> Result<(usize, usize)> {
    let unparseable = || MarshalError::UnparseableTypeName(type_name.to_string());

    let caps = MATRIX_DIMS.captures(type_name).ok_or_else(unparseable)?;
    let rows: usize = caps[1].parse().map_err(|_| unparseable())?;
    let cols: usize = caps[2].parse().map_err(|_| unparseable())?;
    if rows == 0 || cols == 0 {
        return Err(unparseable());
    }
    Ok((rows, cols))
}

impl Adapter {
    /// Build an adapter that needs no reflection.
    ///
    /// Returns `None` for kinds that must be built with
    /// [`Adapter::from_descriptor`].
    #[must_use]
    pub fn without_reflection(kind: AdapterKind, type_name: &str) -> Option<Self> {
        let type_name = type_name.to_string();
        match kind {
            AdapterKind::Passthrough => Some(Self::Passthrough { type_name }),
            AdapterKind::TensorView => Some(Self::TensorView { type_name }),
            _ => None,
        }
    }

    /// Build an adapter from reflected type info.
    ///
    /// `resolve` is called for nested element types and must return the id and
    /// kind of their (possibly cached) adapter.
    ///
    /// # Errors
    ///
    /// - `InvalidTypeInfo` when the reflected fields don't have the layout the
    ///   kind requires, or a vector's `data` field is not an array
    /// - `UnparseableTypeName` for matrix names without dimensions
    /// - anything `resolve` returns
    pub fn from_descriptor<F>(kind: AdapterKind, desc: &TypeDescriptor, mut resolve: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<(AdapterId, AdapterKind)>,
    {
        let type_name = desc.type_name().to_string();
        match kind {
            AdapterKind::DiffTensorView => {
                desc.expect_field_count(2)?;
                let grad_type = &desc.fields()[1].1;
                Ok(Self::DiffTensorView {
                    atomic: grad_type.starts_with(ATOMIC_GRAD_PREFIX),
                    type_name,
                })
            }
            AdapterKind::Array => {
                desc.expect_field_count(2)?;
                let element_type = desc.require_field("type")?;
                let size_text = desc.require_field("size")?;
                let size = size_text.trim().parse::<usize>().map_err(|_| {
                    MarshalError::invalid_type_info(
                        &type_name,
                        format!("array size `{size_text}` is not an integer"),
                    )
                })?;
                let (element, _) = resolve(element_type)?;
                Ok(Self::Array {
                    type_name,
                    element,
                    size,
                })
            }
            AdapterKind::Vector => {
                desc.expect_field_count(1)?;
                let array_type = desc.require_field("data")?;
                let (array, array_kind) = resolve(array_type)?;
                if array_kind != AdapterKind::Array {
                    return Err(MarshalError::invalid_type_info(
                        &type_name,
                        format!("`data` field type `{array_type}` is not an array"),
                    ));
                }
                Ok(Self::Vector { type_name, array })
            }
            AdapterKind::Matrix => {
                let (rows, cols) = parse_matrix_dims(&type_name)?;
                desc.expect_field_count(1)?;
                desc.require_field("data")?;
                Ok(Self::Matrix {
                    type_name,
                    rows,
                    cols,
                })
            }
            AdapterKind::TensorView | AdapterKind::Passthrough => {
                Ok(Self::without_reflection(kind, &type_name)
                    .unwrap_or(Self::Passthrough { type_name }))
            }
        }
    }

    /// Type name this adapter was resolved for.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::Passthrough { type_name }
            | Self::TensorView { type_name }
            | Self::DiffTensorView { type_name, .. }
            | Self::Array { type_name, .. }
            | Self::Vector { type_name, .. }
            | Self::Matrix { type_name, .. } => type_name,
        }
    }

    /// Kind of this adapter.
    #[must_use]
    pub fn kind(&self) -> AdapterKind {
        match self {
            Self::Passthrough { .. } => AdapterKind::Passthrough,
            Self::TensorView { .. } => AdapterKind::TensorView,
            Self::DiffTensorView { .. } => AdapterKind::DiffTensorView,
            Self::Array { .. } => AdapterKind::Array,
            Self::Vector { .. } => AdapterKind::Vector,
            Self::Matrix { .. } => AdapterKind::Matrix,
        }
    }

    /// Shape of this adapter's output.
    #[must_use]
    pub fn storage_shape(&self) -> StorageShape {
        match self {
            Self::DiffTensorView { atomic: true, .. } => StorageShape::DiffPair,
            Self::Array { .. } | Self::Vector { .. } | Self::Matrix { .. } => StorageShape::Tuple,
            Self::DiffTensorView { atomic: false, .. }
            | Self::Passthrough { .. }
            | Self::TensorView { .. } => StorageShape::Passthrough,
        }
    }

    /// Convert `value` to this adapter's canonical storage value.
    ///
    /// `arena` is the adapter arena that element ids index into. Tensor view
    /// errors name the type; use [`Adapter::convert_arg`] to name the kernel
    /// argument instead.
    ///
    /// # Errors
    ///
    /// - `UnsupportedShape` for values of the wrong container kind or arity,
    ///   and for tensors a kernel tensor view cannot describe
    /// - `LengthMismatch` for arrays of the wrong length
    /// - `Candle` if allocating a gradient buffer fails
    pub fn convert(&self, value: &Value, arena: &[Adapter]) -> Result<Value> {
        self.convert_arg(self.type_name(), value, arena)
    }

    /// Like [`Adapter::convert`], reporting tensor view errors against the
    /// argument called `arg`.
    ///
    /// # Errors
    ///
    /// As [`Adapter::convert`].
    pub fn convert_arg(&self, arg: &str, value: &Value, arena: &[Adapter]) -> Result<Value> {
        match self {
            Self::Passthrough { .. } => Ok(value.clone()),
            Self::TensorView { type_name } => convert_tensor_view(type_name, arg, value),
            Self::DiffTensorView { type_name, atomic } => {
                if *atomic {
                    convert_diff_view(type_name, arg, value)
                } else {
                    Ok(value.clone())
                }
            }
            Self::Array {
                type_name,
                element,
                size,
            } => {
                let items = match value {
                    Value::Tuple(items) | Value::List(items) => items,
                    other => {
                        return Err(MarshalError::unsupported_shape(
                            type_name,
                            "tuple or list",
                            other.kind(),
                        ))
                    }
                };
                if items.len() != *size {
                    return Err(MarshalError::length_mismatch(type_name, *size, items.len()));
                }
                let element = &arena[element.0];
                items
                    .iter()
                    .map(|item| element.convert_arg(arg, item, arena))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Tuple)
            }
            Self::Vector { array, .. } => {
                let inner = arena[array.0].convert_arg(arg, value, arena)?;
                Ok(Value::Tuple(vec![inner]))
            }
            Self::Matrix {
                type_name,
                rows,
                cols,
            } => convert_matrix(type_name, *rows, *cols, value),
        }
    }
}

fn convert_tensor_view(type_name: &str, arg: &str, value: &Value) -> Result<Value> {
    let tensor = value
        .as_tensor()
        .ok_or_else(|| MarshalError::unsupported_shape(type_name, "tensor", value.kind()))?;
    TensorViewDesc::from_tensor(arg, tensor)?;
    Ok(value.clone())
}

/// Both halves of a differentiable view are tensor views in the kernel layout.
fn diff_pair(arg: &str, primal: &Tensor, grad: &Tensor) -> Result<Value> {
    TensorViewDesc::from_tensor(arg, primal)?;
    TensorViewDesc::from_tensor(arg, grad)?;
    Ok(Value::Tuple(vec![
        Value::Tensor(primal.clone()),
        Value::Tuple(vec![Value::Tensor(grad.clone())]),
    ]))
}

/// One-element zero gradient buffer next to `primal`.
fn fresh_grad(primal: &Tensor) -> Result<Tensor> {
    Ok(Tensor::zeros(1, primal.dtype(), primal.device())?)
}

fn convert_diff_view(type_name: &str, arg: &str, value: &Value) -> Result<Value> {
    const EXPECTED: &str = "diff tensor view, tuple of length 1 or 2, or tensor";

    let tensor_at = |items: &[Value], i: usize| -> Result<Tensor> {
        items[i].as_tensor().cloned().ok_or_else(|| {
            MarshalError::unsupported_shape(type_name, "tensor in tuple", items[i].kind())
        })
    };

    match value {
        Value::DiffView(view) => diff_pair(arg, &view.value, &view.grad),
        Value::Tuple(items) => match items.as_slice() {
            // Already in canonical form.
            [Value::Tensor(primal), Value::Tuple(slot)] if matches!(slot.as_slice(), [Value::Tensor(_)]) => {
                diff_pair(arg, primal, &tensor_at(slot, 0)?)
            }
            [_] => {
                let primal = tensor_at(items, 0)?;
                let grad = fresh_grad(&primal)?;
                diff_pair(arg, &primal, &grad)
            }
            [_, _] => diff_pair(arg, &tensor_at(items, 0)?, &tensor_at(items, 1)?),
            _ => Err(MarshalError::unsupported_shape(type_name, EXPECTED, value.kind())),
        },
        Value::Tensor(primal) => {
            let grad = fresh_grad(primal)?;
            diff_pair(arg, primal, &grad)
        }
        other => Err(MarshalError::unsupported_shape(type_name, EXPECTED, other.kind())),
    }
}

fn convert_matrix(type_name: &str, rows: usize, cols: usize, value: &Value) -> Result<Value> {
    let row_values = value
        .as_tuple()
        .ok_or_else(|| MarshalError::unsupported_shape(type_name, "tuple of row tuples", value.kind()))?;

    let mut flat = Vec::new();
    for row in row_values {
        let cells = row.as_tuple().ok_or_else(|| {
            MarshalError::unsupported_shape(type_name, "tuple of row tuples", format!("row {}", row.kind()))
        })?;
        if cells.len() != cols {
            return Err(MarshalError::unsupported_shape(
                type_name,
                format!("rows of length {cols}"),
                format!("row of length {}", cells.len()),
            ));
        }
        flat.extend(cells.iter().cloned());
    }

    if row_values.len() != rows {
        tracing::warn!(
            target: "slang_marshal::adapter",
            type_name,
            declared_rows = rows,
            actual_rows = row_values.len(),
            "Matrix row count differs from declared dimensions; passing through"
        );
    }

    Ok(Value::Tuple(vec![Value::Tuple(flat)]))
}
