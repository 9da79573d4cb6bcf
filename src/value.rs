// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Host-side values passed to kernels.
//!
//! Callers hand kernels a loose mix of tensors, tuples, lists and scalars.
//! [`Value`] is the common currency: adapters take a `Value` in whatever shape
//! the caller chose and return a `Value` in the canonical shape the compiled
//! kernel expects.
//!
//! Tensors compare by identity (`TensorId`), not contents. Marshalling never
//! copies a buffer, so identity is what tells a caller that the kernel will
//! write into the tensor they passed.

use candle_core::Tensor;
use std::fmt;

/// A primal tensor paired with the buffer its gradient accumulates into.
#[derive(Debug, Clone)]
pub struct DiffTensorView {
    /// Primal values.
    pub value: Tensor,
    /// Gradient accumulation buffer.
    pub grad: Tensor,
}

impl DiffTensorView {
    /// Pair a primal tensor with an existing gradient buffer.
    pub fn new(value: Tensor, grad: Tensor) -> Self {
        Self { value, grad }
    }

    /// Pair a primal tensor with a zero-filled gradient buffer of the same
    /// shape, dtype and device.
    ///
    /// # Errors
    ///
    /// Returns the Candle error if the allocation fails.
    pub fn with_zero_grad(value: Tensor) -> crate::Result<Self> {
        let grad = value.zeros_like()?;
        Ok(Self { value, grad })
    }
}

impl PartialEq for DiffTensorView {
    fn eq(&self, other: &Self) -> bool {
        self.value.id() == other.value.id() && self.grad.id() == other.grad.id()
    }
}

/// A host value in any of the shapes accepted at the kernel boundary.
#[derive(Debug, Clone)]
pub enum Value {
    /// A tensor buffer.
    Tensor(Tensor),
    /// A differentiable view (primal + gradient buffer).
    DiffView(DiffTensorView),
    /// An ordered, fixed-size tuple.
    Tuple(Vec<Value>),
    /// A list; adapters normalize these to tuples.
    List(Vec<Value>),
    /// Floating point scalar.
    Float(f64),
    /// Integer scalar.
    Int(i64),
    /// Boolean scalar.
    Bool(bool),
}

impl Value {
    /// Build a tuple from anything yielding values.
    pub fn tuple<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::Tuple(items.into_iter().map(Into::into).collect())
    }

    /// Build a list from anything yielding values.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the value's shape, used in error messages.
    #[must_use]
    pub fn kind(&self) -> String {
        match self {
            Self::Tensor(t) => format!("tensor{:?}", t.dims()),
            Self::DiffView(_) => "diff tensor view".to_string(),
            Self::Tuple(items) => format!("tuple of length {}", items.len()),
            Self::List(items) => format!("list of length {}", items.len()),
            Self::Float(_) => "float".to_string(),
            Self::Int(_) => "int".to_string(),
            Self::Bool(_) => "bool".to_string(),
        }
    }

    /// The tensor, if this is one.
    #[must_use]
    pub fn as_tensor(&self) -> Option<&Tensor> {
        match self {
            Self::Tensor(t) => Some(t),
            _ => None,
        }
    }

    /// The tuple elements, if this is a tuple.
    #[must_use]
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Tensor(a), Self::Tensor(b)) => a.id() == b.id(),
            (Self::DiffView(a), Self::DiffView(b)) => a == b,
            (Self::Tuple(a), Self::Tuple(b)) | (Self::List(a), Self::List(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Value], open: &str, close: &str) -> fmt::Result {
            f.write_str(open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            if open == "(" && items.len() == 1 {
                f.write_str(",")?;
            }
            f.write_str(close)
        }

        match self {
            Self::Tensor(t) => write!(f, "Tensor{:?}", t.dims()),
            Self::DiffView(v) => write!(f, "DiffTensorView({:?}, {:?})", v.value.dims(), v.grad.dims()),
            Self::Tuple(items) => seq(f, items, "(", ")"),
            Self::List(items) => seq(f, items, "[", "]"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Int(x) => write!(f, "{x}"),
            Self::Bool(x) => write!(f, "{x}"),
        }
    }
}

impl From<Tensor> for Value {
    fn from(t: Tensor) -> Self {
        Self::Tensor(t)
    }
}

impl From<DiffTensorView> for Value {
    fn from(v: DiffTensorView) -> Self {
        Self::DiffView(v)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Self::Int(x)
    }
}

impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Self::Int(i64::from(x))
    }
}

impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Self::Bool(x)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::List(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn test_tensor_equality_is_identity() {
        let a = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();
        let b = Tensor::zeros(3, DType::F32, &Device::Cpu).unwrap();

        assert_eq!(Value::from(a.clone()), Value::from(a.clone()));
        assert_ne!(Value::from(a), Value::from(b));
    }

    #[test]
    fn test_tuple_and_list_are_distinct() {
        let tuple = Value::tuple([1, 2]);
        let list = Value::list([1, 2]);
        assert_ne!(tuple, list);
        assert_eq!(tuple, Value::tuple([1i64, 2]));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::tuple([1.5f64]).to_string(), "(1.5,)");
        assert_eq!(Value::list([1, 2, 3]).to_string(), "[1, 2, 3]");
        assert_eq!(
            Value::tuple([Value::tuple([1, 2]), Value::Bool(true)]).to_string(),
            "((1, 2), true)"
        );
    }

    #[test]
    fn test_with_zero_grad_matches_primal() {
        let primal = Tensor::ones((2, 3), DType::F32, &Device::Cpu).unwrap();
        let view = DiffTensorView::with_zero_grad(primal.clone()).unwrap();
        assert_eq!(view.grad.dims(), primal.dims());
        assert_eq!(view.grad.dtype(), DType::F32);
        assert_eq!(view.grad.sum_all().unwrap().to_scalar::<f32>().unwrap(), 0.0);
    }
}
