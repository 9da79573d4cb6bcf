// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Host-side description of a tensor handed to a kernel.
//!
//! Kernels address tensors through a fixed-size view: a data pointer plus
//! per-dimension sizes and byte strides for at most [`MAX_TENSOR_RANK`]
//! dimensions. [`TensorViewDesc`] computes the sizes and strides from a Candle
//! tensor and rejects tensors the view cannot describe.

use crate::error::{MarshalError, Result};
use candle_core::{DType, Tensor};

/// Maximum number of dimensions a kernel tensor view can describe.
pub const MAX_TENSOR_RANK: usize = 5;

/// Sizes and byte strides of a tensor as a kernel sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorViewDesc {
    /// Element type.
    pub dtype: DType,
    /// Extent of each dimension.
    pub sizes: Vec<u32>,
    /// Distance in bytes between consecutive indices of each dimension.
    pub strides: Vec<u32>,
}

impl TensorViewDesc {
    /// Describe `tensor`, passed as the argument called `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedShape` if the tensor has more than
    /// [`MAX_TENSOR_RANK`] dimensions or an extent/stride beyond 32 bits.
    pub fn from_tensor(name: &str, tensor: &Tensor) -> Result<Self> {
        let rank = tensor.rank();
        if rank > MAX_TENSOR_RANK {
            return Err(MarshalError::unsupported_shape(
                name,
                format!("tensor of at most {MAX_TENSOR_RANK} dimensions"),
                format!("{rank} dimensions"),
            ));
        }

        let elem_size = tensor.dtype().size_in_bytes();
        let to_u32 = |x: usize| {
            u32::try_from(x).map_err(|_| {
                MarshalError::unsupported_shape(name, "32-bit sizes and strides", x.to_string())
            })
        };

        let sizes = tensor
            .dims()
            .iter()
            .map(|&d| to_u32(d))
            .collect::<Result<Vec<_>>>()?;
        let strides = tensor
            .stride()
            .iter()
            .map(|&s| to_u32(s * elem_size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dtype: tensor.dtype(),
            sizes,
            strides,
        })
    }

    /// Number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.sizes.len()
    }
}
