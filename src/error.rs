// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Error types for kernel argument marshalling.
//!
//! Every failure here is a mismatch between what the host passed and what the
//! compiled kernel declares. None of them are transient, so nothing in the
//! crate retries or recovers: errors propagate straight to the caller and the
//! surrounding forward/backward call is aborted.
//!
//! ## Error Hierarchy
//!
//! ```text
//! MarshalError
//! ├── MissingTypeInfo      - Module exposes no `__typeinfo__<name>` accessor
//! ├── InvalidTypeInfo      - Reflected fields don't have the layout an adapter needs
//! ├── UnsupportedShape     - Host value has the wrong container kind or tuple arity
//! ├── LengthMismatch       - Sequence length disagrees with the declared size
//! ├── UnparseableTypeName  - No `RxC` dimensions in a matrix type name
//! ├── NoAdapterFound       - No registered pattern matches a type name
//! ├── KernelNotFound       - Module has no entry point with the requested name
//! ├── MissingArgument      - Kernel parameter with no value supplied
//! ├── InvalidConfig        - Configuration validation failures
//! ├── Kernel               - Kernel launch failure reported by the backend
//! └── Candle               - Underlying Candle errors
//! ```

use thiserror::Error;

/// Result type alias for marshalling operations.
pub type Result<T> = std::result::Result<T, MarshalError>;

/// Errors raised while resolving adapters, converting values or launching kernels.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MarshalError {
    /// The module has no reflection accessor for the type.
    ///
    /// Signals that the host and the compiled kernel disagree about which
    /// types exist.
    #[error("missing type info for `{type_name}` (no accessor `{accessor}`)")]
    MissingTypeInfo {
        /// Type that was looked up.
        type_name: String,
        /// Accessor name that was expected on the module.
        accessor: String,
    },

    /// Reflected fields exist but don't describe the layout the adapter expects.
    #[error("invalid type info for `{type_name}`: {reason}")]
    InvalidTypeInfo {
        /// Type whose reflection was rejected.
        type_name: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The host value's runtime shape doesn't match the adapter.
    #[error("unsupported shape for `{type_name}`: expected {expected}, got {actual}")]
    UnsupportedShape {
        /// Type being marshalled.
        type_name: String,
        /// Accepted shapes.
        expected: String,
        /// Description of the value received.
        actual: String,
    },

    /// A sequence has a different length than the reflected declared size.
    #[error("length mismatch for `{type_name}`: expected {expected} elements, got {actual}")]
    LengthMismatch {
        /// Type being marshalled.
        type_name: String,
        /// Declared length.
        expected: usize,
        /// Length of the host value.
        actual: usize,
    },

    /// A matrix type name carries no `RxC` dimension pattern.
    #[error("could not parse matrix dimensions from type name `{0}`")]
    UnparseableTypeName(String),

    /// No registered pattern matches the type name.
    #[error("no adapter found for type `{0}`")]
    NoAdapterFound(String),

    /// The module has no kernel with this name.
    #[error("kernel `{kernel}` not found in module `{module}`")]
    KernelNotFound {
        /// Module that was searched.
        module: String,
        /// Kernel entry point requested.
        kernel: String,
    },

    /// A kernel parameter was not supplied by the caller.
    #[error("kernel `{kernel}` is missing argument `{param}`")]
    MissingArgument {
        /// Kernel being invoked.
        kernel: String,
        /// Parameter with no value.
        param: String,
    },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kernel launch or execution failure reported by the backend.
    #[error("kernel error: {message}")]
    Kernel {
        /// Descriptive error message.
        message: String,
    },

    /// Underlying Candle error.
    #[error("candle error: {0}")]
    Candle(#[from] candle_core::Error),
}

impl MarshalError {
    /// Create a missing type info error for `type_name`.
    pub fn missing_type_info(type_name: impl Into<String>, accessor: impl Into<String>) -> Self {
        Self::MissingTypeInfo {
            type_name: type_name.into(),
            accessor: accessor.into(),
        }
    }

    /// Create an invalid type info error.
    pub fn invalid_type_info(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTypeInfo {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported shape error.
    pub fn unsupported_shape(
        type_name: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnsupportedShape {
            type_name: type_name.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a length mismatch error.
    pub fn length_mismatch(type_name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::LengthMismatch {
            type_name: type_name.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a kernel error.
    pub fn kernel(msg: impl Into<String>) -> Self {
        Self::Kernel {
            message: msg.into(),
        }
    }
}
