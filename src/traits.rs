// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Seams between this crate and the shader compiler.
//!
//! The compiler, its reflection machinery and the kernel execution model live
//! outside this crate. They are consumed through two traits:
//!
//! - [`ShaderModule`] - a compiled module: per-type reflection accessors and
//!   kernel lookup
//! - [`Kernel`] - a compiled entry point with reflected parameters and a raw
//!   launch call for the forward and backward passes
//!
//! [`ValidatableConfig`] is the shared validation interface for configuration
//! structs.

use crate::config::LaunchDims;
use crate::error::Result;
use crate::reflection::TypeInfo;
use crate::value::Value;
use std::sync::Arc;

/// Configuration validation trait.
///
/// # Example
///
/// ```rust
/// use slang_marshal::{MarshalError, Result, ValidatableConfig};
///
/// #[derive(Clone)]
/// struct CurveFitConfig {
///     control_points: usize,
/// }
///
/// impl ValidatableConfig for CurveFitConfig {
///     fn validate(&self) -> Result<()> {
///         if self.control_points < 2 {
///             return Err(MarshalError::invalid_config("need at least 2 control points"));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ValidatableConfig: Clone + Send + Sync {
    /// Validate the configuration parameters.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError::InvalidConfig` if validation fails.
    fn validate(&self) -> Result<()>;
}

/// A compiled shader module as seen by the host.
pub trait ShaderModule {
    /// Module name, used in logs and errors.
    fn name(&self) -> &str;

    /// Invoke the reflection accessor called `accessor`.
    ///
    /// Returns `None` when the module exposes no accessor by that name.
    /// Accessor names follow the `__typeinfo__<TypeName>` convention; see
    /// [`crate::reflection::accessor_name`].
    fn type_info(&self, accessor: &str) -> Option<TypeInfo>;

    /// Look up a compiled kernel entry point.
    fn kernel(&self, name: &str) -> Option<&dyn Kernel>;
}

/// Which variant of a kernel entry point to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Primal evaluation.
    Forward,
    /// Reverse-mode derivative. Every parameter is a `(primal, gradient)` pair.
    Backward,
}

/// A reflected kernel parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelParam {
    /// Parameter name, matched against argument names.
    pub name: String,
    /// Reflected type name, resolved through the adapter registry.
    pub type_name: String,
}

impl KernelParam {
    /// Create a parameter description.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// Named arguments in the order the kernel declares its parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KernelArgs {
    entries: Vec<(String, Value)>,
}

impl KernelArgs {
    /// Create an empty argument list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named argument.
    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.entries.push((name.into(), value));
    }

    /// Look an argument up by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Iterate arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Value)> for KernelArgs {
    fn from_iter<I: IntoIterator<Item = (N, Value)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(n, v)| (n.into(), v)).collect(),
        }
    }
}

/// A compiled kernel entry point.
///
/// Arguments reaching [`Kernel::launch`] have already been converted to the
/// canonical layout of each parameter's reflected type.
pub trait Kernel {
    /// Kernel name.
    fn name(&self) -> &str;

    /// Reflected parameters, in declaration order.
    fn params(&self) -> &[KernelParam];

    /// Launch the forward or backward variant.
    ///
    /// # Errors
    ///
    /// Returns `MarshalError::Kernel` if the backend rejects the launch.
    fn launch(&self, pass: Pass, args: &KernelArgs, dims: LaunchDims) -> Result<()>;
}

impl<K: Kernel + ?Sized> Kernel for Arc<K> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn params(&self) -> &[KernelParam] {
        (**self).params()
    }

    fn launch(&self, pass: Pass, args: &KernelArgs, dims: LaunchDims) -> Result<()> {
        (**self).launch(pass, args, dims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarshalError;

    #[derive(Clone)]
    struct TestConfig {
        value: i32,
    }

    impl ValidatableConfig for TestConfig {
        fn validate(&self) -> Result<()> {
            if self.value < 0 {
                return Err(MarshalError::invalid_config("value must be non-negative"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_validatable_config() {
        assert!(TestConfig { value: 10 }.validate().is_ok());
        assert!(TestConfig { value: -1 }.validate().is_err());
    }

    #[test]
    fn test_kernel_args_keep_order() {
        let args: KernelArgs = [("t", Value::Int(1)), ("output", Value::Int(2))]
            .into_iter()
            .collect();

        let names: Vec<&str> = args.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["t", "output"]);
        assert_eq!(args.get("output"), Some(&Value::Int(2)));
        assert!(args.get("missing").is_none());
        assert_eq!(args.len(), 2);
    }
}
