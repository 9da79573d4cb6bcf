// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Kernel launch configuration.
//!
//! Differentiable kernel calls use a one-dimensional launch: a fixed number of
//! threads per group along `x`, and enough groups to cover every element. With
//! the default width of 1024 and `n` elements that is
//! `block = (1 + n / 1024, 1, 1)` and `grid = (1024, 1, 1)`.
//!
//! The launch convention names the group count `block` and the per-group
//! thread count `grid`; [`LaunchDims`] keeps those names so that values line up
//! with what kernel backends log.
//!
//! ## Environment Variables
//!
//! - `SLANG_MARSHAL_THREADS_PER_BLOCK` - override the launch width

use crate::error::{MarshalError, Result};
use crate::traits::ValidatableConfig;

/// Default number of threads along `x` in one launch group.
pub const DEFAULT_THREADS_PER_BLOCK: u32 = 1024;

/// Largest launch width accepted by the supported backends.
pub const MAX_THREADS_PER_BLOCK: u32 = 1024;

/// Raw launch dimensions handed to a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDims {
    /// Number of launch groups in x, y, z.
    pub block: (u32, u32, u32),
    /// Threads per group in x, y, z.
    pub grid: (u32, u32, u32),
}

/// Launch configuration for differentiable kernel calls.
#[derive(Debug, Clone)]
pub struct LaunchConfig {
    /// Threads per launch group along `x`.
    pub threads_per_block: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            threads_per_block: DEFAULT_THREADS_PER_BLOCK,
        }
    }
}

impl LaunchConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set threads per launch group.
    #[must_use]
    pub fn with_threads_per_block(mut self, threads: u32) -> Self {
        self.threads_per_block = threads;
        self
    }

    /// Build configuration from environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SLANG_MARSHAL_THREADS_PER_BLOCK") {
            match val.parse::<u32>() {
                Ok(threads) => config.threads_per_block = threads,
                Err(_) => tracing::warn!(
                    "ignoring SLANG_MARSHAL_THREADS_PER_BLOCK={val:?}: not an unsigned integer"
                ),
            }
        }

        config
    }

    /// Launch dimensions covering `elements` work items.
    ///
    /// Always launches at least one group, and one extra group when `elements`
    /// is an exact multiple of the width.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration fails validation or the
    /// group count doesn't fit the launch's 32-bit dimension.
    pub fn launch_dims(&self, elements: usize) -> Result<LaunchDims> {
        self.validate()?;
        let groups = 1 + elements / self.threads_per_block as usize;
        let groups = u32::try_from(groups).map_err(|_| {
            MarshalError::invalid_config(format!("{elements} elements exceed the launch limit"))
        })?;

        Ok(LaunchDims {
            block: (groups, 1, 1),
            grid: (self.threads_per_block, 1, 1),
        })
    }
}

impl ValidatableConfig for LaunchConfig {
    fn validate(&self) -> Result<()> {
        if self.threads_per_block == 0 {
            return Err(MarshalError::invalid_config(
                "threads_per_block must be greater than 0",
            ));
        }
        if self.threads_per_block > MAX_THREADS_PER_BLOCK {
            return Err(MarshalError::invalid_config(format!(
                "threads_per_block must be at most {MAX_THREADS_PER_BLOCK}, got {}",
                self.threads_per_block
            )));
        }
        Ok(())
    }
}
