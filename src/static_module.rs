// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! In-memory module for hosts that carry reflection data themselves.
//!
//! [`StaticModule`] implements [`ShaderModule`] from tables built up front:
//! reflection accessors keyed by type name and kernel objects keyed by name.
//! It counts reflection queries, which makes cache behaviour observable.
//!
//! [`RecordingKernel`] is a kernel that validates nothing and records every
//! launch; pair it with a `StaticModule` for dry runs of the marshalling path.

use crate::config::LaunchDims;
use crate::error::{MarshalError, Result};
use crate::reflection::{accessor_name, TypeInfo};
use crate::traits::{Kernel, KernelArgs, KernelParam, Pass, ShaderModule};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// A module backed by in-memory reflection and kernel tables.
pub struct StaticModule {
    name: String,
    type_infos: HashMap<String, TypeInfo>,
    kernels: HashMap<String, Box<dyn Kernel + Send + Sync>>,
    queries: AtomicUsize,
}

impl StaticModule {
    /// Start building a module called `name`.
    pub fn builder(name: impl Into<String>) -> StaticModuleBuilder {
        StaticModuleBuilder {
            module: Self {
                name: name.into(),
                type_infos: HashMap::new(),
                kernels: HashMap::new(),
                queries: AtomicUsize::new(0),
            },
        }
    }

    /// Number of reflection accessor calls made so far, including misses.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

impl ShaderModule for StaticModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn type_info(&self, accessor: &str) -> Option<TypeInfo> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        self.type_infos.get(accessor).cloned()
    }

    fn kernel(&self, name: &str) -> Option<&dyn Kernel> {
        self.kernels.get(name).map(|k| k.as_ref() as &dyn Kernel)
    }
}

/// Builder for [`StaticModule`].
pub struct StaticModuleBuilder {
    module: StaticModule,
}

impl StaticModuleBuilder {
    /// Register reflection for `type_name` as `(field, field type)` pairs.
    #[must_use]
    pub fn type_info<I, N, T>(self, type_name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        self.raw_type_info(type_name, TypeInfo::from_fields(fields))
    }

    /// Register reflection for `type_name` as returned by an accessor.
    #[must_use]
    pub fn raw_type_info(mut self, type_name: &str, info: TypeInfo) -> Self {
        self.module.type_infos.insert(accessor_name(type_name), info);
        self
    }

    /// Register a kernel under its own name.
    #[must_use]
    pub fn kernel<K: Kernel + Send + Sync + 'static>(mut self, kernel: K) -> Self {
        self.module
            .kernels
            .insert(kernel.name().to_string(), Box::new(kernel));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> StaticModule {
        self.module
    }
}

/// One launch observed by a [`RecordingKernel`].
#[derive(Debug, Clone)]
pub struct LaunchRecord {
    /// Forward or backward.
    pub pass: Pass,
    /// Arguments after marshalling.
    pub args: KernelArgs,
    /// Launch dimensions.
    pub dims: LaunchDims,
}

/// A kernel that records launches instead of executing them.
pub struct RecordingKernel {
    name: String,
    params: Vec<KernelParam>,
    launches: Mutex<Vec<LaunchRecord>>,
    fail_with: Option<String>,
}

impl RecordingKernel {
    /// Kernel `name` with the given `(parameter, type name)` list.
    pub fn new<I, N, T>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            name: name.into(),
            params: params
                .into_iter()
                .map(|(n, t)| KernelParam::new(n, t))
                .collect(),
            launches: Mutex::new(Vec::new()),
            fail_with: None,
        }
    }

    /// Make every launch fail with `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Launches recorded so far.
    pub fn launches(&self) -> Vec<LaunchRecord> {
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Kernel for RecordingKernel {
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[KernelParam] {
        &self.params
    }

    fn launch(&self, pass: Pass, args: &KernelArgs, dims: LaunchDims) -> Result<()> {
        if let Some(message) = &self.fail_with {
            return Err(MarshalError::kernel(message.clone()));
        }
        self.launches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LaunchRecord {
                pass,
                args: args.clone(),
                dims,
            });
        Ok(())
    }
}
