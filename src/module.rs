// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! A compiled module together with its resolved adapters.
//!
//! [`LoadedModule`] owns the adapter cache for one compiled module. Adapters
//! are resolved lazily: the first request for a type name looks up its
//! [`AdapterKind`] in the [`Registry`], queries reflection if the kind needs
//! it, recursively resolves element types, and stores the result in an arena.
//! Later requests for the same name return the cached [`AdapterId`] without
//! touching reflection again.
//!
//! The cache lives on the handle, so two modules loaded in one process never
//! share or collide on entries.
//!
//! ## Example
//!
//! ```rust
//! use slang_marshal::{LoadedModule, StaticModule, Value};
//!
//! let module = StaticModule::builder("bezier")
//!     .type_info("Array_float_4", [("type", "float"), ("size", "4")])
//!     .build();
//! let loaded = LoadedModule::new(module);
//!
//! let out = loaded.convert("Array_float_4", &Value::list([1.0, 2.0, 3.0, 4.0]))?;
//! assert_eq!(out, Value::tuple([1.0, 2.0, 3.0, 4.0]));
//! # Ok::<(), slang_marshal::MarshalError>(())
//! ```

use crate::adapter::{Adapter, AdapterId};
use crate::error::{MarshalError, Result};
use crate::reflection::query_type_info;
use crate::registry::Registry;
use crate::traits::{Kernel, KernelArgs, ShaderModule};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct AdapterArena {
    adapters: Vec<Adapter>,
    by_name: HashMap<String, AdapterId>,
}

impl AdapterArena {
    fn insert(&mut self, adapter: Adapter) -> AdapterId {
        let id = AdapterId(self.adapters.len());
        self.by_name.insert(adapter.type_name().to_string(), id);
        self.adapters.push(adapter);
        id
    }
}

/// A compiled module plus its lazily populated adapter cache.
pub struct LoadedModule<M> {
    module: M,
    registry: Arc<Registry>,
    arena: RwLock<AdapterArena>,
}

impl<M: ShaderModule> LoadedModule<M> {
    /// Wrap `module` using the built-in registry.
    pub fn new(module: M) -> Self {
        Self::with_registry(module, Arc::new(Registry::default()))
    }

    /// Wrap `module` using a custom registry.
    pub fn with_registry(module: M, registry: Arc<Registry>) -> Self {
        Self {
            module,
            registry,
            arena: RwLock::new(AdapterArena::default()),
        }
    }

    /// The wrapped module.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// The registry used for resolution.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of adapters resolved so far.
    pub fn cached_adapters(&self) -> usize {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .len()
    }

    /// Resolve the adapter for `type_name`, building it on first use.
    ///
    /// # Errors
    ///
    /// Returns `NoAdapterFound`, `MissingTypeInfo`, `InvalidTypeInfo` or
    /// `UnparseableTypeName` for this type or any type nested in it.
    pub fn resolve(&self, type_name: &str) -> Result<AdapterId> {
        {
            let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(&id) = arena.by_name.get(type_name) {
                return Ok(id);
            }
        }

        let mut arena = self.arena.write().unwrap_or_else(PoisonError::into_inner);
        let mut in_progress = Vec::new();
        self.resolve_into(&mut arena, type_name, &mut in_progress)
    }

    fn resolve_into(
        &self,
        arena: &mut AdapterArena,
        type_name: &str,
        in_progress: &mut Vec<String>,
    ) -> Result<AdapterId> {
        if let Some(&id) = arena.by_name.get(type_name) {
            return Ok(id);
        }
        if in_progress.iter().any(|t| t == type_name) {
            return Err(MarshalError::invalid_type_info(
                type_name,
                format!("type refers to itself through {}", in_progress.join(" -> ")),
            ));
        }

        let kind = self.registry.lookup(type_name)?;
        let adapter = match Adapter::without_reflection(kind, type_name) {
            Some(adapter) => adapter,
            None => {
                let desc = query_type_info(&self.module, type_name)?;
                in_progress.push(type_name.to_string());
                let built = Adapter::from_descriptor(kind, &desc, |element| {
                    let id = self.resolve_into(arena, element, in_progress)?;
                    Ok((id, arena.adapters[id.0].kind()))
                });
                in_progress.pop();
                built?
            }
        };

        tracing::debug!(
            target: "slang_marshal::registry",
            module = self.module.name(),
            type_name,
            kind = ?kind,
            "Resolved adapter"
        );

        Ok(arena.insert(adapter))
    }

    /// A copy of the adapter behind `id`.
    ///
    /// Returns `None` for ids from a different module.
    pub fn adapter(&self, id: AdapterId) -> Option<Adapter> {
        self.arena
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .adapters
            .get(id.0)
            .cloned()
    }

    /// Convert `value` with a previously resolved adapter.
    ///
    /// # Errors
    ///
    /// Returns `NoAdapterFound` for ids from a different module, otherwise any
    /// conversion error of the adapter.
    pub fn convert_with(&self, id: AdapterId, value: &Value) -> Result<Value> {
        self.convert_arg_with(id, None, value)
    }

    fn convert_arg_with(&self, id: AdapterId, arg: Option<&str>, value: &Value) -> Result<Value> {
        let arena = self.arena.read().unwrap_or_else(PoisonError::into_inner);
        let adapter = arena
            .adapters
            .get(id.0)
            .ok_or_else(|| MarshalError::NoAdapterFound(format!("adapter #{}", id.0)))?;
        adapter.convert_arg(arg.unwrap_or(adapter.type_name()), value, &arena.adapters)
    }

    /// Resolve the adapter for `type_name` and convert `value` with it.
    ///
    /// # Errors
    ///
    /// Any resolution or conversion error.
    pub fn convert(&self, type_name: &str, value: &Value) -> Result<Value> {
        let id = self.resolve(type_name)?;
        self.convert_with(id, value)
    }

    /// Look up a kernel entry point by name.
    ///
    /// # Errors
    ///
    /// Returns `KernelNotFound` if the module has no such kernel.
    pub fn kernel(&self, name: &str) -> Result<&dyn Kernel> {
        self.module
            .kernel(name)
            .ok_or_else(|| MarshalError::KernelNotFound {
                module: self.module.name().to_string(),
                kernel: name.to_string(),
            })
    }

    /// Convert named arguments to the layouts `kernel` declares.
    ///
    /// Output arguments follow the kernel's parameter order. Arguments with no
    /// matching parameter are ignored. Tensors that don't fit a kernel tensor
    /// view are reported by parameter name.
    ///
    /// # Errors
    ///
    /// Returns `MissingArgument` for parameters with no value, otherwise the
    /// first resolution or conversion error. No partial result is returned.
    pub fn marshal(&self, kernel: &dyn Kernel, args: &KernelArgs) -> Result<KernelArgs> {
        kernel
            .params()
            .iter()
            .map(|param| -> Result<(String, Value)> {
                let value = args.get(&param.name).ok_or_else(|| MarshalError::MissingArgument {
                    kernel: kernel.name().to_string(),
                    param: param.name.clone(),
                })?;
                let id = self.resolve(&param.type_name)?;
                let converted = self.convert_arg_with(id, Some(param.name.as_str()), value)?;
                Ok((param.name.clone(), converted))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterKind;
    use crate::static_module::StaticModule;

    fn module() -> StaticModule {
        StaticModule::builder("test")
            .type_info("Array_float_3", [("type", "float"), ("size", "3")])
            .type_info("_VectorStorage_float_3", [("data", "Array_float_3")])
            .type_info("Array_Loop_2", [("type", "Array_Loop_2"), ("size", "2")])
            .build()
    }

    #[test]
    fn test_resolve_is_cached() {
        let loaded = LoadedModule::new(module());

        let first = loaded.resolve("_VectorStorage_float_3").unwrap();
        let queries = loaded.module().query_count();
        let second = loaded.resolve("_VectorStorage_float_3").unwrap();

        assert_eq!(first, second);
        assert_eq!(loaded.module().query_count(), queries);
        // float, Array_float_3, _VectorStorage_float_3
        assert_eq!(loaded.cached_adapters(), 3);
        assert_eq!(
            loaded.adapter(first).map(|a| a.kind()),
            Some(AdapterKind::Vector)
        );
    }

    #[test]
    fn test_nested_element_shared() {
        let loaded = LoadedModule::new(module());
        let vector = loaded.resolve("_VectorStorage_float_3").unwrap();
        let array = loaded.resolve("Array_float_3").unwrap();

        match loaded.adapter(vector).unwrap() {
            Adapter::Vector { array: inner, .. } => assert_eq!(inner, array),
            other => panic!("expected vector adapter, got {other:?}"),
        }
    }

    #[test]
    fn test_self_referential_type_rejected() {
        let loaded = LoadedModule::new(module());
        let err = loaded.resolve("Array_Loop_2").unwrap_err();
        assert!(matches!(err, MarshalError::InvalidTypeInfo { .. }));
    }

    #[test]
    fn test_vector_data_must_be_array() {
        let module = StaticModule::builder("test")
            .type_info("_VectorStorage_float", [("data", "float")])
            .build();
        let loaded = LoadedModule::new(module);

        let err = loaded.resolve("_VectorStorage_float").unwrap_err();
        assert!(matches!(err, MarshalError::InvalidTypeInfo { .. }));
        assert!(err.to_string().contains("not an array"));
    }

    #[test]
    fn test_unknown_type() {
        let loaded = LoadedModule::new(module());
        assert!(matches!(
            loaded.resolve("Mystery"),
            Err(MarshalError::NoAdapterFound(_))
        ));
        assert!(matches!(
            loaded.resolve("Array_int_9"),
            Err(MarshalError::MissingTypeInfo { .. })
        ));
    }
}
