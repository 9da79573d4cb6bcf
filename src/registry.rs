// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Pattern table mapping reflected type names to adapter kinds.
//!
//! The compiler lowers composite types to storage structs with predictable
//! names (`Array_float_4`, `_VectorStorage_float_3`, `_MatrixStorage_2x3`).
//! The registry matches those names against string patterns once, at
//! resolution time, and hands back a closed [`AdapterKind`]. Conversion never
//! looks at patterns again.
//!
//! Patterns are one of:
//!
//! - an exact name: `DiffTensorView`
//! - a prefix wildcard: `Array_*` matches any name starting with `Array_`
//! - a suffix wildcard: `*_t` matches any name ending with `_t`
//!
//! The first registered match wins.

use crate::adapter::AdapterKind;
use crate::error::{MarshalError, Result};
use std::fmt;

/// Scalar type names that pass through unconverted.
pub const SCALAR_TYPE_NAMES: &[&str] = &[
    "bool", "half", "float", "double", "int", "uint", "int8_t", "uint8_t", "int16_t", "uint16_t",
    "int32_t", "uint32_t", "int64_t", "uint64_t",
];

/// A structural type-name pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypePattern {
    /// Matches one literal name.
    Exact(String),
    /// Matches names starting with the prefix.
    Prefix(String),
    /// Matches names ending with the suffix.
    Suffix(String),
}

impl TypePattern {
    /// Parse `Name`, `Prefix*` or `*Suffix`.
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        if let Some(prefix) = pattern.strip_suffix('*') {
            Self::Prefix(prefix.to_string())
        } else if let Some(suffix) = pattern.strip_prefix('*') {
            Self::Suffix(suffix.to_string())
        } else {
            Self::Exact(pattern.to_string())
        }
    }

    /// Whether `type_name` matches this pattern.
    #[must_use]
    pub fn matches(&self, type_name: &str) -> bool {
        match self {
            Self::Exact(name) => type_name == name,
            Self::Prefix(prefix) => type_name.starts_with(prefix.as_str()),
            Self::Suffix(suffix) => type_name.ends_with(suffix.as_str()),
        }
    }
}

impl fmt::Display for TypePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => f.write_str(name),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
            Self::Suffix(suffix) => write!(f, "*{suffix}"),
        }
    }
}

/// Ordered table of `(pattern, adapter kind)` pairs.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<(TypePattern, AdapterKind)>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("DiffTensorView", AdapterKind::DiffTensorView)
            .register("Array_*", AdapterKind::Array)
            .register("_VectorStorage_*", AdapterKind::Vector)
            .register("_MatrixStorage_*", AdapterKind::Matrix)
            .register("TensorView*", AdapterKind::TensorView);
        for name in SCALAR_TYPE_NAMES {
            registry.register(name, AdapterKind::Passthrough);
        }
        registry
    }
}

impl Registry {
    /// Registry with the built-in patterns.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no patterns at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a pattern. Earlier registrations take precedence.
    pub fn register(&mut self, pattern: &str, kind: AdapterKind) -> &mut Self {
        self.entries.push((TypePattern::parse(pattern), kind));
        self
    }

    /// Kind of adapter for `type_name`.
    ///
    /// # Errors
    ///
    /// Returns `NoAdapterFound` when no pattern matches.
    pub fn lookup(&self, type_name: &str) -> Result<AdapterKind> {
        self.entries
            .iter()
            .find(|(pattern, _)| pattern.matches(type_name))
            .map(|(_, kind)| *kind)
            .ok_or_else(|| MarshalError::NoAdapterFound(type_name.to_string()))
    }

    /// Registered patterns, in precedence order.
    pub fn patterns(&self) -> impl Iterator<Item = (&TypePattern, AdapterKind)> {
        self.entries.iter().map(|(p, k)| (p, *k))
    }
}
