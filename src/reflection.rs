// SPDX-License-Identifier: MIT
// Copyright 2026 Tyler Zervas

//! Type-info queries against a compiled module.
//!
//! For every composite type a module can marshal, the compiler emits a
//! reflection accessor named `__typeinfo__<TypeName>` returning the type's
//! field names and field type names. [`query_type_info`] calls that accessor
//! and checks the two lists line up.
//!
//! Integer-valued metadata (array sizes) is encoded in the field *type* slot as
//! a decimal string, so `Array_float_4` reflects as
//! `[("type", "float"), ("size", "4")]`.

use crate::error::{MarshalError, Result};
use crate::traits::ShaderModule;

/// Prefix of reflection accessor names.
pub const TYPE_INFO_PREFIX: &str = "__typeinfo__";

/// Raw output of a reflection accessor: parallel name and type-name lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    /// Field names, in declaration order.
    pub field_names: Vec<String>,
    /// Field type names, parallel to `field_names`.
    pub field_type_names: Vec<String>,
}

impl TypeInfo {
    /// Build type info from `(field name, field type name)` pairs.
    pub fn from_fields<I, N, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        let (field_names, field_type_names) = fields
            .into_iter()
            .map(|(n, t)| (n.into(), t.into()))
            .unzip();
        Self {
            field_names,
            field_type_names,
        }
    }
}

/// A reflected type: its name and ordered `(field, field type)` pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    type_name: String,
    fields: Vec<(String, String)>,
}

impl TypeDescriptor {
    /// Name of the described type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Fields as `(name, type name)` pairs.
    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    /// Type name of the field called `name`.
    #[must_use]
    pub fn field_type(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    /// Type name of the field called `name`, or an `InvalidTypeInfo` error.
    ///
    /// # Errors
    ///
    /// Fails when the type has no such field.
    pub fn require_field(&self, name: &str) -> Result<&str> {
        self.field_type(name).ok_or_else(|| {
            MarshalError::invalid_type_info(&self.type_name, format!("missing field `{name}`"))
        })
    }

    /// Check the type has exactly `count` fields.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidTypeInfo` when the field count differs.
    pub fn expect_field_count(&self, count: usize) -> Result<()> {
        if self.fields.len() == count {
            Ok(())
        } else {
            Err(MarshalError::invalid_type_info(
                &self.type_name,
                format!("expected {count} fields, found {}", self.fields.len()),
            ))
        }
    }
}

/// Accessor name for a type: `__typeinfo__` followed by the type name.
#[must_use]
pub fn accessor_name(type_name: &str) -> String {
    format!("{TYPE_INFO_PREFIX}{type_name}")
}

/// Query reflected fields for `type_name` from `module`.
///
/// # Errors
///
/// - `MissingTypeInfo` if the module exposes no accessor for the type
/// - `InvalidTypeInfo` if the accessor returns name and type lists of
///   different lengths
pub fn query_type_info<M: ShaderModule + ?Sized>(
    module: &M,
    type_name: &str,
) -> Result<TypeDescriptor> {
    let accessor = accessor_name(type_name);
    let info = module
        .type_info(&accessor)
        .ok_or_else(|| MarshalError::missing_type_info(type_name, &accessor))?;

    if info.field_names.len() != info.field_type_names.len() {
        return Err(MarshalError::invalid_type_info(
            type_name,
            format!(
                "{} field names but {} field types",
                info.field_names.len(),
                info.field_type_names.len()
            ),
        ));
    }

    tracing::trace!(
        target: "slang_marshal::reflection",
        module = module.name(),
        type_name,
        fields = info.field_names.len(),
        "Queried type info"
    );

    Ok(TypeDescriptor {
        type_name: type_name.to_string(),
        fields: info
            .field_names
            .into_iter()
            .zip(info.field_type_names)
            .collect(),
    })
}
