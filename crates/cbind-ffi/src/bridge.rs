//! Binding descriptors for whole declarations.
//!
//! A [`BindingDescriptor`] carries everything a code emitter needs for one
//! foreign function: the host-side name, the rendered host return type and,
//! per parameter, the rendered host type and conversion expression.
//! Enum-typed values go through the enum tables; everything else goes
//! through the [`TypeKey`](crate::mapping::TypeKey) tables.

use serde::Serialize;

use crate::ctype::{CType, Kind, Position};
use crate::declaration::Declaration;
use crate::enums::{enum_conversion_for, enum_host_type_for};
use crate::error::Result;
use crate::mapping::{conversion_for, host_type_for, EnumTable, TypeTable};
use crate::naming::host_name;
use crate::overrides::OverrideLayer;

/// Ordered override tables for all four lookups, plus naming settings.
#[derive(Debug, Clone, Default)]
pub struct Mappings {
    pub types: Vec<TypeTable>,
    pub conversions: Vec<TypeTable>,
    pub enum_types: Vec<EnumTable>,
    pub enum_conversions: Vec<EnumTable>,
    /// Removed from the front of C names before they are lower-cased.
    pub strip_prefix: String,
}

impl Mappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefix = prefix.into();
        self
    }

    /// Append a layer; it is searched after every layer added before it.
    pub fn push_layer(&mut self, layer: OverrideLayer) {
        self.types.push(layer.types);
        self.conversions.push(layer.conversions);
        self.enum_types.push(layer.enum_types);
        self.enum_conversions.push(layer.enum_conversions);
    }

    pub fn from_layers(layers: impl IntoIterator<Item = OverrideLayer>) -> Self {
        let mut mappings = Self::new();
        for layer in layers {
            mappings.push_layer(layer);
        }
        mappings
    }

    /// Host type of a value named `name`.
    pub fn host_type(&self, ty: &CType, name: &str) -> Result<String> {
        if ty.kind() == Kind::Enum {
            enum_host_type_for(Some(ty), name, &self.enum_types)
        } else {
            host_type_for(Some(ty), name, &self.types)
        }
    }

    /// Conversion expression passing `name` as `ty`.
    pub fn conversion(&self, ty: &CType, name: &str) -> Result<String> {
        if ty.kind() == Kind::Enum {
            enum_conversion_for(Some(ty), name, &self.enum_conversions)
        } else {
            conversion_for(Some(ty), name, &self.conversions)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterBinding {
    /// Name as declared; empty for unnamed parameters.
    pub c_name: String,
    /// Name used in rendered templates; `argN` for unnamed parameters.
    pub name: String,
    pub c_type: String,
    pub host_type: String,
    pub conversion: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingDescriptor {
    pub c_name: String,
    pub host_name: String,
    pub position: Position,
    pub c_return_type: String,
    pub return_type: String,
    pub parameters: Vec<ParameterBinding>,
    pub variadic: bool,
}

/// Resolve every type of `decl` against `mappings`.
pub fn describe(decl: &Declaration, mappings: &Mappings) -> Result<BindingDescriptor> {
    let return_type = mappings.host_type(&decl.return_type, &decl.name)?;

    let parameters = decl
        .parameters
        .iter()
        .enumerate()
        .map(|(i, param)| {
            let name = if param.name.is_empty() {
                format!("arg{i}")
            } else {
                param.name.clone()
            };
            Ok(ParameterBinding {
                c_name: param.name.clone(),
                c_type: param.ty.to_string(),
                host_type: mappings.host_type(&param.ty, &name)?,
                conversion: mappings.conversion(&param.ty, &name)?,
                name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(BindingDescriptor {
        c_name: decl.name.clone(),
        host_name: host_name(&decl.name, &mappings.strip_prefix),
        position: decl.position.clone(),
        c_return_type: decl.return_type.to_string(),
        return_type,
        parameters,
        variadic: decl.variadic,
    })
}

/// Describe each declaration independently, one result per declaration.
pub fn describe_all(decls: &[Declaration], mappings: &Mappings) -> Vec<Result<BindingDescriptor>> {
    decls.iter().map(|decl| describe(decl, mappings)).collect()
}
