//! Enum resolution by tag.
//!
//! Enums are looked up by their declared name rather than their storage
//! kind. There is no built-in enum table: a tag is only ever found in the
//! caller's tables, and an enum without a tag cannot be found at all.

use crate::ctype::{CType, Kind};
use crate::error::{FfiError, MappingKey, Result};
use crate::mapping::{lookup, EnumTable, UNRESOLVED};

fn resolve(ty: Option<&CType>, name: &str, tables: &[EnumTable]) -> Result<String> {
    let Some(ty) = ty else {
        return Ok(UNRESOLVED.to_string());
    };
    if ty.kind() != Kind::Enum {
        return Err(FfiError::InvalidType {
            detail: format!("expected an enum, found '{ty}'"),
        });
    }
    let tag = ty.tag().unwrap_or_default();
    if tag.is_empty() {
        return Err(FfiError::UnresolvedTag {
            detail: format!("'{name}' has an anonymous enum type"),
        });
    }
    lookup(tables, tag)
        .map(|template| template.render(name))
        .ok_or_else(|| FfiError::MappingNotFound {
            key: MappingKey::Tag(tag.to_string()),
        })
}

/// Render the host type name for an enum-typed value.
pub fn enum_host_type_for(ty: Option<&CType>, name: &str, tables: &[EnumTable]) -> Result<String> {
    resolve(ty, name, tables)
}

/// Render the conversion expression for an enum-typed value.
pub fn enum_conversion_for(
    ty: Option<&CType>,
    name: &str,
    tables: &[EnumTable],
) -> Result<String> {
    resolve(ty, name, tables)
}
