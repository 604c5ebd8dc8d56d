//! C declaration extraction and host binding type mapping.
//!
//! Parses C headers into resolved function declarations and maps each
//! parameter and return type to a Rust type name and a conversion
//! expression, through caller-supplied override tables layered over
//! built-in defaults.
//!
//! ## Modules
//!
//! - [`lex`], [`preprocess`], [`parse`] — C front end producing an [`ast`]
//! - [`ctype`] — Resolved C types
//! - [`declaration`] — Simple function declaration extraction
//! - [`mapping`] — Type keys, templates and the built-in tables
//! - [`enums`] — Enum lookup by tag
//! - [`overrides`] — Override layer files
//! - [`bridge`] — Per-declaration binding descriptors
//! - [`naming`] — Identifier case helpers

pub mod ast;
pub mod bridge;
pub mod ctype;
pub mod declaration;
pub mod enums;
pub mod error;
pub mod lex;
pub mod mapping;
pub mod naming;
pub mod overrides;
pub mod parse;
pub mod preprocess;

pub use bridge::{describe, describe_all, BindingDescriptor, Mappings, ParameterBinding};
pub use ctype::{CType, Kind, Parameter, Position};
pub use declaration::{extract_declarations, Declaration, Extractor};
pub use enums::{enum_conversion_for, enum_host_type_for};
pub use error::{FfiError, MappingKey};
pub use mapping::{
    conversion_for, host_type_for, EnumTable, MappingTable, Template, TypeKey, TypeTable,
    UNRESOLVED,
};
pub use naming::{lower_case_first, upper_case_first};
pub use overrides::OverrideLayer;
