//! FFI error types.

use std::fmt;

use crate::mapping::TypeKey;

/// The key a failed mapping lookup was searching for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingKey {
    /// A primitive-path lookup.
    Type(TypeKey),
    /// An enum lookup by tag.
    Tag(String),
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingKey::Type(key) => write!(f, "type key '{key}'"),
            MappingKey::Tag(tag) => write!(f, "enum tag '{tag}'"),
        }
    }
}

/// Errors that can occur while parsing C sources or mapping their types.
#[derive(Debug, thiserror::Error)]
pub enum FfiError {
    /// The C front end could not produce a translation unit.
    #[error("{file}:{line}: parse error: {detail}")]
    Parse {
        file: String,
        line: u32,
        detail: String,
    },

    /// No override table nor the built-in table has an entry for the key.
    #[error("no mapping for {key}")]
    MappingNotFound { key: MappingKey },

    /// An enum-only operation was applied to another kind of type.
    #[error("invalid type: {detail}")]
    InvalidType { detail: String },

    /// An enum has no declared name to look up.
    #[error("unresolved enum tag: {detail}")]
    UnresolvedTag { detail: String },

    /// An override layer is malformed.
    #[error("invalid override: {detail}")]
    InvalidOverride { detail: String },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FfiError {
    pub(crate) fn parse(file: &str, line: u32, detail: impl Into<String>) -> Self {
        FfiError::Parse {
            file: file.to_string(),
            line,
            detail: detail.into(),
        }
    }
}

/// Result type alias for FFI operations.
pub type Result<T> = std::result::Result<T, FfiError>;
