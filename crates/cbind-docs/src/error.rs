//! Doc extraction error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DocError {
    /// A source file is not valid Rust.
    #[error("{}: parse error: {detail}", file.display())]
    Parse { file: PathBuf, detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for doc extraction.
pub type Result<T> = std::result::Result<T, DocError>;
