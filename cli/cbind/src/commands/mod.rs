//! CLI command implementations.

pub mod decls;
pub mod docs;
pub mod model;
pub mod targets;

use clap::ValueEnum;

/// Output format shared by the listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}
