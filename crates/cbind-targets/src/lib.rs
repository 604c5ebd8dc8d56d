//! Primitive C type model and target platform presets for cbind.
//!
//! A [`TypeModel`] gives size, alignment and in-struct alignment for every
//! [`PrimitiveKind`], parameterized by the target's pointer width and the
//! width of `long`. A [`Platform`] names a concrete pair of those widths.

pub mod error;
pub mod model;
pub mod parse;
pub mod platform;

pub use error::TargetError;
pub use model::{ModelItem, PrimitiveKind, TypeModel};
pub use platform::Platform;
