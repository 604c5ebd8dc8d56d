//! TOML loading and validation for platform definitions.
//!
//! Custom platforms live in `.target.toml` files:
//!
//! ```toml
//! name = "riscv32-bare"
//! pointer-bytes = 4
//! long-bytes = 4
//! ```

use std::path::Path;

use crate::error::{Result, TargetError};
use crate::platform::Platform;

const VALID_WIDTHS: [u32; 3] = [2, 4, 8];

/// Load a platform from a `.target.toml` file.
pub fn load_platform_toml(path: &Path) -> Result<Platform> {
    if !path.exists() {
        return Err(TargetError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_platform_toml(&content)
}

/// Parse and validate a platform from a TOML string.
pub fn parse_platform_toml(toml_str: &str) -> Result<Platform> {
    let platform: Platform = toml::from_str(toml_str)?;
    validate_platform(&platform)?;
    Ok(platform)
}

/// Serialize a platform to pretty TOML.
pub fn platform_to_toml(platform: &Platform) -> Result<String> {
    let toml_str = toml::to_string_pretty(platform)?;
    Ok(toml_str)
}

/// Validate a platform definition for structural correctness.
pub fn validate_platform(platform: &Platform) -> Result<()> {
    if platform.name.trim().is_empty() {
        return Err(TargetError::Validation {
            detail: "platform name is empty".into(),
        });
    }
    for (field, width) in [
        ("pointer-bytes", platform.pointer_bytes),
        ("long-bytes", platform.long_bytes),
    ] {
        if !VALID_WIDTHS.contains(&width) {
            return Err(TargetError::Validation {
                detail: format!("{field} = {width} (expected 2, 4, or 8)"),
            });
        }
    }
    if platform.long_bytes > platform.pointer_bytes && platform.pointer_bytes < 4 {
        return Err(TargetError::Validation {
            detail: format!(
                "long ({} bytes) wider than pointer ({} bytes) on a sub-32-bit target",
                platform.long_bytes, platform.pointer_bytes
            ),
        });
    }
    Ok(())
}
