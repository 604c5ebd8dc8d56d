//! Named target platforms.
//!
//! A platform is the pair of widths a [`TypeModel`] needs, plus a name and
//! a human description for listings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TargetError};
use crate::model::TypeModel;

/// A target platform as far as C type layout is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Platform {
    /// Platform name (e.g., "linux-x86_64", "stm32f407-discovery").
    pub name: String,
    /// Short human-readable description.
    #[serde(default)]
    pub description: String,
    /// Width of a pointer in bytes.
    pub pointer_bytes: u32,
    /// Width of `long` in bytes.
    pub long_bytes: u32,
}

impl Platform {
    /// Construct a platform from its name and widths.
    pub fn new(name: impl Into<String>, pointer_bytes: u32, long_bytes: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            pointer_bytes,
            long_bytes,
        }
    }

    fn described(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// The primitive type model for this platform.
    pub fn type_model(&self) -> TypeModel {
        TypeModel::new(self.pointer_bytes, self.long_bytes)
    }

    /// The machine cbind is running on.
    pub fn host() -> Self {
        let m = TypeModel::host();
        Self::new("host", m.pointer_bytes, m.long_bytes).described("The machine running cbind")
    }

    /// Generic Linux x86-64 (LP64).
    pub fn generic_linux_x86_64() -> Self {
        Self::new("linux-x86_64", 8, 8).described("Generic Linux x86-64 (LP64)")
    }

    /// Generic Linux AArch64 (LP64).
    pub fn generic_linux_aarch64() -> Self {
        Self::new("linux-aarch64", 8, 8).described("Generic Linux AArch64 (LP64)")
    }

    /// 64-bit Windows (LLP64: `long` stays 4 bytes).
    pub fn windows_x86_64() -> Self {
        Self::new("windows-x86_64", 8, 4).described("Windows x86-64 (LLP64)")
    }

    /// STM32F407 Discovery board (ILP32).
    pub fn stm32f407_discovery() -> Self {
        Self::new("stm32f407-discovery", 4, 4)
            .described("STM32F407 Discovery (ARM Cortex-M4F, ILP32)")
    }

    /// All built-in platforms, in listing order.
    pub fn builtin() -> Vec<Platform> {
        vec![
            Self::host(),
            Self::generic_linux_x86_64(),
            Self::generic_linux_aarch64(),
            Self::windows_x86_64(),
            Self::stm32f407_discovery(),
        ]
    }

    /// Look up a built-in platform by name.
    pub fn by_name(name: &str) -> Result<Self> {
        Self::builtin()
            .into_iter()
            .find(|p| p.name == name)
            .ok_or_else(|| TargetError::UnknownPlatform {
                name: name.to_string(),
            })
    }
}
