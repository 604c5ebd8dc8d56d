//! Override layer files.
//!
//! An override layer is a TOML document with up to four tables. Each value
//! is either a template string or a table with `template` and an optional
//! `label`:
//!
//! ```toml
//! [types]
//! "short*" = "&mut [i16]"
//!
//! [conversions]
//! "short*" = { template = "{name}.as_mut_ptr()", label = "short slice" }
//!
//! [enum-types]
//! Color = "Color"
//!
//! [enum-conversions]
//! Color = "{name} as c_int"
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{FfiError, Result};
use crate::mapping::{EnumTable, Template, TypeKey, TypeTable};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTemplate {
    Source(String),
    Full {
        template: String,
        #[serde(default)]
        label: Option<String>,
    },
}

impl RawTemplate {
    fn into_template(self, key: &str) -> Template {
        match self {
            RawTemplate::Source(source) => Template::new(key, source),
            RawTemplate::Full { template, label } => {
                Template::new(label.unwrap_or_else(|| key.to_string()), template)
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct RawLayer {
    #[serde(default)]
    types: BTreeMap<String, RawTemplate>,
    #[serde(default)]
    conversions: BTreeMap<String, RawTemplate>,
    #[serde(default)]
    enum_types: BTreeMap<String, RawTemplate>,
    #[serde(default)]
    enum_conversions: BTreeMap<String, RawTemplate>,
}

/// One caller-supplied layer for each of the four mapping tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideLayer {
    pub types: TypeTable,
    pub conversions: TypeTable,
    pub enum_types: EnumTable,
    pub enum_conversions: EnumTable,
}

fn type_table(section: &str, raw: BTreeMap<String, RawTemplate>) -> Result<TypeTable> {
    raw.into_iter()
        .map(|(spelling, template)| {
            let key: TypeKey = spelling.parse().map_err(|e| FfiError::InvalidOverride {
                detail: format!("[{section}] {e}"),
            })?;
            Ok((key, template.into_template(&spelling)))
        })
        .collect()
}

fn enum_table(section: &str, raw: BTreeMap<String, RawTemplate>) -> Result<EnumTable> {
    raw.into_iter()
        .map(|(tag, template)| {
            if tag.trim().is_empty() {
                return Err(FfiError::InvalidOverride {
                    detail: format!("[{section}] enum tag must not be empty"),
                });
            }
            let template = template.into_template(&tag);
            Ok((tag, template))
        })
        .collect()
}

impl OverrideLayer {
    /// Parse a layer from TOML text.
    pub fn parse(input: &str) -> Result<Self> {
        let raw: RawLayer = toml::from_str(input)?;
        Ok(Self {
            types: type_table("types", raw.types)?,
            conversions: type_table("conversions", raw.conversions)?,
            enum_types: enum_table("enum-types", raw.enum_types)?,
            enum_conversions: enum_table("enum-conversions", raw.enum_conversions)?,
        })
    }

    /// Parse a layer from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.conversions.is_empty()
            && self.enum_types.is_empty()
            && self.enum_conversions.is_empty()
    }
}
