//! `cbind.toml` project configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cbind_targets::parse::load_platform_toml;
use cbind_targets::Platform;

pub const MANIFEST_FILE: &str = "cbind.toml";

/// The top-level `cbind.toml` structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CbindManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// Generation settings.
    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GeneratorConfig {
    /// Platform name or path to a `.target.toml`.
    #[serde(default)]
    pub target: Option<String>,
    /// Prefix removed from C names before they become host names.
    #[serde(default)]
    pub strip_prefix: String,
    /// Headers parsed when none are given on the command line.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Override layer files, highest precedence first.
    #[serde(default)]
    pub overrides: Vec<String>,
    /// Directories searched by `#include`.
    #[serde(default)]
    pub include_paths: Vec<String>,
}

impl CbindManifest {
    /// Search upward from `start_dir` for a `cbind.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: CbindManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing cbind.toml")
    }

    /// Default header paths, resolved against the project root.
    pub fn headers(&self, root: &Path) -> Vec<PathBuf> {
        self.generator.headers.iter().map(|h| root.join(h)).collect()
    }

    /// Override layer paths, resolved against the project root.
    pub fn overrides(&self, root: &Path) -> Vec<PathBuf> {
        self.generator.overrides.iter().map(|o| root.join(o)).collect()
    }

    /// Include search directories, resolved against the project root.
    pub fn include_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.generator.include_paths.iter().map(|d| root.join(d)).collect()
    }
}

/// Resolve a target given as a built-in name or a `.target.toml` path
/// (relative paths are taken against `base`).
pub fn resolve_target(target: &str, base: &Path) -> Result<Platform> {
    if target.ends_with(".toml") {
        let path = base.join(target);
        return load_platform_toml(&path)
            .with_context(|| format!("loading target definition {}", path.display()));
    }
    Platform::by_name(target)
        .with_context(|| format!("unknown target '{target}' (see `cbind targets`)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = CbindManifest::from_str(
            r#"
[project]
name = "blas-bindings"
description = "CBLAS level 1"

[generator]
target = "linux-aarch64"
strip-prefix = "cblas_"
headers = ["include/cblas.h"]
overrides = ["bindings/rust.toml", "bindings/base.toml"]
include-paths = ["include", "/usr/local/include"]
"#,
        )
        .unwrap();
        assert_eq!(manifest.project.name, "blas-bindings");
        assert_eq!(manifest.generator.target.as_deref(), Some("linux-aarch64"));
        assert_eq!(manifest.generator.strip_prefix, "cblas_");
        let root = Path::new("/proj");
        assert_eq!(manifest.headers(root), [PathBuf::from("/proj/include/cblas.h")]);
        assert_eq!(
            manifest.overrides(root),
            [
                PathBuf::from("/proj/bindings/rust.toml"),
                PathBuf::from("/proj/bindings/base.toml")
            ]
        );
        assert_eq!(
            manifest.include_paths(root),
            [PathBuf::from("/proj/include"), PathBuf::from("/usr/local/include")]
        );
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = CbindManifest::from_str("[project]\nname = \"minimal\"\n").unwrap();
        assert!(manifest.generator.target.is_none());
        assert!(manifest.generator.headers.is_empty());
        assert_eq!(manifest.generator.strip_prefix, "");
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(CbindManifest::from_str("this is not valid toml [[[").is_err());
        assert!(CbindManifest::from_str("[generator]\ntarget = \"host\"\n").is_err());
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[project]\nname = \"parent\"\n").unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found) = CbindManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "parent");
        assert_eq!(found, dir.path());
    }

    #[test]
    fn resolve_named_and_file_targets() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_target("windows-x86_64", dir.path()).unwrap().long_bytes, 4);
        assert!(resolve_target("vax", dir.path()).is_err());

        std::fs::write(
            dir.path().join("rv32.target.toml"),
            "name = \"rv32\"\npointer-bytes = 4\nlong-bytes = 4\n",
        )
        .unwrap();
        let platform = resolve_target("rv32.target.toml", dir.path()).unwrap();
        assert_eq!(platform.name, "rv32");
        assert!(resolve_target("missing.target.toml", dir.path()).is_err());
    }
}
