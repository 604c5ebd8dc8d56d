//! `cbind decls` — extract declarations and render their bindings.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use cbind_ffi::{describe_all, BindingDescriptor, Extractor, Mappings, OverrideLayer};
use cbind_targets::Platform;

use super::Format;
use crate::manifest::CbindManifest;

pub struct DeclsOptions<'a> {
    pub files: &'a [PathBuf],
    pub platform: &'a Platform,
    /// Layers from the command line; searched before the manifest's.
    pub overrides: &'a [PathBuf],
    /// `#include` search directories from the command line; searched
    /// before the manifest's.
    pub include_paths: &'a [PathBuf],
    pub format: Format,
    pub keep_going: bool,
}

pub fn run(project_dir: &Path, manifest: Option<&CbindManifest>, opts: DeclsOptions<'_>) -> Result<()> {
    let descriptors = collect(project_dir, manifest, &opts)?;
    match opts.format {
        Format::Text => print!("{}", render_text(&descriptors)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&descriptors)?),
    }
    Ok(())
}

fn collect(
    project_dir: &Path,
    manifest: Option<&CbindManifest>,
    opts: &DeclsOptions<'_>,
) -> Result<Vec<BindingDescriptor>> {
    let files = if opts.files.is_empty() {
        manifest.map(|m| m.headers(project_dir)).unwrap_or_default()
    } else {
        opts.files.to_vec()
    };
    if files.is_empty() {
        bail!("no input headers (pass files or set [generator] headers in cbind.toml)");
    }

    let mut layer_paths = opts.overrides.to_vec();
    if let Some(m) = manifest {
        layer_paths.extend(m.overrides(project_dir));
    }
    let mut layers = Vec::with_capacity(layer_paths.len());
    for path in &layer_paths {
        let layer = OverrideLayer::load(path)
            .with_context(|| format!("loading override layer {}", path.display()))?;
        layers.push(layer);
    }

    let prefix = manifest
        .map(|m| m.generator.strip_prefix.clone())
        .unwrap_or_default();
    let mappings = Mappings::from_layers(layers).with_prefix(prefix);

    let mut include_paths = opts.include_paths.to_vec();
    if let Some(m) = manifest {
        include_paths.extend(m.include_paths(project_dir));
    }

    let declarations = Extractor::with_model(opts.platform.type_model())
        .include_paths(include_paths)
        .extract(files.as_slice())
        .context("extracting declarations")?;
    info!(
        count = declarations.len(),
        target = %opts.platform.name,
        "extracted declarations"
    );

    let mut descriptors = Vec::with_capacity(declarations.len());
    for (decl, result) in declarations.iter().zip(describe_all(&declarations, &mappings)) {
        match result {
            Ok(desc) => descriptors.push(desc),
            Err(e) if opts.keep_going => {
                warn!(name = %decl.name, at = %decl.position, "skipping: {e}");
            }
            Err(e) => {
                return Err(e).with_context(|| format!("describing {} at {}", decl.name, decl.position));
            }
        }
    }
    Ok(descriptors)
}

fn render_text(descriptors: &[BindingDescriptor]) -> String {
    let mut out = String::new();
    for desc in descriptors {
        let mut params: Vec<String> = desc
            .parameters
            .iter()
            .map(|p| format!("{}: {}", p.name, p.host_type))
            .collect();
        let mut args: Vec<String> = desc.parameters.iter().map(|p| p.conversion.clone()).collect();
        if desc.variadic {
            params.push("...".to_string());
            args.push("...".to_string());
        }
        out.push_str(&format!("{}  {}\n", desc.position, desc.c_name));
        out.push_str(&format!(
            "    fn {}({}) -> {}\n",
            desc.host_name,
            params.join(", "),
            desc.return_type
        ));
        out.push_str(&format!("    {}({})\n", desc.c_name, args.join(", ")));
    }
    out
}
