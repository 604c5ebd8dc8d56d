//! cbind CLI — extract C declarations and describe their Rust bindings.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cbind_targets::Platform;
use commands::decls::DeclsOptions;
use commands::Format;
use manifest::{resolve_target, CbindManifest};

#[derive(Parser)]
#[command(name = "cbind", version, about = "C binding descriptor generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract function declarations and describe their bindings
    Decls {
        /// Header files (default: [generator] headers from cbind.toml)
        files: Vec<PathBuf>,
        /// Target platform name or .target.toml path
        #[arg(long)]
        target: Option<String>,
        /// Override layer file; repeat for more, earlier ones win
        #[arg(long = "overrides")]
        overrides: Vec<PathBuf>,
        /// Directory searched by #include; repeat for more
        #[arg(short = 'I', long = "include")]
        include: Vec<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Skip declarations that cannot be mapped instead of failing
        #[arg(long)]
        keep_going: bool,
    },
    /// Print the doc comment map of a Rust source tree
    Docs {
        /// Source directory or file
        dir: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the primitive type model of a target
    Model {
        /// Target platform name or .target.toml path
        #[arg(long)]
        target: Option<String>,
    },
    /// List built-in target platforms
    Targets,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Decls {
            files,
            target,
            overrides,
            include,
            format,
            keep_going,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let platform = select_target(target.as_deref(), manifest.as_ref(), &project_dir)?;
            commands::decls::run(
                &project_dir,
                manifest.as_ref(),
                DeclsOptions {
                    files: &files,
                    platform: &platform,
                    overrides: &overrides,
                    include_paths: &include,
                    format,
                    keep_going,
                },
            )
        }

        Commands::Docs { dir, format } => commands::docs::run(&dir, format),

        Commands::Model { target } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let platform = select_target(target.as_deref(), manifest.as_ref(), &project_dir)?;
            commands::model::run(&platform)
        }

        Commands::Targets => commands::targets::run(),
    }
}

/// The command-line target, else the manifest's, else the host.
fn select_target(
    cli_target: Option<&str>,
    manifest: Option<&CbindManifest>,
    project_dir: &Path,
) -> anyhow::Result<Platform> {
    let configured = manifest.and_then(|m| m.generator.target.as_deref());
    match cli_target.or(configured) {
        Some(name) => resolve_target(name, project_dir),
        None => Ok(Platform::host()),
    }
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(cwd: &Path) -> anyhow::Result<(Option<CbindManifest>, Option<PathBuf>)> {
    match CbindManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_repeated_overrides() {
        let cli = Cli::try_parse_from([
            "cbind", "decls", "a.h", "b.h", "--overrides", "one.toml", "--overrides", "two.toml",
            "--format", "json", "--keep-going", "-I", "inc", "--include", "vendor/inc",
        ])
        .unwrap();
        match cli.command {
            Commands::Decls {
                files,
                overrides,
                include,
                format,
                keep_going,
                target,
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(overrides, [PathBuf::from("one.toml"), PathBuf::from("two.toml")]);
                assert_eq!(include, [PathBuf::from("inc"), PathBuf::from("vendor/inc")]);
                assert_eq!(format, Format::Json);
                assert!(keep_going);
                assert!(target.is_none());
            }
            _ => panic!("expected decls"),
        }
    }

    #[test]
    fn target_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = CbindManifest::from_str(
            "[project]\nname = \"p\"\n[generator]\ntarget = \"stm32f407-discovery\"\n",
        )
        .unwrap();
        assert_eq!(
            select_target(None, Some(&manifest), dir.path()).unwrap().name,
            "stm32f407-discovery"
        );
        assert_eq!(
            select_target(Some("windows-x86_64"), Some(&manifest), dir.path()).unwrap().name,
            "windows-x86_64"
        );
        assert_eq!(select_target(None, None, dir.path()).unwrap().name, "host");
    }
}
