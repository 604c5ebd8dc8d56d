//! `cbind targets` — built-in platform listing.

use anyhow::Result;

use cbind_targets::Platform;

/// List all built-in platforms.
pub fn run() -> Result<()> {
    print!("{}", render());
    Ok(())
}

fn render() -> String {
    let mut out = String::from("Built-in platforms:\n\n");
    for platform in Platform::builtin() {
        out.push_str(&format!(
            "  {:<22} ptr={} long={}  {}\n",
            platform.name, platform.pointer_bytes, platform.long_bytes, platform.description
        ));
    }
    out.push_str("\nA custom platform can be given as a path to a .target.toml file.\n");
    out
}
