//! `cbind model` — primitive layout table for a platform.

use anyhow::Result;

use cbind_targets::Platform;

/// Print size, alignment and struct alignment of every primitive kind.
pub fn run(platform: &Platform) -> Result<()> {
    print!("{}", render(platform));
    Ok(())
}

fn render(platform: &Platform) -> String {
    let model = platform.type_model();
    let mut out = format!(
        "Platform: {} (pointer {} bytes, long {} bytes)\n\n",
        platform.name, model.pointer_bytes, model.long_bytes
    );
    out.push_str(&format!(
        "  {:<24} {:>5} {:>6} {:>13}\n",
        "kind", "size", "align", "struct-align"
    ));
    for (kind, item) in model.items() {
        out.push_str(&format!(
            "  {:<24} {:>5} {:>6} {:>13}\n",
            kind.spelling(),
            item.size,
            item.align,
            item.struct_align
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_kind() {
        let text = render(&Platform::stm32f407_discovery());
        assert!(text.starts_with("Platform: stm32f407-discovery (pointer 4 bytes, long 4 bytes)"));
        assert_eq!(text.lines().count(), 3 + 21);
        let long_long = text
            .lines()
            .find(|l| l.trim_start().starts_with("long long"))
            .unwrap();
        assert_eq!(long_long.split_whitespace().nth(2), Some("8"));
    }
}
