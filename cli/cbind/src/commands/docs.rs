//! `cbind docs` — doc comment map of a Rust source tree.

use std::path::Path;

use anyhow::{Context, Result};

use cbind_docs::{extract_doc_comments, DocMap};

use super::Format;

pub fn run(root: &Path, format: Format) -> Result<()> {
    let docs = extract_doc_comments(root)
        .with_context(|| format!("harvesting doc comments under {}", root.display()))?;
    match format {
        Format::Text => print!("{}", render_text(&docs)),
        Format::Json => println!("{}", serde_json::to_string_pretty(&docs)?),
    }
    Ok(())
}

fn render_text(docs: &DocMap) -> String {
    let mut out = String::new();
    for (owner, methods) in docs {
        for (method, lines) in methods {
            if owner.is_empty() {
                out.push_str(&format!("{method}\n"));
            } else {
                out.push_str(&format!("{owner}::{method}\n"));
            }
            for line in lines {
                out.push_str(&format!("    {line}\n"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn free_functions_have_no_owner() {
        let mut docs = DocMap::new();
        docs.entry(String::new())
            .or_insert_with(BTreeMap::new)
            .insert("add".into(), vec!["Adds.".into()]);
        docs.entry("Matrix".into())
            .or_insert_with(BTreeMap::new)
            .insert("rows".into(), vec!["Rows.".into(), "Never zero.".into()]);
        assert_eq!(
            render_text(&docs),
            "add\n    Adds.\nMatrix::rows\n    Rows.\n    Never zero.\n"
        );
    }
}
