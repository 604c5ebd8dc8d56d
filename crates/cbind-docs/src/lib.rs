//! Doc comment harvesting from Rust source trees.
//!
//! Walks every `.rs` file under a root and records the doc comment of each
//! method, keyed by the type (or trait) it belongs to. Free functions are
//! keyed under the empty type name. Items without doc comments are left out.

pub mod error;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use syn::{Attribute, Expr, ExprLit, ImplItem, Item, Lit, Meta, TraitItem, Type};
use tracing::debug;

pub use error::{DocError, Result};

/// Type name → method name → doc comment lines.
pub type DocMap = BTreeMap<String, BTreeMap<String, Vec<String>>>;

/// Harvest doc comments from `root`, a directory or a single `.rs` file.
pub fn extract_doc_comments(root: &Path) -> Result<DocMap> {
    let mut files = Vec::new();
    if root.is_file() {
        files.push(root.to_path_buf());
    } else {
        collect_sources(root, &mut files)?;
    }

    let mut docs = DocMap::new();
    for file in &files {
        let source = std::fs::read_to_string(file)?;
        extract_from_source(&source, file, &mut docs)?;
        debug!(file = %file.display(), "harvested doc comments");
    }
    Ok(docs)
}

/// Parse one file's text and merge its doc comments into `docs`.
///
/// Where a method name repeats for the same type, the first one seen wins.
pub fn extract_from_source(source: &str, file: &Path, docs: &mut DocMap) -> Result<()> {
    let parsed = syn::parse_file(source).map_err(|e| DocError::Parse {
        file: file.to_path_buf(),
        detail: e.to_string(),
    })?;
    collect_items(&parsed.items, docs);
    Ok(())
}

/// All `.rs` files below `dir`, in sorted path order.
fn collect_sources(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_sources(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            out.push(path);
        }
    }
    Ok(())
}

fn collect_items(items: &[Item], docs: &mut DocMap) {
    for item in items {
        match item {
            Item::Fn(f) => record(docs, "", &f.sig.ident.to_string(), &f.attrs),
            Item::Impl(imp) => {
                let Some(owner) = type_name(&imp.self_ty) else {
                    continue;
                };
                for member in &imp.items {
                    if let ImplItem::Fn(f) = member {
                        record(docs, &owner, &f.sig.ident.to_string(), &f.attrs);
                    }
                }
            }
            Item::Trait(tr) => {
                let owner = tr.ident.to_string();
                for member in &tr.items {
                    if let TraitItem::Fn(f) = member {
                        record(docs, &owner, &f.sig.ident.to_string(), &f.attrs);
                    }
                }
            }
            Item::Mod(m) => {
                if let Some((_, inner)) = &m.content {
                    collect_items(inner, docs);
                }
            }
            _ => {}
        }
    }
}

/// Last path segment of an impl's self type; `&T` and `Box<T>` style
/// wrappers are not unwrapped.
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()),
        Type::Paren(p) => type_name(&p.elem),
        Type::Group(g) => type_name(&g.elem),
        _ => None,
    }
}

fn record(docs: &mut DocMap, owner: &str, method: &str, attrs: &[Attribute]) {
    let lines = doc_lines(attrs);
    if lines.is_empty() {
        return;
    }
    docs.entry(owner.to_string())
        .or_default()
        .entry(method.to_string())
        .or_insert(lines);
}

/// Text of `///` and `/** */` comments, one entry per line, with the single
/// space after the comment marker removed.
fn doc_lines(attrs: &[Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .flat_map(|text| {
            text.lines()
                .map(|line| line.strip_prefix(' ').unwrap_or(line).to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harvest(source: &str) -> DocMap {
        let mut docs = DocMap::new();
        extract_from_source(source, Path::new("lib.rs"), &mut docs).unwrap();
        docs
    }

    #[test]
    fn methods_and_free_functions() {
        let docs = harvest(
            r#"
/// Adds two numbers.
/// Wraps on overflow.
pub fn add(a: i32, b: i32) -> i32 { a.wrapping_add(b) }

fn undocumented() {}

pub struct Matrix;

impl Matrix {
    /// Number of rows.
    pub fn rows(&self) -> usize { 0 }

    pub fn cols(&self) -> usize { 0 }
}
"#,
        );
        assert_eq!(docs[""]["add"], ["Adds two numbers.", "Wraps on overflow."]);
        assert!(!docs[""].contains_key("undocumented"));
        assert_eq!(docs["Matrix"]["rows"], ["Number of rows."]);
        assert!(!docs["Matrix"].contains_key("cols"));
    }

    #[test]
    fn traits_generics_and_nested_modules() {
        let docs = harvest(
            r#"
pub trait Solver {
    /// Solve in place.
    fn solve(&mut self);
}

mod inner {
    impl<T> super::Wrapper<T> {
        /** Unwraps.
         Panics never. */
        pub fn get(self) -> T { self.0 }
    }
}
"#,
        );
        assert_eq!(docs["Solver"]["solve"], ["Solve in place."]);
        let get = &docs["Wrapper"]["get"];
        assert_eq!(get[0], "Unwraps.");
        assert_eq!(get.len(), 2);
    }

    #[test]
    fn first_definition_wins() {
        let docs = harvest(
            r#"
struct S;
impl S {
    /// First.
    fn f(&self) {}
}
impl Clone for S {
    /// Second.
    fn clone(&self) -> S { S }
}
mod other {
    impl super::S {
        /// Shadowed.
        fn f(&self) {}
    }
}
"#,
        );
        assert_eq!(docs["S"]["f"], ["First."]);
        assert_eq!(docs["S"]["clone"], ["Second."]);
    }

    #[test]
    fn malformed_source_is_a_parse_error() {
        let mut docs = DocMap::new();
        let err = extract_from_source("fn broken( {", Path::new("bad.rs"), &mut docs).unwrap_err();
        assert!(matches!(err, DocError::Parse { ref file, .. } if file == Path::new("bad.rs")));
    }

    #[test]
    fn walks_directories_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(dir.path().join("a.rs"), "/// From a.\nfn shared() {}\n").unwrap();
        std::fs::write(nested.join("c.rs"), "/// From c.\nfn shared() {}\n/// Only c.\nfn own() {}\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not rust {").unwrap();

        let docs = extract_doc_comments(dir.path()).unwrap();
        assert_eq!(docs[""]["shared"], ["From a."]);
        assert_eq!(docs[""]["own"], ["Only c."]);
    }

    #[test]
    fn single_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.rs");
        std::fs::write(&file, "/// Hi.\npub fn hello() {}\n").unwrap();
        let docs = extract_doc_comments(&file).unwrap();
        assert_eq!(docs[""]["hello"], ["Hi."]);
    }

    #[test]
    fn missing_root_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract_doc_comments(&dir.path().join("missing")),
            Err(DocError::Io(_))
        ));
    }
}
