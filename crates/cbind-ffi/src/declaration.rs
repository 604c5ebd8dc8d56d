//! Function declaration extraction.
//!
//! Parses a set of C headers as one translation unit and keeps only the
//! simple function declarations: no body, exactly one declarator, no
//! initializer, not a typedef. The result is sorted by file path, then line,
//! then column, so the output does not depend on parser order.
//!
//! Declarations reached through `#include` are reported under the included
//! file's path.

use std::path::{Path, PathBuf};

use cbind_targets::{PrimitiveKind, TypeModel};
use tracing::debug;

use crate::ast::{ExternalDeclaration, TranslationUnit};
use crate::ctype::{CType, Parameter, Position};
use crate::error::{FfiError, Result};
use crate::lex::lex;
use crate::parse::{Parser, Typedefs};
use crate::preprocess::{preprocess, Includes, MacroTable};

/// File name reported for the predefined prelude.
pub const PREDEFINED: &str = "<predefined>";

const PRELUDE: &str = "\
#define __const const
#define __extension__
#define __inline inline
#define __restrict restrict
#define __restrict__ restrict
#define __signed signed
#define __volatile volatile
";

/// A simple function declaration with resolved types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Position of the declared name.
    pub position: Position,
    pub name: String,
    pub return_type: CType,
    /// In declaration order; unnamed parameters have an empty name.
    pub parameters: Vec<Parameter>,
    pub variadic: bool,
}

/// Parses headers against a type model and extracts their declarations.
#[derive(Debug, Clone)]
pub struct Extractor {
    model: TypeModel,
    predefined: String,
    include_paths: Vec<PathBuf>,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// An extractor for the host platform.
    pub fn new() -> Self {
        Self::with_model(TypeModel::host())
    }

    pub fn with_model(model: TypeModel) -> Self {
        Self {
            model,
            predefined: String::new(),
            include_paths: Vec::new(),
        }
    }

    pub fn model(&self) -> &TypeModel {
        &self.model
    }

    /// Add C source (macros, typedefs) parsed ahead of every input.
    /// Nothing it declares is ever reported.
    pub fn predefine(mut self, source: &str) -> Self {
        self.predefined.push_str(source);
        self.predefined.push('\n');
        self
    }

    /// Directories searched by `#include`, in order, after the including
    /// file's own directory.
    pub fn include_paths<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.include_paths.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Size and data-model macros of the target, as a compiler for it
    /// would predefine them.
    fn target_macros(&self) -> String {
        let model = &self.model;
        let mut defines = vec![
            ("__CHAR_BIT__", "8".to_string()),
            ("__SIZEOF_SHORT__", "2".to_string()),
            ("__SIZEOF_INT__", "4".to_string()),
            ("__SIZEOF_LONG__", model.long_bytes.to_string()),
            ("__SIZEOF_LONG_LONG__", "8".to_string()),
            ("__SIZEOF_POINTER__", model.pointer_bytes.to_string()),
            ("__SIZEOF_SIZE_T__", model.pointer_bytes.to_string()),
        ];
        match (model.pointer_bytes, model.long_bytes) {
            (8, 8) => defines.extend([("__LP64__", "1".to_string()), ("_LP64", "1".to_string())]),
            (8, 4) => defines.extend([("_WIN32", "1".to_string()), ("_WIN64", "1".to_string())]),
            (4, 4) => defines.push(("__ILP32__", "1".to_string())),
            _ => {}
        }
        defines
            .into_iter()
            .map(|(name, value)| format!("#define {name} {value}\n"))
            .collect()
    }

    /// Typedefs every translation unit starts with.
    fn builtin_typedefs(&self) -> Typedefs {
        let unsigned = PrimitiveKind::UintPtr;
        let signed = self.model.pointer_sized_signed();
        [
            ("size_t", unsigned),
            ("uintptr_t", unsigned),
            ("ptrdiff_t", signed),
            ("intptr_t", signed),
            ("ssize_t", signed),
            ("int8_t", PrimitiveKind::SChar),
            ("uint8_t", PrimitiveKind::UChar),
            ("int16_t", PrimitiveKind::Short),
            ("uint16_t", PrimitiveKind::UShort),
            ("int32_t", PrimitiveKind::Int),
            ("uint32_t", PrimitiveKind::UInt),
            ("int64_t", PrimitiveKind::LongLong),
            ("uint64_t", PrimitiveKind::ULongLong),
        ]
        .into_iter()
        .map(|(name, kind)| (name.to_string(), CType::Primitive(kind)))
        .collect()
    }

    /// Parse in-memory `(path, source)` pairs as one translation unit.
    pub fn parse_sources(&self, sources: &[(String, String)]) -> Result<TranslationUnit> {
        let mut macros = MacroTable::new();
        let mut typedefs = self.builtin_typedefs();
        let mut includes = Includes::new(self.include_paths.clone());

        let prelude = format!("{PRELUDE}{}{}", self.target_macros(), self.predefined);
        parse_one(PREDEFINED, &prelude, &mut macros, &mut typedefs, &mut includes)?;

        let mut items = Vec::new();
        for (file, source) in sources {
            if !includes.enter(Path::new(file)) {
                debug!(file = %file, "already parsed");
                continue;
            }
            let parsed = parse_one(file, source, &mut macros, &mut typedefs, &mut includes)?;
            debug!(file = %file, items = parsed.len(), "parsed");
            items.extend(parsed);
        }
        Ok(TranslationUnit { items })
    }

    /// Read and parse files as one translation unit. Repeated paths, and
    /// paths already pulled in by an earlier file's `#include`, are parsed
    /// once, at their first position.
    pub fn parse_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<TranslationUnit> {
        let mut sources: Vec<(String, String)> = Vec::with_capacity(paths.len());
        for path in paths {
            let file = path.as_ref().display().to_string();
            if sources.iter().any(|(seen, _)| *seen == file) {
                continue;
            }
            let source = std::fs::read_to_string(path.as_ref()).map_err(|e| FfiError::Parse {
                file: file.clone(),
                line: 0,
                detail: format!("cannot read file: {e}"),
            })?;
            sources.push((file, source));
        }
        self.parse_sources(&sources)
    }

    /// Extract the sorted function declarations of `paths`.
    pub fn extract<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Declaration>> {
        Ok(declarations(&self.parse_files(paths)?))
    }

    /// Extract the sorted function declarations of in-memory sources.
    pub fn extract_sources(&self, sources: &[(String, String)]) -> Result<Vec<Declaration>> {
        Ok(declarations(&self.parse_sources(sources)?))
    }
}

fn parse_one(
    file: &str,
    source: &str,
    macros: &mut MacroTable,
    typedefs: &mut Typedefs,
    includes: &mut Includes,
) -> Result<Vec<ExternalDeclaration>> {
    let lexed = lex(file, source)?;
    let tokens = preprocess(file, lexed, macros, includes)?;
    Parser::new(file, tokens, typedefs).parse()
}

/// Filter a translation unit down to its simple function declarations,
/// sorted by position.
pub fn declarations(unit: &TranslationUnit) -> Vec<Declaration> {
    let mut out: Vec<Declaration> = unit.items.iter().filter_map(accept).collect();
    out.sort_by(|a, b| a.position.cmp(&b.position));
    out
}

fn accept(item: &ExternalDeclaration) -> Option<Declaration> {
    let raw = match item {
        ExternalDeclaration::Declaration(raw) => raw,
        ExternalDeclaration::FunctionDefinition(def) => {
            debug!(name = %def.name, at = %def.position, "skipping definition");
            return None;
        }
        ExternalDeclaration::StaticAssert(_) => return None,
    };
    let declarator = match raw.declarators.as_slice() {
        [d] => d,
        [] => return None,
        many => {
            debug!(at = %raw.position, count = many.len(), "skipping multi-declarator");
            return None;
        }
    };
    if declarator.has_initializer {
        debug!(name = %declarator.name, at = %raw.position, "skipping initialized declaration");
        return None;
    }
    if raw.is_typedef {
        return None;
    }
    let Some(function) = declarator.ty.function() else {
        debug!(name = %declarator.name, kind = %declarator.ty.kind(), "skipping non-function");
        return None;
    };

    Some(Declaration {
        position: declarator.position.clone(),
        name: declarator.name.clone(),
        return_type: function.result.clone(),
        parameters: function.params.clone(),
        variadic: function.variadic,
    })
}

/// Extract the sorted function declarations of `paths` for the host
/// platform.
pub fn extract_declarations<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<Declaration>> {
    Extractor::new().extract(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(files: &[(&str, &str)]) -> Vec<(String, String)> {
        files
            .iter()
            .map(|(f, s)| (f.to_string(), s.to_string()))
            .collect()
    }

    fn names(decls: &[Declaration]) -> Vec<&str> {
        decls.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn filters_to_simple_function_declarations() {
        let src = "int f(int a, int b);\nint x, y;\nint g(void) = something;\nint h(int);\n";
        let decls = Extractor::new()
            .extract_sources(&sources(&[("t.h", src)]))
            .unwrap();
        assert_eq!(names(&decls), ["f", "h"]);

        let f = &decls[0];
        assert_eq!(f.return_type, CType::Primitive(PrimitiveKind::Int));
        assert_eq!(f.parameters.len(), 2);
        assert_eq!(f.parameters[1].name, "b");
        assert_eq!(decls[1].parameters[0].name, "");
    }

    #[test]
    fn skips_definitions_typedefs_and_variables() {
        let src = "\
typedef int (*callback)(int);
typedef int fn_t(int);
static inline int twice(int v) { return v * 2; }
int (*hook)(int);
double counter;
int kept(callback cb);
";
        let decls = Extractor::new()
            .extract_sources(&sources(&[("t.h", src)]))
            .unwrap();
        assert_eq!(names(&decls), ["kept"]);
        assert_eq!(decls[0].parameters[0].element().map(CType::kind), Some(crate::ctype::Kind::Function));
    }

    #[test]
    fn orders_by_file_then_line() {
        let b = format!("{}int from_b(void);\n", "\n".repeat(4));
        let a = format!("{}int from_a(void);\n", "\n".repeat(99));
        let decls = Extractor::new()
            .extract_sources(&sources(&[("b.h", &b), ("a.h", &a)]))
            .unwrap();
        assert_eq!(names(&decls), ["from_a", "from_b"]);
        assert_eq!(decls[0].position.line, 100);
        assert_eq!(decls[1].position.line, 5);

        let same = "int second(void);\nint first(void);\n";
        let decls = Extractor::new()
            .extract_sources(&sources(&[("s.h", "\n\nint third(void);"), ("s2.h", same)]))
            .unwrap();
        assert_eq!(names(&decls), ["third", "second", "first"]);
        let lines: Vec<u32> = decls[1..].iter().map(|d| d.position.line).collect();
        assert_eq!(lines, [1, 2]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let src = sources(&[("m.h", "void z(void); int y(int); long x(long, ...);")]);
        let extractor = Extractor::new();
        let first = extractor.extract_sources(&src).unwrap();
        let second = extractor.extract_sources(&src).unwrap();
        assert_eq!(first, second);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
        assert_eq!(names(&first), ["z", "y", "x"]);
        assert!(first[2].variadic);
    }

    #[test]
    fn builtin_typedefs_follow_the_model() {
        let src = sources(&[("t.h", "ptrdiff_t diff(size_t n, uint8_t b);")]);
        let decls = Extractor::with_model(TypeModel::new(4, 4))
            .extract_sources(&src)
            .unwrap();
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::Long));
        assert_eq!(decls[0].parameters[0].ty, CType::Primitive(PrimitiveKind::UintPtr));
        assert_eq!(decls[0].parameters[1].ty, CType::Primitive(PrimitiveKind::UChar));

        let decls = Extractor::with_model(TypeModel::new(8, 4))
            .extract_sources(&src)
            .unwrap();
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::LongLong));
    }

    #[test]
    fn prelude_erases_extensions() {
        let src = "\
__extension__ extern int quiet(const char *__restrict s) __attribute__((nonnull(1)));
extern __inline int loud(void) __asm__(\"loud_v2\");
";
        let decls = Extractor::new()
            .extract_sources(&sources(&[("ext.h", src)]))
            .unwrap();
        assert_eq!(names(&decls), ["quiet", "loud"]);
    }

    #[test]
    fn predefined_source_is_shared_but_not_reported() {
        let decls = Extractor::new()
            .predefine("typedef float real;\nint hidden(void);\n#define API extern")
            .extract_sources(&sources(&[("p.h", "API real norm(real *v);")]))
            .unwrap();
        assert_eq!(names(&decls), ["norm"]);
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::Float));
    }

    #[test]
    fn macros_and_typedefs_span_files() {
        let decls = Extractor::new()
            .extract_sources(&sources(&[
                ("types.h", "#define REAL double\ntypedef REAL vec3[3];"),
                ("ops.h", "REAL dot(const vec3 a, const vec3 b);"),
            ]))
            .unwrap();
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::Double));
        assert_eq!(decls[0].parameters[0].kind(), crate::ctype::Kind::Array);
    }

    #[test]
    fn parse_failure_is_an_error() {
        let err = Extractor::new()
            .extract_sources(&sources(&[("bad.h", "int f(int;")]))
            .unwrap_err();
        assert!(matches!(err, FfiError::Parse { ref file, .. } if file == "bad.h"));
    }

    #[test]
    fn reads_files_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.h");
        let b = dir.path().join("b.h");
        std::fs::write(&a, "int alpha(void);\n").unwrap();
        std::fs::write(&b, "int beta(double x);\n").unwrap();

        let decls = extract_declarations(&[&b, &a, &b]).unwrap();
        assert_eq!(names(&decls), ["alpha", "beta"]);
        assert!(decls[0].position.file.ends_with("a.h"));
    }

    #[test]
    fn missing_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.h");
        assert!(matches!(
            extract_declarations(&[missing]),
            Err(FfiError::Parse { line: 0, .. })
        ));
    }

    #[test]
    fn position_is_the_declared_name() {
        let decls = Extractor::new()
            .extract_sources(&sources(&[("g.h", "int\nfoo(void);\nstatic int *\n  bar(int);")]))
            .unwrap();
        assert_eq!(names(&decls), ["foo", "bar"]);
        assert_eq!(decls[0].position, Position::new("g.h", 2, 1));
        assert_eq!(decls[1].position, Position::new("g.h", 4, 3));
    }

    #[test]
    fn includes_share_typedefs_and_report_their_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let types = dir.path().join("types.h");
        let main = dir.path().join("main.h");
        std::fs::write(&types, "typedef int myint;\nmyint helper(void);\n").unwrap();
        std::fs::write(&main, "#include \"types.h\"\nmyint g(void);\n").unwrap();

        let decls = extract_declarations(&[&main, &types]).unwrap();
        assert_eq!(names(&decls), ["g", "helper"]);
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::Int));
        assert_eq!(decls[1].position.file, types.display().to_string());
    }

    #[test]
    fn include_paths_are_searched() {
        let dir = tempfile::tempdir().unwrap();
        let inc = dir.path().join("include");
        std::fs::create_dir(&inc).unwrap();
        std::fs::write(inc.join("real.h"), "typedef double real;\n").unwrap();
        let main = dir.path().join("m.h");
        std::fs::write(&main, "#include <real.h>\n#include <stdlib.h>\nreal norm(void);\n").unwrap();

        let decls = Extractor::new().include_paths([&inc]).extract(&[&main]).unwrap();
        assert_eq!(decls[0].return_type, CType::Primitive(PrimitiveKind::Double));
        assert!(Extractor::new().extract(&[&main]).is_err());
    }

    #[test]
    fn target_macros_select_branches() {
        let src = sources(&[(
            "w.h",
            "#if defined(_WIN64)\nint win(void);\n#elif defined(__LP64__) && __SIZEOF_LONG__ == 8\nint lp64(void);\n#elif __SIZEOF_POINTER__ == 4\nint ilp32(void);\n#endif",
        )]);
        let pick = |model| names(&Extractor::with_model(model).extract_sources(&src).unwrap()).concat();
        assert_eq!(pick(TypeModel::new(8, 4)), "win");
        assert_eq!(pick(TypeModel::new(8, 8)), "lp64");
        assert_eq!(pick(TypeModel::new(4, 4)), "ilp32");
    }
}
