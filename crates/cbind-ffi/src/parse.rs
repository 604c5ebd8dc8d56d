//! C declaration parser.
//!
//! Parses the external declarations of preprocessed token streams. This is
//! not a compiler front end: function bodies, struct bodies and initializer
//! expressions are skipped by brace/paren matching, and typedef names are
//! resolved to their underlying [`CType`] as soon as they are declared.

use std::collections::HashMap;

use cbind_targets::PrimitiveKind;

use crate::ast::{
    ExternalDeclaration, FunctionDefinition, InitDeclarator, RawDeclaration,
};
use crate::ctype::{CType, FunctionType, Kind, Parameter, Position};
use crate::error::{FfiError, Result};
use crate::lex::{Tok, Token};
use crate::preprocess::parse_int;

/// Typedef names visible to the parser, resolved to their types.
pub type Typedefs = HashMap<String, CType>;

const STORAGE: &[&str] = &[
    "typedef",
    "extern",
    "static",
    "auto",
    "register",
    "inline",
    "__inline__",
    "_Noreturn",
    "_Thread_local",
    "__thread",
];

const QUALIFIERS: &[&str] = &[
    "const",
    "volatile",
    "restrict",
    "__restrict__",
    "__const__",
    "__volatile__",
    "__extension__",
    "_Atomic",
];

const BASE_TYPES: &[&str] = &[
    "void",
    "char",
    "short",
    "int",
    "long",
    "float",
    "double",
    "signed",
    "__signed__",
    "unsigned",
    "_Bool",
    "bool",
    "_Complex",
    "__complex__",
];

fn is_keyword(word: &str) -> bool {
    STORAGE.contains(&word)
        || QUALIFIERS.contains(&word)
        || BASE_TYPES.contains(&word)
        || matches!(word, "struct" | "union" | "enum" | "_Alignas" | "alignas")
}

/// Counts of the base type keywords seen in one specifier list.
#[derive(Debug, Default)]
struct BaseSpec {
    void: bool,
    char: bool,
    short: bool,
    int: bool,
    long: u8,
    float: bool,
    double: bool,
    signed: bool,
    unsigned: bool,
    bool: bool,
    complex: bool,
}

impl BaseSpec {
    fn any(&self) -> bool {
        self.void
            || self.char
            || self.short
            || self.int
            || self.long > 0
            || self.float
            || self.double
            || self.signed
            || self.unsigned
            || self.bool
            || self.complex
    }

    fn resolve(&self) -> Option<PrimitiveKind> {
        use PrimitiveKind as P;
        if !self.any() {
            return None;
        }
        let kind = if self.void {
            P::Void
        } else if self.bool {
            P::Bool
        } else if self.float {
            if self.complex { P::FloatComplex } else { P::Float }
        } else if self.double {
            match (self.long > 0, self.complex) {
                (true, true) => P::LongDoubleComplex,
                (true, false) => P::LongDouble,
                (false, true) => P::DoubleComplex,
                (false, false) => P::Double,
            }
        } else if self.complex {
            P::DoubleComplex
        } else if self.char {
            if self.unsigned {
                P::UChar
            } else if self.signed {
                P::SChar
            } else {
                P::Char
            }
        } else if self.short {
            if self.unsigned { P::UShort } else { P::Short }
        } else if self.long >= 2 {
            if self.unsigned { P::ULongLong } else { P::LongLong }
        } else if self.long == 1 {
            if self.unsigned { P::ULong } else { P::Long }
        } else if self.unsigned {
            P::UInt
        } else {
            P::Int
        };
        Some(kind)
    }
}

struct Specifiers {
    ty: CType,
    is_typedef: bool,
}

/// One step of a declarator, applied to the specifier type in order.
enum DeclOp {
    Pointer,
    Array(Option<u64>),
    Function(Vec<Parameter>, bool),
}

struct Declarator {
    name: Option<(String, Position)>,
    ops: Vec<DeclOp>,
}

fn apply(mut ty: CType, ops: Vec<DeclOp>) -> CType {
    for op in ops {
        ty = match op {
            DeclOp::Pointer => CType::pointer_to(ty),
            DeclOp::Array(length) => CType::Array {
                element: Box::new(ty),
                length,
            },
            DeclOp::Function(params, variadic) => CType::Function(Box::new(FunctionType {
                result: ty,
                params,
                variadic,
            })),
        };
    }
    ty
}

/// Parser over one file's preprocessed tokens.
pub struct Parser<'a> {
    file: &'a str,
    toks: Vec<Token>,
    i: usize,
    typedefs: &'a mut Typedefs,
}

impl<'a> Parser<'a> {
    pub fn new(file: &'a str, toks: Vec<Token>, typedefs: &'a mut Typedefs) -> Self {
        Self {
            file,
            toks,
            i: 0,
            typedefs,
        }
    }

    /// Parse every external declaration in the stream.
    pub fn parse(mut self) -> Result<Vec<ExternalDeclaration>> {
        let stray = self.toks.iter().find_map(|t| match t.tok {
            Tok::Punct(q @ ('\'' | '"')) => Some((q, &t.pos)),
            _ => None,
        });
        if let Some((quote, pos)) = stray {
            return Err(FfiError::parse(
                &pos.file,
                pos.line,
                format!("missing terminating {quote} character"),
            ));
        }

        let mut items = Vec::new();
        let mut linkage_depth = 0usize;

        while self.i < self.toks.len() {
            if self.eat_punct(';') {
                continue;
            }
            if linkage_depth > 0 && self.eat_punct('}') {
                linkage_depth -= 1;
                continue;
            }
            if self.peek_ident() == Some("extern") && matches!(self.peek_at(1), Some(Tok::Str(_))) {
                self.i += 2;
                if self.eat_punct('{') {
                    linkage_depth += 1;
                }
                continue;
            }
            if matches!(self.peek_ident(), Some("_Static_assert" | "static_assert")) {
                let pos = self.pos();
                self.i += 1;
                self.skip_balanced('(', ')')?;
                self.expect_punct(';')?;
                items.push(ExternalDeclaration::StaticAssert(pos));
                continue;
            }
            items.push(self.external_declaration()?);
        }

        if linkage_depth > 0 {
            return Err(self.error("unterminated extern \"C\" block"));
        }
        Ok(items)
    }

    fn external_declaration(&mut self) -> Result<ExternalDeclaration> {
        let position = self.pos();
        let spec = self.specifiers()?;
        let mut declarators = Vec::new();

        if !self.eat_punct(';') {
            loop {
                let d = self.declarator()?;
                let (name, name_pos) = match d.name {
                    Some(n) => n,
                    None => return Err(self.error("expected identifier in declaration")),
                };
                let ty = apply(spec.ty.clone(), d.ops);

                if declarators.is_empty() && self.peek_punct('{') {
                    if ty.kind() != Kind::Function {
                        return Err(self.error(format!("'{name}' has a body but is not a function")));
                    }
                    self.skip_balanced('{', '}')?;
                    return Ok(ExternalDeclaration::FunctionDefinition(FunctionDefinition {
                        name,
                        ty,
                        position: name_pos,
                    }));
                }

                let has_initializer = self.eat_punct('=');
                if has_initializer {
                    self.skip_initializer()?;
                }
                if spec.is_typedef {
                    self.typedefs.insert(name.clone(), ty.clone());
                }
                declarators.push(InitDeclarator {
                    name,
                    ty,
                    position: name_pos,
                    has_initializer,
                });

                if self.eat_punct(',') {
                    continue;
                }
                self.expect_punct(';')?;
                break;
            }
        }

        Ok(ExternalDeclaration::Declaration(RawDeclaration {
            position,
            is_typedef: spec.is_typedef,
            declarators,
        }))
    }

    fn specifiers(&mut self) -> Result<Specifiers> {
        let mut base = BaseSpec::default();
        let mut named: Option<CType> = None;
        let mut is_typedef = false;

        while let Some(word) = self.peek_ident().map(str::to_string) {
            match word.as_str() {
                "typedef" => is_typedef = true,
                w if STORAGE.contains(&w) || QUALIFIERS.contains(&w) => {}
                "_Alignas" | "alignas" => {
                    self.i += 1;
                    self.skip_balanced('(', ')')?;
                    continue;
                }
                "void" => base.void = true,
                "char" => base.char = true,
                "short" => base.short = true,
                "int" => base.int = true,
                "long" => base.long += 1,
                "float" => base.float = true,
                "double" => base.double = true,
                "signed" | "__signed__" => base.signed = true,
                "unsigned" => base.unsigned = true,
                "_Bool" | "bool" => base.bool = true,
                "_Complex" | "__complex__" => base.complex = true,
                "struct" | "union" | "enum" => {
                    if named.is_some() {
                        return Err(self.error("conflicting type specifiers"));
                    }
                    named = Some(self.tag_specifier()?);
                    continue;
                }
                w => {
                    let typedef = match (&named, base.any()) {
                        (None, false) => self.typedefs.get(w).cloned(),
                        _ => None,
                    };
                    match typedef {
                        Some(ty) => {
                            named = Some(ty);
                            self.i += 1;
                            continue;
                        }
                        None => break,
                    }
                }
            }
            self.i += 1;
        }

        let ty = match (named, base.resolve()) {
            (Some(_), Some(_)) => return Err(self.error("conflicting type specifiers")),
            (Some(ty), None) => ty,
            (None, Some(kind)) => CType::Primitive(kind),
            (None, None) => {
                let found = self.describe_current();
                return Err(self.error(format!("expected type specifier, found {found}")));
            }
        };
        Ok(Specifiers { ty, is_typedef })
    }

    fn tag_specifier(&mut self) -> Result<CType> {
        let keyword = self.peek_ident().map(str::to_string).unwrap_or_default();
        self.i += 1;

        let mut tag = String::new();
        if let Some(name) = self.peek_ident() {
            if !is_keyword(name) {
                tag = name.to_string();
                self.i += 1;
            }
        }
        let has_body = self.peek_punct('{');
        if has_body {
            self.skip_balanced('{', '}')?;
        }
        if tag.is_empty() && !has_body {
            return Err(self.error(format!("expected {keyword} tag or body")));
        }

        Ok(match keyword.as_str() {
            "enum" => CType::Enum { tag },
            "union" => CType::Union { tag },
            _ => CType::Struct { tag },
        })
    }

    fn declarator(&mut self) -> Result<Declarator> {
        let mut pointers = 0usize;
        while self.eat_punct('*') {
            pointers += 1;
            while self.peek_ident().is_some_and(|w| QUALIFIERS.contains(&w)) {
                self.i += 1;
            }
        }

        let mut inner = None;
        let mut name = None;
        if self.peek_punct('(') && self.is_grouping_paren() {
            self.i += 1;
            inner = Some(self.declarator()?);
            self.expect_punct(')')?;
        } else if let Some(id) = self.peek_ident().filter(|w| !is_keyword(w)) {
            name = Some((id.to_string(), self.pos()));
            self.i += 1;
        }

        let mut suffixes = Vec::new();
        loop {
            if self.eat_punct('[') {
                suffixes.push(DeclOp::Array(self.array_length()?));
            } else if self.eat_punct('(') {
                let (params, variadic) = self.parameters()?;
                suffixes.push(DeclOp::Function(params, variadic));
            } else {
                break;
            }
        }

        let mut ops: Vec<DeclOp> = (0..pointers).map(|_| DeclOp::Pointer).collect();
        ops.extend(suffixes.into_iter().rev());
        if let Some(inner) = inner {
            name = inner.name;
            ops.extend(inner.ops);
        }
        Ok(Declarator { name, ops })
    }

    /// At `(`: does it open a nested declarator rather than a parameter list?
    fn is_grouping_paren(&self) -> bool {
        match self.peek_at(1) {
            Some(Tok::Punct('*' | '(' | '^')) => true,
            Some(Tok::Ident(w)) => !is_keyword(w) && !self.typedefs.contains_key(w.as_str()),
            _ => false,
        }
    }

    /// Called after `[`; consumes through the matching `]`.
    fn array_length(&mut self) -> Result<Option<u64>> {
        let start = self.i;
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated array declarator")),
                Some(Tok::Punct('[')) => depth += 1,
                Some(Tok::Punct(']')) if depth == 0 => break,
                Some(Tok::Punct(']')) => depth -= 1,
                _ => {}
            }
            self.i += 1;
        }
        let length = match &self.toks[start..self.i] {
            [Token {
                tok: Tok::Number(n),
                ..
            }] => parse_int(n),
            _ => None,
        };
        self.i += 1;
        Ok(length)
    }

    /// Called after `(`; consumes through the matching `)`.
    fn parameters(&mut self) -> Result<(Vec<Parameter>, bool)> {
        if self.eat_punct(')') {
            return Ok((Vec::new(), false));
        }
        if self.peek_ident() == Some("void") && matches!(self.peek_at(1), Some(Tok::Punct(')'))) {
            self.i += 2;
            return Ok((Vec::new(), false));
        }

        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if matches!(self.peek(), Some(Tok::Ellipsis)) {
                self.i += 1;
                variadic = true;
                self.expect_punct(')')?;
                break;
            }
            let spec = self.specifiers()?;
            let d = self.declarator()?;
            let name = d.name.map(|(n, _)| n).unwrap_or_default();
            params.push(Parameter::new(name, apply(spec.ty, d.ops)));
            if self.eat_punct(',') {
                continue;
            }
            self.expect_punct(')')?;
            break;
        }
        Ok((params, variadic))
    }

    fn skip_initializer(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated initializer")),
                Some(Tok::Punct(',' | ';')) if depth == 0 => return Ok(()),
                Some(Tok::Punct('(' | '[' | '{')) => depth += 1,
                Some(Tok::Punct(')' | ']' | '}')) => {
                    depth = depth
                        .checked_sub(1)
                        .ok_or_else(|| self.error("unbalanced initializer"))?;
                }
                _ => {}
            }
            self.i += 1;
        }
    }

    /// At `open`; consumes through the matching `close`.
    fn skip_balanced(&mut self, open: char, close: char) -> Result<()> {
        self.expect_punct(open)?;
        let mut depth = 1usize;
        while depth > 0 {
            match self.peek() {
                None => return Err(self.error(format!("missing '{close}'"))),
                Some(t) if t.is_punct(open) => depth += 1,
                Some(t) if t.is_punct(close) => depth -= 1,
                _ => {}
            }
            self.i += 1;
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Tok> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&Tok> {
        self.toks.get(self.i + n).map(|t| &t.tok)
    }

    fn peek_ident(&self) -> Option<&str> {
        self.peek().and_then(Tok::ident)
    }

    fn peek_punct(&self, c: char) -> bool {
        self.peek().is_some_and(|t| t.is_punct(c))
    }

    fn eat_punct(&mut self, c: char) -> bool {
        let matched = self.peek_punct(c);
        if matched {
            self.i += 1;
        }
        matched
    }

    fn expect_punct(&mut self, c: char) -> Result<()> {
        if self.eat_punct(c) {
            return Ok(());
        }
        let found = self.describe_current();
        Err(self.error(format!("expected '{c}', found {found}")))
    }

    fn describe_current(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(Tok::Ident(s)) => format!("'{s}'"),
            Some(Tok::Number(s)) => format!("number {s}"),
            Some(Tok::Str(_)) => "string literal".to_string(),
            Some(Tok::Char(_)) => "character literal".to_string(),
            Some(Tok::Punct(c)) => format!("'{c}'"),
            Some(Tok::Ellipsis) => "'...'".to_string(),
        }
    }

    fn pos(&self) -> Position {
        self.toks
            .get(self.i)
            .or_else(|| self.toks.last())
            .map(|t| t.pos.clone())
            .unwrap_or_else(|| Position::new(self.file, 0, 0))
    }

    fn error(&self, detail: impl Into<String>) -> FfiError {
        let pos = self.pos();
        FfiError::parse(&pos.file, pos.line, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::lex;
    use crate::preprocess::{preprocess, Includes, MacroTable};

    fn parse_src(src: &str) -> Result<Vec<ExternalDeclaration>> {
        let mut typedefs = Typedefs::new();
        parse_with(src, &mut typedefs)
    }

    fn parse_with(src: &str, typedefs: &mut Typedefs) -> Result<Vec<ExternalDeclaration>> {
        let mut macros = MacroTable::new();
        let toks = preprocess("t.h", lex("t.h", src)?, &mut macros, &mut Includes::default())?;
        Parser::new("t.h", toks, typedefs).parse()
    }

    fn only_declarator(src: &str) -> InitDeclarator {
        let items = parse_src(src).unwrap();
        match items.as_slice() {
            [ExternalDeclaration::Declaration(d)] if d.declarators.len() == 1 => {
                d.declarators[0].clone()
            }
            other => panic!("expected one declarator, got {other:?}"),
        }
    }

    fn prim(kind: PrimitiveKind) -> CType {
        CType::Primitive(kind)
    }

    #[test]
    fn simple_function() {
        let d = only_declarator("double sin(double x);");
        assert_eq!(d.name, "sin");
        let f = d.ty.function().unwrap();
        assert_eq!(f.result, prim(PrimitiveKind::Double));
        assert_eq!(f.params, vec![Parameter::new("x", prim(PrimitiveKind::Double))]);
        assert!(!f.variadic);
        assert_eq!(d.position.line, 1);
        assert_eq!(d.position.column, 8);
    }

    #[test]
    fn multi_word_base_types() {
        let cases = [
            ("unsigned long long a;", PrimitiveKind::ULongLong),
            ("long int b;", PrimitiveKind::Long),
            ("signed char c;", PrimitiveKind::SChar),
            ("unsigned d;", PrimitiveKind::UInt),
            ("long double e;", PrimitiveKind::LongDouble),
            ("double _Complex f;", PrimitiveKind::DoubleComplex),
            ("float _Complex g;", PrimitiveKind::FloatComplex),
            ("const short unsigned h;", PrimitiveKind::UShort),
            ("_Bool i;", PrimitiveKind::Bool),
        ];
        for (src, kind) in cases {
            assert_eq!(only_declarator(src).ty, prim(kind), "{src}");
        }
    }

    #[test]
    fn pointer_and_array_declarators() {
        let d = only_declarator("char *const *argv[4];");
        assert_eq!(
            d.ty,
            CType::Array {
                element: Box::new(CType::pointer_to(CType::pointer_to(prim(PrimitiveKind::Char)))),
                length: Some(4),
            }
        );

        let d = only_declarator("int grid[2][3];");
        let CType::Array { element, length } = &d.ty else {
            panic!("expected array");
        };
        assert_eq!(*length, Some(2));
        assert_eq!(element.element().map(CType::kind), Some(Kind::Primitive(PrimitiveKind::Int)));
    }

    #[test]
    fn function_pointer_is_not_a_function() {
        let d = only_declarator("int (*handler)(int, void *);");
        assert_eq!(d.name, "handler");
        assert_eq!(d.ty.kind(), Kind::Primitive(PrimitiveKind::Ptr));
        assert_eq!(d.ty.element().map(CType::kind), Some(Kind::Function));
    }

    #[test]
    fn function_returning_pointer() {
        let d = only_declarator("void *malloc(unsigned long size);");
        let f = d.ty.function().unwrap();
        assert_eq!(f.result, CType::pointer_to(prim(PrimitiveKind::Void)));
    }

    #[test]
    fn unnamed_and_abstract_parameters() {
        let d = only_declarator("int h(int, float *, double [], int (*)(void));");
        let f = d.ty.function().unwrap();
        assert!(f.params.iter().all(|p| p.name.is_empty()));
        assert_eq!(f.params[1].ty, CType::pointer_to(prim(PrimitiveKind::Float)));
        assert_eq!(f.params[2].kind(), Kind::Array);
        assert_eq!(f.params[3].element().map(CType::kind), Some(Kind::Function));
    }

    #[test]
    fn void_and_variadic_parameter_lists() {
        let d = only_declarator("int getpid(void);");
        assert!(d.ty.function().unwrap().params.is_empty());

        let d = only_declarator("int printf(const char *fmt, ...);");
        let f = d.ty.function().unwrap();
        assert!(f.variadic);
        assert_eq!(f.params.len(), 1);
    }

    #[test]
    fn comma_declarators_and_initializers() {
        let items = parse_src("int x = (1, 2), y[] = {1, 2, 3};").unwrap();
        let ExternalDeclaration::Declaration(d) = &items[0] else {
            panic!("expected declaration");
        };
        assert_eq!(d.declarators.len(), 2);
        assert!(d.declarators.iter().all(|d| d.has_initializer));
    }

    #[test]
    fn definitions_are_skipped_by_body() {
        let items = parse_src("static int add(int a, int b) { return a + b; }\nint z;").unwrap();
        assert!(matches!(items[0], ExternalDeclaration::FunctionDefinition(ref f) if f.name == "add"));
        assert!(matches!(items[1], ExternalDeclaration::Declaration(_)));
    }

    #[test]
    fn typedefs_resolve() {
        let mut typedefs = Typedefs::new();
        let items = parse_with(
            "typedef double real;\ntypedef real *vec;\nvec scale(vec v, real k);",
            &mut typedefs,
        )
        .unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(
            typedefs.get("vec"),
            Some(&CType::pointer_to(prim(PrimitiveKind::Double)))
        );
        let ExternalDeclaration::Declaration(d) = &items[2] else {
            panic!("expected declaration");
        };
        let f = d.declarators[0].ty.function().unwrap();
        assert_eq!(f.params[1].ty, prim(PrimitiveKind::Double));
    }

    #[test]
    fn tagged_types() {
        let items = parse_src(
            "enum color { RED, GREEN };\nstruct point;\nenum color pick(struct point *p);\ntypedef enum { A, B } mode;",
        )
        .unwrap();
        assert_eq!(items.len(), 4);
        let ExternalDeclaration::Declaration(d) = &items[2] else {
            panic!("expected declaration");
        };
        let f = d.declarators[0].ty.function().unwrap();
        assert_eq!(f.result, CType::Enum { tag: "color".into() });
        assert_eq!(
            f.params[0].ty,
            CType::pointer_to(CType::Struct { tag: "point".into() })
        );
        let ExternalDeclaration::Declaration(d) = &items[3] else {
            panic!("expected declaration");
        };
        assert!(d.is_typedef);
        assert_eq!(d.declarators[0].ty, CType::Enum { tag: String::new() });
    }

    #[test]
    fn extern_c_blocks_and_static_asserts() {
        let items = parse_src(
            "extern \"C\" {\nint a(void);\n_Static_assert(sizeof(int) == 4, \"int\");\n}\nextern \"C\" int b(void);",
        )
        .unwrap();
        assert_eq!(items.len(), 3);
        assert!(matches!(items[1], ExternalDeclaration::StaticAssert(_)));
    }

    #[test]
    fn syntax_errors_report_position() {
        match parse_src("int ok(void);\nint broken(;") {
            Err(FfiError::Parse { file, line, .. }) => {
                assert_eq!(file, "t.h");
                assert_eq!(line, 2);
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(parse_src("mystery_t f(void);").is_err());
        match parse_src("int ok(void);\nchar c = 'x;\nint after(void);") {
            Err(FfiError::Parse { line, detail, .. }) => {
                assert_eq!(line, 2);
                assert!(detail.contains("terminating '"));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
        assert!(parse_src("extern \"C\" { int a;").is_err());
    }
}
