//! C tokenizer.
//!
//! Produces a flat stream of tokens and raw preprocessor directive lines.
//! Comments and line splices are removed; directives are handed to
//! [`crate::preprocess`] untouched.

use crate::ctype::Position;
use crate::error::{FfiError, Result};

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    Ident(String),
    /// Numeric literal, verbatim.
    Number(String),
    /// String literal contents, escapes left as written.
    Str(String),
    /// Character literal contents, escapes left as written.
    Char(String),
    Punct(char),
    Ellipsis,
}

impl Tok {
    pub fn is_punct(&self, c: char) -> bool {
        matches!(self, Tok::Punct(p) if *p == c)
    }

    pub fn ident(&self) -> Option<&str> {
        match self {
            Tok::Ident(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub tok: Tok,
    pub pos: Position,
}

/// One lexed unit of a source file.
#[derive(Debug, Clone)]
pub enum Item {
    Token(Token),
    /// A `#` line, without the `#`, splices joined and comments stripped.
    Directive { text: String, pos: Position },
}

/// Tokenize a whole source file.
pub fn lex(file: &str, src: &str) -> Result<Vec<Item>> {
    Lexer::new(file, src, 1, true).run()
}

/// Tokenize a directive body (no nested directives), starting at `line`.
pub fn lex_fragment(file: &str, line: u32, src: &str) -> Result<Vec<Token>> {
    let items = Lexer::new(file, src, line, false).run()?;
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Item::Token(t) => Some(t),
            Item::Directive { .. } => None,
        })
        .collect())
}

struct Lexer<'a> {
    file: &'a str,
    chars: Vec<char>,
    i: usize,
    line: u32,
    col: u32,
    directives: bool,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a str, src: &str, line: u32, directives: bool) -> Self {
        Self {
            file,
            chars: src.chars().collect(),
            i: 0,
            line,
            col: 1,
            directives,
        }
    }

    fn peek(&self, n: usize) -> Option<char> {
        self.chars.get(self.i + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek(0)?;
        self.i += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn pos(&self) -> Position {
        Position::new(self.file, self.line, self.col)
    }

    fn error(&self, detail: impl Into<String>) -> FfiError {
        FfiError::parse(self.file, self.line, detail)
    }

    fn run(mut self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut line_start = true;
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => {
                    self.bump();
                    line_start = true;
                }
                '\\' if self.peek(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => self.skip_block_comment()?,
                '#' if line_start && self.directives => {
                    let pos = self.pos();
                    self.bump();
                    let text = self.directive_text()?;
                    items.push(Item::Directive { text, pos });
                }
                _ => {
                    line_start = false;
                    let pos = self.pos();
                    let tok = self.token()?;
                    items.push(Item::Token(Token { tok, pos }));
                }
            }
        }
        Ok(items)
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<()> {
        let start = self.line;
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('*') if self.peek(0) == Some('/') => {
                    self.bump();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(FfiError::parse(
                        self.file,
                        start,
                        "unterminated block comment",
                    ))
                }
            }
        }
    }

    /// Rest of the logical line; the terminating newline is left in place.
    fn directive_text(&mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(c) = self.peek(0) {
            match c {
                '\n' => break,
                '\\' if self.peek(1) == Some('\n') => {
                    self.bump();
                    self.bump();
                    text.push(' ');
                }
                '/' if self.peek(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek(1) == Some('*') => {
                    self.skip_block_comment()?;
                    text.push(' ');
                }
                _ => {
                    text.push(c);
                    self.bump();
                }
            }
        }
        Ok(text)
    }

    fn token(&mut self) -> Result<Tok> {
        let c = self.peek(0).ok_or_else(|| self.error("unexpected end of input"))?;
        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            let mut s = String::new();
            while let Some(c) = self.peek(0) {
                if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                    s.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return Ok(Tok::Ident(s));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
            let mut s = String::new();
            while let Some(c) = self.peek(0) {
                let hex = s.starts_with("0x") || s.starts_with("0X");
                let exponent_sign = (c == '+' || c == '-')
                    && if hex {
                        s.ends_with(['p', 'P'])
                    } else {
                        s.ends_with(['e', 'E'])
                    };
                if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                    s.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return Ok(Tok::Number(s));
        }
        if c == '"' || c == '\'' {
            return Ok(self.quoted(c));
        }
        if c == '.' && self.peek(1) == Some('.') && self.peek(2) == Some('.') {
            self.bump();
            self.bump();
            self.bump();
            return Ok(Tok::Ellipsis);
        }
        self.bump();
        Ok(Tok::Punct(c))
    }

    /// A string or character literal. A quote with no partner on its line
    /// comes back as a lone `Punct`; the parser rejects it if it survives
    /// preprocessing.
    fn quoted(&mut self, quote: char) -> Tok {
        let (start, line, col) = (self.i, self.line, self.col);
        self.bump();
        let mut s = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some('\\') if self.peek(0) == Some('\n') => {
                    self.bump();
                }
                Some('\\') => {
                    s.push('\\');
                    if let Some(escaped) = self.bump() {
                        s.push(escaped);
                    }
                }
                Some('\n') | None => {
                    self.i = start + 1;
                    self.line = line;
                    self.col = col + 1;
                    return Tok::Punct(quote);
                }
                Some(c) => s.push(c),
            }
        }
        if quote == '"' {
            Tok::Str(s)
        } else {
            Tok::Char(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        lex("t.h", src)
            .unwrap()
            .into_iter()
            .filter_map(|i| match i {
                Item::Token(t) => Some(t.tok),
                Item::Directive { .. } => None,
            })
            .collect()
    }

    #[test]
    fn lex_declaration() {
        assert_eq!(
            toks("int f(double *x, ...);"),
            vec![
                Tok::Ident("int".into()),
                Tok::Ident("f".into()),
                Tok::Punct('('),
                Tok::Ident("double".into()),
                Tok::Punct('*'),
                Tok::Ident("x".into()),
                Tok::Punct(','),
                Tok::Ellipsis,
                Tok::Punct(')'),
                Tok::Punct(';'),
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            toks("int /* a\nb */ x; // trailing\n"),
            vec![
                Tok::Ident("int".into()),
                Tok::Ident("x".into()),
                Tok::Punct(';'),
            ]
        );
    }

    #[test]
    fn positions_track_lines() {
        let items = lex("p.h", "\n\n  int y;").unwrap();
        match &items[0] {
            Item::Token(t) => assert_eq!(t.pos, Position::new("p.h", 3, 3)),
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[test]
    fn directives_are_collected() {
        let items = lex("d.h", "#define N \\\n 4 // four\nint a;").unwrap();
        match &items[0] {
            Item::Directive { text, pos } => {
                assert_eq!(text.split_whitespace().collect::<Vec<_>>(), ["define", "N", "4"]);
                assert_eq!(pos.line, 1);
            }
            other => panic!("expected directive, got {other:?}"),
        }
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn hash_inside_line_is_punct() {
        assert_eq!(toks("a # b"), vec![
            Tok::Ident("a".into()),
            Tok::Punct('#'),
            Tok::Ident("b".into()),
        ]);
    }

    #[test]
    fn numbers_and_literals() {
        assert_eq!(
            toks("1.5e-3 0x1F 'x' \"s\\\"q\""),
            vec![
                Tok::Number("1.5e-3".into()),
                Tok::Number("0x1F".into()),
                Tok::Char("x".into()),
                Tok::Str("s\\\"q".into()),
            ]
        );
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        assert!(matches!(lex("u.h", "int /* oops"), Err(FfiError::Parse { .. })));
    }

    #[test]
    fn hex_float_exponent_keeps_its_sign() {
        assert_eq!(
            toks("0x1p-3 0x1e-3 2E+8"),
            vec![
                Tok::Number("0x1p-3".into()),
                Tok::Number("0x1e".into()),
                Tok::Punct('-'),
                Tok::Number("3".into()),
                Tok::Number("2E+8".into()),
            ]
        );
    }

    #[test]
    fn unmatched_quote_is_a_lone_punct() {
        assert_eq!(
            toks("isn't\nint"),
            vec![
                Tok::Ident("isn".into()),
                Tok::Punct('\''),
                Tok::Ident("t".into()),
                Tok::Ident("int".into()),
            ]
        );
        let items = lex("u.h", "int a;\nchar *s = \"abc\n;").unwrap();
        let quote = items
            .iter()
            .find_map(|i| match i {
                Item::Token(t) if t.tok.is_punct('"') => Some(t.pos.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(quote, Position::new("u.h", 2, 11));
    }
}
