//! A small C preprocessor.
//!
//! Handles `#define`/`#undef` (object-like and function-like macros with
//! argument prescan, `#` stringizing, `##` pasting and a per-token hide
//! set), conditional compilation (`#if`, `#ifdef`, `#ifndef`, `#elif`,
//! `#else`, `#endif`) and `#include`. Every other directive is ignored.
//!
//! `#include "x.h"` is looked up next to the including file, then on the
//! search path; `#include <x.h>` only on the search path, and is skipped
//! when not found there. A file is entered at most once per translation
//! unit.
//!
//! A handful of compiler extensions (`__attribute__`, `__asm__`,
//! `__declspec`, ...) are predefined as function-like macros that expand to
//! nothing, so they vanish wherever they appear.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::iter::Peekable;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ctype::Position;
use crate::error::{FfiError, Result};
use crate::lex::{lex, lex_fragment, Item, Tok, Token};

const ERASED: &[&str] = &[
    "__attribute__",
    "__attribute",
    "__asm__",
    "__asm",
    "__declspec",
    "__typeof__",
];

#[derive(Debug, Clone)]
struct Macro {
    /// `None` for object-like macros.
    params: Option<Vec<String>>,
    variadic: bool,
    body: Vec<Token>,
}

/// Macro definitions shared across the files of one translation unit.
#[derive(Debug, Clone)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
}

impl Default for MacroTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroTable {
    /// A table holding only the erased compiler extensions.
    pub fn new() -> Self {
        let macros = ERASED
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    Macro {
                        params: Some(Vec::new()),
                        variadic: true,
                        body: Vec::new(),
                    },
                )
            })
            .collect();
        Self { macros }
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    fn define(&mut self, pos: &Position, rest: &str) -> Result<()> {
        let rest = rest.trim_start();
        let name_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        if name_len == 0 {
            return Err(FfiError::parse(&pos.file, pos.line, "#define without a name"));
        }
        let (name, after) = rest.split_at(name_len);

        let mut params = None;
        let mut variadic = false;
        let mut body_src = after;
        if let Some(list) = after.strip_prefix('(') {
            let close = list
                .find(')')
                .ok_or_else(|| FfiError::parse(&pos.file, pos.line, "unterminated macro parameters"))?;
            let mut names = Vec::new();
            for p in list[..close].split(',').map(str::trim).filter(|p| !p.is_empty()) {
                if p == "..." {
                    variadic = true;
                } else {
                    names.push(p.to_string());
                }
            }
            params = Some(names);
            body_src = &list[close + 1..];
        }

        let body = lex_fragment(&pos.file, pos.line, body_src)?;
        self.macros.insert(
            name.to_string(),
            Macro {
                params,
                variadic,
                body,
            },
        );
        Ok(())
    }
}

/// Include search state for one translation unit.
#[derive(Debug, Clone, Default)]
pub struct Includes {
    search: Vec<PathBuf>,
    entered: HashSet<PathBuf>,
}

impl Includes {
    pub fn new(search: Vec<PathBuf>) -> Self {
        Self {
            search,
            entered: HashSet::new(),
        }
    }

    /// Record `path` as entered. Returns `false` if it already was.
    pub fn enter(&mut self, path: &Path) -> bool {
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entered.insert(key)
    }

    fn resolve(&self, from: &str, name: &str, quoted: bool) -> Option<PathBuf> {
        let local = quoted.then(|| {
            Path::new(from)
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(name)
        });
        local
            .into_iter()
            .chain(self.search.iter().map(|dir| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }
}

#[derive(Debug, Clone, Copy)]
struct Cond {
    /// This branch is live (and so are all enclosing ones).
    active: bool,
    /// Some branch of this group has already been taken.
    taken: bool,
    parent_active: bool,
}

fn is_active(conds: &[Cond]) -> bool {
    conds.last().map_or(true, |c| c.active)
}

/// Run directives and macro expansion over one file's lexed items.
/// Included files are read, preprocessed and spliced in place.
pub fn preprocess(
    file: &str,
    items: Vec<Item>,
    macros: &mut MacroTable,
    includes: &mut Includes,
) -> Result<Vec<Token>> {
    let mut out = Vec::new();
    let mut conds: Vec<Cond> = Vec::new();
    let mut items = items.into_iter().peekable();

    while let Some(item) = items.next() {
        match item {
            Item::Directive { text, pos } => {
                if let Some(path) = directive(&text, &pos, macros, includes, &mut conds)? {
                    out.extend(include(&path, &pos, macros, includes)?);
                }
            }
            Item::Token(tok) => {
                if is_active(&conds) {
                    expand(tok, &mut items, macros, &mut out)?;
                }
            }
        }
    }

    if !conds.is_empty() {
        return Err(FfiError::parse(file, 0, "unterminated conditional directive"));
    }
    Ok(out)
}

fn include(
    path: &Path,
    from: &Position,
    macros: &mut MacroTable,
    includes: &mut Includes,
) -> Result<Vec<Token>> {
    let file = path.display().to_string();
    let source = std::fs::read_to_string(path).map_err(|e| {
        FfiError::parse(&from.file, from.line, format!("cannot read {file}: {e}"))
    })?;
    debug!(file = %file, from = %from, "including");
    preprocess(&file, lex(&file, &source)?, macros, includes)
}

/// Apply one directive. Returns the file to splice in for an `#include`.
fn directive(
    text: &str,
    pos: &Position,
    macros: &mut MacroTable,
    includes: &mut Includes,
    conds: &mut Vec<Cond>,
) -> Result<Option<PathBuf>> {
    let text = text.trim();
    let name_len = text
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(text.len());
    let (name, rest) = text.split_at(name_len);
    let active = is_active(conds);

    match name {
        "define" if active => macros.define(pos, rest)?,
        "undef" if active => {
            macros.macros.remove(rest.trim());
        }
        "include" if active => return include_target(pos, rest, includes),
        "ifdef" | "ifndef" => {
            let defined = macros.is_defined(rest.trim());
            let live = active && (defined == (name == "ifdef"));
            conds.push(Cond {
                active: live,
                taken: live,
                parent_active: active,
            });
        }
        "if" => {
            let live = active && eval_condition(pos, rest, macros)?;
            conds.push(Cond {
                active: live,
                taken: live,
                parent_active: active,
            });
        }
        "elif" => {
            let top = *conds
                .last()
                .ok_or_else(|| FfiError::parse(&pos.file, pos.line, "#elif without #if"))?;
            let live = top.parent_active && !top.taken && eval_condition(pos, rest, macros)?;
            if let Some(c) = conds.last_mut() {
                c.active = live;
                c.taken |= live;
            }
        }
        "else" => {
            let c = conds
                .last_mut()
                .ok_or_else(|| FfiError::parse(&pos.file, pos.line, "#else without #if"))?;
            c.active = c.parent_active && !c.taken;
            c.taken = true;
        }
        "endif" => {
            conds
                .pop()
                .ok_or_else(|| FfiError::parse(&pos.file, pos.line, "#endif without #if"))?;
        }
        _ => {}
    }
    Ok(None)
}

fn include_target(pos: &Position, rest: &str, includes: &mut Includes) -> Result<Option<PathBuf>> {
    let rest = rest.trim();
    let (name, quoted) = match rest.chars().next() {
        Some('"') => (rest[1..].split_once('"').map(|(n, _)| n), true),
        Some('<') => (rest[1..].split_once('>').map(|(n, _)| n), false),
        _ => {
            debug!(at = %pos, "skipping computed #include");
            return Ok(None);
        }
    };
    let name = name.ok_or_else(|| FfiError::parse(&pos.file, pos.line, "malformed #include"))?;

    match includes.resolve(&pos.file, name, quoted) {
        Some(path) if includes.enter(&path) => Ok(Some(path)),
        Some(path) => {
            debug!(file = %path.display(), "already included");
            Ok(None)
        }
        None if quoted => Err(FfiError::parse(
            &pos.file,
            pos.line,
            format!("cannot find include file \"{name}\""),
        )),
        None => {
            debug!(header = name, "system header not on the search path");
            Ok(None)
        }
    }
}

/// A token with the names of the macros that may not expand it again.
type Hidden = (Token, Vec<String>);

/// Pull the next token for macro argument collection: rescanned tokens
/// first, then the file. Directives inside an invocation are skipped.
fn next_token<I: Iterator<Item = Item>>(
    pending: &mut VecDeque<Hidden>,
    items: &mut Peekable<I>,
) -> Option<Hidden> {
    if let Some(next) = pending.pop_front() {
        return Some(next);
    }
    items.find_map(|item| match item {
        Item::Token(t) => Some((t, Vec::new())),
        Item::Directive { .. } => None,
    })
}

fn next_is_open_paren<I: Iterator<Item = Item>>(
    pending: &VecDeque<Hidden>,
    items: &mut Peekable<I>,
) -> bool {
    match pending.front() {
        Some((t, _)) => t.tok.is_punct('('),
        None => matches!(items.peek(), Some(Item::Token(t)) if t.tok.is_punct('(')),
    }
}

fn expand<I: Iterator<Item = Item>>(
    tok: Token,
    items: &mut Peekable<I>,
    macros: &MacroTable,
    out: &mut Vec<Token>,
) -> Result<()> {
    let mut pending = VecDeque::from([(tok, Vec::new())]);
    let expanded = rescan(&mut pending, items, macros)?;
    out.extend(expanded.into_iter().map(|(t, _)| t));
    Ok(())
}

/// Expand everything in `pending`, reading from `items` only to finish a
/// macro invocation.
fn rescan<I: Iterator<Item = Item>>(
    pending: &mut VecDeque<Hidden>,
    items: &mut Peekable<I>,
    macros: &MacroTable,
) -> Result<Vec<Hidden>> {
    let mut out = Vec::new();
    while let Some((tok, hide)) = pending.pop_front() {
        let Some(name) = tok.tok.ident() else {
            out.push((tok, hide));
            continue;
        };
        let Some(mac) = macros.macros.get(name).filter(|_| !hide.iter().any(|h| h == name))
        else {
            out.push((tok, hide));
            continue;
        };
        if mac.params.is_some() && !next_is_open_paren(pending, items) {
            out.push((tok, hide));
            continue;
        }

        let mut hidden = hide;
        hidden.push(name.to_string());
        let args = match mac.params {
            Some(_) => collect_args(&tok, pending, items)?,
            None => Vec::new(),
        };
        let prescanned = args
            .iter()
            .map(|arg| {
                let mut arg_pending: VecDeque<Hidden> = arg.iter().cloned().collect();
                rescan(&mut arg_pending, &mut std::iter::empty().peekable(), macros)
            })
            .collect::<Result<Vec<_>>>()?;

        let replacement = substitute(mac, &args, &prescanned, &hidden)?;
        for (t, h) in replacement.into_iter().rev() {
            let relocated = Token {
                tok: t.tok,
                pos: tok.pos.clone(),
            };
            pending.push_front((relocated, h));
        }
    }
    Ok(out)
}

fn collect_args<I: Iterator<Item = Item>>(
    call: &Token,
    pending: &mut VecDeque<Hidden>,
    items: &mut Peekable<I>,
) -> Result<Vec<Vec<Hidden>>> {
    // Opening parenthesis.
    next_token(pending, items);

    let mut args = vec![Vec::new()];
    let mut depth = 0usize;
    loop {
        let next = next_token(pending, items).ok_or_else(|| {
            FfiError::parse(&call.pos.file, call.pos.line, "unterminated macro invocation")
        })?;
        match &next.0.tok {
            Tok::Punct('(') => depth += 1,
            Tok::Punct(')') if depth == 0 => break,
            Tok::Punct(')') => depth -= 1,
            Tok::Punct(',') if depth == 0 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = args.last_mut() {
            last.push(next);
        }
    }
    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    Ok(args)
}

/// The replacement list of `mac` with its parameters filled in. Operands
/// of `#` and `##` take the argument as written; every other use takes the
/// prescanned argument.
fn substitute(
    mac: &Macro,
    args: &[Vec<Hidden>],
    prescanned: &[Vec<Hidden>],
    hidden: &[String],
) -> Result<Vec<Hidden>> {
    let params: &[String] = mac.params.as_deref().unwrap_or_default();
    let arg_for = |name: &str, from: &[Vec<Hidden>]| -> Option<Vec<Hidden>> {
        if let Some(i) = params.iter().position(|p| p == name) {
            return Some(from.get(i).cloned().unwrap_or_default());
        }
        if mac.variadic && name == "__VA_ARGS__" {
            let mut joined = Vec::new();
            for (i, arg) in from.iter().skip(params.len()).enumerate() {
                if i > 0 {
                    if let Some((first, _)) = arg.first() {
                        let comma = Token {
                            tok: Tok::Punct(','),
                            pos: first.pos.clone(),
                        };
                        joined.push((comma, Vec::new()));
                    }
                }
                joined.extend(arg.iter().cloned());
            }
            return Some(joined);
        }
        None
    };

    let body = &mac.body;
    let is_paste = |i: usize| {
        body.get(i).is_some_and(|t| t.tok.is_punct('#'))
            && body.get(i + 1).is_some_and(|t| t.tok.is_punct('#'))
    };

    let mut out: Vec<Hidden> = Vec::new();
    let mut paste_next = false;
    let mut i = 0;
    while i < body.len() {
        if is_paste(i) {
            paste_next = true;
            i += 2;
            continue;
        }
        let t = &body[i];
        let verbatim = paste_next || is_paste(i + 1);

        let stringized = match &t.tok {
            Tok::Punct('#') if mac.params.is_some() => body
                .get(i + 1)
                .and_then(|n| n.tok.ident())
                .and_then(|n| arg_for(n, args)),
            _ => None,
        };
        let piece: Vec<Hidden> = if let Some(arg) = stringized {
            i += 1;
            let text = Token {
                tok: Tok::Str(stringize(&arg)),
                pos: t.pos.clone(),
            };
            vec![(text, hidden.to_vec())]
        } else if let Some(arg) = t
            .tok
            .ident()
            .and_then(|n| arg_for(n, if verbatim { args } else { prescanned }))
        {
            arg.into_iter()
                .map(|(tok, mut h)| {
                    for name in hidden {
                        if !h.contains(name) {
                            h.push(name.clone());
                        }
                    }
                    (tok, h)
                })
                .collect()
        } else {
            vec![(t.clone(), hidden.to_vec())]
        };

        if paste_next {
            // `, ## __VA_ARGS__` drops the comma when there are no variadic arguments.
            let empty_va = piece.is_empty() && t.tok.ident() == Some("__VA_ARGS__");
            if empty_va && out.last().is_some_and(|(l, _)| l.tok.is_punct(',')) {
                out.pop();
            }
            paste(&mut out, piece)?;
            paste_next = false;
        } else {
            out.extend(piece);
        }
        i += 1;
    }
    Ok(out)
}

/// Join the last token of `out` with the first of `right` and re-lex the
/// spelling.
fn paste(out: &mut Vec<Hidden>, right: Vec<Hidden>) -> Result<()> {
    let mut right = right.into_iter();
    let Some(first) = right.next() else {
        return Ok(());
    };
    match out.pop() {
        None => out.push(first),
        Some((left, hide)) => {
            let text = format!("{}{}", spell(&left), spell(&first.0));
            for tok in lex_fragment(&left.pos.file, left.pos.line, &text)? {
                out.push((tok, hide.clone()));
            }
        }
    }
    out.extend(right);
    Ok(())
}

fn stringize(arg: &[Hidden]) -> String {
    arg.iter()
        .map(|(t, _)| match t.tok {
            Tok::Str(_) | Tok::Char(_) => spell(t).replace('\\', "\\\\").replace('"', "\\\""),
            _ => spell(t),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn spell(t: &Token) -> String {
    match &t.tok {
        Tok::Ident(s) | Tok::Number(s) => s.clone(),
        Tok::Str(s) => format!("\"{s}\""),
        Tok::Char(s) => format!("'{s}'"),
        Tok::Punct(c) => c.to_string(),
        Tok::Ellipsis => "...".to_string(),
    }
}

fn eval_condition(pos: &Position, expr: &str, macros: &MacroTable) -> Result<bool> {
    let raw = lex_fragment(&pos.file, pos.line, expr)?;

    // `defined` must be resolved before expansion.
    let mut resolved = Vec::new();
    let mut it = raw.into_iter().peekable();
    while let Some(t) = it.next() {
        if t.tok.ident() != Some("defined") {
            resolved.push(Item::Token(t));
            continue;
        }
        let parenthesized = it.next_if(|n| n.tok.is_punct('(')).is_some();
        let name = it
            .next()
            .and_then(|n| n.tok.ident().map(str::to_string))
            .ok_or_else(|| FfiError::parse(&pos.file, pos.line, "malformed defined()"))?;
        if parenthesized && it.next_if(|n| n.tok.is_punct(')')).is_none() {
            return Err(FfiError::parse(&pos.file, pos.line, "malformed defined()"));
        }
        let value = if macros.is_defined(&name) { "1" } else { "0" };
        resolved.push(Item::Token(Token {
            tok: Tok::Number(value.into()),
            pos: t.pos,
        }));
    }

    let mut expanded = Vec::new();
    let mut items = resolved.into_iter().peekable();
    while let Some(item) = items.next() {
        if let Item::Token(t) = item {
            expand(t, &mut items, macros, &mut expanded)?;
        }
    }

    let toks: Vec<Tok> = expanded.into_iter().map(|t| t.tok).collect();
    let mut eval = CondEval {
        toks: &toks,
        i: 0,
        unevaluated: 0,
    };
    let value = eval
        .conditional()
        .map_err(|detail| FfiError::parse(&pos.file, pos.line, detail))?;
    if eval.i != toks.len() {
        return Err(FfiError::parse(&pos.file, pos.line, "trailing tokens in #if"));
    }
    Ok(value.is_true())
}

/// An `#if` operand: 64 bits, signed unless a literal made it unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Value {
    bits: u64,
    unsigned: bool,
}

impl Value {
    fn signed(v: i64) -> Self {
        Self {
            bits: v as u64,
            unsigned: false,
        }
    }

    fn truth(b: bool) -> Self {
        Self::signed(i64::from(b))
    }

    fn is_true(self) -> bool {
        self.bits != 0
    }

    /// Result of a binary arithmetic operator on `self` and `r`.
    fn with(self, r: Value, bits: u64) -> Self {
        Self {
            bits,
            unsigned: self.unsigned || r.unsigned,
        }
    }

    fn compare(self, r: Value) -> Ordering {
        if self.unsigned || r.unsigned {
            self.bits.cmp(&r.bits)
        } else {
            (self.bits as i64).cmp(&(r.bits as i64))
        }
    }
}

/// Integer evaluation of `#if` expressions. Identifiers left after
/// expansion evaluate to 0.
struct CondEval<'a> {
    toks: &'a [Tok],
    i: usize,
    /// Depth of short-circuited operands; division by zero is not an
    /// error inside one.
    unevaluated: u32,
}

type EvalResult = std::result::Result<Value, String>;

impl CondEval<'_> {
    fn punct_at(&self, n: usize, c: char) -> bool {
        self.toks.get(self.i + n).is_some_and(|t| t.is_punct(c))
    }

    fn eat(&mut self, ops: &str) -> bool {
        let matched = ops.chars().enumerate().all(|(n, c)| self.punct_at(n, c));
        if matched {
            self.i += ops.chars().count();
        }
        matched
    }

    fn guarded(&mut self, skipped: bool, operand: fn(&mut Self) -> EvalResult) -> EvalResult {
        self.unevaluated += u32::from(skipped);
        let v = operand(self);
        self.unevaluated -= u32::from(skipped);
        v
    }

    fn conditional(&mut self) -> EvalResult {
        let cond = self.or()?;
        if !self.eat("?") {
            return Ok(cond);
        }
        let yes = self.guarded(!cond.is_true(), Self::conditional)?;
        if !self.eat(":") {
            return Err("expected ':' in #if".into());
        }
        let no = self.guarded(cond.is_true(), Self::conditional)?;
        let chosen = if cond.is_true() { yes } else { no };
        Ok(Value {
            bits: chosen.bits,
            unsigned: yes.unsigned || no.unsigned,
        })
    }

    fn or(&mut self) -> EvalResult {
        let mut v = self.and()?;
        while self.eat("||") {
            let r = self.guarded(v.is_true(), Self::and)?;
            v = Value::truth(v.is_true() || r.is_true());
        }
        Ok(v)
    }

    fn and(&mut self) -> EvalResult {
        let mut v = self.bit_or()?;
        while self.eat("&&") {
            let r = self.guarded(!v.is_true(), Self::bit_or)?;
            v = Value::truth(v.is_true() && r.is_true());
        }
        Ok(v)
    }

    fn bit_or(&mut self) -> EvalResult {
        let mut v = self.bit_xor()?;
        while !self.punct_at(1, '|') && self.eat("|") {
            let r = self.bit_xor()?;
            v = v.with(r, v.bits | r.bits);
        }
        Ok(v)
    }

    fn bit_xor(&mut self) -> EvalResult {
        let mut v = self.bit_and()?;
        while self.eat("^") {
            let r = self.bit_and()?;
            v = v.with(r, v.bits ^ r.bits);
        }
        Ok(v)
    }

    fn bit_and(&mut self) -> EvalResult {
        let mut v = self.equality()?;
        while !self.punct_at(1, '&') && self.eat("&") {
            let r = self.equality()?;
            v = v.with(r, v.bits & r.bits);
        }
        Ok(v)
    }

    fn equality(&mut self) -> EvalResult {
        let mut v = self.relational()?;
        loop {
            if self.eat("==") {
                v = Value::truth(v.compare(self.relational()?) == Ordering::Equal);
            } else if self.eat("!=") {
                v = Value::truth(v.compare(self.relational()?) != Ordering::Equal);
            } else {
                return Ok(v);
            }
        }
    }

    fn relational(&mut self) -> EvalResult {
        let mut v = self.shift()?;
        loop {
            if self.eat("<=") {
                v = Value::truth(v.compare(self.shift()?) != Ordering::Greater);
            } else if self.eat(">=") {
                v = Value::truth(v.compare(self.shift()?) != Ordering::Less);
            } else if self.eat("<") {
                v = Value::truth(v.compare(self.shift()?) == Ordering::Less);
            } else if self.eat(">") {
                v = Value::truth(v.compare(self.shift()?) == Ordering::Greater);
            } else {
                return Ok(v);
            }
        }
    }

    /// The result keeps the left operand's signedness.
    fn shift(&mut self) -> EvalResult {
        let mut v = self.additive()?;
        loop {
            if self.eat("<<") {
                let r = self.additive()?;
                v.bits = v.bits.wrapping_shl(r.bits as u32);
            } else if self.eat(">>") {
                let r = self.additive()?;
                v.bits = if v.unsigned {
                    v.bits.wrapping_shr(r.bits as u32)
                } else {
                    (v.bits as i64).wrapping_shr(r.bits as u32) as u64
                };
            } else {
                return Ok(v);
            }
        }
    }

    fn additive(&mut self) -> EvalResult {
        let mut v = self.multiplicative()?;
        loop {
            if self.eat("+") {
                let r = self.multiplicative()?;
                v = v.with(r, v.bits.wrapping_add(r.bits));
            } else if self.eat("-") {
                let r = self.multiplicative()?;
                v = v.with(r, v.bits.wrapping_sub(r.bits));
            } else {
                return Ok(v);
            }
        }
    }

    fn multiplicative(&mut self) -> EvalResult {
        let mut v = self.unary()?;
        loop {
            if self.eat("*") {
                let r = self.unary()?;
                v = v.with(r, v.bits.wrapping_mul(r.bits));
            } else if self.eat("/") || self.eat("%") {
                let is_div = self.toks[self.i - 1].is_punct('/');
                let r = self.unary()?;
                if r.bits == 0 {
                    if self.unevaluated == 0 {
                        return Err("division by zero in #if".into());
                    }
                    v = v.with(r, 0);
                    continue;
                }
                let bits = match (v.unsigned || r.unsigned, is_div) {
                    (true, true) => v.bits / r.bits,
                    (true, false) => v.bits % r.bits,
                    (false, true) => (v.bits as i64).wrapping_div(r.bits as i64) as u64,
                    (false, false) => (v.bits as i64).wrapping_rem(r.bits as i64) as u64,
                };
                v = v.with(r, bits);
            } else {
                return Ok(v);
            }
        }
    }

    fn unary(&mut self) -> EvalResult {
        if self.eat("!") {
            return Ok(Value::truth(!self.unary()?.is_true()));
        }
        if self.eat("-") {
            let v = self.unary()?;
            return Ok(Value {
                bits: v.bits.wrapping_neg(),
                ..v
            });
        }
        if self.eat("+") {
            return self.unary();
        }
        if self.eat("~") {
            let v = self.unary()?;
            return Ok(Value { bits: !v.bits, ..v });
        }
        self.primary()
    }

    fn primary(&mut self) -> EvalResult {
        if self.eat("(") {
            let v = self.conditional()?;
            if !self.eat(")") {
                return Err("expected ')' in #if".into());
            }
            return Ok(v);
        }
        let tok = self
            .toks
            .get(self.i)
            .ok_or_else(|| "unexpected end of #if expression".to_string())?;
        self.i += 1;
        match tok {
            Tok::Number(n) => {
                let bits = parse_int(n).ok_or_else(|| format!("bad integer '{n}' in #if"))?;
                Ok(Value {
                    bits,
                    unsigned: n.contains(['u', 'U']) || bits > i64::MAX as u64,
                })
            }
            Tok::Char(c) => Ok(Value::signed(c.chars().last().map_or(0, |ch| ch as i64))),
            Tok::Ident(_) => Ok(Value::signed(0)),
            other => Err(format!("unexpected {other:?} in #if")),
        }
    }
}

/// Value of an integer literal, suffixes ignored.
pub(crate) fn parse_int(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return u64::from_str_radix(&digits[1..], 8).ok();
    }
    digits.parse().ok()
}
