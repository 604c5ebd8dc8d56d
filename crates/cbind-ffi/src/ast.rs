//! Top-level syntax of a parsed translation unit.
//!
//! Only the external declarations are kept; function bodies, struct bodies
//! and initializer expressions are skipped by the parser and recorded as
//! flags.

use crate::ctype::{CType, Position};

/// Everything parsed from one set of input files, in source order.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub items: Vec<ExternalDeclaration>,
}

#[derive(Debug, Clone)]
pub enum ExternalDeclaration {
    /// A declaration ending in `;`, possibly with several declarators.
    Declaration(RawDeclaration),
    /// A function with a body.
    FunctionDefinition(FunctionDefinition),
    /// `_Static_assert(...)`.
    StaticAssert(Position),
}

impl ExternalDeclaration {
    pub fn position(&self) -> &Position {
        match self {
            ExternalDeclaration::Declaration(d) => &d.position,
            ExternalDeclaration::FunctionDefinition(f) => &f.position,
            ExternalDeclaration::StaticAssert(pos) => pos,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RawDeclaration {
    /// Position of the first specifier.
    pub position: Position,
    pub is_typedef: bool,
    /// Empty for declarations such as `struct s { int x; };`.
    pub declarators: Vec<InitDeclarator>,
}

#[derive(Debug, Clone)]
pub struct InitDeclarator {
    pub name: String,
    pub ty: CType,
    /// Position of the declared identifier.
    pub position: Position,
    pub has_initializer: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub name: String,
    pub ty: CType,
    pub position: Position,
}
