//! Resolved C types.
//!
//! Typedef names are already resolved away by the parser and qualifiers are
//! dropped, so a [`CType`] describes only the shape that matters for binding:
//! its primitive kind, pointer/array structure, tag, and function signature.

use std::fmt;
use std::str::FromStr;

use cbind_targets::{ModelItem, PrimitiveKind, TypeModel};
use serde::Serialize;

/// Coarse classification of a resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    /// A primitive kind; pointers report `Primitive(PrimitiveKind::Ptr)`.
    Primitive(PrimitiveKind),
    Enum,
    Struct,
    Union,
    Array,
    Function,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Primitive(p) => write!(f, "{p}"),
            Kind::Enum => f.write_str("enum"),
            Kind::Struct => f.write_str("struct"),
            Kind::Union => f.write_str("union"),
            Kind::Array => f.write_str("array"),
            Kind::Function => f.write_str("function"),
        }
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "enum" => Ok(Kind::Enum),
            "struct" => Ok(Kind::Struct),
            "union" => Ok(Kind::Union),
            "array" => Ok(Kind::Array),
            "function" => Ok(Kind::Function),
            other => other.parse().map(Kind::Primitive),
        }
    }
}

/// Source position of a declaration or token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    /// File path as given to the parser.
    pub file: String,
    /// 1-based line.
    pub line: u32,
    /// 1-based column.
    pub column: u32,
}

impl Position {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A function parameter. The name is empty for unnamed parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: CType,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Kind of the parameter's type.
    pub fn kind(&self) -> Kind {
        self.ty.kind()
    }

    /// Pointee of a pointer parameter or element of an array parameter.
    pub fn element(&self) -> Option<&CType> {
        self.ty.element()
    }
}

/// A function signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub result: CType,
    pub params: Vec<Parameter>,
    pub variadic: bool,
}

/// A resolved C type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CType {
    /// Any primitive other than [`PrimitiveKind::Ptr`].
    Primitive(PrimitiveKind),
    Pointer(Box<CType>),
    Array {
        element: Box<CType>,
        length: Option<u64>,
    },
    /// Enum type; the tag is empty for anonymous enums.
    Enum { tag: String },
    Struct { tag: String },
    Union { tag: String },
    Function(Box<FunctionType>),
}

impl CType {
    pub fn pointer_to(inner: CType) -> Self {
        CType::Pointer(Box::new(inner))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, CType::Primitive(PrimitiveKind::Void))
    }

    pub fn kind(&self) -> Kind {
        match self {
            CType::Primitive(p) => Kind::Primitive(*p),
            CType::Pointer(_) => Kind::Primitive(PrimitiveKind::Ptr),
            CType::Array { .. } => Kind::Array,
            CType::Enum { .. } => Kind::Enum,
            CType::Struct { .. } => Kind::Struct,
            CType::Union { .. } => Kind::Union,
            CType::Function(_) => Kind::Function,
        }
    }

    /// Pointee of a pointer, or element of an array.
    pub fn element(&self) -> Option<&CType> {
        match self {
            CType::Pointer(inner) => Some(inner),
            CType::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Declared name of an enum, struct or union.
    pub fn tag(&self) -> Option<&str> {
        match self {
            CType::Enum { tag } | CType::Struct { tag } | CType::Union { tag } => Some(tag),
            _ => None,
        }
    }

    /// The signature of a function type.
    pub fn function(&self) -> Option<&FunctionType> {
        match self {
            CType::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Size and alignment under `model`.
    ///
    /// Struct and union bodies are not modeled and functions have no size,
    /// so those (and arrays of them, or arrays of unknown length) yield `None`.
    pub fn layout(&self, model: &TypeModel) -> Option<ModelItem> {
        match self {
            CType::Primitive(p) => Some(model.item(*p)),
            CType::Pointer(_) => Some(model.item(PrimitiveKind::Ptr)),
            CType::Enum { .. } => Some(model.item(PrimitiveKind::Int)),
            CType::Array { element, length } => {
                let item = element.layout(model)?;
                let n = u32::try_from((*length)?).ok()?;
                Some(ModelItem {
                    size: item.size.checked_mul(n)?,
                    ..item
                })
            }
            CType::Struct { .. } | CType::Union { .. } | CType::Function(_) => None,
        }
    }
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CType::Primitive(p) => write!(f, "{p}"),
            CType::Pointer(inner) => write!(f, "{inner}*"),
            CType::Array {
                element,
                length: Some(n),
            } => write!(f, "{element}[{n}]"),
            CType::Array { element, .. } => write!(f, "{element}[]"),
            CType::Enum { tag } if tag.is_empty() => f.write_str("enum <anonymous>"),
            CType::Enum { tag } => write!(f, "enum {tag}"),
            CType::Struct { tag } => write!(f, "struct {tag}"),
            CType::Union { tag } => write!(f, "union {tag}"),
            CType::Function(func) => {
                write!(f, "{}(", func.result)?;
                for (i, p) in func.params.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", p.ty)?;
                }
                if func.variadic {
                    if !func.params.is_empty() {
                        f.write_str(", ")?;
                    }
                    f.write_str("...")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_reports_ptr_kind() {
        let ty = CType::pointer_to(CType::Primitive(PrimitiveKind::Double));
        assert_eq!(ty.kind(), Kind::Primitive(PrimitiveKind::Ptr));
        assert_eq!(
            ty.element(),
            Some(&CType::Primitive(PrimitiveKind::Double))
        );
        assert_eq!(ty.to_string(), "double*");
    }

    #[test]
    fn tags() {
        let e = CType::Enum {
            tag: "Color".into(),
        };
        assert_eq!(e.kind(), Kind::Enum);
        assert_eq!(e.tag(), Some("Color"));
        assert_eq!(CType::Primitive(PrimitiveKind::Int).tag(), None);
        assert_eq!(CType::Enum { tag: String::new() }.to_string(), "enum <anonymous>");
    }

    #[test]
    fn layout_under_models() {
        let lp64 = TypeModel::new(8, 8);
        let ilp32 = TypeModel::new(4, 4);
        let ptr = CType::pointer_to(CType::Primitive(PrimitiveKind::Char));
        assert_eq!(ptr.layout(&lp64).unwrap().size, 8);
        assert_eq!(ptr.layout(&ilp32).unwrap().size, 4);

        let arr = CType::Array {
            element: Box::new(CType::Primitive(PrimitiveKind::Short)),
            length: Some(5),
        };
        let item = arr.layout(&lp64).unwrap();
        assert_eq!((item.size, item.align), (10, 2));

        let open = CType::Array {
            element: Box::new(CType::Primitive(PrimitiveKind::Short)),
            length: None,
        };
        assert!(open.layout(&lp64).is_none());
        assert!(CType::Struct { tag: "s".into() }.layout(&lp64).is_none());
    }

    #[test]
    fn function_display() {
        let f = CType::Function(Box::new(FunctionType {
            result: CType::Primitive(PrimitiveKind::Int),
            params: vec![Parameter::new(
                "fmt",
                CType::pointer_to(CType::Primitive(PrimitiveKind::Char)),
            )],
            variadic: true,
        }));
        assert_eq!(f.to_string(), "int(char*, ...)");
        assert_eq!(f.kind(), Kind::Function);
    }

    #[test]
    fn kind_spellings() {
        assert_eq!("enum".parse(), Ok(Kind::Enum));
        assert_eq!(
            "unsigned long".parse(),
            Ok(Kind::Primitive(PrimitiveKind::ULong))
        );
        assert!("widget".parse::<Kind>().is_err());
    }

    #[test]
    fn positions_order_by_file_then_line() {
        let a = Position::new("a.h", 100, 1);
        let b = Position::new("b.h", 5, 1);
        assert!(a < b);
        assert!(Position::new("a.h", 2, 9) < Position::new("a.h", 3, 1));
    }
}
