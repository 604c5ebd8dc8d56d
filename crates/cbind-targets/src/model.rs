//! Size and alignment of the primitive C kinds for a target.
//!
//! Everything here is derived from two numbers: the pointer width and the
//! width of `long`. The remaining kinds have the same layout on every
//! platform cbind models (`long double` is treated as an 8-byte double).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The primitive kinds a C type can bottom out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimitiveKind {
    /// Any object or function pointer.
    Ptr,
    /// Pointer-sized unsigned integer (`uintptr_t`, `size_t`).
    UintPtr,
    Void,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Float,
    Double,
    LongDouble,
    Bool,
    FloatComplex,
    DoubleComplex,
    LongDoubleComplex,
}

impl PrimitiveKind {
    /// Every primitive kind, in declaration order.
    pub const ALL: [PrimitiveKind; 21] = [
        PrimitiveKind::Ptr,
        PrimitiveKind::UintPtr,
        PrimitiveKind::Void,
        PrimitiveKind::Char,
        PrimitiveKind::SChar,
        PrimitiveKind::UChar,
        PrimitiveKind::Short,
        PrimitiveKind::UShort,
        PrimitiveKind::Int,
        PrimitiveKind::UInt,
        PrimitiveKind::Long,
        PrimitiveKind::ULong,
        PrimitiveKind::LongLong,
        PrimitiveKind::ULongLong,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::LongDouble,
        PrimitiveKind::Bool,
        PrimitiveKind::FloatComplex,
        PrimitiveKind::DoubleComplex,
        PrimitiveKind::LongDoubleComplex,
    ];

    /// The C spelling of this kind, as used in override tables.
    pub fn spelling(self) -> &'static str {
        match self {
            PrimitiveKind::Ptr => "pointer",
            PrimitiveKind::UintPtr => "uintptr_t",
            PrimitiveKind::Void => "void",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SChar => "signed char",
            PrimitiveKind::UChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::ULong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::ULongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
            PrimitiveKind::Bool => "_Bool",
            PrimitiveKind::FloatComplex => "float _Complex",
            PrimitiveKind::DoubleComplex => "double _Complex",
            PrimitiveKind::LongDoubleComplex => "long double _Complex",
        }
    }

    /// Whether this is one of the three complex floating kinds.
    pub fn is_complex(self) -> bool {
        matches!(
            self,
            PrimitiveKind::FloatComplex
                | PrimitiveKind::DoubleComplex
                | PrimitiveKind::LongDoubleComplex
        )
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spelling())
    }
}

impl FromStr for PrimitiveKind {
    type Err = String;

    /// Parse a C spelling. Interior whitespace is normalized, and the common
    /// aliases `bool`, `size_t` and `<type> complex` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = normalized.replace(" complex", " _Complex");
        let kind = match normalized.as_str() {
            "bool" => Some(PrimitiveKind::Bool),
            "size_t" => Some(PrimitiveKind::UintPtr),
            other => PrimitiveKind::ALL
                .into_iter()
                .find(|k| k.spelling() == other),
        };
        kind.ok_or_else(|| format!("unknown primitive kind '{s}'"))
    }
}

/// Layout of a single primitive kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModelItem {
    /// Size in bytes.
    pub size: u32,
    /// Alignment in bytes as a standalone object.
    pub align: u32,
    /// Alignment in bytes as a struct member.
    pub struct_align: u32,
}

impl ModelItem {
    fn uniform(n: u32) -> Self {
        Self {
            size: n,
            align: n,
            struct_align: n,
        }
    }
}

/// The primitive type model of a target.
///
/// Immutable once built; construction is total for any pair of widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TypeModel {
    /// Width of a pointer in bytes.
    pub pointer_bytes: u32,
    /// Width of `long` in bytes.
    pub long_bytes: u32,
}

impl TypeModel {
    /// Build a model from the pointer width and native `long` width.
    pub fn new(pointer_bytes: u32, long_bytes: u32) -> Self {
        Self {
            pointer_bytes,
            long_bytes,
        }
    }

    /// The model of the machine cbind itself is running on.
    pub fn host() -> Self {
        Self::new(
            std::mem::size_of::<usize>() as u32,
            std::mem::size_of::<std::ffi::c_long>() as u32,
        )
    }

    /// Layout of `kind` under this model.
    pub fn item(&self, kind: PrimitiveKind) -> ModelItem {
        match kind {
            PrimitiveKind::Ptr | PrimitiveKind::UintPtr => ModelItem::uniform(self.pointer_bytes),
            PrimitiveKind::Void => ModelItem {
                size: 0,
                align: 1,
                struct_align: 1,
            },
            PrimitiveKind::Char | PrimitiveKind::SChar | PrimitiveKind::UChar => {
                ModelItem::uniform(1)
            }
            PrimitiveKind::Bool => ModelItem::uniform(1),
            PrimitiveKind::Short | PrimitiveKind::UShort => ModelItem::uniform(2),
            PrimitiveKind::Int | PrimitiveKind::UInt => ModelItem::uniform(4),
            PrimitiveKind::Long | PrimitiveKind::ULong => ModelItem::uniform(self.long_bytes),
            PrimitiveKind::LongLong | PrimitiveKind::ULongLong => ModelItem::uniform(8),
            PrimitiveKind::Float => ModelItem::uniform(4),
            PrimitiveKind::Double | PrimitiveKind::LongDouble => ModelItem::uniform(8),
            PrimitiveKind::FloatComplex => ModelItem::uniform(8),
            PrimitiveKind::DoubleComplex | PrimitiveKind::LongDoubleComplex => {
                ModelItem::uniform(16)
            }
        }
    }

    /// The full table, one row per primitive kind.
    pub fn items(&self) -> impl Iterator<Item = (PrimitiveKind, ModelItem)> + '_ {
        PrimitiveKind::ALL.into_iter().map(|k| (k, self.item(k)))
    }

    /// The unsigned kind whose width matches a pointer, used for `size_t`.
    pub fn pointer_sized_unsigned(&self) -> PrimitiveKind {
        if self.long_bytes == self.pointer_bytes {
            PrimitiveKind::ULong
        } else if self.pointer_bytes == 4 {
            PrimitiveKind::UInt
        } else {
            PrimitiveKind::ULongLong
        }
    }

    /// The signed kind whose width matches a pointer, used for `ptrdiff_t`.
    pub fn pointer_sized_signed(&self) -> PrimitiveKind {
        match self.pointer_sized_unsigned() {
            PrimitiveKind::ULong => PrimitiveKind::Long,
            PrimitiveKind::UInt => PrimitiveKind::Int,
            _ => PrimitiveKind::LongLong,
        }
    }
}

impl Default for TypeModel {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lp64_layout() {
        let m = TypeModel::new(8, 8);
        assert_eq!(m.item(PrimitiveKind::Ptr).size, 8);
        assert_eq!(m.item(PrimitiveKind::Long).size, 8);
        assert_eq!(m.item(PrimitiveKind::Int).size, 4);
        assert_eq!(m.item(PrimitiveKind::LongLong).align, 8);
        assert_eq!(m.pointer_sized_unsigned(), PrimitiveKind::ULong);
    }

    #[test]
    fn llp64_layout() {
        let m = TypeModel::new(8, 4);
        assert_eq!(m.item(PrimitiveKind::Long).size, 4);
        assert_eq!(m.item(PrimitiveKind::UintPtr).size, 8);
        assert_eq!(m.pointer_sized_unsigned(), PrimitiveKind::ULongLong);
        assert_eq!(m.pointer_sized_signed(), PrimitiveKind::LongLong);
    }

    #[test]
    fn ilp32_layout() {
        let m = TypeModel::new(4, 4);
        assert_eq!(m.item(PrimitiveKind::Ptr).struct_align, 4);
        assert_eq!(m.pointer_sized_unsigned(), PrimitiveKind::ULong);
        assert_eq!(m.item(PrimitiveKind::LongLong).size, 8);
    }

    #[test]
    fn fixed_width_kinds() {
        let m = TypeModel::new(4, 4);
        let void = m.item(PrimitiveKind::Void);
        assert_eq!((void.size, void.align, void.struct_align), (0, 1, 1));
        assert_eq!(m.item(PrimitiveKind::LongDouble).size, 8);
        assert_eq!(m.item(PrimitiveKind::FloatComplex).size, 8);
        assert_eq!(m.item(PrimitiveKind::DoubleComplex).size, 16);
        assert_eq!(m.item(PrimitiveKind::LongDoubleComplex).align, 16);
        assert_eq!(m.item(PrimitiveKind::Bool).size, 1);
    }

    #[test]
    fn table_covers_every_kind() {
        let m = TypeModel::host();
        let kinds: Vec<_> = m.items().map(|(k, _)| k).collect();
        assert_eq!(kinds, PrimitiveKind::ALL.to_vec());
    }

    #[test]
    fn spelling_round_trips() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(kind.spelling().parse::<PrimitiveKind>(), Ok(kind));
        }
    }

    #[test]
    fn spelling_aliases() {
        assert_eq!("bool".parse(), Ok(PrimitiveKind::Bool));
        assert_eq!("double  complex".parse(), Ok(PrimitiveKind::DoubleComplex));
        assert_eq!("unsigned   int".parse(), Ok(PrimitiveKind::UInt));
        assert!("quad".parse::<PrimitiveKind>().is_err());
    }
}
