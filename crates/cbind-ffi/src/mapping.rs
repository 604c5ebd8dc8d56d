//! Type keys and layered mapping tables.
//!
//! A resolved type is reduced to a [`TypeKey`] by decaying one level of
//! pointer or array indirection. Keys are looked up in caller-supplied
//! override tables first and then in the built-in table; the first table
//! holding the key wins and its [`Template`] is rendered with the symbol
//! name.
//!
//! Two independent built-in tables exist: one renders Rust type names, the
//! other renders the expression that converts a Rust value into its FFI
//! argument form.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::iter;
use std::str::FromStr;
use std::sync::LazyLock;

use cbind_targets::PrimitiveKind;

use crate::ctype::{CType, Kind};
use crate::error::{FfiError, MappingKey, Result};

/// Returned by the lookups when no type was supplied.
pub const UNRESOLVED: &str = "<unresolved>";

/// The text every template substitutes the symbol name for.
pub const PLACEHOLDER: &str = "{name}";

/// Lookup key for the primitive mapping path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey {
    pub kind: Kind,
    pub is_pointer: bool,
}

impl TypeKey {
    pub fn new(kind: Kind, is_pointer: bool) -> Self {
        Self { kind, is_pointer }
    }

    pub fn primitive(kind: PrimitiveKind) -> Self {
        Self::new(Kind::Primitive(kind), false)
    }

    pub fn pointer_to(kind: PrimitiveKind) -> Self {
        Self::new(Kind::Primitive(kind), true)
    }

    /// Key of `ty` after one level of pointer/array decay.
    ///
    /// `T**` becomes `pointer*`, which no built-in entry covers.
    pub fn of(ty: &CType) -> Self {
        match ty.element() {
            Some(element) => Self::new(element.kind(), true),
            None => Self::new(ty.kind(), false),
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if self.is_pointer {
            f.write_str("*")?;
        }
        Ok(())
    }
}

impl FromStr for TypeKey {
    type Err = String;

    /// Parse spellings such as `"int"`, `"double*"` or `"float _Complex *"`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (base, is_pointer) = match s.strip_suffix('*') {
            Some(base) => (base, true),
            None => (s, false),
        };
        let kind = base
            .parse::<Kind>()
            .map_err(|_| format!("unknown type key '{s}'"))?;
        Ok(Self::new(kind, is_pointer))
    }
}

/// A one-placeholder text template plus a label for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub label: String,
    pub source: String,
}

impl Template {
    pub fn new(label: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            source: source.into(),
        }
    }

    /// Substitute `name` for every placeholder.
    pub fn render(&self, name: &str) -> String {
        self.source.replace(PLACEHOLDER, name)
    }
}

/// An immutable-once-built map from keys to templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingTable<K: Ord> {
    entries: BTreeMap<K, Template>,
}

/// Table keyed by [`TypeKey`].
pub type TypeTable = MappingTable<TypeKey>;

/// Table keyed by enum tag.
pub type EnumTable = MappingTable<String>;

impl<K: Ord> Default for MappingTable<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> MappingTable<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, returning the template it replaced.
    pub fn insert(&mut self, key: K, template: Template) -> Option<Template> {
        self.entries.insert(key, template)
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: K, template: Template) -> Self {
        self.insert(key, template);
        self
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&Template>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Template)> {
        self.entries.iter()
    }
}

impl<K: Ord> FromIterator<(K, Template)> for MappingTable<K> {
    fn from_iter<I: IntoIterator<Item = (K, Template)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// First template for `key` across `layers`, in order.
pub fn lookup<'a, K, Q>(
    layers: impl IntoIterator<Item = &'a MappingTable<K>>,
    key: &Q,
) -> Option<&'a Template>
where
    K: Ord + Borrow<Q> + 'a,
    Q: Ord + ?Sized,
{
    layers.into_iter().find_map(|table| table.get(key))
}

fn table(rows: &[(TypeKey, &str, &str)]) -> TypeTable {
    rows.iter()
        .map(|(key, label, source)| (*key, Template::new(*label, *source)))
        .collect()
}

static HOST_TYPES: LazyLock<TypeTable> = LazyLock::new(|| {
    use PrimitiveKind as P;
    use TypeKey as K;
    table(&[
        (K::primitive(P::Ptr), "opaque pointer", "*mut c_void"),
        (K::primitive(P::UintPtr), "pointer-sized unsigned", "usize"),
        (K::primitive(P::Void), "unit", "()"),
        (K::primitive(P::Char), "C char", "c_char"),
        (K::primitive(P::SChar), "signed byte", "i8"),
        (K::primitive(P::UChar), "unsigned byte", "u8"),
        (K::primitive(P::Short), "16-bit signed", "i16"),
        (K::primitive(P::UShort), "16-bit unsigned", "u16"),
        (K::primitive(P::Int), "32-bit signed", "i32"),
        (K::primitive(P::UInt), "32-bit unsigned", "u32"),
        (K::primitive(P::Long), "native long", "c_long"),
        (K::primitive(P::ULong), "native unsigned long", "c_ulong"),
        (K::primitive(P::LongLong), "64-bit signed", "i64"),
        (K::primitive(P::ULongLong), "64-bit unsigned", "u64"),
        (K::primitive(P::Float), "single float", "f32"),
        (K::primitive(P::Double), "double float", "f64"),
        (K::primitive(P::LongDouble), "long double as double", "f64"),
        (K::primitive(P::Bool), "boolean", "bool"),
        (K::primitive(P::FloatComplex), "single complex pair", "[f32; 2]"),
        (K::primitive(P::DoubleComplex), "double complex pair", "[f64; 2]"),
        (K::primitive(P::LongDoubleComplex), "long double complex pair", "[f64; 2]"),
        (K::pointer_to(P::Void), "opaque pointer", "*mut c_void"),
        (K::pointer_to(P::Char), "C string", "&CStr"),
        (K::pointer_to(P::Int), "int slice", "&mut [i32]"),
        (K::pointer_to(P::Float), "float slice", "&mut [f32]"),
        (K::pointer_to(P::Double), "double slice", "&mut [f64]"),
        (K::pointer_to(P::FloatComplex), "complex float slice", "&mut [[f32; 2]]"),
        (K::pointer_to(P::DoubleComplex), "complex double slice", "&mut [[f64; 2]]"),
    ])
});

static CONVERSIONS: LazyLock<TypeTable> = LazyLock::new(|| {
    use PrimitiveKind as P;
    use TypeKey as K;
    table(&[
        (K::primitive(P::Ptr), "pass through", "{name}"),
        (K::primitive(P::UintPtr), "pass through", "{name}"),
        (K::primitive(P::Void), "pass through", "{name}"),
        (K::primitive(P::Char), "pass through", "{name}"),
        (K::primitive(P::SChar), "narrow to c_schar", "{name} as c_schar"),
        (K::primitive(P::UChar), "narrow to c_uchar", "{name} as c_uchar"),
        (K::primitive(P::Short), "narrow to c_short", "{name} as c_short"),
        (K::primitive(P::UShort), "narrow to c_ushort", "{name} as c_ushort"),
        (K::primitive(P::Int), "narrow to c_int", "{name} as c_int"),
        (K::primitive(P::UInt), "narrow to c_uint", "{name} as c_uint"),
        (K::primitive(P::Long), "pass through", "{name}"),
        (K::primitive(P::ULong), "pass through", "{name}"),
        (K::primitive(P::LongLong), "widen to c_longlong", "{name} as c_longlong"),
        (K::primitive(P::ULongLong), "widen to c_ulonglong", "{name} as c_ulonglong"),
        (K::primitive(P::Float), "cast to c_float", "{name} as c_float"),
        (K::primitive(P::Double), "cast to c_double", "{name} as c_double"),
        (K::primitive(P::LongDouble), "pass through", "{name}"),
        (K::primitive(P::Bool), "pass through", "{name}"),
        (K::primitive(P::FloatComplex), "pass through", "{name}"),
        (K::primitive(P::DoubleComplex), "pass through", "{name}"),
        (K::primitive(P::LongDoubleComplex), "pass through", "{name}"),
        (K::pointer_to(P::Void), "pass through", "{name}"),
        (K::pointer_to(P::Char), "borrow C string", "{name}.as_ptr()"),
        (K::pointer_to(P::Int), "slice to raw pointer", "{name}.as_mut_ptr()"),
        (K::pointer_to(P::Float), "slice to raw pointer", "{name}.as_mut_ptr()"),
        (K::pointer_to(P::Double), "slice to raw pointer", "{name}.as_mut_ptr()"),
        (K::pointer_to(P::FloatComplex), "pair slice to raw pointer", "{name}.as_mut_ptr().cast()"),
        (K::pointer_to(P::DoubleComplex), "pair slice to raw pointer", "{name}.as_mut_ptr().cast()"),
    ])
});

/// The built-in host type table.
pub fn builtin_host_types() -> &'static TypeTable {
    &HOST_TYPES
}

/// The built-in conversion expression table.
pub fn builtin_conversions() -> &'static TypeTable {
    &CONVERSIONS
}

fn resolve(
    ty: Option<&CType>,
    name: &str,
    overrides: &[TypeTable],
    builtin: &TypeTable,
) -> Result<String> {
    let Some(ty) = ty else {
        return Ok(UNRESOLVED.to_string());
    };
    let key = TypeKey::of(ty);
    lookup(overrides.iter().chain(iter::once(builtin)), &key)
        .map(|template| template.render(name))
        .ok_or_else(|| FfiError::MappingNotFound {
            key: MappingKey::Type(key),
        })
}

/// Render the host type name for `ty`.
pub fn host_type_for(ty: Option<&CType>, name: &str, overrides: &[TypeTable]) -> Result<String> {
    resolve(ty, name, overrides, builtin_host_types())
}

/// Render the conversion expression that passes `name` as `ty`.
pub fn conversion_for(ty: Option<&CType>, name: &str, overrides: &[TypeTable]) -> Result<String> {
    resolve(ty, name, overrides, builtin_conversions())
}
