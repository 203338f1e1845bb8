//! Ahead-of-time type descriptions and dynamic typed values.
//!
//! A [`TypeDescription`] tells the [`Converter`](crate::Converter) what a raw
//! tree should become, and [`Value`] is what it becomes. Descriptions of std
//! types come from the [`Describe`] trait; structures are described by hand
//! with [`StructDescription`]:
//!
//! ```
//! use serde_formtree::{Describe, StructDescription, StructRef, TypeDescription};
//!
//! fn user() -> StructDescription {
//!     StructDescription::new("User")
//!         .field("name", String::describe())
//!         .renamed_field("emails", "email", Vec::<String>::describe())
//!         .field("friends", TypeDescription::new_named(user))
//! }
//!
//! let ty = TypeDescription::NamedStructure(StructRef::new(user));
//! let value = serde_formtree::Config::new()
//!     .decode_value("name=Ann&email=a@x.org&friends[0][name]=Bob", &ty)
//!     .unwrap();
//! assert_eq!(value.get("friends").unwrap().get(0).unwrap().get("name").unwrap(), "Bob");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::map::Map;
use crate::node::RawNode;

/// The scalar types a leaf value can be converted to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    String,
    Boolean,
    Char,
    /// 8-bit signed integer.
    Byte,
    /// 16-bit signed integer.
    Short,
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    Float,
    Double,
    BigInteger,
    BigDecimal,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScalarKind::String => "string",
            ScalarKind::Boolean => "boolean",
            ScalarKind::Char => "char",
            ScalarKind::Byte => "byte",
            ScalarKind::Short => "short",
            ScalarKind::Integer => "integer",
            ScalarKind::Long => "long",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::BigInteger => "big integer",
            ScalarKind::BigDecimal => "big decimal",
        })
    }
}

/// What a raw tree should be converted to.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeDescription {
    /// A nullable scalar.
    Simple(ScalarKind),
    /// A scalar that cannot be absent. Form input can always omit a key, so
    /// these are rejected with [`Error::UnsupportedType`](crate::Error).
    Primitive(ScalarKind),
    /// A fixed array of elements.
    Array(Box<TypeDescription>),
    /// A growable list of elements.
    GenericSequence(Box<TypeDescription>),
    /// A string-keyed map of values.
    GenericMapping(Box<TypeDescription>),
    NamedStructure(StructRef),
    /// A mapping kept untyped.
    RawMapping,
    /// A sequence kept untyped.
    RawSequence,
    /// Anything, kept untyped.
    Unknown,
}

impl TypeDescription {
    /// A list of the named structure, handy for recursive descriptions.
    pub fn new_named(describe: fn() -> StructDescription) -> Self {
        TypeDescription::GenericSequence(Box::new(TypeDescription::NamedStructure(
            StructRef::new(describe),
        )))
    }
}

/// A lazily resolved structure description.
///
/// Holding a function instead of the description lets a structure refer to
/// itself, e.g. a tree node with a list of child nodes.
#[derive(Clone, Copy)]
pub struct StructRef(fn() -> StructDescription);

impl StructRef {
    pub const fn new(describe: fn() -> StructDescription) -> Self {
        StructRef(describe)
    }

    pub fn resolve(&self) -> StructDescription {
        (self.0)()
    }
}

impl fmt::Debug for StructRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StructRef").field(&self.resolve().name).finish()
    }
}

impl PartialEq for StructRef {
    fn eq(&self, other: &Self) -> bool {
        self.resolve().name == other.resolve().name
    }
}

/// The fields of a named structure.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDescription {
    pub name: String,
    pub fields: Vec<FieldDescription>,
    /// Field collecting keys that match no declared field.
    pub extra: Option<String>,
    /// Whether instances can be created when decoding.
    pub constructible: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescription {
    pub name: String,
    /// The key used on the wire.
    pub wire_name: String,
    pub ty: TypeDescription,
}

impl StructDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            extra: None,
            constructible: true,
        }
    }

    /// A structure that can be described and encoded but never created.
    pub fn opaque(name: impl Into<String>) -> Self {
        Self {
            constructible: false,
            ..Self::new(name)
        }
    }

    pub fn field(self, name: impl Into<String>, ty: TypeDescription) -> Self {
        let name = name.into();
        self.renamed_field(name.clone(), name, ty)
    }

    pub fn renamed_field(
        mut self,
        name: impl Into<String>,
        wire_name: impl Into<String>,
        ty: TypeDescription,
    ) -> Self {
        self.fields.push(FieldDescription {
            name: name.into(),
            wire_name: wire_name.into(),
            ty,
        });
        self
    }

    /// Names the field that receives unmatched keys as a [`Value::Map`].
    pub fn extra(mut self, name: impl Into<String>) -> Self {
        self.extra = Some(name.into());
        self
    }

    pub fn field_by_wire_name(&self, wire_name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.wire_name == wire_name)
    }
}

/// A dynamically typed value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    BigInteger(BigInt),
    BigDecimal(BigDecimal),
    List(Vec<Value>),
    Map(Map<String, Value>),
    Struct(Structure),
}

/// An instance of a named structure, fields keyed by field name.
#[derive(Clone, Debug, PartialEq)]
pub struct Structure {
    pub name: String,
    pub fields: Map<String, Value>,
}

impl Structure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Map::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }
}

/// Indexes into lists, maps and structures.
pub trait Index {
    #[doc(hidden)]
    fn index_into<'v>(&self, value: &'v Value) -> Option<&'v Value>;
}

impl Index for usize {
    fn index_into<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match value {
            Value::List(items) => items.get(*self),
            _ => None,
        }
    }
}

impl Index for str {
    fn index_into<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match value {
            Value::Map(map) => map.get(self),
            Value::Struct(s) => s.fields.get(self),
            _ => None,
        }
    }
}

impl<T: Index + ?Sized> Index for &T {
    fn index_into<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        (**self).index_into(value)
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a list position, a map key or a structure field.
    pub fn get<I: Index>(&self, index: I) -> Option<&Value> {
        index.index_into(self)
    }

    /// The scalar kind of this value, `None` for nulls and containers.
    pub fn kind(&self) -> Option<ScalarKind> {
        Some(match self {
            Value::String(_) => ScalarKind::String,
            Value::Bool(_) => ScalarKind::Boolean,
            Value::Char(_) => ScalarKind::Char,
            Value::Byte(_) => ScalarKind::Byte,
            Value::Short(_) => ScalarKind::Short,
            Value::Int(_) => ScalarKind::Integer,
            Value::Long(_) => ScalarKind::Long,
            Value::Float(_) => ScalarKind::Float,
            Value::Double(_) => ScalarKind::Double,
            Value::BigInteger(_) => ScalarKind::BigInteger,
            Value::BigDecimal(_) => ScalarKind::BigDecimal,
            Value::Null | Value::List(_) | Value::Map(_) | Value::Struct(_) => return None,
        })
    }
}

impl PartialEq<str> for Value {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for Value {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident,)*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    String => String,
    bool => Bool,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    BigInt => BigInteger,
    BigDecimal => BigDecimal,
    Vec<Value> => List,
    Map<String, Value> => Map,
    Structure => Struct,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Types with an ahead-of-time [`TypeDescription`].
pub trait Describe {
    fn describe() -> TypeDescription;
}

macro_rules! describe_scalar {
    ($($ty:ty => $kind:ident,)*) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescription {
                    TypeDescription::Simple(ScalarKind::$kind)
                }
            }
        )*
    };
}

describe_scalar! {
    String => String,
    bool => Boolean,
    char => Char,
    i8 => Byte,
    i16 => Short,
    i32 => Integer,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    BigInt => BigInteger,
    BigDecimal => BigDecimal,
}

impl<T: Describe> Describe for Option<T> {
    fn describe() -> TypeDescription {
        T::describe()
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn describe() -> TypeDescription {
        TypeDescription::GenericSequence(Box::new(T::describe()))
    }
}

impl<T: Describe> Describe for Box<[T]> {
    fn describe() -> TypeDescription {
        TypeDescription::Array(Box::new(T::describe()))
    }
}

impl<V: Describe, S> Describe for HashMap<String, V, S> {
    fn describe() -> TypeDescription {
        TypeDescription::GenericMapping(Box::new(V::describe()))
    }
}

impl<V: Describe> Describe for BTreeMap<String, V> {
    fn describe() -> TypeDescription {
        TypeDescription::GenericMapping(Box::new(V::describe()))
    }
}

impl Describe for RawNode {
    fn describe() -> TypeDescription {
        TypeDescription::Unknown
    }
}
