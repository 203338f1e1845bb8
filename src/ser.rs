//! Serialization support for bracket-nested form-urlencoded strings.
//!
//! Serializing happens in two steps: [`Serializer`] turns any
//! `Serialize` value into a [`RawNode`] tree, and the `flatten` module
//! walks that tree into key chains and writes them out, choosing the list
//! style and percent-encoding from the [`Config`](crate::Config).

mod encode;
mod flatten;

pub(crate) use flatten::write_node;
pub use flatten::flatten;

use serde::ser;

use crate::error::{Error, Result};
use crate::map::Map;
use crate::node::RawNode;

use std::io::Write;
use std::str;

/// Serializes a value into a querystring.
///
/// ```
/// # use serde::Serialize;
/// #[derive(Serialize)]
/// struct Query {
///     age: u8,
///     name: String,
///     occupation: String,
/// }
///
/// let q = Query {
///     age: 24,
///     name: "Alice".to_owned(),
///     occupation: "Student".to_owned(),
/// };
///
/// assert_eq!(
///     serde_formtree::to_string(&q).unwrap(),
///     "age=24&name=Alice&occupation=Student");
/// ```
pub fn to_string<T: ser::Serialize>(input: &T) -> Result<String> {
    let config = crate::Config::default();
    config.serialize_string(input)
}

/// Serializes a value into a generic writer object.
///
/// ```
/// # use serde::Serialize;
/// #[derive(Serialize)]
/// struct Query {
///     ids: Vec<u8>,
/// }
///
/// let mut buffer = Vec::new();
/// serde_formtree::to_writer(&Query { ids: vec![1, 2] }, &mut buffer).unwrap();
/// assert_eq!(String::from_utf8(buffer).unwrap(), "ids[0]=1&ids[1]=2");
/// ```
pub fn to_writer<T: ser::Serialize, W: Write>(input: &T, writer: &mut W) -> Result<()> {
    let config = crate::Config::default();
    config.serialize_to_writer(input, writer)
}

/// Serializes a value into its raw tree.
pub fn to_node<T: ser::Serialize>(input: &T, config: crate::Config) -> Result<Option<RawNode>> {
    input.serialize(Serializer::new(config))
}

/// A serializer producing the [`RawNode`] tree of a value.
///
/// * **Structs and maps** become mappings, keyed by field name or by the
///   serialized map key
/// * **Sequences and tuples** become indexed sequences
/// * **Primitives** become scalars, numbers formatted with `itoa`/`ryu`
/// * **Enums** become a scalar naming a unit variant, or a mapping from
///   the variant name to its content
///
/// The output is `None` for an absent value that the configured
/// [`NullRule`](crate::NullRule) leaves out.
#[derive(Clone, Copy)]
pub struct Serializer {
    config: crate::Config,
}

impl Serializer {
    pub fn new(config: crate::Config) -> Self {
        Self { config }
    }
}

fn scalar(value: impl Into<String>) -> Result<Option<RawNode>> {
    Ok(Some(RawNode::Scalar(value.into())))
}

/// Wraps `node` in `{ variant: node }` for enum variants with content.
fn wrap_variant(variant: Option<&'static str>, node: RawNode) -> RawNode {
    match variant {
        Some(variant) => {
            let mut map = Map::new();
            map.insert(variant.to_owned(), node);
            RawNode::Mapping(map)
        }
        None => node,
    }
}

macro_rules! serialize_itoa {
    (
        $($ty:ty => $meth:ident,)*) => {
        $(
            fn $meth(self, v: $ty) -> Result<Self::Ok> {
                let mut buffer = itoa::Buffer::new();
                scalar(buffer.format(v))
            }
        )*
    };
}

macro_rules! serialize_ryu {
    (
        $($ty:ty => $meth:ident,)*) => {
        $(
            fn $meth(self, v: $ty) -> Result<Self::Ok> {
                let mut buffer = ryu::Buffer::new();
                scalar(buffer.format(v))
            }
        )*
    };
}

impl ser::Serializer for Serializer {
    type Ok = Option<RawNode>;
    type Error = Error;
    type SerializeSeq = SeqSerializer;
    type SerializeTuple = SeqSerializer;
    type SerializeTupleStruct = SeqSerializer;
    type SerializeTupleVariant = SeqSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = MapSerializer;
    type SerializeStructVariant = MapSerializer;

    serialize_itoa! {
        u8  => serialize_u8,
        u16 => serialize_u16,
        u32 => serialize_u32,
        u64 => serialize_u64,
        u128 => serialize_u128,
        i8  => serialize_i8,
        i16 => serialize_i16,
        i32 => serialize_i32,
        i64 => serialize_i64,
        i128 => serialize_i128,
    }
    serialize_ryu! {
        f32 => serialize_f32,
        f64 => serialize_f64,
    }

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        scalar(if v { "true" } else { "false" })
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        scalar(v)
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        scalar(v)
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok> {
        scalar(str::from_utf8(value)?)
    }

    /// Units are written as a key with an empty value, `key=`.
    fn serialize_unit(self) -> Result<Self::Ok> {
        scalar("")
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<Self::Ok> {
        self.serialize_unit()
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        scalar(variant)
    }

    fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok> {
        Ok(value
            .serialize(self)?
            .map(|node| wrap_variant(Some(variant), node)))
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(self.config.null_scalar())
    }

    fn serialize_some<T: ?Sized + ser::Serialize>(self, value: &T) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(SeqSerializer::new(self, len.unwrap_or(0), None))
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(SeqSerializer::new(self, len, None))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(SeqSerializer::new(self, len, None))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Ok(SeqSerializer::new(self, len, Some(variant)))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapSerializer::new(self, None))
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(MapSerializer::new(self, None))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Ok(MapSerializer::new(self, Some(variant)))
    }
}

#[doc(hidden)]
pub struct SeqSerializer {
    serializer: Serializer,
    items: Vec<Option<RawNode>>,
    variant: Option<&'static str>,
}

impl SeqSerializer {
    fn new(serializer: Serializer, len: usize, variant: Option<&'static str>) -> Self {
        Self {
            serializer,
            items: Vec::with_capacity(len),
            variant,
        }
    }

    fn push<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        // absent elements stay as holes so positions are kept
        let item = value.serialize(self.serializer)?;
        self.items.push(item);
        Ok(())
    }

    fn finish(self) -> Result<Option<RawNode>> {
        let node = RawNode::Sequence {
            indexed: true,
            items: self.items,
        };
        Ok(Some(wrap_variant(self.variant, node)))
    }
}

impl ser::SerializeSeq for SeqSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

impl ser::SerializeTuple for SeqSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_element<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

impl ser::SerializeTupleStruct for SeqSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

impl ser::SerializeTupleVariant for SeqSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_field<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

#[doc(hidden)]
pub struct MapSerializer {
    serializer: Serializer,
    map: Map<String, RawNode>,
    key: Option<String>,
    variant: Option<&'static str>,
}

impl MapSerializer {
    fn new(serializer: Serializer, variant: Option<&'static str>) -> Self {
        Self {
            serializer,
            map: Map::new(),
            key: None,
            variant,
        }
    }

    fn insert<T>(&mut self, key: String, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        if let Some(node) = value.serialize(self.serializer)? {
            self.map.insert(key, node);
        }
        Ok(())
    }

    fn finish(self) -> Result<Option<RawNode>> {
        Ok(Some(wrap_variant(self.variant, RawNode::Mapping(self.map))))
    }
}

impl ser::SerializeMap for MapSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_key<T>(&mut self, key: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.key = Some(key.serialize(KeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        let Some(key) = self.key.take() else {
            return Err(Error::Custom(
                "internal error: value serialized before its key".to_owned(),
            ));
        };
        self.insert(key, value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

impl ser::SerializeStruct for MapSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

impl ser::SerializeStructVariant for MapSerializer {
    type Ok = Option<RawNode>;
    type Error = Error;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<()>
    where
        T: ser::Serialize + ?Sized,
    {
        self.insert(key.to_owned(), value)
    }

    fn end(self) -> Result<Self::Ok> {
        self.finish()
    }
}

macro_rules! serialize_key_itoa {
    (
        $($ty:ty => $meth:ident,)*) => {
        $(
            fn $meth(self, v: $ty) -> Result<Self::Ok> {
                let mut buffer = itoa::Buffer::new();
                Ok(buffer.format(v).to_owned())
            }
        )*
    };
}

macro_rules! serialize_key_ryu {
    (
        $($ty:ty => $meth:ident,)*) => {
        $(
            fn $meth(self, v: $ty) -> Result<Self::Ok> {
                let mut buffer = ryu::Buffer::new();
                Ok(buffer.format(v).to_owned())
            }
        )*
    };
}

/// Serializes map keys, which must be strings, numbers, booleans or unit
/// variants.
struct KeySerializer;

impl ser::Serializer for KeySerializer {
    type Ok = String;
    type Error = Error;
    type SerializeSeq = ser::Impossible<Self::Ok, Error>;
    type SerializeTuple = ser::Impossible<Self::Ok, Error>;
    type SerializeTupleStruct = ser::Impossible<Self::Ok, Error>;
    type SerializeTupleVariant = ser::Impossible<Self::Ok, Error>;
    type SerializeMap = ser::Impossible<Self::Ok, Error>;
    type SerializeStruct = ser::Impossible<Self::Ok, Error>;
    type SerializeStructVariant = ser::Impossible<Self::Ok, Error>;

    serialize_key_itoa! {
        u8  => serialize_u8,
        u16 => serialize_u16,
        u32 => serialize_u32,
        u64 => serialize_u64,
        i8  => serialize_i8,
        i16 => serialize_i16,
        i32 => serialize_i32,
        i64 => serialize_i64,
    }
    serialize_key_ryu! {
        f32 => serialize_f32,
        f64 => serialize_f64,
    }

    fn serialize_bool(self, v: bool) -> Result<Self::Ok> {
        Ok(if v { "true" } else { "false" }.to_owned())
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok> {
        Ok(v.to_owned())
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok> {
        Ok(str::from_utf8(value)?.to_owned())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok> {
        value.serialize(self)
    }

    /// Returns an error.
    fn serialize_unit(self) -> Result<Self::Ok> {
        Err(key_error("unit"))
    }

    /// Returns an error.
    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Err(key_error("unit struct"))
    }

    /// Returns an error.
    fn serialize_newtype_variant<T: ?Sized + ser::Serialize>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok> {
        Err(key_error("newtype variant"))
    }

    /// Returns an error.
    fn serialize_none(self) -> Result<Self::Ok> {
        Err(key_error("none"))
    }

    /// Returns an error.
    fn serialize_some<T: ?Sized + ser::Serialize>(self, _value: &T) -> Result<Self::Ok> {
        Err(key_error("option"))
    }

    /// Returns an error.
    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(key_error("sequence"))
    }

    /// Returns an error.
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(key_error("tuple"))
    }

    /// Returns an error.
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Err(key_error("tuple struct"))
    }

    /// Returns an error.
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(key_error("tuple variant"))
    }

    /// Returns an error.
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(key_error("map"))
    }

    /// Returns an error.
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(key_error("struct"))
    }

    /// Returns an error.
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(key_error("struct variant"))
    }
}

fn key_error(kind: &str) -> Error {
    Error::UnsupportedType(format!("{kind} cannot be used as a map key"))
}
