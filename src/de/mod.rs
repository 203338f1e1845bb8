//! Deserialization support for bracket-nested form-urlencoded strings.
//!
//! ### An overview of the design
//!
//! Pairs may arrive in any order, and several pairs can describe the same
//! part of the output: `a[1]=2&b=Hello&a[0]=1` fills `a` out of order, and
//! `a=1&a=2` lists `a` twice. So the input is not deserialized as a stream.
//! It is first turned into a [`RawNode`] tree in three steps:
//!
//! 1. `parse` splits the input into pairs and each key into a chain of
//!    segments (`a[b][0]` → `a`, `b`, `0`), decoding percent-escapes;
//! 2. each chain expands into a minimal tree holding its value;
//! 3. `merge` folds those trees, in input order, into a single mapping.
//!
//! [`Deserializer`] then walks the tree, with the serde visitor deciding
//! which shape and primitive each value is read as. Scalars are parsed by
//! the `ScalarDeserializer` on demand, so `"1"` can become a `u8`, an
//! `f64` or a `String` depending on the target field.

pub mod merge;
pub mod parse;
mod string_parser;

use std::io::Read;

use serde::de;

use crate::RECURSION_LIMIT;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::map::Map;
use crate::node::{NULL_MARKER, RawNode};

use string_parser::ScalarDeserializer;

/// Decodes the input into the merged tree of all pairs.
pub(crate) fn decode(input: &[u8], config: Config) -> Result<Map<String, RawNode>> {
    let parts = parse::parse_pairs(input, &config)?;
    let count = parts.len();
    let tree = merge::merge_parts(parts)?;
    tracing::debug!(pairs = count, roots = tree.len(), "decoded form input");
    Ok(tree)
}

/// Deserializes a querystring from a `&[u8]`.
///
/// ```
/// # use serde::Deserialize;
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Query {
///     name: String,
///     age: u8,
///     occupation: String,
/// }
///
/// let q = Query {
///     name: "Alice".to_owned(),
///     age: 24,
///     occupation: "Student".to_owned(),
/// };
///
/// assert_eq!(
///     serde_formtree::from_bytes::<Query>(
///         "name=Alice&age=24&occupation=Student".as_bytes()
///     ).unwrap(), q);
/// ```
pub fn from_bytes<T: de::DeserializeOwned>(input: &[u8]) -> Result<T> {
    Config::default().deserialize_bytes(input)
}

/// Deserializes a querystring from a `&str`.
///
/// ```
/// # use serde::Deserialize;
/// #[derive(Debug, Deserialize, PartialEq)]
/// struct Query {
///     ids: Vec<u32>,
///     tags: Vec<String>,
/// }
///
/// let q: Query = serde_formtree::from_str("ids[1]=20&ids[0]=10&tags=a&tags=b").unwrap();
/// assert_eq!(q.ids, vec![10, 20]);
/// assert_eq!(q.tags, vec!["a", "b"]);
/// ```
pub fn from_str<T: de::DeserializeOwned>(input: &str) -> Result<T> {
    from_bytes(input.as_bytes())
}

/// Convenience function that reads all bytes from `reader` and deserializes
/// them with `from_bytes`.
pub fn from_reader<T, R>(mut reader: R) -> Result<T>
where
    T: de::DeserializeOwned,
    R: Read,
{
    let mut buf = vec![];
    reader.read_to_end(&mut buf)?;
    from_bytes(&buf)
}

/// Deserializes a typed value from an already decoded tree.
pub fn from_node<T: de::DeserializeOwned>(node: RawNode, config: Config) -> Result<T> {
    T::deserialize(Deserializer::new(node, config))
}

/// A deserializer over a [`RawNode`] tree.
///
/// At the top level this is always a mapping, so structs, maps and enums
/// are the supported outputs there. Below it every serde type is supported.
pub struct Deserializer {
    /// `None` is a hole of an indexed sequence.
    node: Option<RawNode>,
    config: Config,
    depth: usize,
}

impl Deserializer {
    pub fn new(node: RawNode, config: Config) -> Self {
        Deserializer {
            node: Some(node),
            config,
            depth: 0,
        }
    }

    /// Decodes `input` and returns a deserializer over the merged tree.
    pub fn from_bytes(input: &[u8], config: Config) -> Result<Self> {
        let tree = decode(input, config)?;
        Ok(Self::new(RawNode::Mapping(tree), config))
    }

    fn child(&self, node: Option<RawNode>) -> Self {
        Deserializer {
            node,
            config: self.config,
            depth: self.depth + 1,
        }
    }

    fn check_depth(&self) -> Result<()> {
        if self.depth > RECURSION_LIMIT {
            return Err(Error::RecursionLimit(RECURSION_LIMIT));
        }
        Ok(())
    }

    fn seq_access(&self, items: Vec<Option<RawNode>>) -> Result<SeqAccess> {
        self.check_depth()?;
        Ok(SeqAccess {
            iter: items.into_iter(),
            config: self.config,
            depth: self.depth + 1,
        })
    }

    fn map_access(&self, entries: Vec<(String, RawNode)>) -> Result<MapAccess> {
        self.check_depth()?;
        Ok(MapAccess {
            iter: entries.into_iter(),
            value: None,
            config: self.config,
            depth: self.depth + 1,
        })
    }

    /// Entries of a mapping, an indexed sequence keyed by position, or an
    /// empty scalar.
    fn map_entries(node: Option<RawNode>) -> Result<Vec<(String, RawNode)>> {
        match node {
            Some(RawNode::Mapping(map)) => Ok(map.into_iter().collect()),
            Some(RawNode::Sequence {
                indexed: true,
                items,
            }) => Ok(items
                .into_iter()
                .enumerate()
                .filter_map(|(i, item)| item.map(|item| (i.to_string(), item)))
                .collect()),
            Some(RawNode::Scalar(s)) if s.is_empty() => Ok(vec![]),
            Some(other) => Err(Error::incompatible(other.describe(), "map")),
            None => Err(Error::incompatible("null", "map")),
        }
    }
}

macro_rules! deserialize_scalar {
    ($($method:ident => $expected:expr,)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value>
            where
                V: de::Visitor<'de>,
            {
                match self.node {
                    Some(RawNode::Scalar(s)) => ScalarDeserializer::new(s).$method(visitor),
                    Some(other) => Err(Error::incompatible(other.describe(), $expected)),
                    None => Err(Error::incompatible("null", $expected)),
                }
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for Deserializer {
    type Error = Error;

    fn deserialize_any<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.take() {
            None => visitor.visit_unit(),
            Some(RawNode::Scalar(s)) if s == NULL_MARKER => visitor.visit_unit(),
            Some(RawNode::Scalar(s)) => visitor.visit_string(s),
            Some(RawNode::Mapping(map)) => {
                visitor.visit_map(self.map_access(map.into_iter().collect())?)
            }
            Some(RawNode::Sequence { items, .. }) => visitor.visit_seq(self.seq_access(items)?),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let absent = match &self.node {
            None => true,
            Some(RawNode::Scalar(s)) => self.config.is_null(s),
            Some(_) => false,
        };
        if absent {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    /// Sequences also accept a single value, so `a=1` fills `a: Vec<u8>`,
    /// and an empty value, so `a=` is an empty list.
    fn deserialize_seq<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let items = match self.node.take() {
            Some(RawNode::Sequence { items, .. }) => items,
            Some(RawNode::Scalar(s)) if s.is_empty() => vec![],
            Some(single) => vec![Some(single)],
            None => return Err(Error::incompatible("null", "sequence")),
        };
        visitor.visit_seq(self.seq_access(items)?)
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(mut self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let entries = Self::map_entries(self.node.take())?;
        visitor.visit_map(self.map_access(entries)?)
    }

    fn deserialize_struct<V>(
        mut self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        let entries = Self::map_entries(self.node.take())?;
        if self.config.prohibit_extra_properties {
            let unknown: Vec<String> = entries
                .iter()
                .map(|(k, _)| k)
                .filter(|k| !fields.contains(&k.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                tracing::debug!(structure = name, ?unknown, "rejecting unmapped properties");
                return Err(Error::UnmappedExtraProperties {
                    structure: name.to_owned(),
                    keys: unknown,
                });
            }
        }
        visitor.visit_map(self.map_access(entries)?)
    }

    /// Enums are either a bare scalar naming a unit variant (`e=A`) or a
    /// mapping with a single variant key (`e[B]=1`, `e[C][x]=1`).
    fn deserialize_enum<V>(
        mut self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        match self.node.take() {
            Some(RawNode::Scalar(s)) => visitor.visit_enum(ScalarDeserializer::new(s)),
            Some(RawNode::Mapping(map)) if map.len() == 1 => {
                let Some((variant, value)) = map.into_iter().next() else {
                    return Err(Error::incompatible("an empty mapping", "enum"));
                };
                visitor.visit_enum(VariantAccess {
                    variant,
                    value: self.child(Some(value)),
                })
            }
            Some(other) => Err(Error::incompatible(other.describe(), "enum")),
            None => Err(Error::incompatible("null", "enum")),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        visitor.visit_unit()
    }

    deserialize_scalar! {
        deserialize_bool => "bool",
        deserialize_i8 => "i8",
        deserialize_i16 => "i16",
        deserialize_i32 => "i32",
        deserialize_i64 => "i64",
        deserialize_i128 => "i128",
        deserialize_u8 => "u8",
        deserialize_u16 => "u16",
        deserialize_u32 => "u32",
        deserialize_u64 => "u64",
        deserialize_u128 => "u128",
        deserialize_f32 => "f32",
        deserialize_f64 => "f64",
        deserialize_char => "char",
        deserialize_str => "string",
        deserialize_string => "string",
        deserialize_bytes => "bytes",
        deserialize_byte_buf => "bytes",
    }
}

pub struct SeqAccess {
    iter: std::vec::IntoIter<Option<RawNode>>,
    config: Config,
    depth: usize,
}

impl<'de> de::SeqAccess<'de> for SeqAccess {
    type Error = Error;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some(node) => seed
                .deserialize(Deserializer {
                    node,
                    config: self.config,
                    depth: self.depth,
                })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

pub struct MapAccess {
    iter: std::vec::IntoIter<(String, RawNode)>,
    value: Option<RawNode>,
    config: Config,
    depth: usize,
}

impl<'de> de::MapAccess<'de> for MapAccess {
    type Error = Error;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.iter.next() {
            Some((key, value)) => {
                self.value = Some(value);
                seed.deserialize(ScalarDeserializer::new(key)).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: de::DeserializeSeed<'de>,
    {
        let Some(value) = self.value.take() else {
            return Err(Error::Custom(
                "internal error: value requested before its key".to_owned(),
            ));
        };
        seed.deserialize(Deserializer {
            node: Some(value),
            config: self.config,
            depth: self.depth,
        })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.iter.len())
    }
}

struct VariantAccess {
    variant: String,
    value: Deserializer,
}

impl<'de> de::EnumAccess<'de> for VariantAccess {
    type Error = Error;
    type Variant = Deserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ScalarDeserializer::new(self.variant))?;
        Ok((variant, self.value))
    }
}

impl<'de> de::VariantAccess<'de> for Deserializer {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(self)
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V>(self, fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: de::Visitor<'de>,
    {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}
