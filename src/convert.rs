//! Conversion between raw trees and typed [`Value`]s, directed by a
//! [`TypeDescription`].
//!
//! This is the dynamic counterpart of the serde path: the same shapes are
//! accepted (a lone value where a list is expected, an empty value for an
//! empty collection, an indexed list where a map is expected), but the
//! target type is data rather than a Rust type.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::RECURSION_LIMIT;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::map::Map;
use crate::node::RawNode;
use crate::schema::{ScalarKind, StructDescription, Structure, TypeDescription, Value};

/// Converts raw trees to typed values and back.
#[derive(Clone, Copy, Debug)]
pub struct Converter {
    config: Config,
}

impl Converter {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Converts a raw tree into a value of the described type.
    pub fn decode(&self, raw: RawNode, ty: &TypeDescription) -> Result<Value> {
        self.decode_at(raw, ty, 0)
    }

    /// Converts a value of the described type into a raw tree.
    ///
    /// Returns `None` for a null value under
    /// [`NullRule::Ignore`](crate::NullRule::Ignore).
    pub fn encode(&self, value: &Value, ty: &TypeDescription) -> Result<Option<RawNode>> {
        self.encode_at(value, ty, 0)
    }

    /// Like [`encode`](Self::encode), but the result must be a mapping so
    /// it can be written as pairs.
    pub fn encode_root(&self, value: &Value, ty: &TypeDescription) -> Result<RawNode> {
        match self.encode(value, ty)? {
            Some(node @ RawNode::Mapping(_)) => Ok(node),
            None => Ok(RawNode::mapping()),
            Some(other) => Err(Error::top_level(other.type_name())),
        }
    }

    fn decode_at(&self, raw: RawNode, ty: &TypeDescription, depth: usize) -> Result<Value> {
        if depth > RECURSION_LIMIT {
            return Err(Error::RecursionLimit(RECURSION_LIMIT));
        }
        match ty {
            TypeDescription::Simple(kind) => match raw {
                RawNode::Scalar(s) if self.config.is_null(&s) => Ok(Value::Null),
                RawNode::Scalar(s) => parse_scalar(s, *kind),
                other => Err(Error::incompatible(other.describe(), kind)),
            },
            TypeDescription::Primitive(kind) => Err(primitive(*kind)),
            TypeDescription::Array(elem) | TypeDescription::GenericSequence(elem) => {
                self.decode_list(raw, elem, depth)
            }
            TypeDescription::RawSequence => self.decode_list(raw, &TypeDescription::Unknown, depth),
            TypeDescription::GenericMapping(elem) => self.decode_map(raw, elem, depth),
            TypeDescription::RawMapping => match raw {
                RawNode::Mapping(_) => self.decode_untyped(raw, depth),
                other => self.decode_map(other, &TypeDescription::Unknown, depth),
            },
            TypeDescription::NamedStructure(structure) => {
                let desc = structure.resolve();
                if !desc.constructible {
                    return Err(Error::InstantiationFailure(desc.name));
                }
                match raw {
                    RawNode::Mapping(map) => self.decode_struct(&desc, map, depth),
                    RawNode::Scalar(s) if s.is_empty() => {
                        self.decode_struct(&desc, Map::new(), depth)
                    }
                    RawNode::Scalar(s) if self.config.is_null(&s) => Ok(Value::Null),
                    other => Err(Error::incompatible(
                        other.describe(),
                        format_args!("structure `{}`", desc.name),
                    )),
                }
            }
            TypeDescription::Unknown => self.decode_untyped(raw, depth),
        }
    }

    fn decode_list(&self, raw: RawNode, elem: &TypeDescription, depth: usize) -> Result<Value> {
        match raw {
            RawNode::Sequence { items, .. } => items
                .into_iter()
                .map(|item| match item {
                    Some(item) => self.decode_at(item, elem, depth + 1),
                    None => Ok(Value::Null),
                })
                .collect::<Result<_>>()
                .map(Value::List),
            RawNode::Scalar(s) if s.is_empty() => Ok(Value::List(Vec::new())),
            RawNode::Scalar(s) if s == crate::NULL_MARKER => Ok(Value::Null),
            // a lone value stands for a one-element list
            single => Ok(Value::List(vec![self.decode_at(single, elem, depth + 1)?])),
        }
    }

    fn decode_map(&self, raw: RawNode, elem: &TypeDescription, depth: usize) -> Result<Value> {
        let entries: Vec<(String, RawNode)> = match raw {
            RawNode::Mapping(map) => map.into_iter().collect(),
            RawNode::Sequence {
                indexed: true,
                items,
            } => items
                .into_iter()
                .enumerate()
                .filter_map(|(i, item)| item.map(|item| (i.to_string(), item)))
                .collect(),
            RawNode::Scalar(s) if s.is_empty() => Vec::new(),
            RawNode::Scalar(s) if s == crate::NULL_MARKER => return Ok(Value::Null),
            other => return Err(Error::incompatible(other.describe(), "map")),
        };
        let mut map = Map::new();
        for (key, node) in entries {
            let value = self.decode_at(node, elem, depth + 1)?;
            map.insert(key, value);
        }
        Ok(Value::Map(map))
    }

    fn decode_struct(
        &self,
        desc: &StructDescription,
        raw: Map<String, RawNode>,
        depth: usize,
    ) -> Result<Value> {
        let mut fields = Map::new();
        let mut extra = Map::new();
        for (key, node) in raw {
            match desc.field_by_wire_name(&key) {
                Some(field) => {
                    let value = self.decode_at(node, &field.ty, depth + 1)?;
                    fields.insert(field.name.clone(), value);
                }
                None => {
                    extra.insert(key, node);
                }
            }
        }

        if let Some(bucket) = &desc.extra {
            let mut values = Map::new();
            for (key, node) in extra {
                values.insert(key, self.decode_untyped(node, depth + 1)?);
            }
            fields.insert(bucket.clone(), Value::Map(values));
        } else if !extra.is_empty() {
            let keys: Vec<String> = extra.into_keys().collect();
            if self.config.prohibit_extra_properties {
                tracing::debug!(structure = %desc.name, ?keys, "rejecting unmapped keys");
                return Err(Error::UnmappedExtraProperties {
                    structure: desc.name.clone(),
                    keys,
                });
            }
            tracing::debug!(structure = %desc.name, ?keys, "dropping unmapped keys");
        }

        Ok(Value::Struct(Structure {
            name: desc.name.clone(),
            fields,
        }))
    }

    /// Keeps the tree shape, reading scalars as booleans or integers when
    /// they look like one. Integers must print back to the same text, so
    /// `007` and `+7` stay strings.
    fn decode_untyped(&self, raw: RawNode, depth: usize) -> Result<Value> {
        if depth > RECURSION_LIMIT {
            return Err(Error::RecursionLimit(RECURSION_LIMIT));
        }
        Ok(match raw {
            RawNode::Scalar(s) if self.config.is_null(&s) => Value::Null,
            RawNode::Scalar(s) => match s.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => match s.parse::<i64>() {
                    Ok(n) if itoa::Buffer::new().format(n) == s => Value::Long(n),
                    _ => Value::String(s),
                },
            },
            RawNode::Mapping(map) => {
                let mut values = Map::new();
                for (key, node) in map {
                    values.insert(key, self.decode_untyped(node, depth + 1)?);
                }
                Value::Map(values)
            }
            RawNode::Sequence { items, .. } => Value::List(
                items
                    .into_iter()
                    .map(|item| match item {
                        Some(item) => self.decode_untyped(item, depth + 1),
                        None => Ok(Value::Null),
                    })
                    .collect::<Result<_>>()?,
            ),
        })
    }

    fn encode_at(
        &self,
        value: &Value,
        ty: &TypeDescription,
        depth: usize,
    ) -> Result<Option<RawNode>> {
        if depth > RECURSION_LIMIT {
            return Err(Error::RecursionLimit(RECURSION_LIMIT));
        }
        if let TypeDescription::Primitive(kind) = ty {
            return Err(primitive(*kind));
        }
        if value.is_null() {
            return Ok(self.config.null_scalar());
        }
        let node = match ty {
            TypeDescription::Simple(kind) => {
                if value.kind() != Some(*kind) {
                    return Err(Error::incompatible(format_args!("{value:?}"), kind));
                }
                scalar_text(value).map(RawNode::Scalar)
            }
            TypeDescription::Array(elem) | TypeDescription::GenericSequence(elem) => {
                Some(self.encode_list(value, elem, depth)?)
            }
            TypeDescription::RawSequence => {
                Some(self.encode_list(value, &TypeDescription::Unknown, depth)?)
            }
            TypeDescription::GenericMapping(elem) => Some(self.encode_map(value, elem, depth)?),
            TypeDescription::RawMapping => {
                Some(self.encode_map(value, &TypeDescription::Unknown, depth)?)
            }
            TypeDescription::NamedStructure(structure) => match value {
                Value::Struct(instance) => {
                    Some(self.encode_struct(&structure.resolve(), instance, depth)?)
                }
                other => {
                    return Err(Error::incompatible(
                        format_args!("{other:?}"),
                        format_args!("structure `{}`", structure.resolve().name),
                    ));
                }
            },
            TypeDescription::Unknown => self.encode_untyped(value, depth)?,
            TypeDescription::Primitive(_) => None,
        };
        Ok(node)
    }

    fn encode_list(&self, value: &Value, elem: &TypeDescription, depth: usize) -> Result<RawNode> {
        let Value::List(items) = value else {
            return Err(Error::incompatible(format_args!("{value:?}"), "list"));
        };
        let items = items
            .iter()
            .map(|item| self.encode_at(item, elem, depth + 1))
            .collect::<Result<_>>()?;
        Ok(RawNode::Sequence {
            indexed: true,
            items,
        })
    }

    fn encode_map(&self, value: &Value, elem: &TypeDescription, depth: usize) -> Result<RawNode> {
        let Value::Map(entries) = value else {
            return Err(Error::incompatible(format_args!("{value:?}"), "map"));
        };
        let mut map = Map::new();
        for (key, value) in entries {
            if let Some(node) = self.encode_at(value, elem, depth + 1)? {
                map.insert(key.clone(), node);
            }
        }
        Ok(RawNode::Mapping(map))
    }

    fn encode_struct(
        &self,
        desc: &StructDescription,
        instance: &Structure,
        depth: usize,
    ) -> Result<RawNode> {
        let mut map = Map::new();
        for field in &desc.fields {
            let Some(value) = instance.fields.get(&field.name) else {
                continue;
            };
            if let Some(node) = self.encode_at(value, &field.ty, depth + 1)? {
                map.insert(field.wire_name.clone(), node);
            }
        }

        let bucket = desc
            .extra
            .as_ref()
            .and_then(|bucket| instance.fields.get(bucket));
        match bucket {
            Some(Value::Map(extra)) => {
                for (key, value) in extra {
                    if map.contains_key(key) {
                        continue;
                    }
                    if let Some(node) = self.encode_untyped(value, depth + 1)? {
                        map.insert(key.clone(), node);
                    }
                }
            }
            Some(Value::Null) | None => {}
            Some(other) => {
                return Err(Error::incompatible(
                    format_args!("{other:?}"),
                    "map of extra properties",
                ));
            }
        }
        Ok(RawNode::Mapping(map))
    }

    fn encode_untyped(&self, value: &Value, depth: usize) -> Result<Option<RawNode>> {
        if depth > RECURSION_LIMIT {
            return Err(Error::RecursionLimit(RECURSION_LIMIT));
        }
        Ok(match value {
            Value::Null => self.config.null_scalar(),
            Value::List(items) => Some(RawNode::Sequence {
                indexed: true,
                items: items
                    .iter()
                    .map(|item| self.encode_untyped(item, depth + 1))
                    .collect::<Result<_>>()?,
            }),
            Value::Map(entries) | Value::Struct(Structure { fields: entries, .. }) => {
                let mut map = Map::new();
                for (key, value) in entries {
                    if let Some(node) = self.encode_untyped(value, depth + 1)? {
                        map.insert(key.clone(), node);
                    }
                }
                Some(RawNode::Mapping(map))
            }
            scalar => scalar_text(scalar).map(RawNode::Scalar),
        })
    }
}

fn primitive(kind: ScalarKind) -> Error {
    Error::UnsupportedType(format!(
        "primitive {kind} cannot represent a missing key, use a simple {kind}"
    ))
}

/// Parses a leaf as the requested kind. Numbers use Rust's locale-free
/// parsers and booleans must be exactly `true` or `false`.
fn parse_scalar(s: String, kind: ScalarKind) -> Result<Value> {
    fn parse<T: FromStr>(s: &str, kind: ScalarKind) -> Result<T> {
        s.parse()
            .map_err(|_| Error::incompatible(format_args!("{s:?}"), kind))
    }

    Ok(match kind {
        ScalarKind::String => Value::String(s),
        ScalarKind::Boolean => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(Error::incompatible(format_args!("{s:?}"), kind)),
        },
        ScalarKind::Char => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Value::Char(c),
                _ => return Err(Error::incompatible(format_args!("{s:?}"), kind)),
            }
        }
        ScalarKind::Byte => Value::Byte(parse(&s, kind)?),
        ScalarKind::Short => Value::Short(parse(&s, kind)?),
        ScalarKind::Integer => Value::Int(parse(&s, kind)?),
        ScalarKind::Long => Value::Long(parse(&s, kind)?),
        ScalarKind::Float => Value::Float(parse(&s, kind)?),
        ScalarKind::Double => Value::Double(parse(&s, kind)?),
        ScalarKind::BigInteger => Value::BigInteger(parse::<BigInt>(&s, kind)?),
        ScalarKind::BigDecimal => Value::BigDecimal(parse::<BigDecimal>(&s, kind)?),
    })
}

/// The wire text of a scalar value, `None` for nulls and containers.
fn scalar_text(value: &Value) -> Option<String> {
    let mut itoa = itoa::Buffer::new();
    let mut ryu = ryu::Buffer::new();
    Some(match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_owned(),
        Value::Char(c) => c.to_string(),
        Value::Byte(n) => itoa.format(*n).to_owned(),
        Value::Short(n) => itoa.format(*n).to_owned(),
        Value::Int(n) => itoa.format(*n).to_owned(),
        Value::Long(n) => itoa.format(*n).to_owned(),
        Value::Float(n) => ryu.format(*n).to_owned(),
        Value::Double(n) => ryu.format(*n).to_owned(),
        Value::BigInteger(n) => n.to_string(),
        Value::BigDecimal(n) => n.to_string(),
        Value::Null | Value::List(_) | Value::Map(_) | Value::Struct(_) => return None,
    })
}
