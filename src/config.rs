use std::io::Write;

use serde::de;

use crate::convert::Converter;
use crate::error::Result;
use crate::node::{NULL_MARKER, RawNode};
use crate::schema::{TypeDescription, Value};
use crate::{Deserializer, Serializer};

/// Configuration for encoding and decoding behavior.
///
/// ## Nesting Depth
///
/// The `max_depth` parameter controls how deeply nested keys can be.
/// This is important for preventing denial-of-service attacks from maliciously
/// crafted inputs with excessive nesting. A `max_depth` of 0 means no nesting
/// is allowed (flat key-value pairs only). Brackets beyond the limit are kept
/// as part of the last key.
///
/// Default value: `max_depth = 5`
///
/// ```
/// use serde_formtree::Config;
/// use std::collections::HashMap;
///
/// let config = Config::new().max_depth(0);
/// let map: HashMap<String, String> = config.deserialize_str("a[b][c]=1")
///                                          .unwrap();
/// assert_eq!(map.get("a[b][c]").unwrap(), "1");
///
/// let config = Config::new().max_depth(10);
/// let map: HashMap<String, HashMap<String, HashMap<String, String>>> =
///             config.deserialize_str("a[b][c]=1").unwrap();
/// assert_eq!(map.get("a").unwrap().get("b").unwrap().get("c").unwrap(), "1");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub(crate) max_depth: usize,
    pub(crate) max_index: u32,
    pub(crate) use_form_encoding: bool,
    pub(crate) list_style: ListStyle,
    pub(crate) null_rule: NullRule,
    pub(crate) charset: Charset,
    pub(crate) prohibit_extra_properties: bool,
}

/// How lists are written when encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListStyle {
    /// Use the `a=1&a=2` format.
    Hidden,
    /// Use the `a[]=1&a[]=2` format.
    Implicit,
    /// Use the `a[0]=1&a[1]=2` format.
    Explicit,
}

/// How absent values are written when encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullRule {
    /// Leave the key out.
    Ignore,
    /// Write the reserved [`NULL_MARKER`] scalar.
    NullMarker,
    /// Write `key=`.
    EmptyString,
    /// Write `key=null`.
    NullString,
}

/// Character set used to interpret percent-encoded bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    /// ISO-8859-1, one byte per character.
    Latin1,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub const fn new() -> Self {
        Self {
            max_depth: 5,
            max_index: 10_000,
            use_form_encoding: cfg!(feature = "default_to_form_encoding"),
            list_style: ListStyle::Explicit,
            null_rule: NullRule::Ignore,
            charset: Charset::Utf8,
            prohibit_extra_properties: false,
        }
    }

    /// Specifies the maximum number of nested brackets that will be parsed
    /// into separate levels. Default is 5.
    pub const fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Largest accepted explicit list index, e.g. the `7` in `a[7]=x`.
    ///
    /// Explicit indexes allocate every position before them, so this bounds
    /// the memory a single pair can request. Default is 10 000.
    pub const fn max_index(mut self, max_index: u32) -> Self {
        self.max_index = max_index;
        self
    }

    /// By default, keys and values are encoded with the minimal
    /// [WHATWG query](https://url.spec.whatwg.org/#query-percent-encode-set)
    /// set, and nesting brackets are written as literal `[` and `]`.
    ///
    /// With form encoding, the stricter
    /// `application/x-www-form-urlencoded` set is used, nesting brackets
    /// are written as `%5B` and `%5D`, and `%5B`/`%5D` in incoming keys
    /// are read as nesting brackets.
    ///
    /// Alternatively, you can use the `default_to_form_encoding` Cargo feature
    /// to set this to `true` by default.
    pub const fn use_form_encoding(mut self, use_form_encoding: bool) -> Self {
        self.use_form_encoding = use_form_encoding;
        self
    }

    /// Specifies how lists are written during encoding.
    ///
    /// The default is `Explicit`, which results in keys like `a[0]=1&a[1]=2`.
    pub const fn list_style(mut self, list_style: ListStyle) -> Self {
        self.list_style = list_style;
        self
    }

    /// Specifies how absent values are written, and which scalars read back
    /// as absent. Default is `Ignore`.
    pub const fn null_rule(mut self, null_rule: NullRule) -> Self {
        self.null_rule = null_rule;
        self
    }

    /// Character set for percent-encoded bytes. Default is UTF-8.
    pub const fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// When set, keys that match no field of the target structure are an
    /// error instead of being skipped.
    pub const fn prohibit_extra_properties(mut self, prohibit: bool) -> Self {
        self.prohibit_extra_properties = prohibit;
        self
    }

    /// Whether a decoded scalar stands for an absent value.
    pub(crate) fn is_null(&self, scalar: &str) -> bool {
        scalar == NULL_MARKER
            || match self.null_rule {
                NullRule::EmptyString => scalar.is_empty(),
                NullRule::NullString => scalar == "null",
                NullRule::Ignore | NullRule::NullMarker => false,
            }
    }

    /// The scalar written for an absent value, if any.
    pub(crate) fn null_scalar(&self) -> Option<RawNode> {
        match self.null_rule {
            NullRule::Ignore => None,
            NullRule::NullMarker => Some(RawNode::scalar(NULL_MARKER)),
            NullRule::EmptyString => Some(RawNode::scalar("")),
            NullRule::NullString => Some(RawNode::scalar("null")),
        }
    }

    /// Decodes a form-encoded `&[u8]` into a raw tree. The root is always
    /// a mapping.
    pub fn decode_bytes(self, input: &[u8]) -> Result<RawNode> {
        crate::de::decode(input, self).map(RawNode::Mapping)
    }

    /// Decodes a form-encoded `&str` into a raw tree.
    pub fn decode_str(self, input: &str) -> Result<RawNode> {
        self.decode_bytes(input.as_bytes())
    }

    /// Decodes a form-encoded `&str` and converts it to the described type.
    pub fn decode_value(self, input: &str, ty: &TypeDescription) -> Result<Value> {
        let raw = self.decode_str(input)?;
        Converter::new(self).decode(raw, ty)
    }

    /// Converts a value of the described type and encodes it.
    pub fn encode_value(self, value: &Value, ty: &TypeDescription) -> Result<String> {
        let raw = Converter::new(self).encode_root(value, ty)?;
        self.encode_node(&raw)
    }

    /// Encodes a raw tree, which must be a mapping.
    pub fn encode_node(self, node: &RawNode) -> Result<String> {
        let mut buffer = Vec::with_capacity(128);
        crate::ser::write_node(&mut buffer, node, self)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::from(e.utf8_error()))
    }

    /// Deserializes a querystring from a `&[u8]` using this `Config`.
    pub fn deserialize_bytes<T: de::DeserializeOwned>(self, input: &[u8]) -> Result<T> {
        T::deserialize(Deserializer::from_bytes(input, self)?)
    }

    /// Deserializes a querystring from a `&str` using this `Config`.
    pub fn deserialize_str<T: de::DeserializeOwned>(self, input: &str) -> Result<T> {
        self.deserialize_bytes(input.as_bytes())
    }

    /// Serializes an object to a querystring using this `Config`.
    pub fn serialize_string<T: serde::Serialize>(self, input: &T) -> Result<String> {
        // initialize the buffer with 128 bytes
        // this is a guess based on what `serde_json` does
        let mut buffer = Vec::with_capacity(128);
        self.serialize_to_writer(input, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| crate::Error::from(e.utf8_error()))
    }

    /// Serializes an object to a querystring using this `Config`.
    pub fn serialize_to_writer<T: serde::Serialize, W: Write>(
        self,
        input: &T,
        writer: &mut W,
    ) -> Result<()> {
        let node = input
            .serialize(Serializer::new(self))?
            .unwrap_or_else(RawNode::mapping);
        crate::ser::write_node(writer, &node, self)
    }
}
