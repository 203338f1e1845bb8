//! Nested form-urlencoded strings, decoded into trees and typed values
//!
//! Form bodies and querystrings flatten nested data into `key=value` pairs
//! with bracket notation: `user[name]=Ann&user[tags][0]=a&user[tags][1]=b`.
//! This crate reads such input into a [`RawNode`] tree, reconciling pairs
//! that describe overlapping paths, and writes trees back out as pairs.
//!
//! The syntax follows the conventions of [qs](https://github.com/ljharb/qs)
//! and `Rack::Utils::parse_nested_query`: only flat bracket chains
//! (`a[b][c]`, never `a[[b]]`), and lists written as repeated keys
//! (`a=1&a=2`), empty brackets (`a[]=1&a[]=2`) or numbered brackets
//! (`a[0]=1&a[1]=2`).
//!
//! Typed values are reached two ways:
//!
//! * **serde**: [`from_str`] and [`to_string`] work with any
//!   `Deserialize`/`Serialize` type;
//! * **type descriptions**: [`Config::decode_value`] and
//!   [`Config::encode_value`] convert between the tree and a dynamic
//!   [`Value`] as directed by a [`TypeDescription`].
//!
//! ## Supported Types
//!
//! At the **top level** only structs, maps and enums can be used, since
//! every pair needs a key. Below the top level all types are supported.
//!
//! ## Usage
//!
//! ```
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Deserialize, Serialize)]
//! struct Address {
//!     city: String,
//!     postcode: String,
//! }
//! #[derive(Debug, PartialEq, Deserialize, Serialize)]
//! struct QueryParams {
//!     id: u8,
//!     name: String,
//!     address: Address,
//!     phone: u32,
//!     user_ids: Vec<u8>,
//! }
//!
//! let params = QueryParams {
//!     id: 42,
//!     name: "Acme".to_string(),
//!     phone: 12345,
//!     address: Address {
//!         city: "Carrot City".to_string(),
//!         postcode: "12345".to_string(),
//!     },
//!     user_ids: vec![1, 2, 3, 4],
//! };
//! let rec_params: QueryParams = serde_formtree::from_str("\
//!     name=Acme&id=42&phone=12345&address[postcode]=12345&\
//!     address[city]=Carrot+City&user_ids[0]=1&user_ids[1]=2&\
//!     user_ids[2]=3&user_ids[3]=4")
//!     .unwrap();
//! assert_eq!(rec_params, params);
//! ```
//!
//! The raw tree can also be inspected directly:
//!
//! ```
//! let tree = serde_formtree::decode("a[]=1&a[]=2&b[c]=x").unwrap();
//! assert_eq!(tree.get("b").unwrap().get("c").unwrap().as_str(), Some("x"));
//! assert_eq!(tree.get("a").unwrap().as_sequence().unwrap().len(), 2);
//! ```
//!
//! ## Strict and lax parsing
//!
//! Keys that match no struct field are skipped unless
//! [`Config::prohibit_extra_properties`] is set. Malformed keys such as
//! `a[[b]]` and pairs whose shapes cannot be merged, such as `a=1&a[b]=2`,
//! are always errors.

mod chain;
mod config;
mod convert;
pub mod de;
mod error;
mod map;
mod node;
pub mod schema;
mod ser;

/// Nesting limit for merging, converting and flattening trees.
pub(crate) const RECURSION_LIMIT: usize = 128;

pub use chain::{ChainPart, KeySegment};
pub use config::{Charset, Config, ListStyle, NullRule};
pub use convert::Converter;
#[doc(inline)]
pub use de::{Deserializer, from_bytes, from_node, from_reader, from_str};
pub use error::{Error, ErrorKind, Result};
pub use map::Map;
pub use node::{NULL_MARKER, RawNode};
#[doc(inline)]
pub use schema::{
    Describe, FieldDescription, ScalarKind, StructDescription, StructRef, Structure,
    TypeDescription, Value,
};
#[doc(inline)]
pub use ser::{Serializer, flatten, to_node, to_string, to_writer};

/// Decodes a form-encoded string into a raw tree with the default
/// [`Config`]. The root is always a mapping.
pub fn decode(input: &str) -> Result<RawNode> {
    Config::default().decode_str(input)
}
