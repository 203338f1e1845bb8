//! The map type used for mappings in raw trees and typed values.
//!
//! With the `indexmap` feature keys keep their insertion order, otherwise
//! they are sorted.

#[cfg(feature = "indexmap")]
pub use indexmap::map::{Entry, IndexMap as Map};

#[cfg(not(feature = "indexmap"))]
pub use std::collections::btree_map::{BTreeMap as Map, Entry};
