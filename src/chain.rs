//! Key chains: one key=value pair seen as a path of key segments.
//!
//! `a[b][0]=x` is the chain `Key("a")`, `Key("b")`, `Index(Some(0))` with
//! the value `x`. Chains are produced by the key parser when decoding and
//! by the flattener when encoding, and each one expands into a minimal tree
//! via [`ChainPart::into_tree`].

use std::fmt;

use crate::config::ListStyle;
use crate::error::{Error, Result};
use crate::map::Map;
use crate::node::RawNode;

/// One bracketed component of a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeySegment {
    /// A map key, e.g. `b` in `a[b]`.
    Key(String),
    /// A list slot: `Some(n)` for `a[n]`, `None` for `a[]` or a hidden list.
    Index(Option<u32>),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Key(k) => write!(f, "[{k}]"),
            KeySegment::Index(Some(i)) => write!(f, "[{i}]"),
            KeySegment::Index(None) => write!(f, "[]"),
        }
    }
}

/// A decoded (or to-be-encoded) pair: the key path plus its value.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainPart {
    segments: Vec<KeySegment>,
    value: Option<String>,
    implicit: bool,
    explicit: bool,
}

impl ChainPart {
    /// Starts a chain at a root key, appending list segments as `style` asks.
    pub fn new(root: impl Into<String>, style: ListStyle) -> Self {
        Self {
            segments: vec![KeySegment::Key(root.into())],
            value: None,
            implicit: style == ListStyle::Implicit,
            explicit: style == ListStyle::Explicit,
        }
    }

    /// Builds a chain from already classified segments.
    ///
    /// The list intent is taken from the segments themselves: `explicit`
    /// when any index is numbered, `implicit` when any index is empty.
    pub fn from_segments(segments: Vec<KeySegment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::malformed_key("", "a key needs at least one segment"));
        }
        let explicit = segments
            .iter()
            .any(|s| matches!(s, KeySegment::Index(Some(_))));
        let implicit = !explicit
            && segments
                .iter()
                .any(|s| matches!(s, KeySegment::Index(None)));
        Ok(Self {
            segments,
            value: None,
            implicit,
            explicit,
        })
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    fn ensure_open(&self) -> Result<()> {
        if self.value.is_some() {
            return Err(Error::malformed_key(
                self.to_string(),
                "cannot extend a key whose value is already set",
            ));
        }
        Ok(())
    }

    /// Appends a map key segment.
    pub fn push_key(&mut self, name: impl Into<String>) -> Result<()> {
        self.ensure_open()?;
        self.segments.push(KeySegment::Key(name.into()));
        Ok(())
    }

    /// Appends a list segment for `position`.
    ///
    /// Explicit chains get `[position]`, implicit chains get `[]`, and hidden
    /// chains get no segment at all, so the value repeats the parent key.
    pub fn push_list(&mut self, position: u32) -> Result<()> {
        self.ensure_open()?;
        if self.explicit {
            self.segments.push(KeySegment::Index(Some(position)));
        } else if self.implicit {
            self.segments.push(KeySegment::Index(None));
        }
        Ok(())
    }

    /// Fixes the value. Afterwards the segments can no longer change.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = Some(value.into());
    }

    /// Expands the chain into a single-root mapping.
    ///
    /// The innermost segment holds the value, and each enclosing segment
    /// wraps it: keys in a one-entry mapping, numbered indexes in an indexed
    /// sequence padded with holes up to the index, empty indexes in a
    /// one-element sequence.
    pub fn into_tree(self) -> Result<Map<String, RawNode>> {
        let key = self.to_string();
        let Some(value) = self.value else {
            return Err(Error::malformed_key(key, "the key has no value"));
        };
        let mut segments = self.segments.into_iter();
        let root = match segments.next() {
            Some(KeySegment::Key(root)) => root,
            Some(KeySegment::Index(_)) | None => {
                return Err(Error::malformed_key(key, "a list cannot be the root"));
            }
        };

        let mut current = RawNode::Scalar(value);
        for segment in segments.rev() {
            current = match segment {
                KeySegment::Key(name) => {
                    let mut map = Map::new();
                    map.insert(name, current);
                    RawNode::Mapping(map)
                }
                KeySegment::Index(Some(n)) => {
                    let mut items = Vec::with_capacity(n as usize + 1);
                    items.resize_with(n as usize, || None);
                    items.push(Some(current));
                    RawNode::Sequence {
                        indexed: true,
                        items,
                    }
                }
                KeySegment::Index(None) => RawNode::Sequence {
                    indexed: false,
                    items: vec![Some(current)],
                },
            };
        }

        let mut tree = Map::new();
        tree.insert(root, current);
        Ok(tree)
    }
}

impl fmt::Display for ChainPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.segments.iter();
        match segments.next() {
            Some(KeySegment::Key(root)) => write!(f, "{root}")?,
            Some(other) => write!(f, "{other}")?,
            None => {}
        }
        for segment in segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}
