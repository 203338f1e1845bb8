use std::fmt;

use crate::map::Map;

/// Scalar used to represent an explicit null on the wire when the
/// [`NullRule::NullMarker`](crate::NullRule::NullMarker) policy is active.
pub const NULL_MARKER: &str = "\u{0}";

/// The untyped tree between flat key=value pairs and typed values.
///
/// - `Scalar`: a decoded leaf value, e.g. the `John` in `user[name]=John`
/// - `Mapping`: nested objects like `user[name]=John&user[age]=30`
/// - `Sequence`: lists like `ids[0]=1&ids[1]=2` (indexed) or
///   `ids[]=1&ids[]=2` and `ids=1&ids=2` (not indexed)
///
/// Positions of an indexed sequence are meaningful, and unset positions are
/// kept as `None` holes. The order of a non-indexed sequence only reflects
/// the order of the input pairs.
#[derive(Clone, PartialEq)]
pub enum RawNode {
    Scalar(String),
    Mapping(Map<String, RawNode>),
    Sequence {
        indexed: bool,
        items: Vec<Option<RawNode>>,
    },
}

impl RawNode {
    pub fn scalar(value: impl Into<String>) -> Self {
        RawNode::Scalar(value.into())
    }

    pub fn mapping() -> Self {
        RawNode::Mapping(Map::new())
    }

    pub fn sequence(indexed: bool, items: Vec<Option<RawNode>>) -> Self {
        RawNode::Sequence { indexed, items }
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            RawNode::Scalar(_) => "scalar",
            RawNode::Mapping(_) => "mapping",
            RawNode::Sequence { indexed: true, .. } => "indexed sequence",
            RawNode::Sequence { indexed: false, .. } => "sequence",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Map<String, RawNode>> {
        match self {
            RawNode::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Option<RawNode>]> {
        match self {
            RawNode::Sequence { items, .. } => Some(items),
            _ => None,
        }
    }

    /// Looks up a key of a mapping node.
    pub fn get(&self, key: &str) -> Option<&RawNode> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// A sequence is filled when it is indexed and has no holes.
    pub fn is_filled(&self) -> bool {
        match self {
            RawNode::Sequence { indexed, items } => *indexed && items.iter().all(Option::is_some),
            _ => true,
        }
    }

    /// Short rendering of the node for diagnostics.
    pub(crate) fn describe(&self) -> String {
        match self {
            RawNode::Scalar(s) => format!("{s:?}"),
            other => format!("{other:?}"),
        }
    }
}

impl fmt::Debug for RawNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawNode::Scalar(s) => write!(f, "{s:?}"),
            RawNode::Mapping(m) => f.debug_map().entries(m.iter()).finish(),
            RawNode::Sequence { indexed, items } => {
                if !indexed {
                    write!(f, "~")?;
                }
                f.debug_list()
                    .entries(items.iter().map(|item| Hole(item.as_ref())))
                    .finish()
            }
        }
    }
}

struct Hole<'a>(Option<&'a RawNode>);

impl fmt::Debug for Hole<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(node) => node.fmt(f),
            None => write!(f, "_"),
        }
    }
}

impl From<&str> for RawNode {
    fn from(s: &str) -> Self {
        RawNode::Scalar(s.to_owned())
    }
}

impl From<String> for RawNode {
    fn from(s: String) -> Self {
        RawNode::Scalar(s)
    }
}

impl From<Map<String, RawNode>> for RawNode {
    fn from(m: Map<String, RawNode>) -> Self {
        RawNode::Mapping(m)
    }
}
