//! Merging tree fragments into one tree.
//!
//! Every decoded pair expands into a single-root mapping, and the
//! fragments are folded, in input order, into one accumulated mapping.
//! The rules for combining two values at the same path are:
//!
//! | existing \ incoming | scalar                  | mapping   | sequence         |
//! |---------------------|-------------------------|-----------|------------------|
//! | scalar              | hidden list `[old, new]` | conflict  | insert scalar    |
//! | mapping             | conflict                | merge     | conflict         |
//! | sequence            | insert scalar           | conflict  | merge sequences  |
//!
//! Sequences only merge with sequences of the same indexed-ness. Indexed
//! sequences are merged slot by slot, with the incoming value winning for
//! two scalars in the same slot. Non-indexed sequences are appended, except
//! that lists of mappings with the same keys are zipped element by element.
//! The zipping is a heuristic and only kept for compatibility.
//!
//! All functions consume both trees and return the merged one.

use crate::RECURSION_LIMIT;
use crate::chain::ChainPart;
use crate::error::{Error, Result};
use crate::map::{Entry, Map};
use crate::node::RawNode;

type Items = Vec<Option<RawNode>>;

/// Folds chain parts, in order, into a single mapping.
pub fn merge_parts<I>(parts: I) -> Result<Map<String, RawNode>>
where
    I: IntoIterator<Item = ChainPart>,
{
    let mut acc = Map::new();
    for part in parts {
        let tree = part.into_tree()?;
        acc = merge_mappings(tree, acc)?;
    }
    Ok(acc)
}

/// Merges `source` into `target`. `source` is treated as the later input.
pub fn merge_mappings(
    source: Map<String, RawNode>,
    target: Map<String, RawNode>,
) -> Result<Map<String, RawNode>> {
    merge_maps_at(source, target, 0)
}

/// Merges two values that share a path. `source` is treated as the later
/// input, and `key` only names the path in errors.
pub fn merge_values(source: RawNode, target: RawNode, key: &str) -> Result<RawNode> {
    merge_at(source, target, key, 0)
}

fn check_depth(depth: usize) -> Result<()> {
    if depth > RECURSION_LIMIT {
        return Err(Error::RecursionLimit(RECURSION_LIMIT));
    }
    Ok(())
}

fn merge_maps_at(
    source: Map<String, RawNode>,
    mut target: Map<String, RawNode>,
    depth: usize,
) -> Result<Map<String, RawNode>> {
    check_depth(depth)?;
    for (key, value) in source {
        match target.entry(key) {
            Entry::Vacant(v) => {
                v.insert(value);
            }
            Entry::Occupied(mut o) => {
                let existing = std::mem::replace(o.get_mut(), RawNode::mapping());
                let merged = merge_at(value, existing, o.key(), depth + 1)?;
                *o.get_mut() = merged;
            }
        }
    }
    Ok(target)
}

fn merge_at(source: RawNode, target: RawNode, key: &str, depth: usize) -> Result<RawNode> {
    check_depth(depth)?;
    match (source, target) {
        (RawNode::Mapping(source), RawNode::Mapping(target)) => {
            merge_maps_at(source, target, depth).map(RawNode::Mapping)
        }
        (
            RawNode::Sequence {
                indexed: source_indexed,
                items: source,
            },
            RawNode::Sequence {
                indexed: target_indexed,
                items: target,
            },
        ) => {
            if source_indexed != target_indexed {
                return Err(conflict(
                    key,
                    sequence_name(target_indexed),
                    sequence_name(source_indexed),
                ));
            }
            merge_sequences(source, target, target_indexed, key, depth)
        }
        (RawNode::Scalar(source), RawNode::Scalar(target)) => {
            // `foo=a&foo=b` is the hidden list `[a, b]`
            Ok(RawNode::Sequence {
                indexed: false,
                items: vec![
                    Some(RawNode::Scalar(target)),
                    Some(RawNode::Scalar(source)),
                ],
            })
        }
        (scalar @ RawNode::Scalar(_), RawNode::Sequence { indexed, items }) => {
            merge_sequences(vec![Some(scalar)], items, indexed, key, depth)
        }
        (RawNode::Sequence { indexed, items }, scalar @ RawNode::Scalar(_)) => {
            merge_sequences(items, vec![Some(scalar)], indexed, key, depth)
        }
        (source, target) => Err(conflict(key, target.type_name(), source.type_name())),
    }
}

fn merge_sequences(
    source: Items,
    target: Items,
    indexed: bool,
    key: &str,
    depth: usize,
) -> Result<RawNode> {
    let items = if source.is_empty() {
        target
    } else if target.is_empty() {
        source
    } else if indexed {
        merge_indexed(source, target, key, depth)?
    } else {
        merge_unindexed(source, target, key, depth)?
    };
    Ok(RawNode::Sequence { indexed, items })
}

/// Slot-by-slot merge of two indexed sequences.
///
/// While either side still has holes, an incoming mapping is placed over a
/// scalar instead of conflicting with it.
fn merge_indexed(source: Items, target: Items, key: &str, depth: usize) -> Result<Items> {
    let filled = source.iter().chain(&target).all(Option::is_some);
    let len = source.len().max(target.len());
    let mut source = source.into_iter();
    let mut target = target.into_iter();
    let mut merged = Vec::with_capacity(len);
    for _ in 0..len {
        let slot = match (source.next().flatten(), target.next().flatten()) {
            (None, None) => None,
            (None, Some(existing)) => Some(existing),
            (Some(incoming), None) => Some(incoming),
            // the later assignment of a slot wins
            (Some(incoming @ RawNode::Scalar(_)), Some(RawNode::Scalar(_))) => Some(incoming),
            (Some(incoming @ RawNode::Mapping(_)), Some(RawNode::Scalar(_))) if !filled => {
                Some(incoming)
            }
            (Some(incoming), Some(existing)) => Some(merge_at(incoming, existing, key, depth + 1)?),
        };
        merged.push(slot);
    }
    Ok(merged)
}

/// Appends `source` after `target`, or zips lists of same-shaped mappings.
fn merge_unindexed(source: Items, target: Items, key: &str, depth: usize) -> Result<Items> {
    if !zippable(&source, &target) {
        let mut merged = target;
        merged.extend(source);
        return Ok(merged);
    }

    let mut merged = Vec::with_capacity(source.len().max(target.len()));
    let mut source = source.into_iter();
    let mut target = target.into_iter();
    loop {
        let slot = match (source.next(), target.next()) {
            (None, None) => break,
            (Some(incoming), None) => incoming,
            (None, Some(existing)) => existing,
            (Some(Some(incoming)), Some(Some(existing))) => {
                Some(merge_at(incoming, existing, key, depth + 1)?)
            }
            (Some(incoming), Some(existing)) => incoming.or(existing),
        };
        merged.push(slot);
    }
    Ok(merged)
}

/// Whether every incoming element is a mapping with the same keys as the
/// existing element at its position.
fn zippable(source: &Items, target: &Items) -> bool {
    source.iter().enumerate().all(|(i, incoming)| {
        let Some(RawNode::Mapping(incoming)) = incoming else {
            return false;
        };
        match target.get(i) {
            None => true,
            Some(Some(RawNode::Mapping(existing))) => {
                existing.len() == incoming.len()
                    && incoming.keys().all(|k| existing.contains_key(k))
            }
            Some(_) => false,
        }
    })
}

fn sequence_name(indexed: bool) -> &'static str {
    if indexed { "indexed sequence" } else { "sequence" }
}

fn conflict(key: &str, existing: &'static str, incoming: &'static str) -> Error {
    tracing::debug!(key, existing, incoming, "merge conflict");
    Error::MergeConflict {
        key: key.to_owned(),
        existing,
        incoming,
    }
}
