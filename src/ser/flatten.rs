//! Walking a raw tree into key chains and writing them out.

use std::io::Write;

use super::encode::encode_into;
use crate::chain::{ChainPart, KeySegment};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::map::Map;
use crate::node::RawNode;

/// Flattens a raw tree into one chain per leaf, in tree order.
///
/// The root must be a mapping. Lists get segments according to the
/// configured [`ListStyle`](crate::ListStyle), holes are skipped, and empty
/// mappings and sequences are written as an empty value.
pub fn flatten(node: &RawNode, config: Config) -> Result<Vec<ChainPart>> {
    let RawNode::Mapping(root) = node else {
        return Err(Error::top_level(node.type_name()));
    };
    let mut parts = Vec::new();
    for (key, child) in root {
        let part = ChainPart::new(key.as_str(), config.list_style);
        if config.use_form_encoding {
            check_key(key)?;
        }
        flatten_into(child, part, config, &mut parts, 1)?;
    }
    Ok(parts)
}

fn flatten_into(
    node: &RawNode,
    mut part: ChainPart,
    config: Config,
    out: &mut Vec<ChainPart>,
    depth: usize,
) -> Result<()> {
    if depth > crate::RECURSION_LIMIT {
        return Err(Error::RecursionLimit(crate::RECURSION_LIMIT));
    }
    match node {
        RawNode::Scalar(value) => {
            part.set_value(value.as_str());
            out.push(part);
        }
        RawNode::Mapping(map) if map.is_empty() => {
            part.set_value("");
            out.push(part);
        }
        RawNode::Mapping(map) => flatten_mapping(map, part, config, out, depth)?,
        RawNode::Sequence { items, .. } if items.is_empty() => {
            part.set_value("");
            out.push(part);
        }
        RawNode::Sequence { items, .. } => {
            for (position, item) in items.iter().enumerate() {
                let Some(item) = item else { continue };
                let position = u32::try_from(position)
                    .map_err(|_| Error::malformed_key(part.to_string(), "list is too long"))?;
                let mut child = part.clone();
                child.push_list(position)?;
                flatten_into(item, child, config, out, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn flatten_mapping(
    map: &Map<String, RawNode>,
    part: ChainPart,
    config: Config,
    out: &mut Vec<ChainPart>,
    depth: usize,
) -> Result<()> {
    for (key, child) in map {
        if key.is_empty() {
            return Err(Error::malformed_key(
                format!("{part}[]"),
                "an empty key below the root reads back as a list",
            ));
        }
        if config.use_form_encoding {
            check_key(key)?;
        }
        let mut nested = part.clone();
        nested.push_key(key.as_str())?;
        flatten_into(child, nested, config, out, depth + 1)?;
    }
    Ok(())
}

/// In form-encoding mode `%5B` and `%5D` are structural, so a bracket
/// inside a key would not read back as the same key.
fn check_key(key: &str) -> Result<()> {
    if key.contains(['[', ']']) {
        return Err(Error::malformed_key(
            key,
            "keys cannot contain brackets when form encoding is used",
        ));
    }
    Ok(())
}

fn render_part(out: &mut Vec<u8>, part: &ChainPart, config: Config) -> Result<()> {
    let (open, close): (&[u8], &[u8]) = if config.use_form_encoding {
        (b"%5B", b"%5D")
    } else {
        (b"[", b"]")
    };
    let encode = |out: &mut Vec<u8>, s: &str| {
        encode_into(out, s, config.use_form_encoding, config.charset)
    };

    for (position, segment) in part.segments().iter().enumerate() {
        match segment {
            KeySegment::Key(key) if position == 0 => encode(out, key)?,
            KeySegment::Key(key) => {
                out.extend_from_slice(open);
                encode(out, key)?;
                out.extend_from_slice(close);
            }
            KeySegment::Index(index) => {
                out.extend_from_slice(open);
                if let Some(index) = index {
                    let mut buffer = itoa::Buffer::new();
                    out.extend_from_slice(buffer.format(*index).as_bytes());
                }
                out.extend_from_slice(close);
            }
        }
    }
    out.push(b'=');
    encode(out, part.value().unwrap_or_default())
}

/// Writes a raw tree as `key=value` pairs joined by `&`.
pub(crate) fn write_node<W: Write>(writer: &mut W, node: &RawNode, config: Config) -> Result<()> {
    let mut buffer = Vec::with_capacity(64);
    for (position, part) in flatten(node, config)?.iter().enumerate() {
        buffer.clear();
        if position > 0 {
            buffer.push(b'&');
        }
        render_part(&mut buffer, part, config)?;
        tracing::trace!(pair = %String::from_utf8_lossy(&buffer), "encoded pair");
        writer.write_all(&buffer)?;
    }
    Ok(())
}
