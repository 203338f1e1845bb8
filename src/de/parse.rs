//! Splitting the input into pairs and keys into segments.

use crate::chain::{ChainPart, KeySegment};
use crate::config::Config;
use crate::error::{Error, Result};

mod decode;

pub(crate) use decode::decode;

/// The result of parsing one raw key.
#[derive(Debug, PartialEq)]
pub struct ParsedKey {
    pub segments: Vec<KeySegment>,
    /// The key contains an empty `[]` segment.
    pub looks_implicit: bool,
    /// Some bracket of the key holds only digits.
    pub looks_explicit: bool,
}

/// Parses a raw, still percent-encoded key into its segments.
///
/// `a[b][0][]` becomes `Key("a")`, `Key("b")`, `Index(Some(0))`,
/// `Index(None)`. Only flat nesting is legal: unbalanced brackets, `[[`,
/// `]]` and text between `]` and the next `[` are rejected with
/// [`Error::MalformedKey`]. Spaces around the content of a bracket are
/// trimmed before it is classified.
///
/// After `config.max_depth` bracket groups the rest of the key is kept as
/// one literal key segment. A `max_depth` of 0 keeps the whole key as the
/// root.
pub fn parse_key(raw: &[u8], config: &Config) -> Result<ParsedKey> {
    let unbracketed;
    let raw = if config.use_form_encoding {
        unbracketed = decode_brackets(raw);
        unbracketed.as_slice()
    } else {
        raw
    };
    let display = || String::from_utf8_lossy(raw).into_owned();

    validate_brackets(raw).map_err(|reason| Error::malformed_key(display(), reason))?;

    let root_end = if config.max_depth == 0 {
        // no nesting: the whole key is the root
        raw.len()
    } else {
        raw.iter().position(|&b| b == b'[').unwrap_or(raw.len())
    };
    let mut segments = vec![KeySegment::Key(decode(&raw[..root_end], config.charset)?)];
    let mut looks_implicit = false;
    let mut looks_explicit = false;

    let mut rest = &raw[root_end..];
    let mut depth = 0;
    while !rest.is_empty() {
        if depth >= config.max_depth {
            // keep the remaining brackets as part of a literal key
            segments.push(KeySegment::Key(decode(rest, config.charset)?));
            break;
        }
        // `validate_brackets` guarantees `rest` is `[content]...`
        let close = rest
            .iter()
            .position(|&b| b == b']')
            .ok_or_else(|| Error::malformed_key(display(), "unclosed bracket"))?;
        let content = rest[1..close].trim_ascii();
        rest = &rest[close + 1..];
        depth += 1;

        if content.is_empty() {
            looks_implicit = true;
            segments.push(KeySegment::Index(None));
        } else if content.iter().all(u8::is_ascii_digit) {
            looks_explicit = true;
            let index = std::str::from_utf8(content)
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|&i| i <= config.max_index)
                .ok_or_else(|| Error::malformed_key(display(), "list index exceeds the limit"))?;
            segments.push(KeySegment::Index(Some(index)));
        } else {
            segments.push(KeySegment::Key(decode(content, config.charset)?));
        }
    }

    Ok(ParsedKey {
        segments,
        looks_implicit,
        looks_explicit,
    })
}

/// Checks that brackets are balanced, flat and adjacent.
fn validate_brackets(raw: &[u8]) -> std::result::Result<(), &'static str> {
    if raw.windows(2).any(|w| w == b"[[" || w == b"]]") {
        return Err("nested brackets are not supported");
    }
    let mut open = 0usize;
    let mut after_close = false;
    for &b in raw {
        match b {
            b'[' => {
                open += 1;
                after_close = false;
            }
            b']' => {
                open = open.checked_sub(1).ok_or("unbalanced closing bracket")?;
                after_close = true;
            }
            _ if after_close => return Err("unexpected text after a closing bracket"),
            _ => {}
        }
        if open > 1 {
            return Err("nested brackets are not supported");
        }
    }
    if open != 0 {
        return Err("unclosed bracket");
    }
    Ok(())
}

/// Turns percent-encoded brackets into literal ones, leaving every other
/// escape in place.
fn decode_brackets(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' && i + 2 < raw.len() {
            match &raw[i + 1..i + 3] {
                b"5B" | b"5b" => {
                    out.push(b'[');
                    i += 3;
                    continue;
                }
                b"5D" | b"5d" => {
                    out.push(b']');
                    i += 3;
                    continue;
                }
                _ => {}
            }
        }
        out.push(raw[i]);
        i += 1;
    }
    out
}

/// Splits the input on `&` and parses every pair into a chain.
///
/// A pair without `=` has an empty value, and empty pairs are skipped.
pub fn parse_pairs(input: &[u8], config: &Config) -> Result<Vec<ChainPart>> {
    let mut parts = Vec::new();
    for pair in input.split(|&b| b == b'&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.iter().position(|&b| b == b'=') {
            Some(eq) => (&pair[..eq], &pair[eq + 1..]),
            None => (pair, &b""[..]),
        };
        let parsed = parse_key(key, config)?;
        let mut part = ChainPart::from_segments(parsed.segments)?;
        part.set_value(decode(value, config.charset)?);
        tracing::trace!(key = %part, value = ?part.value(), "decoded pair");
        parts.push(part);
    }
    Ok(parts)
}
