use std::borrow::Cow;

use crate::config::Charset;
use crate::error::Result;

#[inline(always)]
fn char_to_digit(c: u8) -> Option<u32> {
    char::from(c).to_digit(16)
}

/// Decodes the input bytes, applying the following:
/// - Replaces `+` with a space
/// - Decodes percent-encoded characters
///
/// Invalid percent sequences are kept as they are.
fn decode_bytes(input: &[u8]) -> Cow<'_, [u8]> {
    if !input.iter().any(|&b| b == b'+' || b == b'%') {
        return Cow::Borrowed(input);
    }

    let mut bytes_iter = input.iter().enumerate();

    let mut decoded = Vec::with_capacity(input.len());
    let mut last_segment = 0;

    while let Some((idx, &b)) = bytes_iter.next() {
        if b == b'+' {
            decoded.extend_from_slice(&input[last_segment..idx]);
            decoded.push(b' ');
            last_segment = idx + 1;
        } else if b == b'%' {
            // first attempt to decode the next two bytes
            // if this fails, we'll skip over the invalid percent-encoded character
            let Some(h) = bytes_iter.next().and_then(|(_, b)| char_to_digit(*b)) else {
                continue;
            };
            let Some(l) = bytes_iter.next().and_then(|(_, b)| char_to_digit(*b)) else {
                continue;
            };

            decoded.extend_from_slice(&input[last_segment..idx]);

            let decoded_byte = h as u8 * 0x10 + l as u8;
            decoded.push(decoded_byte);
            last_segment = idx + 3;
        }
    }

    decoded.extend_from_slice(&input[last_segment..]);
    Cow::Owned(decoded)
}

/// Percent-decodes `input` and reads the bytes in the given charset.
pub fn decode(input: &[u8], charset: Charset) -> Result<String> {
    let bytes = decode_bytes(input);
    match charset {
        Charset::Utf8 => Ok(std::str::from_utf8(&bytes)?.to_owned()),
        Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}
