use std::borrow::Cow;

use percent_encoding::AsciiSet;

use crate::config::Charset;
use crate::error::{Error, Result};

/// As defined in https://url.spec.whatwg.org/#query-percent-encode-set
///
/// The minimal set of characters to escape in a query, plus the characters
/// with a structural meaning in a nested form: `%` (escapes), `+` (space),
/// `[`/`]` (nesting), `=` and `&` (pair delimiters).
const MINIMAL_QS_SET: &AsciiSet = &percent_encoding::CONTROLS
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'%')
    .add(b'+')
    .add(b'[')
    .add(b']')
    .add(b'=')
    .add(b'&');

/// As defined in https://url.spec.whatwg.org/#application-x-www-form-urlencoded-percent-encode-set
///
/// Everything except ASCII alphanumerics and `*`, `-`, `.`, `_`.
const FORM_URLENCODED_SET: &AsciiSet = &percent_encoding::NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_');

/// Converts a string to bytes in the target charset.
///
/// Latin-1 can only represent code points up to U+00FF.
fn charset_bytes(value: &str, charset: Charset) -> Result<Cow<'_, [u8]>> {
    match charset {
        Charset::Utf8 => Ok(Cow::Borrowed(value.as_bytes())),
        Charset::Latin1 if value.is_ascii() => Ok(Cow::Borrowed(value.as_bytes())),
        Charset::Latin1 => value
            .chars()
            .map(|c| {
                u8::try_from(u32::from(c))
                    .map_err(|_| Error::incompatible(c, "a Latin-1 character"))
            })
            .collect::<Result<Vec<u8>>>()
            .map(Cow::Owned),
    }
}

/// Percent-encodes one key segment or value and appends it to `out`.
///
/// In the default mode the minimal query set is used and spaces become `+`.
/// In form-encoding mode the stricter form set is used and spaces become
/// `%20`.
pub fn encode_into(
    out: &mut Vec<u8>,
    value: &str,
    use_form_encoding: bool,
    charset: Charset,
) -> Result<()> {
    let bytes = charset_bytes(value, charset)?;
    let set = if use_form_encoding {
        FORM_URLENCODED_SET
    } else {
        MINIMAL_QS_SET
    };
    for chunk in percent_encoding::percent_encode(&bytes, set) {
        if use_form_encoding {
            out.extend_from_slice(chunk.as_bytes());
        } else {
            out.extend(chunk.bytes().map(|b| if b == b' ' { b'+' } else { b }));
        }
    }
    Ok(())
}
