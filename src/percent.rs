//! Payload escaping shared by the delta codec and the patch serializer.
//!
//! One table rules both formats: everything outside the unreserved pool
//! below is emitted as `%XX` (UTF-8 bytes for non-ASCII). Space stays
//! literal, which is what the wire formats expect.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

// Unreserved pool: A-Z a-z 0-9 and `- _ . ! ~ * ' ( ) ; / ? : @ & = + $ , #`
// plus space. `%` and `\n` are therefore always escaped.
const PAYLOAD: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#');

pub(crate) fn encode(units: &[char]) -> String {
    let raw: String = units.iter().collect();
    utf8_percent_encode(&raw, PAYLOAD).to_string()
}

/// Decodes a payload back into code units. `None` when a `%` is not
/// followed by two hex digits or the decoded bytes are not UTF-8.
pub(crate) fn decode(encoded: &str) -> Option<Vec<char>> {
    let bytes = encoded.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = |o: usize| bytes.get(i + o).is_some_and(|b| b.is_ascii_hexdigit());
            if !hex(1) || !hex(2) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let decoded = percent_decode_str(encoded).decode_utf8().ok()?;
    Some(decoded.chars().collect())
}
