//! Escaping of field values that contain line breaks.
//!
//! Rows are single lines, so a literal newline inside a cell is stored as the marker
//! `<NL>`. Tabs separate cells and are stored as spaces.

use std::borrow::Cow;

pub const NEWLINE_MARKER: &str = "<NL>";

/// Restores literal newlines in a stored field.
pub fn decode_field(field: &str) -> Cow<'_, str> {
    if field.contains(NEWLINE_MARKER) {
        Cow::Owned(field.replace(NEWLINE_MARKER, "\n"))
    } else {
        Cow::Borrowed(field)
    }
}

/// Decodes `field` into `target`, reusing its allocation.
pub fn decode_into(field: &str, target: &mut String) {
    target.clear();
    let mut rest = field;
    while let Some(pos) = rest.find(NEWLINE_MARKER) {
        target.push_str(&rest[..pos]);
        target.push('\n');
        rest = &rest[pos + NEWLINE_MARKER.len()..];
    }
    target.push_str(rest);
}

/// Prepares a value for storage in a single tab-delimited line.
pub fn encode_field(value: &str) -> Cow<'_, str> {
    if !value.contains(['\n', '\r', '\t']) {
        return Cow::Borrowed(value);
    }
    let mut encoded = String::with_capacity(value.len() + 8);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                encoded.push_str(NEWLINE_MARKER);
            }
            '\n' => encoded.push_str(NEWLINE_MARKER),
            '\t' => encoded.push(' '),
            _ => encoded.push(c),
        }
    }
    Cow::Owned(encoded)
}
