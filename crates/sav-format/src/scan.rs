//! Span scanner for the JSON payload.
//!
//! The payload is validated with `serde_json` before any scanning happens, so
//! the scanner only has to locate byte ranges. Every range it returns indexes
//! the original payload text; nothing is re-encoded.

use std::ops::Range;

use crate::error::{FormatError, Result};

/// One `"key": value` member of an object.
#[derive(Debug, Clone)]
pub struct Member {
    /// Decoded key.
    pub key: String,
    /// Offset of the opening quote of the key.
    pub start: usize,
    /// Byte range of the value.
    pub value: Range<usize>,
}

impl Member {
    /// Byte range from the key to the end of the value.
    pub fn span(&self) -> Range<usize> {
        self.start..self.value.end
    }
}

/// Located object with its member list.
#[derive(Debug, Clone)]
pub struct ObjectSpan {
    /// Offset of `{`.
    pub open: usize,
    /// Offset of `}`.
    pub close: usize,
    pub members: Vec<Member>,
}

impl ObjectSpan {
    /// Find a member by key.
    pub fn member(&self, key: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.key == key)
    }
}

pub fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\n' | b'\r') {
        i += 1;
    }
    i
}

/// Scan a string literal starting at its opening quote; returns the offset after the closing quote.
pub fn scan_string(bytes: &[u8], start: usize) -> Result<usize> {
    if bytes.get(start) != Some(&b'"') {
        return Err(FormatError::framing(start, "expected string"));
    }
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(FormatError::framing(start, "unterminated string"))
}

/// Scan any value starting at `start`; returns its end offset.
pub fn scan_value(bytes: &[u8], start: usize) -> Result<usize> {
    match bytes.get(start) {
        Some(b'"') => scan_string(bytes, start),
        Some(b'{' | b'[') => scan_composite(bytes, start),
        Some(_) => {
            let mut i = start;
            while i < bytes.len()
                && !matches!(bytes[i], b',' | b'}' | b']' | b' ' | b'\t' | b'\n' | b'\r')
            {
                i += 1;
            }
            if i == start {
                return Err(FormatError::framing(start, "expected value"));
            }
            Ok(i)
        }
        None => Err(FormatError::framing(start, "unexpected end of payload")),
    }
}

fn scan_composite(bytes: &[u8], start: usize) -> Result<usize> {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = scan_string(bytes, i)?;
                continue;
            }
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }
    Err(FormatError::framing(start, "unterminated container"))
}

/// Decode a string literal span into its value.
pub fn decode_string(text: &str, span: Range<usize>) -> Result<String> {
    let start = span.start;
    serde_json::from_str(&text[span]).map_err(|e| FormatError::framing(start, e.to_string()))
}

/// Scan the object whose `{` is at `open`.
pub fn scan_object(text: &str, open: usize) -> Result<ObjectSpan> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'{') {
        return Err(FormatError::framing(open, "expected object"));
    }
    let mut members = Vec::new();
    let mut i = skip_ws(bytes, open + 1);
    if bytes.get(i) == Some(&b'}') {
        return Ok(ObjectSpan {
            open,
            close: i,
            members,
        });
    }
    loop {
        let key_start = i;
        let key_end = scan_string(bytes, key_start)?;
        let key = decode_string(text, key_start..key_end)?;
        i = skip_ws(bytes, key_end);
        if bytes.get(i) != Some(&b':') {
            return Err(FormatError::framing(i, "expected ':'"));
        }
        let value_start = skip_ws(bytes, i + 1);
        let value_end = scan_value(bytes, value_start)?;
        members.push(Member {
            key,
            start: key_start,
            value: value_start..value_end,
        });
        i = skip_ws(bytes, value_end);
        match bytes.get(i) {
            Some(b',') => i = skip_ws(bytes, i + 1),
            Some(b'}') => {
                return Ok(ObjectSpan {
                    open,
                    close: i,
                    members,
                });
            }
            _ => return Err(FormatError::framing(i, "expected ',' or '}'")),
        }
    }
}

/// Scan the array whose `[` is at `open`; returns the element spans.
pub fn scan_array(text: &str, open: usize) -> Result<Vec<Range<usize>>> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'[') {
        return Err(FormatError::framing(open, "expected array"));
    }
    let mut elements = Vec::new();
    let mut i = skip_ws(bytes, open + 1);
    if bytes.get(i) == Some(&b']') {
        return Ok(elements);
    }
    loop {
        let end = scan_value(bytes, i)?;
        elements.push(i..end);
        i = skip_ws(bytes, end);
        match bytes.get(i) {
            Some(b',') => i = skip_ws(bytes, i + 1),
            Some(b']') => return Ok(elements),
            _ => return Err(FormatError::framing(i, "expected ',' or ']'")),
        }
    }
}

/// Depth-first search for the first object-valued member named `name`.
///
/// At each object the direct members are checked before descending into
/// the member values in document order.
pub fn find_object(text: &str, start: usize, name: &str) -> Result<Option<ObjectSpan>> {
    match text.as_bytes().get(start) {
        Some(b'{') => {
            let object = scan_object(text, start)?;
            if let Some(found) = object
                .members
                .iter()
                .find(|m| m.key == name && text.as_bytes()[m.value.start] == b'{')
            {
                return scan_object(text, found.value.start).map(Some);
            }
            for member in &object.members {
                if let Some(found) = find_object(text, member.value.start, name)? {
                    return Ok(Some(found));
                }
            }
            Ok(None)
        }
        Some(b'[') => {
            for element in scan_array(text, start)? {
                if let Some(found) = find_object(text, element.start, name)? {
                    return Ok(Some(found));
                }
            }
            Ok(None)
        }
        _ => Ok(None),
    }
}

/// Follow a fixed key path of nested objects.
pub fn find_path(text: &str, start: usize, path: &[&str]) -> Result<Option<ObjectSpan>> {
    if text.as_bytes().get(start) != Some(&b'{') {
        return Ok(None);
    }
    let mut object = scan_object(text, start)?;
    for key in path {
        let Some(member) = object.member(key) else {
            return Ok(None);
        };
        if text.as_bytes()[member.value.start] != b'{' {
            return Ok(None);
        }
        object = scan_object(text, member.value.start)?;
    }
    Ok(Some(object))
}
