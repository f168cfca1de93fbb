// src/services/extractor.rs

//! Embedded structured-data extraction.
//!
//! Channel and watch pages carry their data as a script assignment, either
//! as a plain object literal:
//!
//! ```text
//! var ytInitialData = {"contents": {...}};
//! ```
//!
//! or, on legacy/mobile markup, as a single-quoted string with `\xHH`
//! escapes:
//!
//! ```text
//! var ytInitialData = '\x7b\x22contents\x22...\x7d';
//! ```
//!
//! The object literal is delimited by a brace-depth scan that skips over
//! quoted strings and escape sequences, so braces inside string values do not
//! end the payload early.

use scraper::{Html, Selector};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Variable holding a channel tab's data document.
pub const INITIAL_DATA: &str = "ytInitialData";

/// Variable holding a watch page's player response.
pub const PLAYER_RESPONSE: &str = "ytInitialPlayerResponse";

/// Locate and decode the document assigned to `var_name` in `page`.
///
/// Script elements are searched first; raw text is scanned when no script
/// carries the assignment, which also covers non-HTML input.
pub fn extract_embedded_json(page: &str, var_name: &str) -> Result<Value> {
    let document = Html::parse_document(page);
    let script_sel = parse_selector("script")?;

    for script in document.select(&script_sel) {
        let text: String = script.text().collect();
        if !text.contains(var_name) {
            continue;
        }
        if let Some(value) = find_assignment(&text, var_name)? {
            return Ok(value);
        }
    }

    find_assignment(page, var_name)?.ok_or_else(|| {
        AppError::extraction(format!(
            "no {var_name} assignment found; page layout not recognized"
        ))
    })
}

/// Scan `text` for `var_name = {…}` or `var_name = '…'`.
///
/// Occurrences that are not assignments (reads, feature checks) are skipped.
/// A located payload that fails to decode is an error.
fn find_assignment(text: &str, var_name: &str) -> Result<Option<Value>> {
    for (idx, _) in text.match_indices(var_name) {
        let Some(start) = assignment_value_start(text, idx + var_name.len()) else {
            continue;
        };

        match text.as_bytes()[start] {
            b'{' => {
                let end = object_end(text, start).ok_or_else(|| {
                    AppError::extraction(format!("unterminated {var_name} object literal"))
                })?;
                let value = serde_json::from_str(&text[start..end]).map_err(|e| {
                    AppError::extraction(format!("{var_name} object literal: {e}"))
                })?;
                return Ok(Some(value));
            }
            b'\'' => {
                let end = quoted_end(text, start).ok_or_else(|| {
                    AppError::extraction(format!("unterminated {var_name} string literal"))
                })?;
                let json = unescape_js_string(&text[start + 1..end])?;
                let value = serde_json::from_str(&json).map_err(|e| {
                    AppError::extraction(format!("{var_name} string literal: {e}"))
                })?;
                return Ok(Some(value));
            }
            _ => continue,
        }
    }
    Ok(None)
}

/// Position of the first byte of the assigned value, if `pos` (just past the
/// variable name) is followed by an assignment. Accepts `name =`, and the
/// bracketed `window["name"] =` form.
fn assignment_value_start(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;

    while i < bytes.len() && matches!(bytes[i], b'"' | b'\'' | b']') {
        i += 1;
    }
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    if bytes.get(i) != Some(&b'=') || bytes.get(i + 1) == Some(&b'=') {
        return None;
    }
    i += 1;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    (i < bytes.len()).then_some(i)
}

/// Exclusive end of the object literal opening at `start`.
fn object_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;

    for (offset, &b) in text.as_bytes()[start..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        match b {
            b'"' | b'\'' => quote = Some(b),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + offset + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the quote closing the string literal that opens at `start`.
fn quoted_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let quote = bytes[start];
    let mut escaped = false;

    for (offset, &b) in bytes[start + 1..].iter().enumerate() {
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == quote {
            return Some(start + 1 + offset);
        }
    }
    None
}

/// Decode the escape sequences of a JavaScript string literal body.
fn unescape_js_string(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let Some(esc) = chars.next() else {
            return Err(AppError::extraction("dangling escape at end of string"));
        };
        match esc {
            'x' => {
                let code = read_hex(&mut chars, 2)?;
                out.push(char::from(code as u8));
            }
            'u' => {
                let unit = read_hex(&mut chars, 4)?;
                let ch = if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate; the low half follows as another \uXXXX.
                    if chars.next() != Some('\\') || chars.next() != Some('u') {
                        return Err(AppError::extraction("unpaired surrogate escape"));
                    }
                    let low = read_hex(&mut chars, 4)?;
                    char::from_u32(0x10000 + ((unit - 0xD800) << 10) + (low.wrapping_sub(0xDC00)))
                } else {
                    char::from_u32(unit)
                };
                out.push(ch.ok_or_else(|| AppError::extraction("invalid unicode escape"))?);
            }
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            other => out.push(other),
        }
    }
    Ok(out)
}

fn read_hex(chars: &mut std::str::Chars<'_>, len: usize) -> Result<u32> {
    let digits: String = chars.by_ref().take(len).collect();
    if digits.len() != len {
        return Err(AppError::extraction("truncated hex escape"));
    }
    u32::from_str_radix(&digits, 16)
        .map_err(|e| AppError::extraction(format!("bad hex escape '{digits}': {e}")))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::extraction(format!("selector '{s}': {e:?}")))
}
