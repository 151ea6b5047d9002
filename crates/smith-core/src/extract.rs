// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Pull a single JSON object out of model text.
//!
//! Handles bare JSON, fenced code blocks (with or without a language tag)
//! and JSON embedded in prose.  Anything else is a [`ResponseParseError`];
//! a partial object is never returned.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::ResponseParseError;

pub fn extract_json(raw: &str) -> Result<Map<String, Value>, ResponseParseError> {
    let text = strip_fence(raw.trim());

    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(text) {
        return Ok(obj);
    }

    let mut from = 0;
    while let Some(offset) = text[from..].find('{') {
        let start = from + offset;
        if let Some(end) = matching_brace(text, start) {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(obj);
            }
        }
        from = start + 1;
    }

    Err(ResponseParseError::new("no JSON object found in model response", raw))
}

/// Extract and deserialise into `T`.  A shape mismatch is a parse error too.
pub fn extract_as<T: DeserializeOwned>(raw: &str) -> Result<T, ResponseParseError> {
    let obj = extract_json(raw)?;
    serde_json::from_value(Value::Object(obj))
        .map_err(|e| ResponseParseError::new(format!("unexpected JSON shape: {e}"), raw))
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Optional language tag up to the first newline
    let rest = match rest.find('\n') {
        Some(nl) if rest[..nl].chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') => &rest[nl + 1..],
        _ => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Byte index of the `}` closing the `{` at `start`, skipping braces inside
/// string literals.
fn matching_brace(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, b) in text.bytes().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
