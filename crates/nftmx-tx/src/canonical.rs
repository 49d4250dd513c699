//! Canonical JSON for sign documents.
//!
//! Object keys sorted bytewise at every depth, no insignificant whitespace,
//! and `<`, `>`, `&`, U+2028, U+2029 escaped the way the chain's JSON encoder
//! does. Independent of whether `serde_json` preserves insertion order.

use serde::Serialize;
use serde_json::Value;
use nftmx_types::{MarketError, Result};

pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|e| MarketError::Other(format!("failed to serialize sign document: {}", e)))?;
    let mut out = String::new();
    write_sorted(&value, &mut out);
    Ok(escape(&out))
}

fn write_sorted(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));
            out.push('{');
            for (i, (key, val)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_sorted(val, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

// These characters can only appear inside string literals at this point.
fn escape(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
