//! Canonical JSON serialization
//!
//! The canonical form is the ONLY thing ever hashed or signed. It must be
//! stable across implementations and languages:
//! - object keys sorted ascending by Unicode code point, at every level
//! - arrays element-wise in original order
//! - no whitespace
//! - strings in their native JSON encoding
//! - numbers in their minimal decimal representation
//!
//! Never hash a language-specific serialization that could vary in key
//! order.

use serde::Serialize;
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::types::Digest;

/// Serialize a JSON value to its canonical string form.
pub fn canonical_json(value: &Value) -> CoreResult<String> {
    let mut out = String::new();
    write_canonical(value, &mut out)?;
    Ok(out)
}

/// Canonicalize any serializable value via its JSON representation.
pub fn canonicalize<T: Serialize>(value: &T) -> CoreResult<String> {
    let json = serde_json::to_value(value)?;
    canonical_json(&json)
}

/// SHA-256 digest of a value's canonical form.
pub fn content_digest<T: Serialize>(value: &T) -> CoreResult<Digest> {
    let canonical = canonicalize(value)?;
    Ok(Digest::compute(canonical.as_bytes()))
}

fn write_canonical(value: &Value, out: &mut String) -> CoreResult<()> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => {
            // serde_json already renders the shortest decimal form for
            // both integers and floats.
            if n.as_f64().map(|f| !f.is_finite()).unwrap_or(false) {
                return Err(CoreError::Canon(format!("non-finite number: {}", n)));
            }
            out.push_str(&n.to_string());
        }
        Value::String(s) => {
            let encoded = serde_json::to_string(s)?;
            out.push_str(&encoded);
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Sort keys ascending by code point regardless of how the
            // map preserves insertion order.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let encoded = serde_json::to_string(key)?;
                out.push_str(&encoded);
                out.push(':');
                write_canonical(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_order_independent() {
        let a = json!({"a": 1, "b": 2});
        let b = json!({"b": 2, "a": 1});
        assert_eq!(canonical_json(&a).unwrap(), canonical_json(&b).unwrap());
        assert_eq!(canonical_json(&a).unwrap(), r#"{"a":1,"b":2}"#);
    }

    #[test]
    fn test_nested_objects_sorted_recursively() {
        let value = json!({"outer": {"z": 1, "a": {"y": 2, "b": 3}}, "alpha": true});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"alpha":true,"outer":{"a":{"b":3,"y":2},"z":1}}"#
        );
    }

    #[test]
    fn test_arrays_keep_order() {
        let value = json!({"list": [3, 1, 2]});
        assert_eq!(canonical_json(&value).unwrap(), r#"{"list":[3,1,2]}"#);
    }

    #[test]
    fn test_no_whitespace() {
        let value = json!({"a": [1, {"b": "c d"}], "e": null});
        let canonical = canonical_json(&value).unwrap();
        assert_eq!(canonical, r#"{"a":[1,{"b":"c d"}],"e":null}"#);
    }

    #[test]
    fn test_minimal_number_representation() {
        let value = json!({"int": 42, "float": 1.5, "neg": -7});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"float":1.5,"int":42,"neg":-7}"#
        );
    }

    #[test]
    fn test_string_escaping() {
        let value = json!({"s": "line\nbreak \"quoted\""});
        assert_eq!(
            canonical_json(&value).unwrap(),
            r#"{"s":"line\nbreak \"quoted\""}"#
        );
    }

    #[test]
    fn test_content_digest_deterministic() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(
            content_digest(&a).unwrap(),
            content_digest(&b).unwrap()
        );
    }
}
