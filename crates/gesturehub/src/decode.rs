//! Tolerant request decoding.
//!
//! Bodies are read as a loose JSON object and each field is coerced on its
//! own. A wrong type on an optional field falls back to that field's
//! default; only required identifiers are ever rejected.

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde_json::{Map, Value};

use crate::error::ApiError;

pub type Body = Map<String, Value>;

/// JSON object body. An empty body reads as `{}`.
#[derive(Debug, Clone, Default)]
pub struct JsonBody(pub Body);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|_| ApiError::invalid("Invalid JSON body"))?;
        parse_body(&bytes).map(JsonBody)
    }
}

pub fn parse_body(bytes: &[u8]) -> Result<Body, ApiError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::invalid("Invalid JSON body")),
    }
}

/// Trimmed string value, `None` when absent or not a string. May be empty.
pub fn trimmed<'a>(body: &'a Body, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).map(str::trim)
}

/// Trimmed non-empty string, else `default`.
pub fn string_or(body: &Body, key: &str, default: &str) -> String {
    match trimmed(body, key) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => default.to_string(),
    }
}

/// Trimmed non-empty string, `None` otherwise.
pub fn non_blank(body: &Body, key: &str) -> Option<String> {
    trimmed(body, key)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Identifier that defaults when absent but is rejected when sent blank.
pub fn identifier_or(body: &Body, key: &str, default: &str) -> Result<String, ApiError> {
    match trimmed(body, key) {
        Some("") => Err(ApiError::invalid(format!("{} must not be blank", key))),
        Some(s) => Ok(s.to_string()),
        None => Ok(default.to_string()),
    }
}

/// Required identifier: must be a non-blank string.
pub fn required(body: &Body, key: &str) -> Result<String, ApiError> {
    non_blank(body, key).ok_or_else(|| ApiError::invalid(format!("{} required", key)))
}

/// Only a JSON integer is accepted.
pub fn strict_int_or(body: &Body, key: &str, default: i64) -> i64 {
    body.get(key).and_then(Value::as_i64).unwrap_or(default)
}

/// A number or numeric string, truncated toward zero.
pub fn loose_int_or(body: &Body, key: &str, default: i64) -> i64 {
    body.get(key)
        .and_then(loose_number)
        .map(|n| n.trunc() as i64)
        .unwrap_or(default)
}

/// A number or numeric string.
pub fn loose_float_or(body: &Body, key: &str, default: f64) -> f64 {
    body.get(key).and_then(loose_number).unwrap_or(default)
}

pub(crate) fn loose_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

/// Objects and arrays are kept verbatim; anything else is dropped.
pub fn structured(body: &Body, key: &str) -> Option<Value> {
    body.get(key)
        .filter(|v| v.is_object() || v.is_array())
        .cloned()
}

/// The value if it is an array, else an empty one.
pub fn array_or_empty(body: &Body, key: &str) -> Value {
    body.get(key)
        .filter(|v| v.is_array())
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Body {
        match value {
            Value::Object(map) => map,
            _ => panic!("test body must be an object"),
        }
    }

    #[test]
    fn empty_body_is_empty_object() {
        assert!(parse_body(b"").unwrap().is_empty());
        assert!(parse_body(b"  \n").unwrap().is_empty());
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(parse_body(b"[1,2]").is_err());
        assert!(parse_body(b"{not json").is_err());
        assert!(parse_body(b"\"text\"").is_err());
    }

    #[test]
    fn strings_trim_and_default() {
        let b = body(json!({"a": "  x ", "b": 5, "c": "   "}));
        assert_eq!(string_or(&b, "a", "unknown"), "x");
        assert_eq!(string_or(&b, "b", "unknown"), "unknown");
        assert_eq!(string_or(&b, "c", "unknown"), "unknown");
        assert_eq!(string_or(&b, "missing", "unknown"), "unknown");
    }

    #[test]
    fn identifiers_reject_only_blank_strings() {
        let b = body(json!({"blank": " ", "number": 3, "ok": " s1 "}));
        assert!(identifier_or(&b, "blank", "unknown").is_err());
        assert_eq!(identifier_or(&b, "number", "unknown").unwrap(), "unknown");
        assert_eq!(identifier_or(&b, "missing", "unknown").unwrap(), "unknown");
        assert_eq!(identifier_or(&b, "ok", "unknown").unwrap(), "s1");
    }

    #[test]
    fn numeric_coercion() {
        let b = body(json!({
            "int": 3,
            "float": 2.9,
            "numeric_text": " 7.5 ",
            "junk": "seven",
            "neg": -1.7,
        }));
        assert_eq!(strict_int_or(&b, "int", 1), 3);
        assert_eq!(strict_int_or(&b, "float", 1), 1);
        assert_eq!(strict_int_or(&b, "numeric_text", 1), 1);

        assert_eq!(loose_int_or(&b, "float", 0), 2);
        assert_eq!(loose_int_or(&b, "numeric_text", 0), 7);
        assert_eq!(loose_int_or(&b, "junk", 0), 0);
        assert_eq!(loose_int_or(&b, "neg", 0), -1);
        assert_eq!(loose_float_or(&b, "numeric_text", 0.0), 7.5);
    }

    #[test]
    fn structured_values_only() {
        let b = body(json!({"o": {"k": 1}, "a": [1], "s": "text", "n": null}));
        assert_eq!(structured(&b, "o"), Some(json!({"k": 1})));
        assert_eq!(structured(&b, "a"), Some(json!([1])));
        assert_eq!(structured(&b, "s"), None);
        assert_eq!(structured(&b, "n"), None);
        assert_eq!(array_or_empty(&b, "o"), json!([]));
        assert_eq!(array_or_empty(&b, "a"), json!([1]));
    }
}
