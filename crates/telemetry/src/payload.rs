//! Payload decoding and JSON field access helpers.
//!
//! Devices publish JSON objects on most topics, but a few categories also
//! accept a bare textual form. Both shapes are normalized into a JSON object
//! so that the rule set only ever reads fields.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::category::Category;

/// Maximum length kept from a raw event description.
pub const MAX_EVENT_TEXT: usize = 255;

/// Status tokens that mean the device is online.
pub const ONLINE_TOKENS: [&str; 4] = ["online", "1", "true", "connected"];

/// Reasons a payload could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("payload is not valid UTF-8")]
    NotUtf8,

    #[error("{0} payloads must be JSON objects")]
    NotAnObject(Category),

    #[error("counts payload is neither a JSON object nor an integer")]
    NotAnInteger,
}

/// A decoded telemetry payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// JSON object as published
    Structured(Map<String, Value>),
    /// Bare status token, trimmed and lower-cased
    StatusToken(String),
    /// Free text on the tamper topic
    TamperText(String),
    /// Bare integer on the counts topic
    Count(u64),
    /// Free text on the events topic, already truncated
    EventText(String),
}

impl Payload {
    /// Normalize into the object shape the rule set reads.
    pub fn into_object(self) -> Map<String, Value> {
        let value = match self {
            Payload::Structured(map) => return map,
            Payload::StatusToken(token) => json!({ "status": token }),
            Payload::TamperText(text) => json!({ "type": "unknown", "detail": text }),
            Payload::Count(n) => json!({ "count": n }),
            Payload::EventText(text) => json!({ "event_type": text }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Payload::Structured(_))
    }
}

/// Decode raw bytes for a category.
///
/// A JSON object is always accepted. Anything else falls back to the
/// category's textual interpretation, if it has one.
pub fn decode(category: Category, raw: &[u8]) -> Result<Payload, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|_| DecodeError::NotUtf8)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(Payload::Structured(map));
    }

    match category {
        Category::Status => Ok(Payload::StatusToken(
            trimmed.trim_matches('"').to_ascii_lowercase(),
        )),
        Category::Tamper => Ok(Payload::TamperText(trimmed.to_string())),
        Category::Counts => trimmed
            .parse::<u64>()
            .map(Payload::Count)
            .map_err(|_| DecodeError::NotAnInteger),
        Category::Events => Ok(Payload::EventText(
            text.chars().take(MAX_EVENT_TEXT).collect(),
        )),
        other => Err(DecodeError::NotAnObject(other)),
    }
}

/// Resolve a dotted path (`tamper.gpio`) inside an object.
pub fn lookup_path<'a>(object: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    segments.try_fold(object.get(first)?, |current, segment| {
        current.as_object()?.get(segment)
    })
}

/// Truthiness of a JSON value as devices use it.
///
/// Null, false, zero, empty strings and empty containers are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Numeric view of a JSON value. Arrays count as their length.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Array(a) => Some(a.len() as f64),
        _ => None,
    }
}

/// Case-insensitive textual view used for token comparison.
pub fn as_token(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_ascii_lowercase()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
