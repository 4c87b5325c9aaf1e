//! Raw eFuse attribute values and their coercion from tool output.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{EfuseError, EfuseResult};

/// Sentinel rendered for attributes that could not be read or coerced.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// Flat attribute map keyed by eFuse name.
pub type AttributeMap = BTreeMap<String, RawValue>;

/// A single raw eFuse value as reported by the device tooling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    /// Integer field (bit flags, counters, versions)
    Int(i64),
    /// Opaque textual field (key purposes and the like)
    Text(String),
    /// Attribute missing or not coercible
    NotFound,
}

impl RawValue {
    /// Coerce a textual token the way espefuse renders values.
    ///
    /// `0x..` and `0b..` parse as integers, `true` / `false` map to 1 / 0,
    /// decimal digits parse as integers and anything else stays opaque text.
    /// Prefixed or numeric tokens that fail to parse become [`RawValue::NotFound`].
    pub fn coerce_str(raw: &str) -> Self {
        let token = raw.trim();
        let lower = token.to_ascii_lowercase();

        match lower.as_str() {
            "true" => return RawValue::Int(1),
            "false" => return RawValue::Int(0),
            _ => {}
        }

        if let Some(hex) = lower.strip_prefix("0x") {
            return i64::from_str_radix(hex, 16)
                .map(RawValue::Int)
                .unwrap_or(RawValue::NotFound);
        }
        if let Some(bin) = lower.strip_prefix("0b") {
            return i64::from_str_radix(bin, 2)
                .map(RawValue::Int)
                .unwrap_or(RawValue::NotFound);
        }

        let digits = token.strip_prefix('-').unwrap_or(token);
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return token
                .parse::<i64>()
                .map(RawValue::Int)
                .unwrap_or(RawValue::NotFound);
        }

        RawValue::Text(token.to_string())
    }

    /// Coerce a JSON value from an espefuse summary.
    ///
    /// `{"value": v}` wrappers are unwrapped once. Floats, nulls, arrays and
    /// out-of-range integers are not coercible.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => RawValue::Int(i64::from(*b)),
            Value::Number(n) => n.as_i64().map(RawValue::Int).unwrap_or(RawValue::NotFound),
            Value::String(s) => RawValue::coerce_str(s),
            Value::Object(map) => match map.get("value") {
                Some(inner) if !inner.is_object() => RawValue::from_json(inner),
                _ => RawValue::NotFound,
            },
            Value::Null | Value::Array(_) => RawValue::NotFound,
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, RawValue::NotFound)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RawValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Int(v) => write!(f, "{}", v),
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::NotFound => f.write_str(NOT_FOUND),
        }
    }
}

impl Serialize for RawValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawValue::Int(v) => serializer.serialize_i64(*v),
            RawValue::Text(s) => serializer.serialize_str(s),
            RawValue::NotFound => serializer.serialize_str(NOT_FOUND),
        }
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        RawValue::Int(v)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::coerce_str(s)
    }
}

/// Build an attribute map from a decoded espefuse JSON summary.
pub fn attributes_from_json(value: &Value) -> EfuseResult<AttributeMap> {
    let object = value.as_object().ok_or_else(|| {
        EfuseError::InvalidInput("expected a JSON object of eFuse name to value".to_string())
    })?;

    Ok(object
        .iter()
        .map(|(name, raw)| (name.clone(), RawValue::from_json(raw)))
        .collect())
}

/// Parse an espefuse JSON summary document.
///
/// Tools often print banner text around the JSON body, so everything outside
/// the outermost braces is ignored.
pub fn parse_attributes(text: &str) -> EfuseResult<AttributeMap> {
    let body = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(EfuseError::InvalidInput(
                "no JSON object found in attribute input".to_string(),
            ))
        }
    };

    let value: Value = serde_json::from_str(body)
        .map_err(|e| EfuseError::InvalidInput(format!("malformed attribute JSON: {}", e)))?;
    attributes_from_json(&value)
}
