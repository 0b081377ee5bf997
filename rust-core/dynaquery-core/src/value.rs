// SPDX-License-Identifier: PMPL-1.0-or-later
//! Typed literal values and coercion from untyped strings.
//!
//! Filter conditions arrive as strings; the target field's declared
//! [`ScalarType`] decides how a literal is read:
//!
//! - `timestamp` → RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (UTC)
//! - `byte` .. `int64` → range-checked integer
//! - `float`, `double`, `decimal` → finite floating point
//! - `bool` → `true`/`false`, any case
//! - `guid` → hyphenated or simple UUID
//! - `string` → passed through untouched
//!
//! A nullable target additionally accepts the literal `null`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::QueryError;
use crate::schema::{ScalarKind, ScalarType};

/// A coerced literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Value {
    Null,
    Bool(bool),
    /// Any integral kind, widened to 64 bits.
    Int(i64),
    /// Any floating or decimal kind.
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    Guid(Uuid),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Timestamp(_) => "timestamp",
            Value::Guid(_) => "guid",
            Value::String(_) => "string",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Typed ordering between two values.
    ///
    /// Integers and floats compare numerically with each other; every other
    /// pair of distinct kinds is incomparable and yields `None`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Guid(id) => write!(f, "{id}"),
            Value::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

/// Convert `raw` into a value of the `target` type.
pub fn coerce(raw: &str, target: ScalarType) -> Result<Value, QueryError> {
    let conversion_error = || QueryError::ValueConversion {
        value: raw.to_string(),
        target: target.kind,
    };
    let trimmed = raw.trim();

    if target.nullable && trimmed.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }

    match target.kind {
        ScalarKind::Bool => match trimmed.to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(conversion_error()),
        },
        ScalarKind::Byte
        | ScalarKind::SByte
        | ScalarKind::Int16
        | ScalarKind::Int32
        | ScalarKind::Int64 => {
            let parsed: i64 = trimmed.parse().map_err(|_| conversion_error())?;
            match target.kind.integral_range() {
                Some((min, max)) if parsed < min || parsed > max => Err(conversion_error()),
                _ => Ok(Value::Int(parsed)),
            }
        }
        ScalarKind::Float | ScalarKind::Double | ScalarKind::Decimal => {
            let parsed: f64 = trimmed.parse().map_err(|_| conversion_error())?;
            if parsed.is_finite() {
                Ok(Value::Float(parsed))
            } else {
                Err(conversion_error())
            }
        }
        ScalarKind::Timestamp => parse_timestamp(trimmed)
            .map(Value::Timestamp)
            .ok_or_else(conversion_error),
        ScalarKind::Guid => Uuid::parse_str(trimmed)
            .map(Value::Guid)
            .map_err(|_| conversion_error()),
        ScalarKind::String => Ok(Value::String(raw.to_string())),
    }
}

/// Parse the accepted timestamp formats; offset-less forms are UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts);
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive).into());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(kind: ScalarKind) -> ScalarType {
        ScalarType::required(kind)
    }

    #[test]
    fn test_coerce_integers() {
        assert_eq!(coerce("42", req(ScalarKind::Int32)).unwrap(), Value::Int(42));
        assert_eq!(coerce(" -7 ", req(ScalarKind::Int64)).unwrap(), Value::Int(-7));
        assert!(coerce("4.2", req(ScalarKind::Int32)).is_err());
    }

    #[test]
    fn test_coerce_integer_range_checked() {
        assert!(coerce("256", req(ScalarKind::Byte)).is_err());
        assert!(coerce("-1", req(ScalarKind::Byte)).is_err());
        assert!(coerce("2147483648", req(ScalarKind::Int32)).is_err());
        assert_eq!(
            coerce("2147483648", req(ScalarKind::Int64)).unwrap(),
            Value::Int(2_147_483_648)
        );
    }

    #[test]
    fn test_coerce_floating() {
        assert_eq!(coerce("9.5", req(ScalarKind::Decimal)).unwrap(), Value::Float(9.5));
        assert_eq!(coerce("3", req(ScalarKind::Double)).unwrap(), Value::Float(3.0));
        assert!(coerce("NaN", req(ScalarKind::Double)).is_err());
        assert!(coerce("inf", req(ScalarKind::Float)).is_err());
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(coerce("TRUE", req(ScalarKind::Bool)).unwrap(), Value::Bool(true));
        assert_eq!(coerce("false", req(ScalarKind::Bool)).unwrap(), Value::Bool(false));
        assert!(coerce("yes", req(ScalarKind::Bool)).is_err());
    }

    #[test]
    fn test_coerce_timestamp_formats() {
        let rfc = coerce("2024-03-01T10:00:00+02:00", req(ScalarKind::Timestamp)).unwrap();
        let plain = coerce("2024-03-01 08:00:00", req(ScalarKind::Timestamp)).unwrap();
        assert_eq!(rfc.compare(&plain), Some(Ordering::Equal));

        let date = coerce("2024-03-01", req(ScalarKind::Timestamp)).unwrap();
        assert_eq!(date.compare(&plain), Some(Ordering::Less));
        assert!(coerce("yesterday", req(ScalarKind::Timestamp)).is_err());
    }

    #[test]
    fn test_coerce_guid() {
        let v = coerce(
            "67e55044-10b1-426f-9247-bb680e5fe0c8",
            req(ScalarKind::Guid),
        )
        .unwrap();
        assert!(matches!(v, Value::Guid(_)));
        assert!(coerce("not-a-guid", req(ScalarKind::Guid)).is_err());
    }

    #[test]
    fn test_coerce_string_untouched() {
        assert_eq!(
            coerce(" padded ", req(ScalarKind::String)).unwrap(),
            Value::String(" padded ".into())
        );
        // "null" is only special for nullable targets.
        assert_eq!(
            coerce("null", req(ScalarKind::String)).unwrap(),
            Value::String("null".into())
        );
    }

    #[test]
    fn test_coerce_nullable_null() {
        assert_eq!(
            coerce("NULL", ScalarType::nullable(ScalarKind::Int32)).unwrap(),
            Value::Null
        );
        assert!(coerce("NULL", req(ScalarKind::Int32)).is_err());
    }

    #[test]
    fn test_conversion_error_names_target() {
        let err = coerce("abc", req(ScalarKind::Int64)).unwrap_err();
        match err {
            QueryError::ValueConversion { value, target } => {
                assert_eq!(value, "abc");
                assert_eq!(target, ScalarKind::Int64);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(Value::Int(2).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Float(3.0).compare(&Value::Int(3)), Some(Ordering::Equal));
        assert_eq!(Value::Int(1).compare(&Value::String("1".into())), None);
    }

    #[test]
    fn test_value_serde_roundtrip() {
        let values = vec![
            Value::Null,
            Value::Int(5),
            Value::String("x".into()),
            coerce("2024-01-01", req(ScalarKind::Timestamp)).unwrap(),
        ];
        let json = serde_json::to_string(&values).unwrap();
        let parsed: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }
}
