// SPDX-License-Identifier: PMPL-1.0-or-later
//! Field path parsing.
//!
//! A field path is a dotted member chain such as `customer.address.city`.
//! Filter paths additionally carry `,Operator,value` after the last segment:
//! `orders.total,Greater,100`. The suffix is split off at the first comma
//! before the dotted part is split, so values may themselves contain dots and
//! commas (`price,Less,9.5`, `id,InWithEqual,1,2,3`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Ordered, non-empty sequence of member names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a plain dotted path (projection/order mode).
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        if raw.contains(',') {
            return Err(QueryError::malformed(
                raw,
                "operator suffix is only allowed in filter paths",
            ));
        }
        Self::parse_segments(raw, raw)
    }

    fn parse_segments(dotted: &str, raw: &str) -> Result<Self, QueryError> {
        if dotted.trim().is_empty() {
            return Err(QueryError::malformed(raw, "empty path"));
        }
        let segments = dotted
            .split('.')
            .map(|s| {
                let s = s.trim();
                if s.is_empty() {
                    Err(QueryError::malformed(raw, "empty path segment"))
                } else {
                    Ok(s.to_string())
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether the path has no segments. Parsed paths never do.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Final member name.
    pub fn leaf(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl std::str::FromStr for FieldPath {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Raw `operator,value` suffix of a filter path, not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSuffix {
    pub operator: String,
    pub value: String,
}

/// Parse a filter-mode string `path,Operator,value`.
pub fn parse_filter(raw: &str) -> Result<(FieldPath, FilterSuffix), QueryError> {
    let (dotted, suffix) = raw
        .split_once(',')
        .ok_or_else(|| QueryError::malformed(raw, "missing ',operator,value' suffix"))?;
    let (operator, value) = suffix
        .split_once(',')
        .ok_or_else(|| QueryError::malformed(raw, "missing value after operator"))?;
    let operator = operator.trim();
    if operator.is_empty() {
        return Err(QueryError::malformed(raw, "empty operator"));
    }
    let path = FieldPath::parse_segments(dotted, raw)?;
    Ok((
        path,
        FilterSuffix {
            operator: operator.to_string(),
            value: value.to_string(),
        },
    ))
}

/// Split the comma-joined projection form (`"id,address.city"`) into paths.
pub fn split_field_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dotted_path() {
        let path = FieldPath::parse("customer.address.city").unwrap();
        assert_eq!(path.segments(), ["customer", "address", "city"]);
        assert_eq!(path.leaf(), "city");
        assert_eq!(path.to_string(), "customer.address.city");
        assert_eq!(path.len(), 3);
        assert!(!path.is_empty());
    }

    #[test]
    fn test_parse_trims_segments() {
        let path = FieldPath::parse(" orders . total ").unwrap();
        assert_eq!(path.segments(), ["orders", "total"]);
    }

    #[test]
    fn test_empty_segment_rejected() {
        for raw in ["", "  ", "a..b", ".a", "a."] {
            let err = FieldPath::parse(raw).unwrap_err();
            assert!(matches!(err, QueryError::MalformedPath { .. }), "{raw}");
        }
    }

    #[test]
    fn test_projection_path_rejects_suffix() {
        assert!(matches!(
            FieldPath::parse("name,Equal,bob"),
            Err(QueryError::MalformedPath { .. })
        ));
    }

    #[test]
    fn test_parse_filter() {
        let (path, suffix) = parse_filter("orders.item.sku,Equal,AB-1").unwrap();
        assert_eq!(path.segments(), ["orders", "item", "sku"]);
        assert_eq!(suffix.operator, "Equal");
        assert_eq!(suffix.value, "AB-1");
    }

    #[test]
    fn test_filter_value_keeps_dots_and_commas() {
        let (path, suffix) = parse_filter("price,Less,9.5").unwrap();
        assert_eq!(path.segments(), ["price"]);
        assert_eq!(suffix.value, "9.5");

        let (_, suffix) = parse_filter("id,InWithEqual,1,2,3").unwrap();
        assert_eq!(suffix.operator, "InWithEqual");
        assert_eq!(suffix.value, "1,2,3");
    }

    #[test]
    fn test_filter_empty_value_allowed() {
        let (_, suffix) = parse_filter("name,Equal,").unwrap();
        assert_eq!(suffix.value, "");
    }

    #[test]
    fn test_filter_missing_suffix() {
        for raw in ["customer.name", "customer.name,Equal", "name,,x"] {
            let err = parse_filter(raw).unwrap_err();
            assert!(matches!(err, QueryError::MalformedPath { .. }), "{raw}");
        }
    }

    #[test]
    fn test_split_field_list() {
        let fields: Vec<&str> = split_field_list("id, address.city,,name ").collect();
        assert_eq!(fields, ["id", "address.city", "name"]);
    }
}
