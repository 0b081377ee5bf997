// SPDX-License-Identifier: PMPL-1.0-or-later
//! Caller-facing filter and ordering conditions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::path::parse_filter;

/// Comparison applied by a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Contains,
    Equal,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    NotEqual,
    /// Equality against any of a comma-separated list.
    InWithEqual,
    /// Substring match against any of a comma-separated list.
    InWithContains,
    /// Two comma-separated integer bounds.
    Between,
}

impl Operator {
    pub const ALL: [Operator; 10] = [
        Operator::Contains,
        Operator::Equal,
        Operator::Greater,
        Operator::GreaterEqual,
        Operator::Less,
        Operator::LessEqual,
        Operator::NotEqual,
        Operator::InWithEqual,
        Operator::InWithContains,
        Operator::Between,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Operator::Contains => "Contains",
            Operator::Equal => "Equal",
            Operator::Greater => "Greater",
            Operator::GreaterEqual => "GreaterEqual",
            Operator::Less => "Less",
            Operator::LessEqual => "LessEqual",
            Operator::NotEqual => "NotEqual",
            Operator::InWithEqual => "InWithEqual",
            Operator::InWithContains => "InWithContains",
            Operator::Between => "Between",
        }
    }

    /// Operators whose value is a list rather than a single literal.
    pub fn is_multi_value(self) -> bool {
        matches!(
            self,
            Operator::InWithEqual | Operator::InWithContains | Operator::Between
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Operator::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(token))
            .ok_or_else(|| QueryError::UnsupportedOperator(s.to_string()))
    }
}

/// How sibling conditions are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combinator::And => write!(f, "AND"),
            Combinator::Or => write!(f, "OR"),
        }
    }
}

impl FromStr for Combinator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AND" => Ok(Combinator::And),
            "OR" => Ok(Combinator::Or),
            _ => Err(QueryError::UnsupportedCombinator(s.to_string())),
        }
    }
}

/// One filter condition: a dotted field path, an operator and an untyped
/// literal that is coerced against the field's declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: String,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Parse the encoded `path,Operator,value` form.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let (path, suffix) = parse_filter(raw)?;
        Ok(Self {
            field: path.to_string(),
            operator: suffix.operator.parse()?,
            value: suffix.value,
        })
    }

    /// The encoded `path,Operator,value` form.
    pub fn encode(&self) -> String {
        format!("{},{},{}", self.field, self.operator, self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

/// Sort key on a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCondition {
    pub field: String,
    #[serde(default)]
    pub direction: OrderDirection,
}

impl OrderCondition {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }
}
