// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query building error types.

use thiserror::Error;

use crate::schema::ScalarKind;

/// Errors raised while turning field paths into predicates, projections and
/// eager-load plans.
///
/// All of these are detected before anything is handed to a provider.
#[derive(Error, Debug)]
pub enum QueryError {
    /// A field path is empty, has an empty segment, or (in filter mode) lacks
    /// its `,operator,value` suffix.
    #[error("malformed field path '{path}': {reason}")]
    MalformedPath { path: String, reason: &'static str },

    /// A path segment does not name a field on the current entity.
    #[error("unknown field '{field}' on '{entity}'")]
    UnknownField { entity: String, field: String },

    /// The source row type or a referenced entity is not registered.
    #[error("unknown entity type: {0}")]
    UnknownEntity(String),

    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("unsupported combinator '{0}' (expected AND or OR)")]
    UnsupportedCombinator(String),

    /// `Between` needs exactly two comma-separated integers.
    #[error("Between expects two comma-separated integers, got '{0}'")]
    InvalidBetweenArguments(String),

    #[error("cannot convert '{value}' to {target}")]
    ValueConversion { value: String, target: ScalarKind },

    /// The operator cannot be applied to the resolved field.
    #[error("field '{field}' is not comparable: {reason}")]
    NotComparable { field: String, reason: &'static str },

    #[error("path '{path}' has {depth} segments (max: {max})")]
    PathTooDeep { path: String, depth: usize, max: usize },

    #[error("unknown scalar type token: {0}")]
    UnknownScalarType(String),

    /// The build context already holds state for a different row type.
    #[error("build context is bound to '{bound}', cannot build for '{requested}' without reset")]
    ContextMismatch { bound: String, requested: String },

    #[error("invalid schema: {0}")]
    Schema(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueryError {
    /// Machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::MalformedPath { .. } => "MalformedPath",
            QueryError::UnknownField { .. } => "UnknownField",
            QueryError::UnknownEntity(_) => "UnknownEntity",
            QueryError::UnsupportedOperator(_) => "UnsupportedOperator",
            QueryError::UnsupportedCombinator(_) => "UnsupportedCombinator",
            QueryError::InvalidBetweenArguments(_) => "InvalidBetweenArguments",
            QueryError::ValueConversion { .. } => "ValueConversionError",
            QueryError::NotComparable { .. } => "NotComparable",
            QueryError::PathTooDeep { .. } => "PathTooDeep",
            QueryError::UnknownScalarType(_) => "UnknownScalarType",
            QueryError::ContextMismatch { .. } => "ContextMismatch",
            QueryError::Schema(_) => "InvalidSchema",
            QueryError::Provider(_) => "ProviderError",
            QueryError::Serialization(_) => "SerializationError",
        }
    }

    pub(crate) fn malformed(path: &str, reason: &'static str) -> Self {
        QueryError::MalformedPath {
            path: path.to_string(),
            reason,
        }
    }

    pub(crate) fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        QueryError::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub(crate) fn not_comparable(field: impl Into<String>, reason: &'static str) -> Self {
        QueryError::NotComparable {
            field: field.into(),
            reason,
        }
    }
}
