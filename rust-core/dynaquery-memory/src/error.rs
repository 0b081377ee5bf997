// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error types for the in-memory provider.
//
// Everything here surfaces to session callers as `QueryError::Provider`.

use dynaquery_core::QueryError;
use thiserror::Error;

/// Errors raised while storing rows or executing a query in memory.
#[derive(Debug, Error)]
pub enum MemoryProviderError {
    /// No rows were ever stored for the entity.
    #[error("no table for entity: {0}")]
    UnknownTable(String),

    /// Rows must be JSON objects.
    #[error("row {index} of '{entity}' is not a JSON object")]
    RowNotObject { entity: String, index: usize },

    /// A predicate referenced a parameter slot it does not carry.
    #[error("parameter slot {0} is out of range")]
    UnknownParam(usize),

    /// A step walked through a relation that was never eager-loaded.
    #[error("relation '{0}' was not eager-loaded")]
    NotLoaded(String),

    /// A step was built for a different entity than the query's rows.
    #[error("step built for '{expected}' applied to '{actual}' rows")]
    EntityMismatch { expected: String, actual: String },

    #[error("row decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<MemoryProviderError> for QueryError {
    fn from(err: MemoryProviderError) -> Self {
        QueryError::Provider(err.to_string())
    }
}
