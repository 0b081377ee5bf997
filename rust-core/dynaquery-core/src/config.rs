// SPDX-License-Identifier: PMPL-1.0-or-later
//! Builder configuration.
//!
//! Defaults:
//! - default_combinator: AND
//! - parameterize_literals: true
//! - max_path_depth: 32

use serde::{Deserialize, Serialize};

use crate::condition::Combinator;

/// Knobs for a [`QuerySession`](crate::QuerySession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Combinator used by `filter` when the caller does not pick one.
    pub default_combinator: Combinator,
    /// Emit coerced literals as parameter slots instead of inline constants.
    pub parameterize_literals: bool,
    /// Longest accepted field path, in segments.
    pub max_path_depth: usize,
}

impl BuilderConfig {
    /// Parse a JSON config; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, crate::QueryError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            default_combinator: Combinator::And,
            parameterize_literals: true,
            max_path_depth: 32,
        }
    }
}
