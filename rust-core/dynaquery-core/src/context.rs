// SPDX-License-Identifier: PMPL-1.0-or-later
//! Per-session build state.

use std::collections::BTreeSet;

use crate::error::QueryError;
use crate::relation::RelationForest;
use crate::tree::{FieldTree, LeafCondition};

/// Everything accumulated while building one query.
///
/// The context binds to the first row type it is used with and refuses any
/// other until [`clear`](Self::clear) is called.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    root: Option<String>,
    pub(crate) filters: FieldTree<LeafCondition>,
    pub(crate) projection: FieldTree<()>,
    pub(crate) relations: RelationForest,
    /// Ids of eager loads already attached to the source.
    pub(crate) applied: BTreeSet<String>,
}

impl BuildContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn filters(&self) -> &FieldTree<LeafCondition> {
        &self.filters
    }

    pub fn projection(&self) -> &FieldTree<()> {
        &self.projection
    }

    pub fn relations(&self) -> &RelationForest {
        &self.relations
    }

    pub fn applied_loads(&self) -> impl Iterator<Item = &str> {
        self.applied.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
            && self.filters.is_empty()
            && self.projection.is_empty()
            && self.relations.is_empty()
            && self.applied.is_empty()
    }

    pub(crate) fn bind(&mut self, root: &str) -> Result<(), QueryError> {
        match &self.root {
            Some(bound) if bound != root => Err(QueryError::ContextMismatch {
                bound: bound.clone(),
                requested: root.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.root = Some(root.to_string());
                Ok(())
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
