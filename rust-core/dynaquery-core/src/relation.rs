// SPDX-License-Identifier: PMPL-1.0-or-later
//! Relation discovery and eager-load planning.
//!
//! Every navigation a filter, projection or ordering path walks through is
//! registered in a [`RelationForest`]. Nodes are keyed by target entity plus
//! field name, so two paths through `orders.item` share one `orders` node and
//! one nested `item` node. [`RelationForest::plan`] flattens the forest
//! depth-first into [`EagerLoad`] directives: each top-level relation followed
//! by its nested relations.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolve::{PathStep, Target};

/// One discovered relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationNode {
    pub key: String,
    /// Navigation field on the parent.
    pub field: String,
    /// Related entity type.
    pub entity: String,
    pub is_collection: bool,
    pub children: Vec<RelationNode>,
}

/// Relations discovered while building one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationForest {
    roots: Vec<RelationNode>,
}

impl RelationForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn roots(&self) -> &[RelationNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of relation nodes.
    pub fn len(&self) -> usize {
        fn count(nodes: &[RelationNode]) -> usize {
            nodes.iter().map(|n| 1 + count(&n.children)).sum()
        }
        count(&self.roots)
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    /// Register the navigation prefix of a resolved path.
    pub fn register(&mut self, steps: &[PathStep<'_>]) {
        let mut level = &mut self.roots;
        for step in steps {
            let Target::Entity(entity) = &step.target else {
                break;
            };
            let key = step.key();
            let idx = match level.iter().position(|n| n.key == key) {
                Some(idx) => idx,
                None => {
                    level.push(RelationNode {
                        key,
                        field: step.name.to_string(),
                        entity: entity.to_string(),
                        is_collection: step.is_collection,
                        children: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            level = &mut level[idx].children;
        }
    }

    /// Fold `other` into this forest, reusing nodes with equal keys.
    pub fn merge(&mut self, other: RelationForest) {
        merge_nodes(&mut self.roots, other.roots);
    }

    /// Depth-first eager-load plan.
    pub fn plan(&self) -> Vec<EagerLoad> {
        let mut out = Vec::new();
        let mut prefix = Vec::new();
        plan_nodes(&self.roots, &mut prefix, &mut out);
        out
    }

    /// Plan entries whose id is not in `applied`, in plan order.
    pub fn plan_pending(&self, applied: &BTreeSet<String>) -> Vec<EagerLoad> {
        self.plan()
            .into_iter()
            .filter(|load| !applied.contains(&load.id()))
            .collect()
    }
}

fn merge_nodes(into: &mut Vec<RelationNode>, from: Vec<RelationNode>) {
    for node in from {
        match into.iter().position(|n| n.key == node.key) {
            Some(idx) => merge_nodes(&mut into[idx].children, node.children),
            None => into.push(node),
        }
    }
}

fn plan_nodes(nodes: &[RelationNode], prefix: &mut Vec<String>, out: &mut Vec<EagerLoad>) {
    for node in nodes {
        prefix.push(node.field.clone());
        out.push(EagerLoad {
            path: prefix.clone(),
            entity: node.entity.clone(),
            is_collection: node.is_collection,
            nested: prefix.len() > 1,
        });
        plan_nodes(&node.children, prefix, out);
        prefix.pop();
    }
}

/// One eager-load directive.
///
/// `path` names the navigation fields from the query root. Nested directives
/// (`nested == true`) load a relation of an already loaded parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EagerLoad {
    pub path: Vec<String>,
    pub entity: String,
    pub is_collection: bool,
    pub nested: bool,
}

impl EagerLoad {
    /// Dotted path, unique within one plan.
    pub fn id(&self) -> String {
        self.path.join(".")
    }
}

impl fmt::Display for EagerLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.nested { "then_include" } else { "include" };
        write!(f, "{verb} {} ({})", self.id(), self.entity)
    }
}
