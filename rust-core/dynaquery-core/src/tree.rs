// SPDX-License-Identifier: PMPL-1.0-or-later
//! Field trees.
//!
//! A field tree records which fields of the root entity a query touches. Each
//! node is a scalar leaf, a single-valued navigation or a collection-valued
//! navigation, identified by [`PathStep::key`]. Paths that share a prefix
//! share the navigation nodes of that prefix.
//!
//! Two builders populate trees from raw input:
//!
//! - [`FilterTreeBuilder`] attaches a [`LeafCondition`] to each leaf. Leaves
//!   always append, so two conditions on the same field both apply.
//! - [`ProjectionTreeBuilder`] carries no payload and deduplicates leaves.
//!
//! Both resolve through [`resolve_path`] and register the navigations they
//! walk in a [`RelationForest`].

use serde::{Deserialize, Serialize};

use crate::condition::{Condition, Operator};
use crate::error::QueryError;
use crate::path::{split_field_list, FieldPath};
use crate::relation::RelationForest;
use crate::resolve::{comparable_leaf, resolve_path, LeafType, PathStep, Target};
use crate::schema::SchemaRegistry;

/// Payload of a filter leaf: the operator and its still-untyped literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCondition {
    pub operator: Operator,
    pub value: String,
}

/// Leaf node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarField<L> {
    pub key: String,
    pub name: String,
    pub ty: LeafType,
    /// Scalar list field.
    pub is_collection: bool,
    pub payload: L,
}

/// Navigation node; `entity` is the related (element) type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationField<L> {
    pub key: String,
    pub name: String,
    pub entity: String,
    pub children: Vec<FieldNode<L>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldNode<L> {
    Scalar(ScalarField<L>),
    Navigation(NavigationField<L>),
    Collection(NavigationField<L>),
}

impl<L> FieldNode<L> {
    pub fn key(&self) -> &str {
        match self {
            FieldNode::Scalar(leaf) => &leaf.key,
            FieldNode::Navigation(nav) | FieldNode::Collection(nav) => &nav.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FieldNode::Scalar(leaf) => &leaf.name,
            FieldNode::Navigation(nav) | FieldNode::Collection(nav) => &nav.name,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, FieldNode::Scalar(_))
    }

    pub fn children(&self) -> &[FieldNode<L>] {
        match self {
            FieldNode::Scalar(_) => &[],
            FieldNode::Navigation(nav) | FieldNode::Collection(nav) => &nav.children,
        }
    }

    fn children_mut(&mut self) -> Option<&mut Vec<FieldNode<L>>> {
        match self {
            FieldNode::Scalar(_) => None,
            FieldNode::Navigation(nav) | FieldNode::Collection(nav) => Some(&mut nav.children),
        }
    }
}

/// How leaves with an existing key are handled on insert and merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafMerge {
    Append,
    Dedupe,
}

/// Top-level nodes under the root entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldTree<L> {
    nodes: Vec<FieldNode<L>>,
}

impl<L> Default for FieldTree<L> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<L> FieldTree<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[FieldNode<L>] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of leaves anywhere in the tree.
    pub fn leaf_count(&self) -> usize {
        fn count<L>(nodes: &[FieldNode<L>]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    FieldNode::Scalar(_) => 1,
                    other => count(other.children()),
                })
                .sum()
        }
        count(&self.nodes)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Insert one resolved path ending in `payload`.
    pub fn insert(&mut self, steps: &[PathStep<'_>], payload: L, leaves: LeafMerge) {
        insert_nodes(&mut self.nodes, steps, payload, leaves);
    }

    /// Fold `other` into this tree.
    pub fn merge(&mut self, other: FieldTree<L>, leaves: LeafMerge) {
        merge_nodes(&mut self.nodes, other.nodes, leaves);
    }
}

fn insert_nodes<L>(
    nodes: &mut Vec<FieldNode<L>>,
    steps: &[PathStep<'_>],
    payload: L,
    leaves: LeafMerge,
) {
    let Some((step, rest)) = steps.split_first() else {
        return;
    };
    let key = step.key();
    match &step.target {
        Target::Leaf(ty) => {
            if leaves == LeafMerge::Dedupe && nodes.iter().any(|n| n.key() == key) {
                return;
            }
            nodes.push(FieldNode::Scalar(ScalarField {
                key,
                name: step.name.to_string(),
                ty: ty.clone(),
                is_collection: step.is_collection,
                payload,
            }));
        }
        Target::Entity(entity) => {
            let idx = match nodes.iter().position(|n| !n.is_scalar() && n.key() == key) {
                Some(idx) => idx,
                None => {
                    let nav = NavigationField {
                        key,
                        name: step.name.to_string(),
                        entity: entity.to_string(),
                        children: Vec::new(),
                    };
                    nodes.push(if step.is_collection {
                        FieldNode::Collection(nav)
                    } else {
                        FieldNode::Navigation(nav)
                    });
                    nodes.len() - 1
                }
            };
            if let Some(children) = nodes[idx].children_mut() {
                insert_nodes(children, rest, payload, leaves);
            }
        }
    }
}

fn merge_nodes<L>(into: &mut Vec<FieldNode<L>>, from: Vec<FieldNode<L>>, leaves: LeafMerge) {
    for node in from {
        let existing = into
            .iter()
            .position(|n| n.is_scalar() == node.is_scalar() && n.key() == node.key());
        match (node, existing) {
            (FieldNode::Scalar(_), Some(_)) if leaves == LeafMerge::Dedupe => {}
            (FieldNode::Scalar(leaf), _) => into.push(FieldNode::Scalar(leaf)),
            (FieldNode::Navigation(nav) | FieldNode::Collection(nav), Some(idx)) => {
                if let Some(children) = into[idx].children_mut() {
                    merge_nodes(children, nav.children, leaves);
                }
            }
            (nav, None) => into.push(nav),
        }
    }
}

/// Builds the filter tree for one batch of conditions.
#[derive(Debug)]
pub struct FilterTreeBuilder<'r> {
    registry: &'r SchemaRegistry,
    root: &'r str,
    max_depth: usize,
    tree: FieldTree<LeafCondition>,
    relations: RelationForest,
}

impl<'r> FilterTreeBuilder<'r> {
    pub fn new(
        registry: &'r SchemaRegistry,
        root: &str,
        max_depth: usize,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            registry,
            root: registry.entity(root)?.name.as_str(),
            max_depth,
            tree: FieldTree::new(),
            relations: RelationForest::new(),
        })
    }

    /// Add one condition.
    pub fn add(&mut self, condition: &Condition) -> Result<(), QueryError> {
        let path = FieldPath::parse(&condition.field)?;
        let steps = resolve_path(self.registry, self.root, &path, self.max_depth)?;
        comparable_leaf(&path, &steps)?;

        self.relations.register(&steps);
        self.tree.insert(
            &steps,
            LeafCondition {
                operator: condition.operator,
                value: condition.value.clone(),
            },
            LeafMerge::Append,
        );
        Ok(())
    }

    /// Add one condition in its `path,Operator,value` form.
    pub fn add_encoded(&mut self, raw: &str) -> Result<(), QueryError> {
        self.add(&Condition::parse(raw)?)
    }

    pub fn finish(self) -> (FieldTree<LeafCondition>, RelationForest) {
        (self.tree, self.relations)
    }
}

/// Builds the projection tree for a list of field paths.
#[derive(Debug)]
pub struct ProjectionTreeBuilder<'r> {
    registry: &'r SchemaRegistry,
    root: &'r str,
    max_depth: usize,
    tree: FieldTree<()>,
    relations: RelationForest,
}

impl<'r> ProjectionTreeBuilder<'r> {
    pub fn new(
        registry: &'r SchemaRegistry,
        root: &str,
        max_depth: usize,
    ) -> Result<Self, QueryError> {
        Ok(Self {
            registry,
            root: registry.entity(root)?.name.as_str(),
            max_depth,
            tree: FieldTree::new(),
            relations: RelationForest::new(),
        })
    }

    /// Add one dotted path. Ending on a navigation selects the whole object.
    pub fn add(&mut self, raw: &str) -> Result<(), QueryError> {
        let path = FieldPath::parse(raw)?;
        let steps = resolve_path(self.registry, self.root, &path, self.max_depth)?;
        self.relations.register(&steps);
        self.tree.insert(&steps, (), LeafMerge::Dedupe);
        Ok(())
    }

    /// Add every path of a comma-joined field list.
    pub fn add_list(&mut self, raw: &str) -> Result<(), QueryError> {
        for field in split_field_list(raw) {
            self.add(field)?;
        }
        Ok(())
    }

    pub fn finish(self) -> (FieldTree<()>, RelationForest) {
        (self.tree, self.relations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, ScalarKind};

    fn shop() -> SchemaRegistry {
        SchemaRegistry::builder("shop")
            .entity(
                EntitySchema::new("shop.Customer")
                    .scalar("id", ScalarKind::Int32)
                    .scalar("name", ScalarKind::String)
                    .reference("address", "shop.Address")
                    .collection("orders", "shop.Order")
                    .scalar_list("tags", ScalarKind::String),
            )
            .entity(
                EntitySchema::new("shop.Address")
                    .scalar("city", ScalarKind::String)
                    .scalar("zip", ScalarKind::String),
            )
            .entity(
                EntitySchema::new("shop.Order")
                    .scalar("total", ScalarKind::Decimal)
                    .reference("item", "shop.Item"),
            )
            .entity(EntitySchema::new("shop.Item").scalar("sku", ScalarKind::String))
            .build()
            .unwrap()
    }

    #[test]
    fn test_filter_leaves_append() {
        let registry = shop();
        let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add_encoded("id,Greater,1").unwrap();
        builder.add_encoded("id,Less,10").unwrap();
        let (tree, relations) = builder.finish();
        assert_eq!(tree.nodes().len(), 2);
        assert_eq!(tree.leaf_count(), 2);
        assert!(relations.is_empty());
    }

    #[test]
    fn test_filter_shares_navigation_prefix() {
        let registry = shop();
        let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add_encoded("address.city,Equal,Oslo").unwrap();
        builder.add_encoded("address.zip,Equal,0150").unwrap();
        let (tree, relations) = builder.finish();

        assert_eq!(tree.nodes().len(), 1);
        let FieldNode::Navigation(address) = &tree.nodes()[0] else {
            panic!("expected navigation");
        };
        assert_eq!(address.entity, "shop.Address");
        assert_eq!(address.children.len(), 2);
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_filter_on_navigation_not_comparable() {
        let registry = shop();
        let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        let err = builder.add_encoded("address,Equal,x").unwrap_err();
        assert!(matches!(err, QueryError::NotComparable { .. }));
        let err = builder.add_encoded("tags,Contains,x").unwrap_err();
        assert!(matches!(err, QueryError::NotComparable { .. }));
    }

    #[test]
    fn test_filter_unknown_field() {
        let registry = shop();
        let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        assert!(matches!(
            builder.add_encoded("foo.bar,Equal,1"),
            Err(QueryError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_collection_node() {
        let registry = shop();
        let mut builder = FilterTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add_encoded("orders.item.sku,Equal,A1").unwrap();
        let (tree, relations) = builder.finish();
        assert!(matches!(tree.nodes()[0], FieldNode::Collection(_)));
        assert!(matches!(tree.nodes()[0].children()[0], FieldNode::Navigation(_)));
        assert_eq!(relations.len(), 2);
    }

    #[test]
    fn test_projection_dedupes_leaves() {
        let registry = shop();
        let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add_list("name, address.city, name, address.city").unwrap();
        let (tree, _) = builder.finish();
        assert_eq!(tree.nodes().len(), 2);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_projection_navigation_leaf() {
        let registry = shop();
        let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add("address").unwrap();
        builder.add("tags").unwrap();
        let (tree, relations) = builder.finish();
        assert!(tree.nodes()[0].children().is_empty());
        assert!(matches!(&tree.nodes()[1], FieldNode::Scalar(f) if f.is_collection));
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_merge_respects_leaf_mode() {
        let registry = shop();
        let build = |paths: &[&str]| {
            let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
            for p in paths {
                builder.add(p).unwrap();
            }
            builder.finish().0
        };

        let mut deduped = build(&["name", "orders.total"]);
        deduped.merge(build(&["name", "orders.item.sku"]), LeafMerge::Dedupe);
        assert_eq!(deduped.nodes().len(), 2);
        assert_eq!(deduped.leaf_count(), 3);

        let mut appended = build(&["name"]);
        appended.merge(build(&["name"]), LeafMerge::Append);
        assert_eq!(appended.leaf_count(), 2);
    }

    #[test]
    fn test_clear() {
        let registry = shop();
        let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add("name").unwrap();
        let (mut tree, _) = builder.finish();
        tree.clear();
        assert!(tree.is_empty());
    }
}
