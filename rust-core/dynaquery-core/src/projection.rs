// SPDX-License-Identifier: PMPL-1.0-or-later
//! Projection IR and its assembly from a projection tree.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::tree::{FieldNode, FieldTree};

/// Construct an `entity` value populating only `bindings`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectProjection {
    pub entity: String,
    pub bindings: Vec<Binding>,
}

/// Target member and how its value is produced from the source member of
/// the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub member: String,
    pub value: BindingValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum BindingValue {
    /// Scalar leaf, bound directly.
    Scalar,
    /// Navigation selected without sub-fields, copied whole.
    Copy,
    /// Single-valued navigation, projected recursively.
    Object(ObjectProjection),
    /// Collection navigation, projected per element and materialised.
    Collection(ObjectProjection),
}

impl ObjectProjection {
    /// Dotted paths of every leaf binding, in binding order.
    pub fn member_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_paths(self, "", &mut out);
        out
    }
}

fn collect_paths(projection: &ObjectProjection, prefix: &str, out: &mut Vec<String>) {
    for binding in &projection.bindings {
        let path = if prefix.is_empty() {
            binding.member.clone()
        } else {
            format!("{prefix}.{}", binding.member)
        };
        match &binding.value {
            BindingValue::Scalar | BindingValue::Copy => out.push(path),
            BindingValue::Object(inner) | BindingValue::Collection(inner) => {
                collect_paths(inner, &path, out)
            }
        }
    }
}

/// Assemble the projection for `entity`; an empty tree yields `None`.
pub fn assemble_projection(entity: &str, tree: &FieldTree<()>) -> Option<ObjectProjection> {
    if tree.is_empty() {
        return None;
    }
    let projection = object(entity, tree.nodes());
    debug!(
        entity,
        bindings = projection.bindings.len(),
        "projection assembled"
    );
    Some(projection)
}

fn object(entity: &str, nodes: &[FieldNode<()>]) -> ObjectProjection {
    let bindings = nodes
        .iter()
        .map(|node| {
            let value = match node {
                FieldNode::Scalar(_) => BindingValue::Scalar,
                FieldNode::Navigation(nav) if nav.children.is_empty() => BindingValue::Copy,
                FieldNode::Collection(nav) if nav.children.is_empty() => BindingValue::Copy,
                FieldNode::Navigation(nav) => {
                    BindingValue::Object(object(&nav.entity, &nav.children))
                }
                FieldNode::Collection(nav) => {
                    BindingValue::Collection(object(&nav.entity, &nav.children))
                }
            };
            Binding {
                member: node.name().to_string(),
                value,
            }
        })
        .collect();
    ObjectProjection {
        entity: entity.to_string(),
        bindings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntitySchema, ScalarKind, SchemaRegistry};
    use crate::tree::ProjectionTreeBuilder;

    fn project(paths: &str) -> Option<ObjectProjection> {
        let registry = SchemaRegistry::builder("shop")
            .entity(
                EntitySchema::new("shop.Customer")
                    .scalar("id", ScalarKind::Int32)
                    .scalar("name", ScalarKind::String)
                    .reference("address", "shop.Address")
                    .collection("orders", "shop.Order"),
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
            .entity(EntitySchema::new("shop.Item").scalar("name", ScalarKind::String))
            .build()
            .unwrap();
        let mut builder = ProjectionTreeBuilder::new(&registry, "shop.Customer", 8).unwrap();
        builder.add_list(paths).unwrap();
        assemble_projection("shop.Customer", &builder.finish().0)
    }

    #[test]
    fn test_empty_projection_is_none() {
        assert!(project("").is_none());
    }

    #[test]
    fn test_scalar_bindings() {
        let projection = project("id,name").unwrap();
        assert_eq!(projection.entity, "shop.Customer");
        assert_eq!(projection.member_paths(), ["id", "name"]);
        assert!(projection
            .bindings
            .iter()
            .all(|b| b.value == BindingValue::Scalar));
    }

    #[test]
    fn test_nested_object_binds_only_requested_fields() {
        let projection = project("address.city").unwrap();
        let BindingValue::Object(address) = &projection.bindings[0].value else {
            panic!("expected nested object");
        };
        assert_eq!(address.entity, "shop.Address");
        assert_eq!(address.bindings.len(), 1);
        assert_eq!(address.bindings[0].member, "city");
    }

    #[test]
    fn test_collection_projection() {
        let projection = project("orders.total,orders.item.name").unwrap();
        let BindingValue::Collection(order) = &projection.bindings[0].value else {
            panic!("expected collection");
        };
        assert_eq!(order.entity, "shop.Order");
        assert!(matches!(order.bindings[1].value, BindingValue::Object(_)));
        assert_eq!(
            projection.member_paths(),
            ["orders.total", "orders.item.name"]
        );
    }

    #[test]
    fn test_navigation_without_children_is_copy() {
        let projection = project("address,orders").unwrap();
        assert_eq!(projection.bindings[0].value, BindingValue::Copy);
        assert_eq!(projection.bindings[1].value, BindingValue::Copy);
    }
}
