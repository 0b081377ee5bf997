// SPDX-License-Identifier: PMPL-1.0-or-later
//! Path resolution against the schema registry.
//!
//! Both tree builders and the ordering step go through [`resolve_path`], so a
//! dotted path means the same thing whether it filters, projects or sorts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;
use crate::path::FieldPath;
use crate::schema::{EntitySchema, FieldType, ScalarType, SchemaRegistry};

/// Declared type of a field that ends a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeafType {
    Scalar(ScalarType),
    /// Registered entity outside the model namespace, carried as a value.
    Opaque(String),
}

impl LeafType {
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            LeafType::Scalar(ty) => Some(*ty),
            LeafType::Opaque(_) => None,
        }
    }
}

impl fmt::Display for LeafType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeafType::Scalar(ty) => write!(f, "{ty}"),
            LeafType::Opaque(name) => f.write_str(name),
        }
    }
}

/// What a resolved segment points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target<'r> {
    Leaf(LeafType),
    /// Model entity reached through a navigation.
    Entity(&'r str),
}

/// One resolved path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep<'r> {
    /// Entity the segment was looked up on.
    pub owner: &'r str,
    pub name: &'r str,
    /// The field is a list; `target` describes its element type.
    pub is_collection: bool,
    pub target: Target<'r>,
}

impl PathStep<'_> {
    /// Tree identity key: resolved type name plus field name.
    pub fn key(&self) -> String {
        match &self.target {
            Target::Entity(entity) => format!("{}.{}", entity, self.name),
            Target::Leaf(leaf) => format!("{}.{}", leaf, self.name),
        }
    }

    pub fn is_navigation(&self) -> bool {
        matches!(self.target, Target::Entity(_))
    }
}

/// Resolve one segment on `owner`.
pub fn resolve_segment<'r>(
    registry: &'r SchemaRegistry,
    owner: &'r EntitySchema,
    segment: &str,
) -> Result<PathStep<'r>, QueryError> {
    let field = owner
        .field(segment)
        .ok_or_else(|| QueryError::unknown_field(&owner.name, segment))?;
    let (element, is_collection) = field.ty.element();
    let target = match element {
        FieldType::Scalar(ty) => Target::Leaf(LeafType::Scalar(*ty)),
        FieldType::Entity(name) if registry.is_model_type(name) => {
            Target::Entity(registry.entity(name)?.name.as_str())
        }
        FieldType::Entity(name) => Target::Leaf(LeafType::Opaque(name.clone())),
        FieldType::List(_) => {
            return Err(QueryError::Schema(format!(
                "nested list field '{}' on '{}'",
                field.name, owner.name
            )))
        }
    };
    Ok(PathStep {
        owner: owner.name.as_str(),
        name: field.name.as_str(),
        is_collection,
        target,
    })
}

/// Resolve every segment of `path`, starting at the `root` entity.
///
/// Only the last segment may resolve to a leaf; a path that keeps going after
/// a leaf is reported as an unknown member of the leaf's type.
pub fn resolve_path<'r>(
    registry: &'r SchemaRegistry,
    root: &str,
    path: &FieldPath,
    max_depth: usize,
) -> Result<Vec<PathStep<'r>>, QueryError> {
    if path.len() > max_depth {
        return Err(QueryError::PathTooDeep {
            path: path.to_string(),
            depth: path.len(),
            max: max_depth,
        });
    }

    let segments = path.segments();
    let mut owner = registry.entity(root)?;
    let mut steps = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let step = resolve_segment(registry, owner, segment)?;
        if let Some(next) = segments.get(i + 1) {
            match &step.target {
                Target::Entity(entity) => owner = registry.entity(entity)?,
                Target::Leaf(leaf) => {
                    return Err(QueryError::unknown_field(leaf.to_string(), next.as_str()))
                }
            }
        }
        steps.push(step);
    }
    Ok(steps)
}

/// Scalar type a resolved path ends on, if values of it can be compared.
pub fn comparable_leaf(path: &FieldPath, steps: &[PathStep<'_>]) -> Result<ScalarType, QueryError> {
    let not_comparable = |reason| QueryError::not_comparable(path.to_string(), reason);
    match steps.last() {
        Some(step) if step.is_navigation() => Err(not_comparable("path ends on a navigation")),
        Some(step) if step.is_collection => Err(not_comparable("list fields cannot be compared")),
        Some(PathStep {
            target: Target::Leaf(LeafType::Scalar(ty)),
            ..
        }) => Ok(*ty),
        _ => Err(not_comparable(
            "type outside the model has no comparable value",
        )),
    }
}
