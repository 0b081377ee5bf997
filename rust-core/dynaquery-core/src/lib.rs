// SPDX-License-Identifier: PMPL-1.0-or-later
//! DynaQuery Core
//!
//! Runtime filters and projections over an object graph, described with
//! dotted field paths such as `customer.address.city`.
//! Paths are resolved against a [`SchemaRegistry`] into field trees; the trees
//! are assembled into a provider-neutral predicate, an object projection and
//! the eager-load directives needed to have the touched relations available.
//! A [`QueryProvider`] runs the result.

pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod path;
pub mod predicate;
pub mod projection;
pub mod provider;
pub mod relation;
pub mod resolve;
pub mod schema;
pub mod session;
pub mod tree;
pub mod value;

pub use condition::{Combinator, Condition, Operator, OrderCondition, OrderDirection};
pub use config::BuilderConfig;
pub use context::BuildContext;
pub use error::QueryError;
pub use path::{parse_filter, FieldPath};
pub use predicate::{
    CompareOp, CompiledPredicate, MemberPath, Operand, ParamRef, Predicate, PredicateAssembler,
};
pub use projection::{assemble_projection, Binding, BindingValue, ObjectProjection};
pub use provider::{QueryProvider, SortKey};
pub use relation::{EagerLoad, RelationForest, RelationNode};
pub use resolve::{resolve_path, LeafType, PathStep, Target};
pub use schema::{
    EntitySchema, FieldSchema, FieldType, RegistryBuilder, ScalarKind, ScalarType,
    SchemaDocument, SchemaRegistry,
};
pub use session::QuerySession;
pub use tree::{
    FieldNode, FieldTree, FilterTreeBuilder, LeafCondition, LeafMerge, NavigationField,
    ProjectionTreeBuilder, ScalarField,
};
pub use value::{coerce, Value};
