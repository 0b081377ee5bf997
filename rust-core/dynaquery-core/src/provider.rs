// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Query provider capability trait.
//
// A provider is the query engine that actually runs the assembled query. The
// session never executes anything itself: it hands compiled predicates,
// projections, eager-load directives and sort keys to the provider, which
// compiles them into whatever its backend understands.

use serde::{Deserialize, Serialize};

use crate::condition::OrderDirection;
use crate::error::QueryError;
use crate::predicate::{CompiledPredicate, MemberPath};
use crate::projection::ObjectProjection;
use crate::relation::EagerLoad;
use crate::schema::ScalarKind;

/// One resolved ordering key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub path: MemberPath,
    /// Declared kind of the leaf, so providers compare values by type.
    pub kind: ScalarKind,
    pub direction: OrderDirection,
}

/// A composable query over rows of one entity type.
///
/// Every `attach_*` method consumes the query and returns the extended one,
/// mirroring a builder pipeline. Steps attach in call order.
pub trait QueryProvider: Sized {
    /// Row type produced by [`execute`](Self::execute).
    type Row;

    /// Registered entity name of the rows this query yields.
    fn element_type(&self) -> &str;

    /// Keep only rows satisfying the predicate.
    fn attach_predicate(self, predicate: CompiledPredicate) -> Result<Self, QueryError>;

    /// Populate only the projected members of each row.
    fn attach_projection(self, projection: ObjectProjection) -> Result<Self, QueryError>;

    /// Make a relation available to later steps.
    ///
    /// Nested directives (`load.nested`) always follow the directive for
    /// their parent path.
    fn attach_eager_load(self, load: &EagerLoad) -> Result<Self, QueryError>;

    /// Order rows by `keys`, first key most significant.
    ///
    /// Providers without ordering support keep this default.
    fn attach_ordering(self, _keys: Vec<SortKey>) -> Result<Self, QueryError> {
        Err(QueryError::Provider(
            "ordering is not supported by this provider".to_string(),
        ))
    }

    fn execute(self) -> Result<Vec<Self::Row>, QueryError>;
}
