// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Query-building sessions.
//!
//! A [`QuerySession`] is the entry point callers use: it owns one
//! [`BuildContext`], borrows the shared [`SchemaRegistry`], and extends a
//! [`QueryProvider`] step by step.
//!
//! ```text
//! filter(source, conditions)   ──► eager loads (new only) ──► predicate
//! project(source, fields)      ──► eager loads (new only) ──► projection
//! order_by(source, keys)       ──► eager loads (new only) ──► ordering
//! reset(source)                ──► cleared context, source unchanged
//! ```
//!
//! Each step works on a staged copy of the context which replaces the live
//! one only after every provider call succeeded, so a failed step leaves the
//! session exactly as it was.

use tracing::{debug, instrument, warn};

use crate::condition::{Combinator, Condition, OrderCondition};
use crate::config::BuilderConfig;
use crate::context::BuildContext;
use crate::error::QueryError;
use crate::path::{split_field_list, FieldPath};
use crate::predicate::{MemberPath, PredicateAssembler};
use crate::projection::assemble_projection;
use crate::provider::{QueryProvider, SortKey};
use crate::relation::RelationForest;
use crate::resolve::{comparable_leaf, resolve_path};
use crate::schema::SchemaRegistry;
use crate::tree::{FilterTreeBuilder, LeafMerge, ProjectionTreeBuilder};

/// Builds one query at a time against a shared registry.
#[derive(Debug, Clone)]
pub struct QuerySession<'r> {
    registry: &'r SchemaRegistry,
    config: BuilderConfig,
    ctx: BuildContext,
}

impl<'r> QuerySession<'r> {
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        Self::with_config(registry, BuilderConfig::default())
    }

    pub fn with_config(registry: &'r SchemaRegistry, config: BuilderConfig) -> Self {
        Self {
            registry,
            config,
            ctx: BuildContext::new(),
        }
    }

    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Filter with the configured default combinator.
    pub fn filter<P: QueryProvider>(
        &mut self,
        source: P,
        conditions: &[Condition],
    ) -> Result<P, QueryError> {
        let combinator = self.config.default_combinator;
        self.filter_with(source, conditions, combinator)
    }

    /// Filter rows by `conditions`, joined by `combinator`.
    ///
    /// Each call attaches its own predicate, so successive calls narrow the
    /// rows further; the context's filter tree keeps the leaves of every call.
    /// Conditions with no leaves leave the source untouched.
    #[instrument(
        skip_all,
        fields(root = %source.element_type(), conditions = conditions.len(), %combinator)
    )]
    pub fn filter_with<P: QueryProvider>(
        &mut self,
        source: P,
        conditions: &[Condition],
        combinator: Combinator,
    ) -> Result<P, QueryError> {
        let root = source.element_type().to_string();
        let mut staged = self.ctx.clone();
        staged.bind(&root)?;

        let mut builder = FilterTreeBuilder::new(self.registry, &root, self.config.max_path_depth)?;
        for condition in conditions {
            builder.add(condition)?;
        }
        let (tree, relations) = builder.finish();
        let compiled = PredicateAssembler::new(combinator, self.config.parameterize_literals)
            .assemble(&root, &tree)?;

        staged.filters.merge(tree, LeafMerge::Append);
        staged.relations.merge(relations);
        let mut source = attach_pending_loads(source, &mut staged)?;
        match compiled {
            Some(predicate) => source = source.attach_predicate(predicate)?,
            None => warn!(root = %root, "filter produced no predicate; source unchanged"),
        }

        self.ctx = staged;
        Ok(source)
    }

    /// Filter with encoded `path,Operator,value` conditions and a textual
    /// combinator (`AND`/`OR`).
    pub fn filter_encoded<P: QueryProvider, S: AsRef<str>>(
        &mut self,
        source: P,
        conditions: &[S],
        combinator: &str,
    ) -> Result<P, QueryError> {
        let combinator: Combinator = combinator.parse()?;
        let conditions = conditions
            .iter()
            .map(|raw| Condition::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.filter_with(source, &conditions, combinator)
    }

    /// Project rows onto `fields`, accumulating with earlier projections of
    /// this session.
    #[instrument(skip_all, fields(root = %source.element_type(), fields = fields.len()))]
    pub fn project<P: QueryProvider, S: AsRef<str>>(
        &mut self,
        source: P,
        fields: &[S],
    ) -> Result<P, QueryError> {
        let root = source.element_type().to_string();
        let mut staged = self.ctx.clone();
        staged.bind(&root)?;

        let mut builder =
            ProjectionTreeBuilder::new(self.registry, &root, self.config.max_path_depth)?;
        for field in fields {
            builder.add(field.as_ref())?;
        }
        let (tree, relations) = builder.finish();

        staged.projection.merge(tree, LeafMerge::Dedupe);
        staged.relations.merge(relations);
        let mut source = attach_pending_loads(source, &mut staged)?;
        match assemble_projection(&root, &staged.projection) {
            Some(projection) => source = source.attach_projection(projection)?,
            None => debug!(root = %root, "no projection fields"),
        }

        self.ctx = staged;
        Ok(source)
    }

    /// Project onto a comma-joined field list such as `"id,address.city"`.
    pub fn project_str<P: QueryProvider>(
        &mut self,
        source: P,
        fields: &str,
    ) -> Result<P, QueryError> {
        let fields: Vec<&str> = split_field_list(fields).collect();
        self.project(source, &fields)
    }

    /// Order rows by scalar fields, loading any relations the keys walk.
    #[instrument(skip_all, fields(root = %source.element_type(), keys = orders.len()))]
    pub fn order_by<P: QueryProvider>(
        &mut self,
        source: P,
        orders: &[OrderCondition],
    ) -> Result<P, QueryError> {
        let root = source.element_type().to_string();
        self.registry.entity(&root)?;
        let mut staged = self.ctx.clone();
        staged.bind(&root)?;

        let mut relations = RelationForest::new();
        let mut keys = Vec::with_capacity(orders.len());
        for order in orders {
            let path = FieldPath::parse(&order.field)?;
            let steps = resolve_path(self.registry, &root, &path, self.config.max_path_depth)?;
            if steps.iter().any(|s| s.is_navigation() && s.is_collection) {
                return Err(QueryError::not_comparable(
                    path.to_string(),
                    "cannot order through a collection",
                ));
            }
            let ty = comparable_leaf(&path, &steps)?;
            relations.register(&steps);
            keys.push(SortKey {
                path: MemberPath(path.segments().to_vec()),
                kind: ty.kind,
                direction: order.direction,
            });
        }

        staged.relations.merge(relations);
        let mut source = attach_pending_loads(source, &mut staged)?;
        if !keys.is_empty() {
            source = source.attach_ordering(keys)?;
        }

        self.ctx = staged;
        Ok(source)
    }

    /// Drop all accumulated state so the next step starts a fresh query.
    pub fn reset<P>(&mut self, source: P) -> P {
        debug!(
            filters = self.ctx.filters.leaf_count(),
            projected = self.ctx.projection.leaf_count(),
            relations = self.ctx.relations.len(),
            "resetting build context"
        );
        self.ctx.clear();
        source
    }
}

/// Attach every planned eager load not yet applied to the source.
fn attach_pending_loads<P: QueryProvider>(
    mut source: P,
    ctx: &mut BuildContext,
) -> Result<P, QueryError> {
    for load in ctx.relations.plan_pending(&ctx.applied) {
        debug!(load = %load, "attaching eager load");
        ctx.applied.insert(load.id());
        source = source.attach_eager_load(&load)?;
    }
    Ok(source)
}
