// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory tables and the query provider over them.
//
// Rows are JSON objects holding the full object graph; relations are nested
// objects and arrays. A query records filters and orderings and runs them in
// attach order on `execute`; every path is relative to the source entity, so
// the projection is applied last and a newer projection replaces an older one.
// Relations are only readable once an eager-load directive for them has been
// attached, which makes the provider a strict check of the plans the session
// produces.

use std::collections::{BTreeMap, BTreeSet};

use dynaquery_core::{
    CompiledPredicate, EagerLoad, ObjectProjection, QueryError, QueryProvider, SortKey,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as Json;
use tracing::debug;

use crate::error::MemoryProviderError;
use crate::eval::{self, Loaded};

/// Named tables of JSON rows.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Json>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append rows to the table of `entity`, creating it if needed.
    pub fn insert(
        &mut self,
        entity: impl Into<String>,
        rows: Vec<Json>,
    ) -> Result<(), MemoryProviderError> {
        let entity = entity.into();
        let table = self.tables.entry(entity.clone()).or_default();
        let offset = table.len();
        if let Some(index) = rows.iter().position(|row| !row.is_object()) {
            return Err(MemoryProviderError::RowNotObject {
                entity,
                index: offset + index,
            });
        }
        table.extend(rows);
        Ok(())
    }

    /// Append rows given as a JSON array.
    pub fn insert_json(
        &mut self,
        entity: impl Into<String>,
        json: &str,
    ) -> Result<(), MemoryProviderError> {
        let rows: Vec<Json> = serde_json::from_str(json)?;
        self.insert(entity, rows)
    }

    /// Append serializable rows.
    pub fn insert_all<T: Serialize>(
        &mut self,
        entity: impl Into<String>,
        rows: &[T],
    ) -> Result<(), MemoryProviderError> {
        let rows = rows
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        self.insert(entity, rows)
    }

    pub fn len(&self, entity: &str) -> usize {
        self.tables.get(entity).map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    /// Start a query over a snapshot of the table.
    pub fn query(&self, entity: &str) -> Result<MemoryQuery, MemoryProviderError> {
        let rows = self
            .tables
            .get(entity)
            .ok_or_else(|| MemoryProviderError::UnknownTable(entity.to_string()))?;
        Ok(MemoryQuery::new(entity, rows.clone()))
    }
}

#[derive(Debug, Clone)]
enum Step {
    Filter(CompiledPredicate),
    Order(Vec<SortKey>),
}

/// Query over rows of one entity.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    entity: String,
    rows: Vec<Json>,
    loads: Vec<EagerLoad>,
    loaded: BTreeSet<String>,
    steps: Vec<Step>,
    projection: Option<ObjectProjection>,
}

impl MemoryQuery {
    pub fn new(entity: impl Into<String>, rows: Vec<Json>) -> Self {
        Self {
            entity: entity.into(),
            rows,
            loads: Vec::new(),
            loaded: BTreeSet::new(),
            steps: Vec::new(),
            projection: None,
        }
    }

    /// Eager-load directives in the order they were attached.
    pub fn eager_loads(&self) -> &[EagerLoad] {
        &self.loads
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    pub fn projection(&self) -> Option<&ObjectProjection> {
        self.projection.as_ref()
    }

    /// Execute and decode each row into `T`.
    pub fn execute_as<T: DeserializeOwned>(self) -> Result<Vec<T>, QueryError> {
        self.execute()?
            .into_iter()
            .map(|row| serde_json::from_value(row).map_err(QueryError::from))
            .collect()
    }

    fn check_entity(&self, expected: &str) -> Result<(), MemoryProviderError> {
        if expected == self.entity {
            Ok(())
        } else {
            Err(MemoryProviderError::EntityMismatch {
                expected: expected.to_string(),
                actual: self.entity.clone(),
            })
        }
    }
}

impl QueryProvider for MemoryQuery {
    type Row = Json;

    fn element_type(&self) -> &str {
        &self.entity
    }

    fn attach_predicate(mut self, predicate: CompiledPredicate) -> Result<Self, QueryError> {
        self.check_entity(&predicate.entity)?;
        self.steps.push(Step::Filter(predicate));
        Ok(self)
    }

    fn attach_projection(mut self, projection: ObjectProjection) -> Result<Self, QueryError> {
        self.check_entity(&projection.entity)?;
        self.projection = Some(projection);
        Ok(self)
    }

    fn attach_eager_load(mut self, load: &EagerLoad) -> Result<Self, QueryError> {
        if load.nested {
            let parent = load.path[..load.path.len().saturating_sub(1)].join(".");
            if !self.loaded.contains(&parent) {
                return Err(MemoryProviderError::NotLoaded(parent).into());
            }
        }
        self.loaded.insert(load.id());
        self.loads.push(load.clone());
        Ok(self)
    }

    fn attach_ordering(mut self, keys: Vec<SortKey>) -> Result<Self, QueryError> {
        self.steps.push(Step::Order(keys));
        Ok(self)
    }

    fn execute(self) -> Result<Vec<Json>, QueryError> {
        let loaded = Loaded(&self.loaded);
        let mut rows = self.rows;
        for step in &self.steps {
            rows = match step {
                Step::Filter(predicate) => {
                    let mut kept = Vec::with_capacity(rows.len());
                    for row in rows {
                        if eval::matches(predicate, &row, &loaded)? {
                            kept.push(row);
                        }
                    }
                    kept
                }
                Step::Order(keys) => eval::sort(rows, keys, &loaded)?,
            };
        }
        if let Some(projection) = &self.projection {
            rows = rows
                .iter()
                .map(|row| eval::project(projection, row, &loaded))
                .collect::<Result<Vec<_>, _>>()?;
        }
        debug!(
            entity = %self.entity,
            steps = self.steps.len(),
            projected = self.projection.is_some(),
            loads = self.loads.len(),
            rows = rows.len(),
            "memory query executed"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_rejects_non_objects() {
        let mut store = MemoryStore::new();
        store.insert("shop.Customer", vec![json!({"id": 1})]).unwrap();
        let err = store
            .insert("shop.Customer", vec![json!({"id": 2}), json!(3)])
            .unwrap_err();
        assert!(matches!(err, MemoryProviderError::RowNotObject { index: 2, .. }));
        assert_eq!(store.len("shop.Customer"), 1);
    }

    #[test]
    fn test_unknown_table() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.query("shop.Customer"),
            Err(MemoryProviderError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_insert_json_and_serialize() {
        #[derive(Serialize)]
        struct Row {
            id: i32,
        }

        let mut store = MemoryStore::new();
        store.insert_json("a", r#"[{"id": 1}, {"id": 2}]"#).unwrap();
        store.insert_all("a", &[Row { id: 3 }]).unwrap();
        assert_eq!(store.len("a"), 3);
        assert!(store.insert_json("a", "[1").is_err());
    }

    #[test]
    fn test_nested_load_requires_parent() {
        let query = MemoryQuery::new("shop.Customer", Vec::new());
        let nested = EagerLoad {
            path: vec!["orders".into(), "item".into()],
            entity: "shop.Item".into(),
            is_collection: false,
            nested: true,
        };
        let err = query.attach_eager_load(&nested).err().unwrap();
        assert_eq!(err.code(), "ProviderError");
    }

    #[test]
    fn test_entity_mismatch() {
        let query = MemoryQuery::new("shop.Customer", Vec::new());
        let projection = ObjectProjection {
            entity: "shop.Order".into(),
            bindings: Vec::new(),
        };
        let err = query.attach_projection(projection).err().unwrap();
        assert!(err.to_string().contains("shop.Order"));
    }

    #[test]
    fn test_newer_projection_replaces_older() {
        use dynaquery_core::{Binding, BindingValue};

        let scalar = |member: &str| Binding {
            member: member.to_string(),
            value: BindingValue::Scalar,
        };
        let rows = vec![json!({"id": 1, "name": "ann", "age": 40})];
        let query = MemoryQuery::new("shop.Customer", rows)
            .attach_projection(ObjectProjection {
                entity: "shop.Customer".into(),
                bindings: vec![scalar("id")],
            })
            .unwrap()
            .attach_projection(ObjectProjection {
                entity: "shop.Customer".into(),
                bindings: vec![scalar("id"), scalar("name")],
            })
            .unwrap();
        assert_eq!(query.step_count(), 0);
        assert_eq!(query.execute().unwrap(), vec![json!({"id": 1, "name": "ann"})]);
    }

    #[test]
    fn test_execute_without_steps_returns_rows() {
        let rows = vec![json!({"id": 1}), json!({"id": 2})];
        let query = MemoryQuery::new("shop.Customer", rows.clone());
        assert_eq!(query.execute().unwrap(), rows);
    }
}
