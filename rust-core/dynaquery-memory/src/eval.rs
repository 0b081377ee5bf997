// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Evaluation of predicate, projection and ordering IR over JSON rows.
//
// Walking through a member that is not the last one of a path crosses a
// relation, which must have been eager-loaded; the same holds for nested
// projections. Missing members read as null.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use dynaquery_core::value::parse_timestamp;
use dynaquery_core::{
    BindingValue, CompareOp, CompiledPredicate, ObjectProjection, Operand, OrderDirection,
    Predicate, ScalarKind, SortKey, Value,
};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::error::MemoryProviderError;

static NULL: Json = Json::Null;

/// Relations available to a query, by dotted path from the root.
pub(crate) struct Loaded<'a>(pub &'a BTreeSet<String>);

impl Loaded<'_> {
    fn ensure(&self, scope: &[String], prefix: &[String]) -> Result<(), MemoryProviderError> {
        let id = scope
            .iter()
            .chain(prefix)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(".");
        if self.0.contains(&id) {
            Ok(())
        } else {
            Err(MemoryProviderError::NotLoaded(id))
        }
    }
}

/// Member at `path` below `row`; `None` when an intermediate member is null.
fn lookup<'j>(
    row: &'j Json,
    path: &[String],
    scope: &[String],
    loaded: &Loaded<'_>,
) -> Result<Option<&'j Json>, MemoryProviderError> {
    let mut current = row;
    for (i, segment) in path.iter().enumerate() {
        if i > 0 {
            loaded.ensure(scope, &path[..i])?;
            if current.is_null() {
                return Ok(None);
            }
        }
        current = current.get(segment).unwrap_or(&NULL);
    }
    Ok(Some(current))
}

/// Read a JSON value as a typed value, guided by the value it is compared to.
pub(crate) fn to_value(json: &Json, hint: Option<&Value>) -> Option<Value> {
    match json {
        Json::Null => Some(Value::Null),
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float)),
        Json::String(s) => match hint {
            Some(Value::Timestamp(_)) => parse_timestamp(s).map(Value::Timestamp),
            Some(Value::Guid(_)) => Uuid::parse_str(s).ok().map(Value::Guid),
            _ => Some(Value::String(s.clone())),
        },
        Json::Array(_) | Json::Object(_) => None,
    }
}

/// Read a JSON value as the declared kind of its field.
fn to_kind(json: &Json, kind: ScalarKind) -> Option<Value> {
    match (json, kind) {
        (Json::String(s), ScalarKind::Timestamp) => parse_timestamp(s).map(Value::Timestamp),
        (Json::String(s), ScalarKind::Guid) => Uuid::parse_str(s).ok().map(Value::Guid),
        _ => to_value(json, None),
    }
}

fn compare(actual: Option<&Json>, op: CompareOp, expected: &Value) -> bool {
    let actual = actual.and_then(|json| to_value(json, Some(expected)));
    match (actual, op) {
        (Some(actual), CompareOp::Eq | CompareOp::Ne) => {
            let equal = match (&actual, expected) {
                (Value::Null, Value::Null) => true,
                (Value::Null, _) | (_, Value::Null) => false,
                (a, b) => a.compare(b) == Some(Ordering::Equal),
            };
            equal == (op == CompareOp::Eq)
        }
        (None, CompareOp::Ne) => true,
        (None, _) => false,
        (Some(Value::Null), _) => false,
        (Some(actual), op) => actual.compare(expected).is_some_and(|o| op.holds(o)),
    }
}

fn contains(actual: Option<&Json>, expected: &Value) -> bool {
    match (actual.and_then(Json::as_str), expected.as_str()) {
        (Some(haystack), Some(needle)) => haystack.contains(needle),
        _ => false,
    }
}

fn operand_value<'a>(
    compiled: &'a CompiledPredicate,
    operand: &'a Operand,
) -> Result<&'a Value, MemoryProviderError> {
    match operand {
        Operand::Param(p) => compiled
            .params
            .get(p.slot)
            .ok_or(MemoryProviderError::UnknownParam(p.slot)),
        Operand::Literal(v) => Ok(v),
    }
}

/// Evaluate a compiled predicate against one row.
pub(crate) fn matches(
    compiled: &CompiledPredicate,
    row: &Json,
    loaded: &Loaded<'_>,
) -> Result<bool, MemoryProviderError> {
    eval(compiled, &compiled.predicate, row, &[], loaded)
}

fn eval(
    compiled: &CompiledPredicate,
    predicate: &Predicate,
    row: &Json,
    scope: &[String],
    loaded: &Loaded<'_>,
) -> Result<bool, MemoryProviderError> {
    match predicate {
        Predicate::Const(b) => Ok(*b),
        Predicate::Compare { field, op, operand: o } => {
            let expected = operand_value(compiled, o)?;
            let actual = lookup(row, field.segments(), scope, loaded)?;
            Ok(compare(actual, *op, expected))
        }
        Predicate::Contains { field, operand: o } => {
            let expected = operand_value(compiled, o)?;
            let actual = lookup(row, field.segments(), scope, loaded)?;
            Ok(contains(actual, expected))
        }
        Predicate::And(items) => {
            for item in items {
                if !eval(compiled, item, row, scope, loaded)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Predicate::Or(items) => {
            for item in items {
                if eval(compiled, item, row, scope, loaded)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Predicate::Any {
            collection,
            predicate,
        } => {
            let path = collection.segments();
            loaded.ensure(scope, path)?;
            let Some(Json::Array(elements)) = lookup(row, path, scope, loaded)? else {
                return Ok(false);
            };
            let inner_scope: Vec<String> = scope.iter().chain(path).cloned().collect();
            for element in elements {
                if eval(compiled, predicate, element, &inner_scope, loaded)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

/// Build the projected form of `row`.
pub(crate) fn project(
    projection: &ObjectProjection,
    row: &Json,
    loaded: &Loaded<'_>,
) -> Result<Json, MemoryProviderError> {
    project_object(projection, row, &[], loaded)
}

fn project_object(
    projection: &ObjectProjection,
    row: &Json,
    scope: &[String],
    loaded: &Loaded<'_>,
) -> Result<Json, MemoryProviderError> {
    let mut out = Map::new();
    for binding in &projection.bindings {
        let source = row.get(&binding.member).unwrap_or(&NULL);
        let value = match &binding.value {
            BindingValue::Scalar | BindingValue::Copy => source.clone(),
            BindingValue::Object(inner) => {
                let member = [binding.member.clone()];
                loaded.ensure(scope, &member)?;
                if source.is_null() {
                    Json::Null
                } else {
                    let inner_scope: Vec<String> = scope.iter().chain(&member).cloned().collect();
                    project_object(inner, source, &inner_scope, loaded)?
                }
            }
            BindingValue::Collection(inner) => {
                let member = [binding.member.clone()];
                loaded.ensure(scope, &member)?;
                match source {
                    Json::Array(elements) => {
                        let inner_scope: Vec<String> =
                            scope.iter().chain(&member).cloned().collect();
                        let projected = elements
                            .iter()
                            .map(|element| project_object(inner, element, &inner_scope, loaded))
                            .collect::<Result<Vec<_>, _>>()?;
                        Json::Array(projected)
                    }
                    _ => Json::Null,
                }
            }
        };
        out.insert(binding.member.clone(), value);
    }
    Ok(Json::Object(out))
}

/// Stable sort of `rows` by `keys`. Nulls sort first in ascending order.
pub(crate) fn sort(
    rows: Vec<Json>,
    keys: &[SortKey],
    loaded: &Loaded<'_>,
) -> Result<Vec<Json>, MemoryProviderError> {
    let mut keyed = rows
        .into_iter()
        .map(|row| -> Result<(Vec<Value>, Json), MemoryProviderError> {
            let values = keys
                .iter()
                .map(|key| -> Result<Value, MemoryProviderError> {
                    Ok(lookup(&row, key.path.segments(), &[], loaded)?
                        .and_then(|json| to_kind(json, key.kind))
                        .unwrap_or(Value::Null))
                })
                .collect::<Result<Vec<_>, MemoryProviderError>>()?;
            Ok((values, row))
        })
        .collect::<Result<Vec<_>, MemoryProviderError>>()?;

    keyed.sort_by(|(a, _), (b, _)| {
        for ((left, right), key) in a.iter().zip(b).zip(keys) {
            let ordering = match (left, right) {
                (Value::Null, Value::Null) => Ordering::Equal,
                (Value::Null, _) => Ordering::Less,
                (_, Value::Null) => Ordering::Greater,
                (l, r) => l.compare(r).unwrap_or(Ordering::Equal),
            };
            let ordering = match key.direction {
                OrderDirection::Asc => ordering,
                OrderDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}
