// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Predicate IR and its assembly from a filter tree.
//!
//! A [`Predicate`] is provider-neutral: member paths are relative to the
//! current scope (the query root, or the element of the innermost
//! [`Predicate::Any`]). Coerced literals normally live in the
//! [`CompiledPredicate::params`] table and are referenced by slot, so two
//! queries that differ only in their literal values produce the same
//! predicate and the same [`CompiledPredicate::shape_fingerprint`].
//!
//! ## Operator lowering
//!
//! | Operator | Lowered to |
//! |---|---|
//! | `Contains` | `Contains(f, v)` |
//! | `Equal` .. `LessEqual`, `NotEqual` | `Compare(f, op, v)` |
//! | `InWithEqual` | `Or[Compare(f, =, v_i) ...]` |
//! | `InWithContains` | `Or[Contains(f, v_i) ...]` |
//! | `Between lo,hi` | `And[f >= lo, f >= hi]` |
//!
//! `Between` compares *both* bounds with `>=`. Callers depend on this exact
//! behaviour, so it is kept and covered by tests.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::condition::{Combinator, Operator};
use crate::error::QueryError;
use crate::schema::{ScalarKind, ScalarType};
use crate::tree::{FieldNode, FieldTree, LeafCondition, ScalarField};
use crate::value::{coerce, Value};

/// Typed comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Apply to the result of [`Value::compare`].
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            CompareOp::Eq => ordering == Equal,
            CompareOp::Ne => ordering != Equal,
            CompareOp::Gt => ordering == Greater,
            CompareOp::Ge => ordering != Less,
            CompareOp::Lt => ordering == Less,
            CompareOp::Le => ordering != Greater,
        }
    }
}

/// Member access chain relative to the current scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberPath(pub Vec<String>);

impl MemberPath {
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Reference to a slot in [`CompiledPredicate::params`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParamRef {
    pub slot: usize,
    /// Declared kind of the compared field.
    pub kind: ScalarKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Operand {
    Param(ParamRef),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Predicate {
    Const(bool),
    Compare {
        field: MemberPath,
        op: CompareOp,
        operand: Operand,
    },
    /// Substring test on a string field.
    Contains { field: MemberPath, operand: Operand },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Some element of `collection` satisfies `predicate`; paths inside are
    /// relative to the element.
    Any {
        collection: MemberPath,
        predicate: Box<Predicate>,
    },
}

impl Predicate {
    fn join(mut preds: Vec<Predicate>, combinator: Combinator) -> Predicate {
        if preds.len() == 1 {
            return preds.remove(0);
        }
        match combinator {
            Combinator::And => Predicate::And(preds),
            Combinator::Or => Predicate::Or(preds),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Param(p) => write!(f, "${}", p.slot),
            Operand::Literal(v) => write!(f, "{v}"),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, items: &[Predicate], sep: &str) -> fmt::Result {
            write!(f, "(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, " {sep} ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ")")
        }

        match self {
            Predicate::Const(b) => write!(f, "{b}"),
            Predicate::Compare { field, op, operand } => {
                write!(f, "{field} {} {operand}", op.symbol())
            }
            Predicate::Contains { field, operand } => write!(f, "{field} CONTAINS {operand}"),
            Predicate::And(items) => list(f, items, "AND"),
            Predicate::Or(items) => list(f, items, "OR"),
            Predicate::Any {
                collection,
                predicate,
            } => write!(f, "ANY {collection} ({predicate})"),
        }
    }
}

/// A predicate plus the parameter values it refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledPredicate {
    /// Root entity the member paths start from.
    pub entity: String,
    pub predicate: Predicate,
    pub params: Vec<Value>,
}

impl CompiledPredicate {
    /// Value behind an operand, resolving parameter slots.
    pub fn operand_value<'a>(&'a self, operand: &'a Operand) -> Option<&'a Value> {
        match operand {
            Operand::Param(p) => self.params.get(p.slot),
            Operand::Literal(v) => Some(v),
        }
    }

    /// SHA-256 of the predicate shape with parameter values erased.
    pub fn shape_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.entity.as_bytes());
        hasher.update(b"|");
        hasher.update(self.predicate.to_string().as_bytes());
        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

/// Turns a filter tree into a [`CompiledPredicate`].
#[derive(Debug)]
pub struct PredicateAssembler {
    combinator: Combinator,
    parameterize: bool,
    params: Vec<Value>,
}

impl PredicateAssembler {
    pub fn new(combinator: Combinator, parameterize: bool) -> Self {
        Self {
            combinator,
            parameterize,
            params: Vec::new(),
        }
    }

    /// Assemble the tree; a tree without leaves yields `None`.
    pub fn assemble(
        mut self,
        entity: &str,
        tree: &FieldTree<LeafCondition>,
    ) -> Result<Option<CompiledPredicate>, QueryError> {
        let preds = self.nodes(tree.nodes(), &[])?;
        if preds.is_empty() {
            return Ok(None);
        }
        let compiled = CompiledPredicate {
            entity: entity.to_string(),
            predicate: Predicate::join(preds, self.combinator),
            params: self.params,
        };
        debug!(
            entity,
            predicate = %compiled.predicate,
            params = compiled.params.len(),
            "predicate assembled"
        );
        Ok(Some(compiled))
    }

    fn nodes(
        &mut self,
        nodes: &[FieldNode<LeafCondition>],
        prefix: &[String],
    ) -> Result<Vec<Predicate>, QueryError> {
        let mut preds = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                FieldNode::Scalar(leaf) => {
                    let mut path = prefix.to_vec();
                    path.push(leaf.name.clone());
                    preds.push(self.leaf(leaf, MemberPath(path))?);
                }
                FieldNode::Navigation(nav) => {
                    let mut path = prefix.to_vec();
                    path.push(nav.name.clone());
                    let children = self.nodes(&nav.children, &path)?;
                    if !children.is_empty() {
                        preds.push(Predicate::join(children, self.combinator));
                    }
                }
                FieldNode::Collection(nav) => {
                    let children = self.nodes(&nav.children, &[])?;
                    if !children.is_empty() {
                        let mut path = prefix.to_vec();
                        path.push(nav.name.clone());
                        preds.push(Predicate::Any {
                            collection: MemberPath(path),
                            predicate: Box::new(Predicate::join(children, self.combinator)),
                        });
                    }
                }
            }
        }
        Ok(preds)
    }

    fn leaf(
        &mut self,
        leaf: &ScalarField<LeafCondition>,
        field: MemberPath,
    ) -> Result<Predicate, QueryError> {
        let ty = match leaf.ty.scalar() {
            Some(ty) if !leaf.is_collection => ty,
            _ => {
                return Err(QueryError::not_comparable(
                    field.to_string(),
                    "only scalar fields can be filtered",
                ))
            }
        };
        let LeafCondition { operator, value } = &leaf.payload;

        let compare = |this: &mut Self, op: CompareOp| -> Result<Predicate, QueryError> {
            let operand = this.operand(coerce(value, ty)?, ty.kind);
            Ok(Predicate::Compare {
                field: field.clone(),
                op,
                operand,
            })
        };

        match operator {
            Operator::Equal => compare(self, CompareOp::Eq),
            Operator::NotEqual => compare(self, CompareOp::Ne),
            Operator::Greater
            | Operator::GreaterEqual
            | Operator::Less
            | Operator::LessEqual => {
                if !ty.kind.is_ordered() {
                    return Err(QueryError::not_comparable(
                        field.to_string(),
                        "field type has no ordering",
                    ));
                }
                let op = match operator {
                    Operator::Greater => CompareOp::Gt,
                    Operator::GreaterEqual => CompareOp::Ge,
                    Operator::Less => CompareOp::Lt,
                    _ => CompareOp::Le,
                };
                compare(self, op)
            }
            Operator::Contains => {
                require_string(&field, ty)?;
                let operand = self.operand(coerce(value, ty)?, ty.kind);
                Ok(Predicate::Contains {
                    field: field.clone(),
                    operand,
                })
            }
            Operator::InWithEqual => {
                let mut alternatives = Vec::new();
                for item in value.split(',') {
                    let operand = self.operand(coerce(item, ty)?, ty.kind);
                    alternatives.push(Predicate::Compare {
                        field: field.clone(),
                        op: CompareOp::Eq,
                        operand,
                    });
                }
                Ok(Predicate::Or(alternatives))
            }
            Operator::InWithContains => {
                require_string(&field, ty)?;
                let mut alternatives = Vec::new();
                for item in value.split(',') {
                    let operand = self.operand(coerce(item, ty)?, ty.kind);
                    alternatives.push(Predicate::Contains {
                        field: field.clone(),
                        operand,
                    });
                }
                Ok(Predicate::Or(alternatives))
            }
            Operator::Between => {
                if !(ty.kind.is_integral() || ty.kind.is_floating()) {
                    return Err(QueryError::not_comparable(
                        field.to_string(),
                        "Between needs a numeric field",
                    ));
                }
                let (lo, hi) = parse_between(value)?;
                let bound = |b: i64| {
                    if ty.kind.is_floating() {
                        Value::Float(b as f64)
                    } else {
                        Value::Int(b)
                    }
                };
                let lo = self.operand(bound(lo), ty.kind);
                let hi = self.operand(bound(hi), ty.kind);
                Ok(Predicate::And(vec![
                    Predicate::Compare {
                        field: field.clone(),
                        op: CompareOp::Ge,
                        operand: lo,
                    },
                    Predicate::Compare {
                        field: field.clone(),
                        op: CompareOp::Ge,
                        operand: hi,
                    },
                ]))
            }
        }
    }

    fn operand(&mut self, value: Value, kind: ScalarKind) -> Operand {
        if self.parameterize {
            self.params.push(value);
            Operand::Param(ParamRef {
                slot: self.params.len() - 1,
                kind,
            })
        } else {
            Operand::Literal(value)
        }
    }
}

fn require_string(field: &MemberPath, ty: ScalarType) -> Result<(), QueryError> {
    if ty.kind == ScalarKind::String {
        Ok(())
    } else {
        Err(QueryError::not_comparable(
            field.to_string(),
            "substring match needs a string field",
        ))
    }
}

/// Parse the `lo,hi` argument of `Between`.
pub fn parse_between(value: &str) -> Result<(i64, i64), QueryError> {
    let invalid = || QueryError::InvalidBetweenArguments(value.to_string());
    let mut parts = value.split(',');
    let (Some(lo), Some(hi), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(invalid());
    };
    let lo = lo.trim().parse().map_err(|_| invalid())?;
    let hi = hi.trim().parse().map_err(|_| invalid())?;
    Ok((lo, hi))
}
