// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//! Schema registry.
//!
//! A [`SchemaRegistry`] is built once at startup and maps a fully-qualified
//! entity name to its field descriptors. Path resolution queries it by name;
//! nothing is discovered by introspection at query time.
//!
//! ## Type tokens
//!
//! Schema files describe field types with compact tokens:
//!
//! | Token | Meaning |
//! |---|---|
//! | `int32`, `string`, `timestamp`, ... | non-nullable scalar |
//! | `int32?` | nullable scalar |
//! | `shop.models.Order` | single-valued reference to a registered entity |
//! | `[shop.models.Order]` | collection of entities (or `[string]` for a scalar list) |
//!
//! Scalar tokens are matched case-insensitively and accept the usual aliases
//! (`int`, `long`, `datetime`, `uuid`, ...).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Scalar field kinds understood by value coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalarKind {
    Bool,
    Byte,
    SByte,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
    Timestamp,
    Guid,
    String,
}

impl ScalarKind {
    /// All scalar kinds in canonical order.
    pub const ALL: [ScalarKind; 12] = [
        ScalarKind::Bool,
        ScalarKind::Byte,
        ScalarKind::SByte,
        ScalarKind::Int16,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::Decimal,
        ScalarKind::Timestamp,
        ScalarKind::Guid,
        ScalarKind::String,
    ];

    /// Canonical lowercase token.
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Byte => "byte",
            ScalarKind::SByte => "sbyte",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
            ScalarKind::Decimal => "decimal",
            ScalarKind::Timestamp => "timestamp",
            ScalarKind::Guid => "guid",
            ScalarKind::String => "string",
        }
    }

    pub fn is_integral(self) -> bool {
        self.integral_range().is_some()
    }

    pub fn is_floating(self) -> bool {
        matches!(
            self,
            ScalarKind::Float | ScalarKind::Double | ScalarKind::Decimal
        )
    }

    /// Whether `<`, `<=`, `>`, `>=` are meaningful for this kind.
    pub fn is_ordered(self) -> bool {
        !matches!(self, ScalarKind::Bool | ScalarKind::Guid)
    }

    /// Inclusive value range of an integral kind.
    pub fn integral_range(self) -> Option<(i64, i64)> {
        match self {
            ScalarKind::Byte => Some((u8::MIN as i64, u8::MAX as i64)),
            ScalarKind::SByte => Some((i8::MIN as i64, i8::MAX as i64)),
            ScalarKind::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            ScalarKind::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            ScalarKind::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScalarKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bool" | "boolean" => Ok(ScalarKind::Bool),
            "byte" | "uint8" | "u8" => Ok(ScalarKind::Byte),
            "sbyte" | "int8" | "i8" => Ok(ScalarKind::SByte),
            "int16" | "short" | "i16" => Ok(ScalarKind::Int16),
            "int32" | "int" | "integer" | "i32" => Ok(ScalarKind::Int32),
            "int64" | "long" | "i64" => Ok(ScalarKind::Int64),
            "float" | "single" | "f32" => Ok(ScalarKind::Float),
            "double" | "f64" => Ok(ScalarKind::Double),
            "decimal" => Ok(ScalarKind::Decimal),
            "timestamp" | "datetime" | "datetimeoffset" => Ok(ScalarKind::Timestamp),
            "guid" | "uuid" => Ok(ScalarKind::Guid),
            "string" | "str" | "text" => Ok(ScalarKind::String),
            _ => Err(QueryError::UnknownScalarType(s.to_string())),
        }
    }
}

impl TryFrom<String> for ScalarKind {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScalarKind> for String {
    fn from(kind: ScalarKind) -> Self {
        kind.name().to_string()
    }
}

/// A scalar kind plus nullability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScalarType {
    pub kind: ScalarKind,
    pub nullable: bool,
}

impl ScalarType {
    pub fn required(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub fn nullable(kind: ScalarKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}?", self.kind)
        } else {
            write!(f, "{}", self.kind)
        }
    }
}

/// Declared type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Scalar(ScalarType),
    /// Reference to another registered entity.
    Entity(String),
    /// Finite sequence of the inner type.
    List(Box<FieldType>),
}

impl FieldType {
    /// Element type and whether the field is a collection.
    pub fn element(&self) -> (&FieldType, bool) {
        match self {
            FieldType::List(inner) => (inner.as_ref(), true),
            other => (other, false),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(ty) => write!(f, "{ty}"),
            FieldType::Entity(name) => f.write_str(name),
            FieldType::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

impl FromStr for FieldType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(QueryError::Schema("empty field type token".to_string()));
        }

        if let Some(inner) = token.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            let inner: FieldType = inner.parse()?;
            if matches!(inner, FieldType::List(_)) {
                return Err(QueryError::Schema(format!(
                    "nested list types are not supported: {token}"
                )));
            }
            return Ok(FieldType::List(Box::new(inner)));
        }

        if let Some(base) = token.strip_suffix('?') {
            let kind: ScalarKind = base.parse()?;
            return Ok(FieldType::Scalar(ScalarType::nullable(kind)));
        }

        if let Ok(kind) = token.parse::<ScalarKind>() {
            return Ok(FieldType::Scalar(ScalarType::required(kind)));
        }

        if token.chars().any(|c| c.is_whitespace() || c == ',' || c == '[' || c == ']') {
            return Err(QueryError::UnknownScalarType(token.to_string()));
        }

        // Anything else names an entity; `SchemaRegistry::validate` decides
        // whether it exists.
        Ok(FieldType::Entity(token.to_string()))
    }
}

impl TryFrom<String> for FieldType {
    type Error = QueryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

/// One field of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
}

/// An entity type and its fields, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    /// Fully-qualified type name (e.g. `shop.models.Customer`).
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Look up a field by exact name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
        });
        self
    }

    pub fn scalar(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.with_field(name, FieldType::Scalar(ScalarType::required(kind)))
    }

    pub fn nullable(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.with_field(name, FieldType::Scalar(ScalarType::nullable(kind)))
    }

    /// Single-valued navigation to `entity`.
    pub fn reference(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.with_field(name, FieldType::Entity(entity.into()))
    }

    /// Collection-valued navigation to `entity`.
    pub fn collection(self, name: impl Into<String>, entity: impl Into<String>) -> Self {
        self.with_field(
            name,
            FieldType::List(Box::new(FieldType::Entity(entity.into()))),
        )
    }

    pub fn scalar_list(self, name: impl Into<String>, kind: ScalarKind) -> Self {
        self.with_field(
            name,
            FieldType::List(Box::new(FieldType::Scalar(ScalarType::required(kind)))),
        )
    }
}

/// On-disk form of a registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(default)]
    pub model_namespace: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntitySchema>,
}

/// Immutable map from entity type name to its schema.
///
/// Entities whose name starts with the model namespace are *model types*:
/// fields referring to them are navigations and are eager-loaded. Registered
/// entities outside the namespace are treated as opaque values. Without a
/// namespace every registered entity is a model type.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    model_namespace: Option<String>,
    entities: BTreeMap<String, EntitySchema>,
}

impl SchemaRegistry {
    /// Start building a registry whose model types live under `namespace`.
    pub fn builder(namespace: impl Into<String>) -> RegistryBuilder {
        RegistryBuilder {
            namespace: Some(namespace.into()),
            entities: Vec::new(),
        }
    }

    pub fn from_document(doc: SchemaDocument) -> Result<Self, QueryError> {
        let mut builder = RegistryBuilder {
            namespace: doc.model_namespace,
            entities: Vec::new(),
        };
        for entity in doc.entities {
            builder = builder.entity(entity);
        }
        builder.build()
    }

    /// Load and validate a registry from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, QueryError> {
        let doc: SchemaDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    pub fn to_document(&self) -> SchemaDocument {
        SchemaDocument {
            model_namespace: self.model_namespace.clone(),
            entities: self.entities.values().cloned().collect(),
        }
    }

    pub fn model_namespace(&self) -> Option<&str> {
        self.model_namespace.as_deref()
    }

    pub fn entity(&self, name: &str) -> Result<&EntitySchema, QueryError> {
        self.entities
            .get(name)
            .ok_or_else(|| QueryError::UnknownEntity(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    fn in_namespace(&self, name: &str) -> bool {
        match self.model_namespace.as_deref() {
            Some(ns) if !ns.is_empty() => name.starts_with(ns),
            _ => true,
        }
    }

    /// Whether `name` is a registered entity inside the model namespace.
    pub fn is_model_type(&self, name: &str) -> bool {
        self.contains(name) && self.in_namespace(name)
    }

    fn validate(&self) -> Result<(), QueryError> {
        for entity in self.entities.values() {
            let mut seen = HashSet::new();
            for field in &entity.fields {
                if field.name.is_empty()
                    || field
                        .name
                        .chars()
                        .any(|c| c == '.' || c == ',' || c.is_whitespace())
                {
                    return Err(QueryError::Schema(format!(
                        "invalid field name '{}' on '{}'",
                        field.name, entity.name
                    )));
                }
                if !seen.insert(field.name.as_str()) {
                    return Err(QueryError::Schema(format!(
                        "duplicate field '{}' on '{}'",
                        field.name, entity.name
                    )));
                }
                let (element, _) = field.ty.element();
                if let FieldType::Entity(target) = element {
                    if self.contains(target) {
                        continue;
                    }
                    // Unregistered model names are missing entities; anything
                    // else is a type token nobody recognised.
                    return Err(if self.in_namespace(target) {
                        QueryError::UnknownEntity(target.clone())
                    } else {
                        QueryError::UnknownScalarType(target.clone())
                    });
                }
            }
        }
        Ok(())
    }
}

/// Collects entities and validates cross references on [`build`](Self::build).
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    namespace: Option<String>,
    entities: Vec<EntitySchema>,
}

impl RegistryBuilder {
    /// Builder without a model namespace.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntitySchema) -> Self {
        self.entities.push(entity);
        self
    }

    pub fn build(self) -> Result<SchemaRegistry, QueryError> {
        let mut entities = BTreeMap::new();
        for entity in self.entities {
            if entity.name.is_empty() {
                return Err(QueryError::Schema("entity with empty name".to_string()));
            }
            let name = entity.name.clone();
            if entities.insert(name.clone(), entity).is_some() {
                return Err(QueryError::Schema(format!("duplicate entity '{name}'")));
            }
        }
        let registry = SchemaRegistry {
            model_namespace: self.namespace,
            entities,
        };
        registry.validate()?;
        Ok(registry)
    }
}
