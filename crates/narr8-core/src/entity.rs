//! Materialized entities.
//!
//! An entity is built from one node plus its resolved children. Scalar
//! values live in `fields`; children live in `relations`, keyed by the
//! child's type name. Children are shared through `Arc`, so one identity
//! maps to one allocation across the whole graph.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::Properties;

/// An application-level value object.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Type name of the schema that produced this entity.
    #[serde(skip)]
    pub type_name: String,
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_count: Option<i64>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub relations: BTreeMap<String, Relation>,
}

/// A resolved child relation.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Relation {
    One(Arc<Entity>),
    Many(Vec<Arc<Entity>>),
}

impl Relation {
    /// True for a `Many` relation without elements.
    pub fn is_empty(&self) -> bool {
        matches!(self, Relation::Many(items) if items.is_empty())
    }

    pub fn as_one(&self) -> Option<&Entity> {
        match self {
            Relation::One(entity) => Some(entity),
            Relation::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Arc<Entity>]> {
        match self {
            Relation::One(_) => None,
            Relation::Many(items) => Some(items),
        }
    }
}

impl Entity {
    /// Build the common envelope (`id`, `createdAt`, `updatedAt`,
    /// `recordCount`) from node properties.
    ///
    /// Missing timestamps default to the current time.
    pub fn from_properties(type_name: impl Into<String>, properties: &Properties) -> Self {
        let now = Utc::now();
        Self {
            type_name: type_name.into(),
            id: properties
                .get("id")
                .and_then(scalar_to_string)
                .unwrap_or_default(),
            created_at: properties
                .get("createdAt")
                .and_then(parse_timestamp)
                .unwrap_or(now),
            updated_at: properties
                .get("updatedAt")
                .and_then(parse_timestamp)
                .unwrap_or(now),
            record_count: properties.get("recordCount").and_then(Value::as_i64),
            fields: Map::new(),
            relations: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Copy `name` from `properties` when present and not null.
    pub fn with_property(mut self, properties: &Properties, name: &str) -> Self {
        if let Some(value) = properties.get(name).filter(|v| !v.is_null()) {
            self.fields.insert(name.to_string(), value.clone());
        }
        self
    }

    /// Read a field by its wire name.
    ///
    /// The envelope keys resolve to their typed values; everything else is
    /// looked up in `fields`. Absent fields and relations yield `None`.
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "createdAt" => Some(Value::String(self.created_at.to_rfc3339())),
            "updatedAt" => Some(Value::String(self.updated_at.to_rfc3339())),
            "recordCount" => self.record_count.map(Value::from),
            _ => self.fields.get(name).cloned(),
        }
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// The single child stored under `name`, if any.
    pub fn one(&self, name: &str) -> Option<&Entity> {
        self.relation(name).and_then(Relation::as_one)
    }

    /// The children stored under `name`; empty when absent.
    pub fn many(&self, name: &str) -> &[Arc<Entity>] {
        self.relation(name)
            .and_then(Relation::as_many)
            .unwrap_or_default()
    }

    /// Assign a single child, replacing any previous value.
    pub fn set_one(&mut self, name: impl Into<String>, child: Arc<Entity>) {
        self.relations.insert(name.into(), Relation::One(child));
    }

    /// Append a child unless one with the same id is already present.
    ///
    /// Returns whether the child was appended.
    pub fn push_unique(&mut self, name: impl Into<String>, child: Arc<Entity>) -> bool {
        let relation = self
            .relations
            .entry(name.into())
            .or_insert_with(|| Relation::Many(Vec::new()));

        if let Relation::One(existing) = relation {
            let existing = existing.clone();
            *relation = Relation::Many(vec![existing]);
        }

        match relation {
            Relation::Many(items) => {
                if items.iter().any(|item| item.id == child.id) {
                    return false;
                }
                items.push(child);
                true
            }
            Relation::One(_) => false,
        }
    }
}

/// Render a scalar identity value as a string.
///
/// Strings are taken as-is and numbers are formatted; every other JSON
/// type yields `None`.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
