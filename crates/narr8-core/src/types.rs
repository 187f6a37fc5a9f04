//! Row abstraction for graph query results.
//!
//! A row is one tuple returned by a graph query. Each named column holds a
//! node, a relationship, or nothing. Fan-out joins repeat parent columns
//! across several rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Scalar properties carried by nodes and relationships.
pub type Properties = Map<String, Value>;

// ── Graph Values ──────────────────────────────────────────────────

/// A labeled, property-bearing vertex read from a query result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub label: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// A labeled, property-bearing edge read from a query result.
///
/// Used for edge-local attributes that belong to neither endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub rel_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Relationship {
    pub fn new(rel_type: impl Into<String>) -> Self {
        Self {
            rel_type: rel_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }
}

/// The value held by a present column.
///
/// On the wire a column is `null`, `{"node": {...}}` or
/// `{"relationship": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<TaggedColumn>", into = "Option<TaggedColumn>")]
pub enum ColumnValue {
    Null,
    Node(Node),
    Relationship(Relationship),
}

/// Wire form of a non-null column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaggedColumn {
    Node(Node),
    Relationship(Relationship),
}

impl From<Option<TaggedColumn>> for ColumnValue {
    fn from(value: Option<TaggedColumn>) -> Self {
        match value {
            None => ColumnValue::Null,
            Some(TaggedColumn::Node(n)) => ColumnValue::Node(n),
            Some(TaggedColumn::Relationship(r)) => ColumnValue::Relationship(r),
        }
    }
}

impl From<ColumnValue> for Option<TaggedColumn> {
    fn from(value: ColumnValue) -> Self {
        match value {
            ColumnValue::Null => None,
            ColumnValue::Node(n) => Some(TaggedColumn::Node(n)),
            ColumnValue::Relationship(r) => Some(TaggedColumn::Relationship(r)),
        }
    }
}

// ── Rows ──────────────────────────────────────────────────────────

/// One result tuple of named columns.
///
/// `get` distinguishes an absent column (`None`) from a column that is
/// present but null (`Some(ColumnValue::Null)`).
pub trait Row {
    /// Column names carried by this row.
    fn columns(&self) -> Vec<&str>;

    /// Value at `column`, or `None` when the row has no such column.
    fn get(&self, column: &str) -> Option<&ColumnValue>;

    fn has(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// The node at `column`; `None` for absent, null, or relationship columns.
    fn node(&self, column: &str) -> Option<&Node> {
        match self.get(column) {
            Some(ColumnValue::Node(node)) => Some(node),
            _ => None,
        }
    }

    /// The relationship at `column`; `None` for absent, null, or node columns.
    fn relationship(&self, column: &str) -> Option<&Relationship> {
        match self.get(column) {
            Some(ColumnValue::Relationship(rel)) => Some(rel),
            _ => None,
        }
    }
}

/// An owned, in-memory row. Deserializes from a JSON object of
/// column name to column value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryRow {
    columns: BTreeMap<String, ColumnValue>,
}

impl MemoryRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ColumnValue) {
        self.columns.insert(column.into(), value);
    }

    pub fn with_node(mut self, column: impl Into<String>, node: Node) -> Self {
        self.insert(column, ColumnValue::Node(node));
        self
    }

    pub fn with_relationship(mut self, column: impl Into<String>, rel: Relationship) -> Self {
        self.insert(column, ColumnValue::Relationship(rel));
        self
    }

    pub fn with_null(mut self, column: impl Into<String>) -> Self {
        self.insert(column, ColumnValue::Null);
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Row for MemoryRow {
    fn columns(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    fn get(&self, column: &str) -> Option<&ColumnValue> {
        self.columns.get(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absent_and_null_columns_differ() {
        let row = MemoryRow::new()
            .with_null("character_user")
            .with_node("character", Node::new("Character").with_property("id", "c1"));

        assert!(row.get("missing").is_none());
        assert_eq!(row.get("character_user"), Some(&ColumnValue::Null));
        assert!(row.has("character_user"));
        assert!(row.node("character_user").is_none());
        assert_eq!(
            row.node("character").and_then(|n| n.property("id")),
            Some(&json!("c1"))
        );
    }

    #[test]
    fn row_deserializes_tagged_columns() {
        let raw = json!({
            "character": {"node": {"label": "Character", "properties": {"id": "c1"}}},
            "character_proficiency": {"relationship": {"type": "HAS_ATTRIBUTE", "properties": {"proficiency": 2}}},
            "character_user": null
        });

        let row: MemoryRow = serde_json::from_value(raw).unwrap();
        assert_eq!(row.len(), 3);
        assert_eq!(row.node("character").unwrap().label, "Character");
        assert_eq!(
            row.relationship("character_proficiency").unwrap().rel_type,
            "HAS_ATTRIBUTE"
        );
        assert_eq!(row.get("character_user"), Some(&ColumnValue::Null));
        assert_eq!(
            row.columns(),
            vec!["character", "character_proficiency", "character_user"]
        );
    }

    #[test]
    fn relationship_column_is_not_a_node() {
        let row = MemoryRow::new().with_relationship(
            "character_proficiency",
            Relationship::new("HAS_ATTRIBUTE").with_property("proficiency", "Trained"),
        );
        assert!(row.node("character_proficiency").is_none());
        assert!(row.relationship("character_proficiency").is_some());
    }
}
