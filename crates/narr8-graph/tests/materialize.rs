//! Fan-out folding scenarios for the graph materializer.

use std::sync::Arc;

use narr8_core::{Entity, MemoryRow, Node, Relationship};
use narr8_graph::{GraphMaterializer, MapperContext, Schema, SchemaRegistry};

const CREATED: &str = "2024-03-01T12:00:00Z";

fn character_schema() -> Schema {
    Schema::new("character", |ctx| {
        Ok(ctx
            .entity()
            .with_property(ctx.properties, "name")
            .with_property(ctx.properties, "avatar"))
    })
    .with_endpoint("characters")
    .with_single_child("user")
    .with_multi_child("attribute")
}

fn attribute_schema() -> Schema {
    Schema::new("attribute", |ctx: &MapperContext<'_>| {
        let proficiency = ctx
            .parent_relationship("proficiency")
            .and_then(|rel| rel.property("proficiency").cloned())
            .unwrap_or_else(|| "Unskilled".into());
        Ok(ctx
            .entity()
            .with_property(ctx.properties, "name")
            .with_field("proficiency", proficiency))
    })
    .with_endpoint("attributes")
}

fn registry() -> Arc<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    registry.register(character_schema());
    registry.register(attribute_schema());
    registry.register(Schema::copying("user").with_endpoint("users"));
    Arc::new(registry)
}

fn character_node(id: &str) -> Node {
    Node::new("Character")
        .with_property("id", id)
        .with_property("name", "Ada")
        .with_property("createdAt", CREATED)
        .with_property("updatedAt", CREATED)
}

fn user_node(id: &str) -> Node {
    Node::new("User")
        .with_property("id", id)
        .with_property("name", "player")
        .with_property("discord", "1234")
        .with_property("createdAt", CREATED)
        .with_property("updatedAt", CREATED)
}

fn attribute_node(id: &str, name: &str) -> Node {
    Node::new("Attribute")
        .with_property("id", id)
        .with_property("name", name)
        .with_property("createdAt", CREATED)
        .with_property("updatedAt", CREATED)
}

fn fan_out_row(character: &str, attribute: (&str, &str), proficiency: Option<&str>) -> MemoryRow {
    let mut row = MemoryRow::new()
        .with_node("character", character_node(character))
        .with_node("character_user", user_node("u1"))
        .with_node("character_attribute", attribute_node(attribute.0, attribute.1));
    if let Some(p) = proficiency {
        row = row.with_relationship(
            "character_proficiency",
            Relationship::new("HAS_ATTRIBUTE").with_property("proficiency", p),
        );
    }
    row
}

fn scalars(entity: &Entity) -> (String, serde_json::Map<String, serde_json::Value>) {
    (entity.id.clone(), entity.fields.clone())
}

#[test]
fn test_character_fan_out_end_to_end() {
    let materializer = GraphMaterializer::new(registry());
    let rows = vec![
        fan_out_row("c1", ("a1", "strength"), Some("Trained")),
        fan_out_row("c1", ("a2", "agility"), None),
        fan_out_row("c1", ("a3", "occult"), Some("Expert")),
    ];

    let characters = materializer.create_graph_list(&character_schema(), &rows);
    assert_eq!(characters.len(), 1);

    let character = &characters[0];
    assert_eq!(character.id, "c1");
    assert_eq!(character.one("user").map(|u| u.id.as_str()), Some("u1"));

    let attributes = character.many("attribute");
    assert_eq!(attributes.len(), 3);
    let names: Vec<_> = attributes
        .iter()
        .map(|a| a.field("name").unwrap())
        .collect();
    assert_eq!(names, vec!["strength", "agility", "occult"]);
    assert_eq!(attributes[0].field("proficiency").unwrap(), "Trained");
    assert_eq!(attributes[1].field("proficiency").unwrap(), "Unskilled");
    assert_eq!(attributes[2].field("proficiency").unwrap(), "Expert");
}

#[test]
fn test_scalar_merge_is_idempotent_across_fan_out() {
    let materializer = GraphMaterializer::new(registry());
    let attributes = [("a1", "strength"), ("a2", "agility"), ("a3", "occult")];

    let single = materializer.create_graph_list(
        &character_schema(),
        &[fan_out_row("c1", attributes[0], None)],
    );

    // Repeat rows, including exact duplicates, to widen the fan-out.
    let mut rows = Vec::new();
    for round in 0..3 {
        for attribute in &attributes[..=round] {
            rows.push(fan_out_row("c1", *attribute, None));
        }
    }
    let many = materializer.create_graph_list(&character_schema(), &rows);

    assert_eq!(single.len(), 1);
    assert_eq!(many.len(), 1);
    assert_eq!(scalars(&single[0]), scalars(&many[0]));

    let ids: Vec<&str> = many[0]
        .many("attribute")
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(ids, vec!["a1", "a2", "a3"]);
}

#[test]
fn test_unknown_child_token_is_tolerated() {
    let mut registry = SchemaRegistry::new();
    let character = Schema::copying("character")
        .with_single_child("server")
        .with_multi_child("attribute");
    registry.register(character.clone());
    registry.register(Schema::copying("attribute"));
    let materializer = GraphMaterializer::new(Arc::new(registry));

    let rows = vec![MemoryRow::new()
        .with_node("character", character_node("c1"))
        .with_node("character_server", Node::new("Server").with_property("id", "s1"))
        .with_node("character_attribute", attribute_node("a1", "strength"))];

    let characters = materializer.create_graph_list(&character, &rows);
    assert_eq!(characters.len(), 1);
    assert!(characters[0].relation("server").is_none());
    assert_eq!(characters[0].many("attribute").len(), 1);
}

#[test]
fn test_multiple_roots_with_missing_children() {
    let materializer = GraphMaterializer::new(registry());
    let rows = vec![
        fan_out_row("c1", ("a1", "strength"), None),
        MemoryRow::new()
            .with_node("character", character_node("c2"))
            .with_null("character_user")
            .with_null("character_attribute"),
        fan_out_row("c1", ("a2", "agility"), None),
    ];

    let characters = materializer.create_graph_list(&character_schema(), &rows);
    assert_eq!(characters.len(), 2);
    assert_eq!(characters[0].id, "c1");
    assert_eq!(characters[0].many("attribute").len(), 2);
    assert_eq!(characters[1].id, "c2");
    assert!(characters[1].relation("user").is_none());
    assert!(characters[1].relation("attribute").is_none());
}

#[test]
fn test_root_type_nested_under_other_root_is_returned() {
    let materializer = GraphMaterializer::new(registry());
    let user = Schema::copying("user").with_multi_child("character");
    let rows = vec![
        MemoryRow::new()
            .with_node("user", user_node("u1"))
            .with_node("user_character", character_node("c1")),
        MemoryRow::new()
            .with_node("user", user_node("u1"))
            .with_node("user_character", character_node("c2")),
    ];

    let users = materializer.create_graph_list(&user, &rows);
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].many("character").len(), 2);

    let characters = materializer.create_graph_list(&character_schema(), &rows);
    assert!(characters.is_empty());
}
