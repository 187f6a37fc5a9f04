//! Character attributes.
//!
//! An attribute node is shared between characters; how well a given
//! character masters it lives on the `HAS_ATTRIBUTE` edge, returned by the
//! query in the `<parentAlias>_proficiency` column.

use narr8_core::entity::scalar_to_string;
use narr8_graph::{MapperContext, Schema};
use narr8_jsonapi::ResourceDescriptor;
use serde_json::Value;

pub const TYPE: &str = "attribute";
pub const ENDPOINT: &str = "attributes";

/// Edge type carrying the proficiency.
pub const RELATIONSHIP_TYPE: &str = "HAS_ATTRIBUTE";

pub const DEFAULT_PROFICIENCY: &str = "Unskilled";

pub fn schema() -> Schema {
    Schema::new(TYPE, |ctx| {
        Ok(ctx
            .entity()
            .with_property(ctx.properties, "name")
            .with_field("proficiency", proficiency(ctx)))
    })
    .with_endpoint(ENDPOINT)
}

/// Proficiency from the parent's `HAS_ATTRIBUTE` edge in this row.
///
/// Numbers are rendered as strings. Missing, null, empty, or zero values
/// fall back to [`DEFAULT_PROFICIENCY`].
pub fn proficiency(ctx: &MapperContext<'_>) -> String {
    ctx.parent_relationship("proficiency")
        .filter(|rel| rel.rel_type == RELATIONSHIP_TYPE)
        .and_then(|rel| rel.property("proficiency"))
        .filter(|value| !is_blank(value))
        .and_then(scalar_to_string)
        .unwrap_or_else(|| DEFAULT_PROFICIENCY.to_string())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE)
        .with_endpoint(ENDPOINT)
        .with_field("name")
        .with_field("proficiency")
}
