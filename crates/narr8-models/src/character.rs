//! Player characters: one owning user, many attributes.

use narr8_graph::Schema;
use narr8_jsonapi::{RelationshipDescriptor, ResourceDescriptor};

use crate::{attribute, user};

pub const TYPE: &str = "character";
pub const ENDPOINT: &str = "characters";

pub fn schema() -> Schema {
    Schema::new(TYPE, |ctx| {
        Ok(ctx
            .entity()
            .with_property(ctx.properties, "name")
            .with_property(ctx.properties, "avatar"))
    })
    .with_endpoint(ENDPOINT)
    .with_single_child(user::TYPE)
    .with_multi_child(attribute::TYPE)
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE)
        .with_endpoint(ENDPOINT)
        .with_field("name")
        .with_field("avatar")
        .with_relationship(RelationshipDescriptor::embedded(user::TYPE, user::TYPE).force_single())
        .with_relationship(RelationshipDescriptor::embedded(attribute::TYPE, attribute::TYPE))
}
