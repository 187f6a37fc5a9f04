//! Discord servers (guilds) hosting a game.

use narr8_graph::Schema;
use narr8_jsonapi::ResourceDescriptor;

pub const TYPE: &str = "server";
pub const ENDPOINT: &str = "servers";

pub fn schema() -> Schema {
    Schema::new(TYPE, |ctx| {
        Ok(ctx
            .entity()
            .with_property(ctx.properties, "discord")
            .with_property(ctx.properties, "name"))
    })
    .with_endpoint(ENDPOINT)
}

pub fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE)
        .with_endpoint(ENDPOINT)
        .with_field("discord")
        .with_field("name")
}
