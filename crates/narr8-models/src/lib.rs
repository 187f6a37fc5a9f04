//! narr8-models: The game's entity types.
//!
//! Each module exposes its type name and endpoint, the materialization
//! [`Schema`](narr8_graph::Schema), and the JSON:API
//! [`ResourceDescriptor`](narr8_jsonapi::ResourceDescriptor).

use std::sync::Arc;

use narr8_graph::SchemaRegistry;
use narr8_jsonapi::DescriptorRegistry;

pub mod attribute;
pub mod character;
pub mod server;
pub mod user;

/// Register every model's schema and descriptor.
pub fn register_all(schemas: &mut SchemaRegistry, descriptors: &mut DescriptorRegistry) {
    schemas.register(user::schema());
    schemas.register(server::schema());
    schemas.register(attribute::schema());
    schemas.register(character::schema());

    descriptors.register(user::descriptor());
    descriptors.register(server::descriptor());
    descriptors.register(attribute::descriptor());
    descriptors.register(character::descriptor());

    tracing::debug!(
        schemas = schemas.len(),
        descriptors = descriptors.len(),
        "Registered narr8 models"
    );
}

/// Fresh, fully populated registries.
pub fn registries() -> (Arc<SchemaRegistry>, Arc<DescriptorRegistry>) {
    let mut schemas = SchemaRegistry::new();
    let mut descriptors = DescriptorRegistry::new();
    register_all(&mut schemas, &mut descriptors);
    (Arc::new(schemas), Arc::new(descriptors))
}
