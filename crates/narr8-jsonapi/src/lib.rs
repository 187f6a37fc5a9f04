//! narr8-jsonapi: Compound document builder for entity graphs.
//!
//! A [`JsonApiBuilder`] is created per request from the raw query string.
//! It serialises entities through per-type [`ResourceDescriptor`]s into a
//! [`Document`] with pagination links, sparse fieldsets, relationship
//! linkage, and an `included` set deduplicated by `(type, id)`.

pub mod builder;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod filters;
pub mod links;
pub mod pagination;

pub use builder::JsonApiBuilder;
pub use descriptor::{
    Accessor, DescriptorRegistry, KeyPath, RelationshipDescriptor, RelationshipKind,
    ResourceDescriptor,
};
pub use document::{
    Document, DocumentLinks, Linkage, PrimaryData, RelationshipLinks, RelationshipObject,
    ResourceIdentifier, ResourceLinks, ResourceObject,
};
pub use error::{AccessorError, JsonApiError};
pub use filters::QueryFilters;
pub use pagination::{Cursor, PageWindow};
