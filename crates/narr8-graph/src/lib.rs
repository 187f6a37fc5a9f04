//! narr8-graph: Entity graph materialization from flat query rows.
//!
//! Graph queries return denormalized rows: a parent column repeats once per
//! joined child. This crate folds those rows back into a deduplicated object
//! graph, guided by a per-type [`Schema`] looked up by name in a
//! [`SchemaRegistry`].

pub mod error;
pub mod materializer;
pub mod schema;

pub use error::MaterializeError;
pub use materializer::GraphMaterializer;
pub use schema::{MapperContext, Schema, SchemaRegistry};
