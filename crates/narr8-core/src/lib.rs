//! narr8-core: Shared building blocks for the narr8 graph shaping pipeline.
//!
//! This crate provides the foundational types used across all narr8 components:
//! - The row abstraction (nodes, relationships, named columns) read from graph queries
//! - Materialized entities and their single/multi relations
//! - A string-keyed registry for late-bound type lookup
//! - Configuration management
//! - Common error types

pub mod config;
pub mod entity;
pub mod error;
pub mod registry;
pub mod types;

pub use config::Narr8Config;
pub use entity::{Entity, Relation};
pub use error::Narr8Error;
pub use registry::{Registered, Registry};
pub use types::{ColumnValue, MemoryRow, Node, Properties, Relationship, Row};
