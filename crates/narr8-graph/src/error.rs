//! Error types for the narr8-graph crate.
//!
//! None of these abort a materialization: the affected row fragment is
//! logged and skipped.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaterializeError {
    #[error("Malformed identity on {label} node in column {alias}: {value}")]
    MalformedIdentity {
        label: String,
        alias: String,
        value: String,
    },

    #[error("Missing property {property} for {type_name} in column {alias}")]
    MissingProperty {
        type_name: String,
        alias: String,
        property: String,
    },

    #[error("Mapper for {type_name} failed: {reason}")]
    Mapper { type_name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MaterializeError>;
