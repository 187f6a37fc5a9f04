//! Error types for the narr8-jsonapi crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonApiError {
    #[error("{resource_type} not found")]
    NotFound { resource_type: String },

    #[error("No descriptor registered for resource type {resource_type}")]
    UnknownResource { resource_type: String },

    #[error("Relationship {relationship} on {resource_type} could not be resolved: {reason}")]
    RelationshipResolution {
        resource_type: String,
        relationship: String,
        reason: String,
    },

    #[error("Invalid link base {base}: {source}")]
    InvalidUrl {
        base: String,
        #[source]
        source: url::ParseError,
    },
}

pub type Result<T> = std::result::Result<T, JsonApiError>;

/// Failure of a computed attribute, meta, or relationship accessor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessorError {
    #[error("Field {0} is not present")]
    MissingField(String),

    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_errors_render_their_cause() {
        assert_eq!(
            AccessorError::MissingField("rank".into()).to_string(),
            "Field rank is not present"
        );
        assert_eq!(AccessorError::Failed("timeout".into()).to_string(), "timeout");
    }
}
