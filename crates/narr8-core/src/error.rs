use thiserror::Error;

/// Top-level error type for the narr8 pipeline.
#[derive(Error, Debug)]
pub enum Narr8Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for Narr8Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
