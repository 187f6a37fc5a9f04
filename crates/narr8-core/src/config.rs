//! Configuration management for narr8 services.
//!
//! Configuration is loaded from (in priority order):
//! 1. Environment variables (NARR8__ prefix, `__` separator)
//! 2. Config file (narr8.toml by default)
//! 3. Defaults

use serde::Deserialize;

use crate::error::Narr8Error;

/// Settings shared by the document builder and the CLI.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Narr8Config {
    /// Base URL prepended to every resource endpoint in document links.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Page size used when a request does not carry `page[size]`.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_api_url() -> String {
    "http://localhost:3000/".to_string()
}

fn default_page_size() -> usize {
    25
}

fn default_log_filter() -> String {
    "warn".to_string()
}

impl Default for Narr8Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            default_page_size: default_page_size(),
            log_filter: default_log_filter(),
        }
    }
}

impl Narr8Config {
    /// Load configuration from `<file_prefix>.{toml,yaml,json}` (optional)
    /// overlaid with `NARR8__*` environment variables.
    pub fn load(file_prefix: &str) -> Result<Self, Narr8Error> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(file_prefix).required(false))
            .add_source(
                config::Environment::with_prefix("NARR8")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), Narr8Error> {
        if self.default_page_size == 0 {
            return Err(Narr8Error::Config(
                "default_page_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Narr8Config::default();
        assert_eq!(config.api_url, "http://localhost:3000/");
        assert_eq!(config.default_page_size, 25);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("narr8.toml"),
            "api_url = \"https://api.narr8.test/\"\ndefault_page_size = 10\n",
        )
        .unwrap();

        let prefix = dir.path().join("narr8");
        let config = Narr8Config::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.api_url, "https://api.narr8.test/");
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.log_filter, "warn");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("absent");
        let config = Narr8Config::load(prefix.to_str().unwrap()).unwrap();
        assert_eq!(config.default_page_size, 25);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("narr8.toml"), "default_page_size = 0\n").unwrap();

        let prefix = dir.path().join("narr8");
        let err = Narr8Config::load(prefix.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, Narr8Error::Config(_)));
    }
}
