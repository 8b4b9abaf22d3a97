//! Configuration for the context and memory layer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PalaverError, PalaverResult};

/// Configuration consumed by the context manager and memory engine.
///
/// Values are immutable per manager instance once a manager is constructed
/// from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of turns retained per conversation.
    pub max_messages: usize,
    /// Idle minutes after which a conversation expires.
    pub expiry_minutes: i64,
    /// Advisory token budget for memory strategies.
    pub max_token_limit: usize,
    /// Name of the memory strategy to use.
    pub memory_type: String,
    /// Path to the durable store file.
    pub store_path: PathBuf,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_messages: 10,
            expiry_minutes: 60,
            max_token_limit: 1000,
            memory_type: "summary_buffer".to_string(),
            store_path: PathBuf::from("memory_store.json"),
        }
    }
}

impl ContextConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> PalaverResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| PalaverError::Configuration(e.to_string()))
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| PalaverError::Configuration(e.to_string())),
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| PalaverError::Configuration(e.to_string())),
            _ => Err(PalaverError::Configuration(
                "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("MAX_CONTEXT_MESSAGES") {
            config.max_messages = n;
        }
        if let Some(n) = env_parse::<i64>("CONTEXT_EXPIRY_MINUTES") {
            config.expiry_minutes = n;
        }
        if let Some(n) = env_parse::<usize>("MAX_TOKEN_LIMIT") {
            config.max_token_limit = n;
        }
        if let Ok(name) = std::env::var("MEMORY_TYPE") {
            config.memory_type = name;
        }
        if let Ok(path) = std::env::var("MEMORY_STORE_PATH") {
            config.store_path = PathBuf::from(path);
        }

        config
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> ContextConfigBuilder {
        ContextConfigBuilder::default()
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

/// Builder for [`ContextConfig`].
#[derive(Default)]
pub struct ContextConfigBuilder {
    config: ContextConfig,
}

impl ContextConfigBuilder {
    /// Set the per-conversation turn cap.
    pub fn max_messages(mut self, max: usize) -> Self {
        self.config.max_messages = max;
        self
    }

    /// Set the idle expiry in minutes.
    pub fn expiry_minutes(mut self, minutes: i64) -> Self {
        self.config.expiry_minutes = minutes;
        self
    }

    /// Set the advisory token budget.
    pub fn max_token_limit(mut self, limit: usize) -> Self {
        self.config.max_token_limit = limit;
        self
    }

    /// Set the memory strategy name.
    pub fn memory_type(mut self, name: impl Into<String>) -> Self {
        self.config.memory_type = name.into();
        self
    }

    /// Set the durable store file path.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ContextConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.max_messages, 10);
        assert_eq!(config.expiry_minutes, 60);
        assert_eq!(config.max_token_limit, 1000);
        assert_eq!(config.memory_type, "summary_buffer");
        assert_eq!(config.store_path, PathBuf::from("memory_store.json"));
    }

    #[test]
    fn test_builder() {
        let config = ContextConfig::builder()
            .max_messages(3)
            .expiry_minutes(5)
            .memory_type("buffer")
            .build();
        assert_eq!(config.max_messages, 3);
        assert_eq!(config.expiry_minutes, 5);
        assert_eq!(config.memory_type, "buffer");
        // untouched fields keep their defaults
        assert_eq!(config.max_token_limit, 1000);
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max_messages = 4\nmemory_type = \"buffer\"").unwrap();

        let config = ContextConfig::from_file(&path).unwrap();
        assert_eq!(config.max_messages, 4);
        assert_eq!(config.memory_type, "buffer");
        assert_eq!(config.expiry_minutes, 60);
    }

    #[test]
    fn test_from_file_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("palaver.ini");
        std::fs::write(&path, "max_messages = 4").unwrap();

        let err = ContextConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, PalaverError::Configuration(_)));
    }
}
