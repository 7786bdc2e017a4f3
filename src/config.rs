//! Serializable configuration for repositories and permission negotiation.

use crate::enforcement::GraphPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Per-repository settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Name used in logs and errors
    pub name: String,

    /// Runtime treatment of edges missing from the state graph
    pub graph_policy: GraphPolicy,

    /// Committed transitions kept for inspection; 0 disables history
    pub history_capacity: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            name: "state".to_string(),
            graph_policy: GraphPolicy::default(),
            history_capacity: 64,
        }
    }
}

impl RepositoryConfig {
    /// Load from a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Settings for permission negotiators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// How often the platform status is polled while someone is watching
    pub poll_interval_ms: u64,

    /// Template for each negotiator's repository; the name is prefixed to the
    /// permission kind
    pub repository: RepositoryConfig,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            repository: RepositoryConfig {
                name: "permission".to_string(),
                ..RepositoryConfig::default()
            },
        }
    }
}

impl PermissionConfig {
    /// Load from a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RepositoryConfig::from_json("{}").unwrap();
        assert_eq!(config, RepositoryConfig::default());
        assert_eq!(config.history_capacity, 64);
        assert_eq!(config.graph_policy, GraphPolicy::Warn);
    }

    #[test]
    fn fields_override_defaults() {
        let config =
            RepositoryConfig::from_json(r#"{"name":"scanner","graph_policy":"enforce"}"#).unwrap();
        assert_eq!(config.name, "scanner");
        assert_eq!(config.graph_policy, GraphPolicy::Enforce);
        assert_eq!(config.history_capacity, 64);
    }

    #[test]
    fn permission_config_nests_repository_settings() {
        let config = PermissionConfig::from_json(
            r#"{"poll_interval_ms":250,"repository":{"history_capacity":4}}"#,
        )
        .unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
        assert_eq!(config.repository.history_capacity, 4);
        assert_eq!(config.repository.name, "state");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let result = PermissionConfig::from_json(r#"{"poll_interval_ms":0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let result = RepositoryConfig::from_json("{ not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
