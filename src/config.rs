//! Registry configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::registry::SyntaxError;

fn default_true() -> bool {
    true
}

fn default_recent_capacity() -> usize {
    6
}

/// Tunables of the syntax registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RegistryConfig {
    /// How many recently resolved syntax names to remember (default: 6)
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,

    /// Rename legacy `.yaml` syntax files to `.yml` on startup (default: true)
    #[serde(default = "default_true")]
    pub migrate_legacy_extension: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            recent_capacity: default_recent_capacity(),
            migrate_legacy_extension: true,
        }
    }
}

impl RegistryConfig {
    /// The config filename
    pub const FILENAME: &'static str = "syntaxes.json";

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, SyntaxError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| SyntaxError::io(path, e))?;

        serde_json::from_str(&contents)
            .map_err(|e| SyntaxError::Serialize(format!("{}: {}", path.display(), e)))
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No registry config at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(config) => {
                tracing::info!("Loaded registry config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    /// JSON Schema describing the config file
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(RegistryConfig)).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RegistryConfig::default();
        assert_eq!(config.recent_capacity, 6);
        assert!(config.migrate_legacy_extension);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(RegistryConfig::FILENAME);
        std::fs::write(&path, r#"{"recent_capacity": 2}"#).unwrap();

        let config = RegistryConfig::load_from_file(&path).unwrap();
        assert_eq!(config.recent_capacity, 2);
        assert!(config.migrate_legacy_extension);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(RegistryConfig::FILENAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(RegistryConfig::load_from_file(&path).is_err());
        assert_eq!(RegistryConfig::load_or_default(&path), RegistryConfig::default());
        assert_eq!(
            RegistryConfig::load_or_default(temp_dir.path().join("missing.json")),
            RegistryConfig::default()
        );
    }

    #[test]
    fn test_json_schema_lists_fields() {
        let schema = RegistryConfig::json_schema();
        let properties = &schema["properties"];
        assert!(properties.get("recent_capacity").is_some());
        assert!(properties.get("migrate_legacy_extension").is_some());
    }
}
