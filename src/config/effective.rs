//! Effective configuration with provenance
//!
//! The merged configuration plus a record of every layer that contributed
//! to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use super::defaults::BuiltinDefaults;
use super::merge::merge_layers;

/// Schema version for effective_config
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "yarn-submit/effective_config@1";

/// Overrides the poll interval, in seconds
pub const ENV_POLL_INTERVAL: &str = "YARN_SUBMIT_POLL_INTERVAL";

/// Overrides the log level / filter
pub const ENV_LOG: &str = "YARN_SUBMIT_LOG";

/// Upper bound for `poll_interval_seconds`
pub const MAX_POLL_INTERVAL_SECONDS: u64 = 3600;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Env,
    Cli,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (host layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (host layer only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Effective configuration with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub schema_version: u32,
    pub schema_id: String,

    /// When this config was computed
    pub created_at: DateTime<Utc>,

    /// The merged configuration object
    pub config: Value,

    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl EffectiveConfig {
    /// Build effective config from layers
    ///
    /// A host config path that does not exist is skipped.
    pub fn build(
        host_config_path: Option<&Path>,
        env_overrides: Option<Value>,
        cli_overrides: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let mut layers = Vec::new();
        let mut sources = Vec::new();

        // Layer 1: Built-in defaults
        layers.push(BuiltinDefaults::default().to_value());
        sources.push(ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        });

        // Layer 2: Host config
        if let Some(path) = host_config_path {
            if path.exists() {
                let (value, digest) = Self::load_toml_file(path)?;
                layers.push(value);
                sources.push(ConfigSource {
                    origin: ConfigOrigin::Host,
                    path: Some(path.to_string_lossy().to_string()),
                    digest: Some(digest),
                });
            }
        }

        // Layer 3: Environment
        if let Some(env) = env_overrides {
            layers.push(env);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Env,
                path: None,
                digest: None,
            });
        }

        // Layer 4: CLI overrides
        if let Some(cli) = cli_overrides {
            layers.push(cli);
            sources.push(ConfigSource {
                origin: ConfigOrigin::Cli,
                path: None,
                digest: None,
            });
        }

        let merged = merge_layers(layers);
        Self::validate_config(&merged)?;

        Ok(Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            config: merged,
            sources,
        })
    }

    /// Default host config location: `~/.config/yarn-submit/config.toml`
    pub fn default_host_path() -> Option<PathBuf> {
        let home = std::env::var("HOME").ok()?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("yarn-submit")
                .join("config.toml"),
        )
    }

    /// Environment layer from the process environment
    pub fn env_overrides() -> Result<Option<Value>, ConfigError> {
        Self::env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Environment layer from an arbitrary variable lookup
    pub fn env_overrides_from<F>(lookup: F) -> Result<Option<Value>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut overrides = serde_json::Map::new();

        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            let seconds: u64 = raw.trim().parse().map_err(|_| {
                ConfigError::ParseError(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    ENV_POLL_INTERVAL, raw
                ))
            })?;
            overrides.insert("poll_interval_seconds".to_string(), seconds.into());
        }

        if let Some(level) = lookup(ENV_LOG) {
            overrides.insert("log".to_string(), serde_json::json!({ "level": level }));
        }

        Ok((!overrides.is_empty()).then_some(Value::Object(overrides)))
    }

    /// Load and parse a TOML file, returning the value and digest
    fn load_toml_file(path: &Path) -> Result<(Value, String), ConfigError> {
        let bytes = fs::read(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::ParseError(format!("Invalid UTF-8: {}", e)))?;

        let toml_value: toml::Value = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("TOML parse error: {}", e)))?;

        Ok((toml_to_json(toml_value), digest))
    }

    /// Validate configuration values
    fn validate_config(config: &Value) -> Result<(), ConfigError> {
        match config.get("poll_interval_seconds").and_then(Value::as_u64) {
            Some(seconds) if (1..=MAX_POLL_INTERVAL_SECONDS).contains(&seconds) => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "poll_interval_seconds must be in [1, {}]",
                    MAX_POLL_INTERVAL_SECONDS
                )))
            }
        }

        for key in ["client.program", "config.suffix"] {
            let value = key
                .split('.')
                .try_fold(config, |current, part| current.get(part))
                .and_then(Value::as_str);
            if value.map_or(true, |v| v.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a non-empty string",
                    key
                )));
            }
        }

        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Get a config value by path (dot-separated)
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.config;
        for part in path.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    pub fn get_u64(&self, path: &str) -> Option<u64> {
        self.get(path).and_then(|v| v.as_u64())
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(|v| v.as_str())
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(|v| v.as_bool())
    }
}

/// Convert TOML Value to JSON Value
pub(crate) fn toml_to_json(toml: toml::Value) -> Value {
    match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(arr.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_with_defaults_only() {
        let config = EffectiveConfig::build(None, None, None).unwrap();

        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.get_u64("poll_interval_seconds"), Some(5));
        assert_eq!(config.get_str("client.program"), Some("tony-cli"));
        assert_eq!(config.get_bool("keep_config_file"), Some(true));
    }

    #[test]
    fn test_layer_precedence() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "poll_interval_seconds = 30").unwrap();
        writeln!(host, "[client]").unwrap();
        writeln!(host, "program = \"/opt/tony/bin/tony-cli\"").unwrap();

        let env = serde_json::json!({ "poll_interval_seconds": 20 });
        let cli = serde_json::json!({ "poll_interval_seconds": 10 });

        let config = EffectiveConfig::build(Some(host.path()), Some(env.clone()), None).unwrap();
        assert_eq!(config.get_u64("poll_interval_seconds"), Some(20));
        assert_eq!(config.get_str("client.program"), Some("/opt/tony/bin/tony-cli"));
        // Untouched keys in the same table survive
        assert_eq!(config.get_str("client.kill_program"), Some("yarn"));

        let config = EffectiveConfig::build(Some(host.path()), Some(env), Some(cli)).unwrap();
        assert_eq!(config.get_u64("poll_interval_seconds"), Some(10));
    }

    #[test]
    fn test_missing_host_file_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            EffectiveConfig::build(Some(&dir.path().join("absent.toml")), None, None).unwrap();
        assert_eq!(config.sources.len(), 1);
    }

    #[test]
    fn test_validation_poll_interval() {
        for seconds in [0, MAX_POLL_INTERVAL_SECONDS + 1] {
            let cli = serde_json::json!({ "poll_interval_seconds": seconds });
            let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
            assert!(err.to_string().contains("poll_interval_seconds"));
        }
    }

    #[test]
    fn test_validation_empty_program() {
        let cli = serde_json::json!({ "client": { "program": " " } });
        let err = EffectiveConfig::build(None, None, Some(cli)).unwrap_err();
        assert!(err.to_string().contains("client.program"));
    }

    #[test]
    fn test_invalid_toml() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "poll_interval_seconds = = 3").unwrap();
        let err = EffectiveConfig::build(Some(host.path()), None, None).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env = EffectiveConfig::env_overrides_from(|key| match key {
            ENV_POLL_INTERVAL => Some("15".to_string()),
            ENV_LOG => Some("debug".to_string()),
            _ => None,
        })
        .unwrap()
        .unwrap();
        assert_eq!(env["poll_interval_seconds"], 15);
        assert_eq!(env["log"]["level"], "debug");

        assert!(EffectiveConfig::env_overrides_from(|_| None).unwrap().is_none());

        let err = EffectiveConfig::env_overrides_from(|key| {
            (key == ENV_POLL_INTERVAL).then(|| "soon".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains(ENV_POLL_INTERVAL));
    }

    #[test]
    fn test_sources_tracked() {
        let mut host = NamedTempFile::new().unwrap();
        writeln!(host, "keep_config_file = false").unwrap();
        let config = EffectiveConfig::build(
            Some(host.path()),
            None,
            Some(serde_json::json!({ "strict_initialization": true })),
        )
        .unwrap();

        let origins: Vec<_> = config.sources.iter().map(|s| s.origin.clone()).collect();
        assert_eq!(
            origins,
            vec![ConfigOrigin::Builtin, ConfigOrigin::Host, ConfigOrigin::Cli]
        );
        assert_eq!(config.sources[1].digest.as_ref().map(String::len), Some(64));
    }
}
