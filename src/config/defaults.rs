//! Built-in submitter defaults (layer 1)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::client::ProcessClientConfig;
use crate::coordinator::DEFAULT_POLL_INTERVAL;
use crate::materialize::DEFAULT_SUFFIX;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Seconds between application id checks (default: 5)
    pub poll_interval_seconds: u64,

    /// Abort when client initialization fails (default: false)
    pub strict_initialization: bool,

    /// Keep the launcher configuration after the worker ends (default: true)
    pub keep_config_file: bool,

    /// Directory for launcher configuration files (default: system temp dir)
    pub config_dir: PathBuf,

    /// Launcher configuration file name suffix (default: "tony-final.xml")
    pub config_suffix: String,

    /// Submission client command
    pub client: ProcessClientConfig,

    /// Log level (default: "info")
    pub log_level: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            poll_interval_seconds: DEFAULT_POLL_INTERVAL.as_secs(),
            strict_initialization: false,
            keep_config_file: true,
            config_dir: std::env::temp_dir(),
            config_suffix: DEFAULT_SUFFIX.to_string(),
            client: ProcessClientConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "poll_interval_seconds": self.poll_interval_seconds,
            "strict_initialization": self.strict_initialization,
            "keep_config_file": self.keep_config_file,
            "config": {
                "dir": self.config_dir.to_string_lossy(),
                "suffix": self.config_suffix
            },
            "client": {
                "program": self.client.program,
                "args": self.client.args,
                "kill_program": self.client.kill_program,
                "kill_args": self.client.kill_args
            },
            "log": {
                "level": self.log_level
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let defaults = BuiltinDefaults::default();
        assert_eq!(defaults.poll_interval_seconds, 5);
        assert!(!defaults.strict_initialization);
        assert!(defaults.keep_config_file);
        assert_eq!(defaults.config_suffix, "tony-final.xml");
        assert_eq!(defaults.client.program, "tony-cli");
    }

    #[test]
    fn test_to_value() {
        let value = BuiltinDefaults::default().to_value();

        assert_eq!(value["poll_interval_seconds"], 5);
        assert_eq!(value["config"]["suffix"], "tony-final.xml");
        assert_eq!(value["client"]["kill_program"], "yarn");
        assert_eq!(value["client"]["kill_args"][1], "-kill");
        assert_eq!(value["log"]["level"], "info");
    }
}
