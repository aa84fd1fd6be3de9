//! Typed view of the effective configuration

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::effective::{ConfigError, EffectiveConfig};
use crate::client::ProcessClientConfig;
use crate::coordinator::CoordinatorOptions;
use crate::materialize::FileMaterializer;

#[derive(Debug, Deserialize)]
struct RawSettings {
    poll_interval_seconds: u64,
    strict_initialization: bool,
    keep_config_file: bool,
    config: RawConfigFile,
    client: ProcessClientConfig,
    log: RawLog,
}

#[derive(Debug, Deserialize)]
struct RawConfigFile {
    dir: PathBuf,
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    level: String,
}

/// Settings for one submitter run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitterSettings {
    pub poll_interval: Duration,
    pub strict_initialization: bool,
    pub keep_config_file: bool,
    pub config_dir: PathBuf,
    pub config_suffix: String,
    pub client: ProcessClientConfig,
    pub log_level: String,
}

impl SubmitterSettings {
    pub fn from_effective(effective: &EffectiveConfig) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_value(effective.config.clone())
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(Self {
            poll_interval: Duration::from_secs(raw.poll_interval_seconds),
            strict_initialization: raw.strict_initialization,
            keep_config_file: raw.keep_config_file,
            config_dir: raw.config.dir,
            config_suffix: raw.config.suffix,
            client: raw.client,
            log_level: raw.log.level,
        })
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        CoordinatorOptions {
            poll_interval: self.poll_interval,
            strict_initialization: self.strict_initialization,
            keep_config_file: self.keep_config_file,
        }
    }

    pub fn materializer(&self) -> FileMaterializer {
        FileMaterializer::new(&self.config_dir).with_suffix(&self.config_suffix)
    }
}
