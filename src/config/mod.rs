//! Submitter configuration
//!
//! Layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Host config (~/.config/yarn-submit/config.toml or --config)
//! 3. Environment (YARN_SUBMIT_POLL_INTERVAL, YARN_SUBMIT_LOG)
//! 4. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub(crate) use effective::toml_to_json;
pub use effective::{
    ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, ENV_LOG, ENV_POLL_INTERVAL,
    MAX_POLL_INTERVAL_SECONDS,
};
pub use merge::{deep_merge, merge_layers};
pub use settings::SubmitterSettings;
