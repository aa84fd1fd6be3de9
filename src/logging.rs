//! Logging setup
//!
//! Events go to stderr so stdout stays reserved for the submission result.
//! The level comes from the effective configuration, where `YARN_SUBMIT_LOG`
//! already overrides the host file; any `EnvFilter` directive is accepted
//! (e.g. `info,yarn_submit::client=debug`).

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Fallback when the configured filter does not parse
pub const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber; later calls are no-ops
pub fn init(level: &str) {
    INIT.call_once(|| {
        let (filter, invalid) = match filter(level) {
            Some(filter) => (filter, false),
            None => (EnvFilter::new(DEFAULT_LEVEL), true),
        };

        let layer = fmt::layer().with_target(true).with_writer(std::io::stderr);
        // Another subscriber may already be installed (e.g. by a test harness)
        let _ = tracing_subscriber::registry().with(filter).with(layer).try_init();

        if invalid {
            tracing::warn!(level, "invalid log filter, using {}", DEFAULT_LEVEL);
        }
    });
}

fn filter(level: &str) -> Option<EnvFilter> {
    EnvFilter::try_new(level.trim()).ok()
}
