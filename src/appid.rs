//! Resource manager application identifiers
//!
//! The resource manager names an accepted application
//! `application_<cluster_timestamp>_<sequence>`, with the sequence padded to
//! at least four digits.

use std::sync::OnceLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the resource manager to an accepted application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApplicationId {
    /// Start time of the resource manager that issued the id
    pub cluster_timestamp: u64,
    /// Per-cluster application counter
    pub sequence: u32,
}

/// Error parsing an application identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid application id '{0}'")]
pub struct InvalidApplicationId(pub String);

const PREFIX: &str = "application";

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"application_(\d+)_(\d+)").expect("valid application id pattern")
    })
}

impl ApplicationId {
    pub fn new(cluster_timestamp: u64, sequence: u32) -> Self {
        Self {
            cluster_timestamp,
            sequence,
        }
    }

    /// Find the first application id mentioned in a line of launcher output
    pub fn find_in(line: &str) -> Option<Self> {
        pattern()
            .captures_iter(line)
            .find_map(|caps| Self::from_parts(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    fn from_parts(timestamp: &str, sequence: &str) -> Option<Self> {
        Some(Self {
            cluster_timestamp: timestamp.parse().ok()?,
            sequence: sequence.parse().ok()?,
        })
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{:04}", PREFIX, self.cluster_timestamp, self.sequence)
    }
}

impl std::str::FromStr for ApplicationId {
    type Err = InvalidApplicationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidApplicationId(s.to_string());
        let mut parts = s.trim().split('_');
        if parts.next() != Some(PREFIX) {
            return Err(invalid());
        }
        let timestamp = parts.next().ok_or_else(invalid)?;
        let sequence = parts.next().ok_or_else(invalid)?;
        if parts.next().is_some()
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
            || !sequence.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }
        Self::from_parts(timestamp, sequence).ok_or_else(invalid)
    }
}

impl TryFrom<String> for ApplicationId {
    type Error = InvalidApplicationId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ApplicationId> for String {
    fn from(value: ApplicationId) -> Self {
        value.to_string()
    }
}
