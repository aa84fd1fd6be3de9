//! Parsers for command-line style parameter values.
//!
//! - resources: `memory=4G,vcores=2,gpu=1`
//! - localizations: `hdfs:///data/train:./train[:ro|:rw]`
//! - configuration overrides: `key=value`

use serde::{Deserialize, Serialize};

use crate::ParamError;

/// Container resource request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resource {
    /// Memory in MiB
    pub memory_mb: u64,
    pub vcores: u32,
    pub gpus: u32,
}

impl Resource {
    fn parse_memory(input: &str, value: &str) -> Result<u64, ParamError> {
        let value = value.trim();
        let split = value
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(value.len());
        let (digits, unit) = value.split_at(split);
        let amount: u64 = digits.parse().map_err(|_| ParamError::InvalidResource {
            input: input.to_string(),
            reason: format!("memory '{}' is not a number", value),
        })?;
        let multiplier = match unit.trim().to_lowercase().as_str() {
            "" | "m" | "mb" | "mi" => 1,
            "g" | "gb" | "gi" => 1024,
            other => {
                return Err(ParamError::InvalidResource {
                    input: input.to_string(),
                    reason: format!("unknown memory unit '{}'", other),
                })
            }
        };
        amount
            .checked_mul(multiplier)
            .ok_or_else(|| ParamError::InvalidResource {
                input: input.to_string(),
                reason: format!("memory '{}' is too large", value),
            })
    }

    fn parse_count(input: &str, key: &str, value: &str) -> Result<u32, ParamError> {
        value.trim().parse().map_err(|_| ParamError::InvalidResource {
            input: input.to_string(),
            reason: format!("{} '{}' is not a number", key, value.trim()),
        })
    }
}

impl std::str::FromStr for Resource {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut memory_mb = None;
        let mut vcores = None;
        let mut gpus = 0;

        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| ParamError::InvalidResource {
                input: s.to_string(),
                reason: format!("'{}' is not key=value", part),
            })?;
            match key.trim().to_lowercase().as_str() {
                "memory" | "memory-mb" | "memory_mb" => {
                    memory_mb = Some(Self::parse_memory(s, value)?)
                }
                "vcores" | "vcore" => vcores = Some(Self::parse_count(s, "vcores", value)?),
                "gpu" | "gpus" | "yarn.io/gpu" => gpus = Self::parse_count(s, "gpu", value)?,
                other => {
                    return Err(ParamError::InvalidResource {
                        input: s.to_string(),
                        reason: format!("unknown resource '{}'", other),
                    })
                }
            }
        }

        let memory_mb = memory_mb.ok_or_else(|| ParamError::InvalidResource {
            input: s.to_string(),
            reason: "memory is required".to_string(),
        })?;
        let vcores = vcores.ok_or_else(|| ParamError::InvalidResource {
            input: s.to_string(),
            reason: "vcores is required".to_string(),
        })?;

        Ok(Resource {
            memory_mb,
            vcores,
            gpus,
        })
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "memory={}M,vcores={}", self.memory_mb, self.vcores)?;
        if self.gpus > 0 {
            write!(f, ",gpu={}", self.gpus)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Resource {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resource> for String {
    fn from(value: Resource) -> Self {
        value.to_string()
    }
}

/// Access mode of a localized resource inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalizationMode {
    ReadOnly,
    #[default]
    ReadWrite,
}

impl LocalizationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocalizationMode::ReadOnly => "ro",
            LocalizationMode::ReadWrite => "rw",
        }
    }
}

/// A remote file or directory made available inside each container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Localization {
    pub remote_uri: String,
    pub local_path: String,
    pub mode: LocalizationMode,
}

impl std::str::FromStr for Localization {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ParamError::InvalidLocalization {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = s.trim();
        let (rest, mode) = if let Some(rest) = trimmed.strip_suffix(":ro") {
            (rest, LocalizationMode::ReadOnly)
        } else if let Some(rest) = trimmed.strip_suffix(":rw") {
            (rest, LocalizationMode::ReadWrite)
        } else {
            (trimmed, LocalizationMode::default())
        };

        let idx = rest.rfind(':').ok_or_else(|| invalid("expected remote:local"))?;
        let (remote, local) = (&rest[..idx], &rest[idx + 1..]);
        // "hdfs:///path" has no local part; the colon belongs to the scheme
        if local.starts_with("//") {
            return Err(invalid("missing local path"));
        }
        if remote.is_empty() {
            return Err(invalid("missing remote uri"));
        }
        if local.is_empty() {
            return Err(invalid("missing local path"));
        }

        Ok(Localization {
            remote_uri: remote.to_string(),
            local_path: local.to_string(),
            mode,
        })
    }
}

impl std::fmt::Display for Localization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.remote_uri, self.local_path, self.mode.as_str())
    }
}

impl TryFrom<String> for Localization {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Localization> for String {
    fn from(value: Localization) -> Self {
        value.to_string()
    }
}

/// Raw configuration override passed through to the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConfPair {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for ConfPair {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| ParamError::InvalidConfPair(s.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ParamError::InvalidConfPair(s.to_string()));
        }
        Ok(ConfPair {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }
}

impl std::fmt::Display for ConfPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl TryFrom<String> for ConfPair {
    type Error = ParamError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConfPair> for String {
    fn from(value: ConfPair) -> Self {
        value.to_string()
    }
}
