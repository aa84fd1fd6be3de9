//! Job parameter model.

use serde::{Deserialize, Serialize};

use crate::{ConfPair, Framework, Localization, ParamError, Resource};

fn default_num_workers() -> u32 {
    1
}

/// Settings shared by every framework
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommonParameters {
    /// Application name shown by the resource manager
    pub name: String,

    /// Scheduler queue (cluster default when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Container image; enables the docker runtime when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_path: Option<String>,

    /// Container environment, `KEY=VALUE` entries
    #[serde(default)]
    pub envs: Vec<String>,

    #[serde(default)]
    pub localizations: Vec<Localization>,

    /// Raw launcher configuration overrides, applied last
    #[serde(default)]
    pub conf_pairs: Vec<ConfPair>,

    #[serde(default)]
    pub security_disabled: bool,

    #[serde(default)]
    pub verbose: bool,
}

/// Parameters of a distributed TensorFlow job (workers plus parameter servers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorFlowParameters {
    #[serde(flatten)]
    pub common: CommonParameters,

    #[serde(default = "default_num_workers")]
    pub num_workers: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_resource: Option<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_launch_cmd: Option<String>,

    #[serde(default)]
    pub num_ps: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_resource: Option<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ps_launch_cmd: Option<String>,

    #[serde(default)]
    pub tensorboard: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensorboard_resource: Option<Resource>,
}

/// Parameters of a distributed PyTorch job (workers only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyTorchParameters {
    #[serde(flatten)]
    pub common: CommonParameters,

    #[serde(default = "default_num_workers")]
    pub num_workers: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_resource: Option<Resource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_launch_cmd: Option<String>,
}

/// A training job description, one variant per framework
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "framework", rename_all = "lowercase")]
pub enum JobParameters {
    TensorFlow(TensorFlowParameters),
    PyTorch(PyTorchParameters),
}

impl JobParameters {
    pub fn framework(&self) -> Framework {
        match self {
            JobParameters::TensorFlow(_) => Framework::TensorFlow,
            JobParameters::PyTorch(_) => Framework::PyTorch,
        }
    }

    pub fn common(&self) -> &CommonParameters {
        match self {
            JobParameters::TensorFlow(p) => &p.common,
            JobParameters::PyTorch(p) => &p.common,
        }
    }

    /// Parse parameters from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self, ParamError> {
        serde_json::from_str(json).map_err(|e| ParamError::Parse(e.to_string()))
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ParamError> {
        serde_json::to_string_pretty(self).map_err(|e| ParamError::Parse(e.to_string()))
    }

    /// Check the parameters describe a job that can be launched
    pub fn validate(&self) -> Result<(), ParamError> {
        validate_common(self.common())?;
        match self {
            JobParameters::TensorFlow(p) => p.validate(),
            JobParameters::PyTorch(p) => p.validate(),
        }
    }
}

impl TensorFlowParameters {
    pub fn new(name: impl Into<String>, worker_launch_cmd: impl Into<String>) -> Self {
        Self {
            common: CommonParameters {
                name: name.into(),
                ..CommonParameters::default()
            },
            num_workers: default_num_workers(),
            worker_resource: None,
            worker_launch_cmd: Some(worker_launch_cmd.into()),
            num_ps: 0,
            ps_resource: None,
            ps_launch_cmd: None,
            tensorboard: false,
            tensorboard_resource: None,
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        validate_workers(self.num_workers, self.worker_launch_cmd.as_deref())?;
        if self.num_ps > 0 && is_blank(self.ps_launch_cmd.as_deref()) {
            return Err(ParamError::invalid(
                "ps_launch_cmd",
                format!("required when num_ps is {}", self.num_ps),
            ));
        }
        Ok(())
    }
}

impl PyTorchParameters {
    pub fn new(name: impl Into<String>, worker_launch_cmd: impl Into<String>) -> Self {
        Self {
            common: CommonParameters {
                name: name.into(),
                ..CommonParameters::default()
            },
            num_workers: default_num_workers(),
            worker_resource: None,
            worker_launch_cmd: Some(worker_launch_cmd.into()),
        }
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        validate_workers(self.num_workers, self.worker_launch_cmd.as_deref())
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

fn validate_common(common: &CommonParameters) -> Result<(), ParamError> {
    if common.name.trim().is_empty() {
        return Err(ParamError::invalid("name", "must not be empty"));
    }
    for env in &common.envs {
        match env.split_once('=') {
            Some((key, _)) if !key.trim().is_empty() => {}
            _ => {
                return Err(ParamError::invalid(
                    "envs",
                    format!("'{}' is not KEY=VALUE", env),
                ))
            }
        }
    }
    Ok(())
}

fn validate_workers(num_workers: u32, launch_cmd: Option<&str>) -> Result<(), ParamError> {
    if num_workers == 0 {
        return Err(ParamError::invalid("num_workers", "must be at least 1"));
    }
    if is_blank(launch_cmd) {
        return Err(ParamError::invalid("worker_launch_cmd", "must not be empty"));
    }
    Ok(())
}
