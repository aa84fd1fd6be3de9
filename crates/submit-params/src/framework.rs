//! Training framework identifiers.

use serde::{Deserialize, Serialize};

use crate::ParamError;

/// Training framework a job is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    TensorFlow,
    PyTorch,
}

impl Framework {
    pub fn as_str(&self) -> &'static str {
        match self {
            Framework::TensorFlow => "tensorflow",
            Framework::PyTorch => "pytorch",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Framework {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tensorflow" | "tf" => Ok(Framework::TensorFlow),
            "pytorch" | "torch" => Ok(Framework::PyTorch),
            _ => Err(ParamError::UnknownFramework(s.to_string())),
        }
    }
}
