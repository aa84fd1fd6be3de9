//! Parameter errors.

/// Errors produced while parsing or validating job parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("unknown framework '{0}' (expected tensorflow or pytorch)")]
    UnknownFramework(String),

    #[error("invalid resource '{input}': {reason}")]
    InvalidResource { input: String, reason: String },

    #[error("invalid localization '{input}': {reason}")]
    InvalidLocalization { input: String, reason: String },

    #[error("invalid configuration pair '{0}': expected key=value")]
    InvalidConfPair(String),

    #[error("invalid parameter {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("failed to parse parameters: {0}")]
    Parse(String),
}

impl ParamError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        ParamError::Invalid {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
