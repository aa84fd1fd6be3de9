//! Submission state and its persisted record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

use submit_params::Framework;

use super::{next_seq, now_rfc3339, TerminalState};
use crate::appid::ApplicationId;

/// Schema version for submission records
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "yarn-submit/submission@1";

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionState {
    /// No attempt started yet
    Idle,
    /// Checking the parameters can be submitted
    Validating,
    /// Writing the launcher configuration
    Configuring,
    /// Handing the configuration to the submission client
    Initializing,
    /// Client running, waiting for an application id
    Running,
    /// Application id received
    Completed,
    /// Attempt failed
    Failed,
}

impl TerminalState for SubmissionState {
    fn is_terminal(&self) -> bool {
        matches!(self, SubmissionState::Completed | SubmissionState::Failed)
    }
}

impl SubmissionState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: SubmissionState) -> bool {
        use SubmissionState::*;
        match (self, target) {
            (Idle, Validating) => true,
            (Validating, Configuring) => true,
            (Configuring, Initializing) => true,
            (Initializing, Running) => true,
            (Running, Completed) => true,

            (Validating | Configuring | Initializing | Running, Failed) => true,

            _ => false,
        }
    }
}

impl std::fmt::Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SubmissionState::Idle => "IDLE",
            SubmissionState::Validating => "VALIDATING",
            SubmissionState::Configuring => "CONFIGURING",
            SubmissionState::Initializing => "INITIALIZING",
            SubmissionState::Running => "RUNNING",
            SubmissionState::Completed => "COMPLETED",
            SubmissionState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// Errors for state operations
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition {
        from: SubmissionState,
        to: SubmissionState,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Snapshot of one submission attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub schema_version: u32,
    pub schema_id: String,

    /// Attempt identifier (ULID)
    pub attempt_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub framework: Option<Framework>,

    pub state: SubmissionState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,

    /// Materialized launcher configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_sha256: Option<String>,

    /// Failure description when state is FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Monotonic sequence counter for ordering
    pub seq: u64,
}

impl SubmissionRecord {
    /// Create a record in IDLE state
    pub fn new(attempt_id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            attempt_id: attempt_id.into(),
            framework: None,
            state: SubmissionState::Idle,
            application_id: None,
            config_path: None,
            config_sha256: None,
            failure: None,
            created_at: now,
            updated_at: now,
            seq: next_seq(),
        }
    }

    /// Transition to a new state
    pub fn transition(&mut self, new_state: SubmissionState) -> Result<(), StateError> {
        if !self.state.can_transition_to(new_state) {
            return Err(StateError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        self.state = new_state;
        self.updated_at = now_rfc3339();
        self.seq = next_seq();
        Ok(())
    }

    /// RUNNING → COMPLETED with the received id
    pub fn complete(&mut self, id: ApplicationId) -> Result<(), StateError> {
        self.transition(SubmissionState::Completed)?;
        self.application_id = Some(id);
        Ok(())
    }

    /// Move to FAILED, recording why
    pub fn fail(&mut self, reason: impl Into<String>) -> Result<(), StateError> {
        self.transition(SubmissionState::Failed)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write atomically to file (write-then-rename)
    pub fn write_to_file(&self, path: &Path) -> Result<(), StateError> {
        let json = self.to_json()?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, &json)?;
        fs::rename(&temp_path, path)?;

        Ok(())
    }

    /// Load from file
    pub fn from_file(path: &Path) -> Result<Self, StateError> {
        let json = fs::read_to_string(path)?;
        Ok(Self::from_json(&json)?)
    }
}
