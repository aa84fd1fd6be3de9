//! Submission attempt state machine
//!
//! IDLE → VALIDATING → CONFIGURING → INITIALIZING → RUNNING → COMPLETED,
//! with FAILED reachable from every non-terminal state after IDLE.

mod submission_state;

pub use submission_state::{StateError, SubmissionRecord, SubmissionState};

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global sequence counter for ordering records within a single process
static SEQUENCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Get the next sequence number for ordering
pub fn next_seq() -> u64 {
    SEQUENCE_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Get current UTC timestamp
pub fn now_rfc3339() -> DateTime<Utc> {
    Utc::now()
}

/// Check if a state is terminal (no further transitions possible)
pub trait TerminalState {
    fn is_terminal(&self) -> bool;
}
