//! Worker thread running the submission client

use std::io;
use std::thread::{self, JoinHandle};

use crate::teardown::panic_message;

/// Name of the thread running `SubmissionClient::start`
pub const WORKER_THREAD_NAME: &str = "submission-worker";

/// How the worker thread ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The client's run loop returned
    Completed,
    /// The client panicked
    Panicked(String),
}

impl std::fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerExit::Completed => write!(f, "worker completed"),
            WorkerExit::Panicked(message) => write!(f, "worker panicked: {}", message),
        }
    }
}

/// Owned handle on the worker thread; liveness is queryable without blocking
#[derive(Debug)]
pub struct WorkerHandle {
    handle: JoinHandle<WorkerExit>,
}

impl WorkerHandle {
    pub fn spawn<F>(body: F) -> io::Result<Self>
    where
        F: FnOnce() -> WorkerExit + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(body)?;
        Ok(Self { handle })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the thread ends
    pub fn join(self) -> WorkerExit {
        self.handle
            .join()
            .unwrap_or_else(|payload| WorkerExit::Panicked(panic_message(&*payload)))
    }
}
