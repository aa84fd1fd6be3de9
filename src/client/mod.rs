//! Submission client capability
//!
//! The coordinator does not talk to the resource manager itself. It drives a
//! [`SubmissionClient`], which launches the application and reports the id it
//! was assigned through a [`CompletionNotifier`] callback from its own thread.
//!
//! - [`ProcessClient`]: production client wrapping an external launcher command
//! - [`crate::mock::MockClient`]: scripted in-process client for tests

mod process;

pub use process::{ProcessClient, ProcessClientConfig, CONF_FILE_ARG};

use std::io;

use crate::appid::ApplicationId;

/// Callback sink invoked by a client once the resource manager accepted the job
pub trait CompletionNotifier: Send + Sync {
    fn on_identifier_received(&self, id: ApplicationId);
}

impl<F> CompletionNotifier for F
where
    F: Fn(ApplicationId) + Send + Sync,
{
    fn on_identifier_received(&self, id: ApplicationId) {
        self(id)
    }
}

/// External client that submits and then monitors one cluster application
pub trait SubmissionClient: Send + Sync + 'static {
    /// Prepare the client; `args` carries the materialized configuration reference
    fn initialize(&self, args: &[String]) -> Result<(), ClientError>;

    /// Submit and monitor the application. Blocks until the application
    /// reaches a terminal state or the client is terminated, reporting ids
    /// to `notifier` as they become known.
    fn start(&self, notifier: &dyn CompletionNotifier);

    /// Kill the cluster application
    fn force_terminate(&self) -> Result<(), ClientError>;
}

/// Submission client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("initialization failed: {0}")]
    Initialization(String),

    #[error("failed to launch submission client: {0}")]
    Launch(String),

    #[error("resource manager error: {0}")]
    ResourceManager(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
