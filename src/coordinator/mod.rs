//! Job submission coordinator
//!
//! Bridges a synchronous caller and an asynchronous submission client. One
//! [`Coordinator`] runs one submission attempt:
//! 1. Check the framework is supported and the parameters are usable
//! 2. Materialize the launcher configuration
//! 3. Initialize the client (failure is logged and the attempt goes on
//!    unless strict initialization is enabled)
//! 4. Register a teardown hook that force-terminates the application
//! 5. Run `client.start` on the `submission-worker` thread
//! 6. Poll until the client reports an application id or the worker ends
//!
//! Interrupting the poll wait only wakes it; the loop keeps polling.

mod cell;
mod poll;
mod worker;

pub use cell::IdentifierCell;
pub use poll::{Interrupter, PollSignal, WaitOutcome, DEFAULT_POLL_INTERVAL};
pub use worker::{WorkerExit, WorkerHandle, WORKER_THREAD_NAME};

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use submit_params::{Framework, JobParameters, ParamError};
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn};

use crate::appid::ApplicationId;
use crate::client::{ClientError, SubmissionClient};
use crate::materialize::{MaterializeError, MaterializedConfig, Materializer};
use crate::state::{StateError, SubmissionRecord, SubmissionState};
use crate::sync::lock;
use crate::teardown::{panic_message, TeardownError, TeardownRegistry};

/// Submission errors
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("unsupported framework: {0}")]
    UnsupportedFramework(Framework),

    #[error("invalid job parameters: {0}")]
    InvalidParameters(#[from] ParamError),

    #[error("failed to write launcher configuration: {0}")]
    ConfigWriteFailure(#[from] MaterializeError),

    #[error("submission client initialization failed: {0}")]
    ClientInitializationFailure(#[source] ClientError),

    #[error("no application id received ({0})")]
    NoIdentifierReceived(WorkerExit),

    #[error("failed to spawn submission worker: {0}")]
    WorkerSpawn(#[source] io::Error),

    #[error("invalid coordinator state: {0}")]
    InvalidState(#[from] StateError),
}

impl SubmissionError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SubmissionError::UnsupportedFramework(_) => 10,
            SubmissionError::InvalidParameters(_) => 11,
            SubmissionError::ConfigWriteFailure(_) => 20,
            SubmissionError::ClientInitializationFailure(_) => 30,
            SubmissionError::NoIdentifierReceived(_) => 40,
            SubmissionError::WorkerSpawn(_) => 41,
            SubmissionError::InvalidState(_) => 1,
        }
    }
}

/// Tunables for one coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub poll_interval: Duration,
    /// Abort when the client fails to initialize instead of starting anyway
    pub strict_initialization: bool,
    /// Leave the materialized configuration on disk after the worker ends
    pub keep_config_file: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            strict_initialization: false,
            keep_config_file: true,
        }
    }
}

/// Runs a single submission attempt
pub struct Coordinator {
    client: Arc<dyn SubmissionClient>,
    materializer: Arc<dyn Materializer>,
    teardown: Arc<TeardownRegistry>,
    options: CoordinatorOptions,
    attempt_id: String,
    record: Mutex<SubmissionRecord>,
    cell: Arc<IdentifierCell>,
    signal: PollSignal,
    worker: Mutex<Option<WorkerHandle>>,
    worker_exit: Mutex<Option<WorkerExit>>,
}

impl Coordinator {
    pub fn new(
        client: Arc<dyn SubmissionClient>,
        materializer: Arc<dyn Materializer>,
        teardown: Arc<TeardownRegistry>,
        options: CoordinatorOptions,
    ) -> Self {
        let attempt_id = ulid::Ulid::new().to_string().to_lowercase();
        Self {
            client,
            materializer,
            teardown,
            options,
            record: Mutex::new(SubmissionRecord::new(attempt_id.clone())),
            attempt_id,
            cell: Arc::new(IdentifierCell::new()),
            signal: PollSignal::new(),
            worker: Mutex::new(None),
            worker_exit: Mutex::new(None),
        }
    }

    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub fn state(&self) -> SubmissionState {
        lock(&self.record).state
    }

    /// Snapshot of the attempt for persistence or display
    pub fn record(&self) -> SubmissionRecord {
        lock(&self.record).clone()
    }

    /// Latest application id reported by the client
    pub fn identifier(&self) -> Option<ApplicationId> {
        self.cell.get()
    }

    /// Handle that wakes the poll wait early
    pub fn interrupter(&self) -> Interrupter {
        self.signal.interrupter()
    }

    /// Submit `params` and wait for the resource manager's application id
    ///
    /// Only one attempt per coordinator; a second call fails with
    /// [`SubmissionError::InvalidState`].
    pub fn submit(&self, params: &JobParameters) -> Result<ApplicationId, SubmissionError> {
        let span = info_span!("submission", attempt = %self.attempt_id);
        let _enter = span.enter();

        self.advance(SubmissionState::Validating)?;
        {
            let mut record = lock(&self.record);
            record.framework = Some(params.framework());
        }

        let result = self.run_attempt(params);
        let mut record = lock(&self.record);
        match &result {
            Ok(id) => {
                record.complete(*id)?;
                info!(application_id = %id, "submission completed");
            }
            Err(e) => {
                record.fail(e.to_string())?;
                error!(error = %e, "submission failed");
            }
        }
        result
    }

    /// Block until the worker thread ends; `None` if it never started
    pub fn wait_for_worker(&self) -> Option<WorkerExit> {
        let handle = lock(&self.worker).take();
        match handle {
            Some(handle) => {
                info!("waiting for submission worker to finish");
                let exit = handle.join();
                *lock(&self.worker_exit) = Some(exit.clone());
                Some(exit)
            }
            None => lock(&self.worker_exit).clone(),
        }
    }

    fn run_attempt(&self, params: &JobParameters) -> Result<ApplicationId, SubmissionError> {
        let tf = match params {
            JobParameters::TensorFlow(tf) => tf,
            JobParameters::PyTorch(_) => {
                return Err(SubmissionError::UnsupportedFramework(Framework::PyTorch))
            }
        };
        params.validate()?;

        self.advance(SubmissionState::Configuring)?;
        let config = self.materializer.materialize(tf)?;
        {
            let mut record = lock(&self.record);
            record.config_path = Some(config.path.to_string_lossy().into_owned());
            record.config_sha256 = Some(config.sha256.clone());
        }

        self.advance(SubmissionState::Initializing)?;
        if let Err(e) = self.client.initialize(&config.client_args()) {
            if self.options.strict_initialization {
                self.discard_config(&config);
                return Err(SubmissionError::ClientInitializationFailure(e));
            }
            error!(error = %e, "submission client initialization failed, starting anyway");
        }

        self.start_worker(config)?;
        self.advance(SubmissionState::Running)?;
        self.await_identifier()
    }

    fn start_worker(&self, config: MaterializedConfig) -> Result<(), SubmissionError> {
        let terminator = Arc::clone(&self.client);
        let guard = self.teardown.register(
            format!("force-terminate attempt {}", self.attempt_id),
            move || terminator.force_terminate().map_err(TeardownError::from),
        );

        let client = Arc::clone(&self.client);
        let cell = Arc::clone(&self.cell);
        let keep_config = self.options.keep_config_file;
        let span = tracing::Span::current();
        let worker = WorkerHandle::spawn(move || {
            let _enter = span.enter();
            debug!("submission worker started");
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| client.start(&*cell)));
            if !keep_config {
                remove_config(&config);
            }
            match outcome {
                Ok(()) => {
                    // Application has ended; nothing left to kill
                    drop(guard);
                    info!("submission worker finished");
                    WorkerExit::Completed
                }
                Err(payload) => {
                    // The application may have outlived the client
                    guard.detach();
                    let message = panic_message(&*payload);
                    error!(panic = %message, "submission client panicked");
                    WorkerExit::Panicked(message)
                }
            }
        })
        .map_err(SubmissionError::WorkerSpawn)?;

        *lock(&self.worker) = Some(worker);
        Ok(())
    }

    fn await_identifier(&self) -> Result<ApplicationId, SubmissionError> {
        loop {
            if let Some(id) = self.cell.get() {
                return Ok(id);
            }

            if self.worker_finished() {
                // Catch an id reported just before the worker ended
                if let Some(id) = self.cell.get() {
                    return Ok(id);
                }
                let exit = self.wait_for_worker().unwrap_or(WorkerExit::Completed);
                return Err(SubmissionError::NoIdentifierReceived(exit));
            }

            match self.signal.wait(self.options.poll_interval) {
                WaitOutcome::Elapsed => debug!("waiting for application id"),
                WaitOutcome::Interrupted => warn!("poll wait interrupted, continuing"),
            }
        }
    }

    fn worker_finished(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .map_or(true, WorkerHandle::is_finished)
    }

    fn advance(&self, next: SubmissionState) -> Result<(), StateError> {
        let mut record = lock(&self.record);
        let from = record.state;
        record.transition(next)?;
        debug!(%from, to = %next, "state transition");
        Ok(())
    }

    fn discard_config(&self, config: &MaterializedConfig) {
        if !self.options.keep_config_file {
            remove_config(config);
        }
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("attempt_id", &self.attempt_id)
            .field("state", &self.state())
            .field("options", &self.options)
            .finish()
    }
}

fn remove_config(config: &MaterializedConfig) {
    match config.discard() {
        Ok(()) => debug!(path = %config.path.display(), "removed launcher configuration"),
        Err(e) => {
            warn!(path = %config.path.display(), error = %e, "failed to remove launcher configuration")
        }
    }
}
