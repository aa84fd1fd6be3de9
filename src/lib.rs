//! yarn-submit - distributed training job submission
//!
//! Submits one TensorFlow job to a YARN cluster through an external launcher
//! and reports the application id the resource manager assigned to it. The
//! [`Coordinator`] bridges the caller's thread and the launcher's
//! asynchronous callback, and makes sure the cluster application is killed if
//! the host process dies while the application may still be running.

pub mod appid;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod jobfile;
pub mod logging;
pub mod materialize;
pub mod mock;
pub mod state;
pub mod teardown;

mod sync;

pub use appid::ApplicationId;
pub use client::{ClientError, CompletionNotifier, ProcessClient, ProcessClientConfig, SubmissionClient};
pub use config::{EffectiveConfig, SubmitterSettings};
pub use coordinator::{Coordinator, CoordinatorOptions, Interrupter, SubmissionError, WorkerExit};
pub use materialize::{FileMaterializer, MaterializedConfig, Materializer};
pub use state::{SubmissionRecord, SubmissionState};
pub use submit_params::{Framework, JobParameters, PyTorchParameters, TensorFlowParameters};
pub use teardown::{install_process_hooks, TeardownGuard, TeardownReason, TeardownRegistry};
