//! Launcher Process Tests
//!
//! End-to-end submission through `ProcessClient` with shell scripts standing
//! in for the launcher and the resource manager's kill command.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use yarn_submit::{
    ApplicationId, Coordinator, CoordinatorOptions, FileMaterializer, JobParameters,
    ProcessClient, ProcessClientConfig, SubmissionError, TeardownReason, TeardownRegistry,
    TensorFlowParameters, WorkerExit,
};

fn tf_params() -> JobParameters {
    let mut tf = TensorFlowParameters::new("mnist", "python train.py");
    tf.num_workers = 3;
    JobParameters::TensorFlow(tf)
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string(), "launcher".to_string()]
}

fn submit_with(
    config: ProcessClientConfig,
    dir: &Path,
    registry: &Arc<TeardownRegistry>,
) -> (Coordinator, Result<ApplicationId, SubmissionError>) {
    let coordinator = Coordinator::new(
        Arc::new(ProcessClient::new(config)),
        Arc::new(FileMaterializer::new(dir)),
        Arc::clone(registry),
        CoordinatorOptions {
            poll_interval: Duration::from_millis(20),
            ..CoordinatorOptions::default()
        },
    );
    let result = coordinator.submit(&tf_params());
    (coordinator, result)
}

#[test]
fn test_launcher_reads_config_and_reports_id() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(TeardownRegistry::new());
    // Report an id only when the configuration carries the worker count
    let config = ProcessClientConfig {
        program: "sh".to_string(),
        args: sh("grep -q '<value>3</value>' \"$2\" && \
                  echo 'INFO Submitted application application_1700000000000_0042'"),
        ..ProcessClientConfig::default()
    };

    let (coordinator, result) = submit_with(config, dir.path(), &registry);

    assert_eq!(result.unwrap(), ApplicationId::new(1700000000000, 42));
    assert_eq!(coordinator.wait_for_worker(), Some(WorkerExit::Completed));
    assert_eq!(registry.pending(), 0);
}

#[test]
fn test_launcher_exiting_without_id() {
    let dir = tempfile::tempdir().unwrap();
    let registry = Arc::new(TeardownRegistry::new());
    let config = ProcessClientConfig {
        program: "sh".to_string(),
        args: sh("echo 'ERROR queue does not exist' >&2; exit 1"),
        ..ProcessClientConfig::default()
    };

    let (_, result) = submit_with(config, dir.path(), &registry);

    assert!(matches!(
        result,
        Err(SubmissionError::NoIdentifierReceived(WorkerExit::Completed))
    ));
}

#[test]
fn test_teardown_kills_application() {
    let dir = tempfile::tempdir().unwrap();
    let killed = dir.path().join("killed");
    let registry = Arc::new(TeardownRegistry::new());
    let config = ProcessClientConfig {
        program: "sh".to_string(),
        args: sh("echo application_1700000000000_0005; exec sleep 30"),
        kill_program: "sh".to_string(),
        kill_args: vec![
            "-c".to_string(),
            format!("echo \"$0\" > '{}'", killed.display()),
        ],
    };

    let (coordinator, result) = submit_with(config, dir.path(), &registry);
    let id = result.unwrap();

    let report = registry.run_all(TeardownReason::Signal);
    assert_eq!(report.ran, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(fs::read_to_string(&killed).unwrap().trim(), id.to_string());

    // Killing the launcher ends the worker
    assert_eq!(coordinator.wait_for_worker(), Some(WorkerExit::Completed));
}
