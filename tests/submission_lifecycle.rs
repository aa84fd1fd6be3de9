//! Submission Lifecycle Tests
//!
//! Drives the coordinator through its success, failure and interrupt paths
//! with the in-process mock client.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use yarn_submit::mock::{FailureConfig, MockClient, MockOperation, MockScript};
use yarn_submit::{
    ApplicationId, Coordinator, CoordinatorOptions, FileMaterializer, Framework, JobParameters,
    PyTorchParameters, SubmissionError, SubmissionState, TeardownRegistry, TensorFlowParameters,
    WorkerExit,
};

fn tf_params() -> JobParameters {
    let mut tf = TensorFlowParameters::new("mnist", "python train.py --epochs 3");
    tf.num_workers = 2;
    tf.num_ps = 1;
    tf.ps_launch_cmd = Some("python ps.py".to_string());
    JobParameters::TensorFlow(tf)
}

fn options(poll_interval: Duration) -> CoordinatorOptions {
    CoordinatorOptions {
        poll_interval,
        ..CoordinatorOptions::default()
    }
}

fn new_coordinator(
    client: &Arc<MockClient>,
    dir: &Path,
    options: CoordinatorOptions,
) -> Arc<Coordinator> {
    let client: Arc<MockClient> = Arc::clone(client);
    Arc::new(Coordinator::new(
        client,
        Arc::new(FileMaterializer::new(dir)),
        Arc::new(TeardownRegistry::new()),
        options,
    ))
}

fn wait_for_state(coordinator: &Coordinator, state: SubmissionState) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while coordinator.state() != state {
        assert!(Instant::now() < deadline, "timed out waiting for {}", state);
        thread::sleep(Duration::from_millis(5));
    }
}

fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

// =============================================================================
// Preconditions
// =============================================================================

#[test]
fn test_unsupported_framework_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::new());
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(10)));

    let params = JobParameters::PyTorch(PyTorchParameters::new("bert", "python run.py"));
    let err = coordinator.submit(&params).unwrap_err();

    assert!(matches!(err, SubmissionError::UnsupportedFramework(Framework::PyTorch)));
    assert_eq!(err.exit_code(), 10);
    assert_eq!(file_count(dir.path()), 0, "no configuration file may be written");
    assert!(client.init_calls().is_empty());
    assert_eq!(client.start_calls(), 0);
}

#[test]
fn test_config_write_failure_never_touches_client() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::reporting(ApplicationId::new(1, 1)));
    let coordinator = new_coordinator(
        &client,
        &dir.path().join("does-not-exist"),
        options(Duration::from_millis(10)),
    );

    let err = coordinator.submit(&tf_params()).unwrap_err();

    assert!(matches!(err, SubmissionError::ConfigWriteFailure(_)));
    assert!(client.init_calls().is_empty());
    assert_eq!(client.start_calls(), 0);
    assert_eq!(coordinator.state(), SubmissionState::Failed);
    assert!(coordinator.record().failure.is_some());
}

// =============================================================================
// Identifier delivery
// =============================================================================

#[test]
fn test_returns_id_without_waiting_for_worker() {
    let dir = tempfile::tempdir().unwrap();
    let id = ApplicationId::new(1700000000000, 7);
    let client = Arc::new(MockClient::reporting(id));
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(20)));

    assert_eq!(coordinator.submit(&tf_params()).unwrap(), id);

    // The worker is still monitoring the application
    assert_eq!(client.terminate_calls(), 0);
    let record = coordinator.record();
    assert_eq!(record.state, SubmissionState::Completed);
    assert_eq!(record.application_id, Some(id));

    client.finish();
    assert_eq!(coordinator.wait_for_worker(), Some(WorkerExit::Completed));
}

#[test]
fn test_worker_ending_without_id_fails() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::new());
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(10)));

    let err = coordinator.submit(&tf_params()).unwrap_err();

    assert!(matches!(
        err,
        SubmissionError::NoIdentifierReceived(WorkerExit::Completed)
    ));
    assert_eq!(err.exit_code(), 40);
    assert_eq!(client.start_calls(), 1);
    assert_eq!(coordinator.state(), SubmissionState::Failed);
}

#[test]
fn test_repeated_notification_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let first = ApplicationId::new(1700000000000, 1);
    let second = ApplicationId::new(1700000000000, 2);
    let client = Arc::new(MockClient::with_script(MockScript {
        notifications: vec![first, second],
        gated: true,
        hold: true,
        ..MockScript::default()
    }));
    // Long interval: only the interrupt below wakes the poller
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_secs(60)));

    let submitter = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.submit(&tf_params()))
    };

    wait_for_state(&coordinator, SubmissionState::Running);
    thread::sleep(Duration::from_millis(200));
    client.release_start();
    assert!(client.wait_notified(Duration::from_secs(10)));
    coordinator.interrupter().interrupt();

    let result = submitter.join().unwrap();
    assert_eq!(result.unwrap(), second);
    assert_eq!(coordinator.identifier(), Some(second));
    assert_eq!(coordinator.record().application_id, Some(second));

    client.finish();
    assert_eq!(coordinator.wait_for_worker(), Some(WorkerExit::Completed));
}

// =============================================================================
// Interrupt resilience
// =============================================================================

#[test]
fn test_interrupts_do_not_end_polling() {
    let dir = tempfile::tempdir().unwrap();
    let id = ApplicationId::new(1700000000000, 3);
    let client = Arc::new(MockClient::with_script(MockScript {
        notifications: vec![id],
        gated: true,
        hold: true,
        ..MockScript::default()
    }));
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(50)));

    let submitter = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || coordinator.submit(&tf_params()))
    };

    wait_for_state(&coordinator, SubmissionState::Running);
    let interrupter = coordinator.interrupter();
    for _ in 0..5 {
        interrupter.interrupt();
        thread::sleep(Duration::from_millis(20));
    }
    assert!(!submitter.is_finished(), "interrupts must not end the attempt");
    assert_eq!(coordinator.state(), SubmissionState::Running);

    client.release_start();
    assert_eq!(submitter.join().unwrap().unwrap(), id);

    client.finish();
    coordinator.wait_for_worker();
}

// =============================================================================
// Initialization
// =============================================================================

#[test]
fn test_initialization_failure_still_starts_worker() {
    let dir = tempfile::tempdir().unwrap();
    let id = ApplicationId::new(1700000000000, 4);
    let client = Arc::new(MockClient::reporting(id));
    client.inject_error(MockOperation::Initialize, "unreadable configuration");
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(10)));

    assert_eq!(coordinator.submit(&tf_params()).unwrap(), id);
    assert_eq!(client.init_calls().len(), 1);
    assert_eq!(client.start_calls(), 1);

    client.finish();
    coordinator.wait_for_worker();
}

#[test]
fn test_strict_initialization_failure_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MockClient::reporting(ApplicationId::new(1, 1)));
    client.inject_error(MockOperation::Initialize, "unreadable configuration");
    let coordinator = new_coordinator(
        &client,
        dir.path(),
        CoordinatorOptions {
            strict_initialization: true,
            ..options(Duration::from_millis(10))
        },
    );

    let err = coordinator.submit(&tf_params()).unwrap_err();
    assert!(matches!(err, SubmissionError::ClientInitializationFailure(_)));
    assert_eq!(err.exit_code(), 30);
    assert_eq!(client.start_calls(), 0);
    assert_eq!(coordinator.wait_for_worker(), None);
}

#[test]
fn test_strict_initialization_succeeds_once_transient_failure_passes() {
    let dir = tempfile::tempdir().unwrap();
    let id = ApplicationId::new(1700000000000, 13);
    let client = Arc::new(MockClient::reporting(id));
    client.inject_failure(
        MockOperation::Initialize,
        FailureConfig::error("configuration not yet visible").with_fail_count(1),
    );
    let strict = || CoordinatorOptions {
        strict_initialization: true,
        ..options(Duration::from_millis(10))
    };

    let first = new_coordinator(&client, dir.path(), strict());
    let err = first.submit(&tf_params()).unwrap_err();
    assert!(matches!(err, SubmissionError::ClientInitializationFailure(_)));
    assert_eq!(client.start_calls(), 0);

    // A fresh attempt against the same client gets through
    let second = new_coordinator(&client, dir.path(), strict());
    assert_eq!(second.submit(&tf_params()).unwrap(), id);
    assert_eq!(client.init_calls().len(), 2);
    assert_eq!(client.start_calls(), 1);

    client.finish();
    second.wait_for_worker();
}

#[test]
fn test_record_roundtrips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let id = ApplicationId::new(1700000000000, 12);
    let client = Arc::new(MockClient::reporting(id));
    let coordinator = new_coordinator(&client, dir.path(), options(Duration::from_millis(10)));
    coordinator.submit(&tf_params()).unwrap();

    let path = dir.path().join("submission.json");
    coordinator.record().write_to_file(&path).unwrap();
    let json = std::fs::read_to_string(&path).unwrap();
    assert!(json.contains("application_1700000000000_0012"));
    assert!(json.contains(coordinator.attempt_id()));

    client.finish();
    coordinator.wait_for_worker();
}
