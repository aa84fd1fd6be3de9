//! Mock Submission Client Implementation
//!
//! Scripted client for driving the coordinator through every path without a
//! cluster. `start` runs through these phases:
//! 1. wait for [`MockClient::release_start`] (when gated)
//! 2. report the scripted application ids, then open the `notified` latch
//! 3. panic (when scripted)
//! 4. block until [`MockClient::finish`] or `force_terminate` (when held)

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::appid::ApplicationId;
use crate::client::{ClientError, CompletionNotifier, SubmissionClient};
use crate::sync::lock;

use super::failure::{FailureConfig, FailureInjector, MockOperation};

/// One-way latch: once opened, every waiter proceeds
#[derive(Debug, Default)]
pub struct Latch {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        *lock(&self.open) = true;
        self.cv.notify_all();
    }

    pub fn is_open(&self) -> bool {
        *lock(&self.open)
    }

    pub fn wait(&self) {
        let mut open = lock(&self.open);
        while !*open {
            open = self.cv.wait(open).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Wait up to `timeout`; returns whether the latch is open
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let open = lock(&self.open);
        let (open, _) = self
            .cv
            .wait_timeout_while(open, timeout, |open| !*open)
            .unwrap_or_else(|e| e.into_inner());
        *open
    }
}

/// What `start` does when called
#[derive(Debug, Clone, Default)]
pub struct MockScript {
    /// Ids reported to the notifier, in order
    pub notifications: Vec<ApplicationId>,
    /// Wait for `release_start` before reporting
    pub gated: bool,
    /// Keep running after reporting until finished or terminated
    pub hold: bool,
    /// Panic with this message after reporting
    pub panic_message: Option<String>,
}

/// Configurable mock submission client for testing
#[derive(Debug, Default)]
pub struct MockClient {
    script: MockScript,
    failures: Mutex<FailureInjector>,
    init_calls: Mutex<Vec<Vec<String>>>,
    start_calls: AtomicUsize,
    terminate_calls: AtomicUsize,
    start_gate: Latch,
    notified: Latch,
    finished: Latch,
}

impl MockClient {
    /// Client whose `start` returns immediately without reporting an id
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: MockScript) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    /// Report `id` and keep running until finished or terminated
    pub fn reporting(id: ApplicationId) -> Self {
        Self::with_script(MockScript {
            notifications: vec![id],
            hold: true,
            ..MockScript::default()
        })
    }

    // === Public API for test configuration ===

    /// Inject an error for an operation
    pub fn inject_error(&self, op: MockOperation, message: &str) {
        lock(&self.failures).inject_error(op, message);
    }

    /// Inject a failure configuration for an operation
    pub fn inject_failure(&self, op: MockOperation, config: FailureConfig) {
        lock(&self.failures).inject(op, config);
    }

    /// Remove every injected failure
    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Let a gated `start` proceed to reporting
    pub fn release_start(&self) {
        self.start_gate.open();
    }

    /// Let a held `start` return, as if the application finished
    pub fn finish(&self) {
        self.finished.open();
    }

    /// Wait until `start` has reported every scripted id
    pub fn wait_notified(&self, timeout: Duration) -> bool {
        self.notified.wait_timeout(timeout)
    }

    // === Recorded calls ===

    pub fn init_calls(&self) -> Vec<Vec<String>> {
        lock(&self.init_calls).clone()
    }

    pub fn start_calls(&self) -> usize {
        self.start_calls.load(Ordering::SeqCst)
    }

    pub fn terminate_calls(&self) -> usize {
        self.terminate_calls.load(Ordering::SeqCst)
    }

    fn check(&self, op: MockOperation) -> Option<String> {
        let (delay, failure) = {
            let mut failures = lock(&self.failures);
            (failures.get_delay(op), failures.check(op))
        };
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        failure
    }
}

impl SubmissionClient for MockClient {
    fn initialize(&self, args: &[String]) -> Result<(), ClientError> {
        lock(&self.init_calls).push(args.to_vec());
        match self.check(MockOperation::Initialize) {
            Some(message) => Err(ClientError::Initialization(message)),
            None => Ok(()),
        }
    }

    fn start(&self, notifier: &dyn CompletionNotifier) {
        self.start_calls.fetch_add(1, Ordering::SeqCst);

        if self.script.gated {
            self.start_gate.wait();
        }
        for id in &self.script.notifications {
            notifier.on_identifier_received(*id);
        }
        self.notified.open();

        if let Some(message) = &self.script.panic_message {
            panic!("{}", message);
        }
        if self.script.hold {
            self.finished.wait();
        }
    }

    fn force_terminate(&self) -> Result<(), ClientError> {
        self.terminate_calls.fetch_add(1, Ordering::SeqCst);
        let failure = self.check(MockOperation::ForceTerminate);
        // The application is gone either way from the client's point of view
        self.finished.open();
        match failure {
            Some(message) => Err(ClientError::ResourceManager(message)),
            None => Ok(()),
        }
    }
}
