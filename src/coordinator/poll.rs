//! Interruptible poll wait

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::time::Duration;

use crate::sync::lock;

/// Default interval between identifier checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How a poll wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Elapsed,
    Interrupted,
}

/// Sleep that another thread can cut short
#[derive(Debug)]
pub struct PollSignal {
    tx: Sender<()>,
    rx: Mutex<Receiver<()>>,
}

impl PollSignal {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            tx: self.tx.clone(),
        }
    }

    /// Wait for `timeout` or until interrupted; one interrupt wakes one wait
    pub fn wait(&self, timeout: Duration) -> WaitOutcome {
        match lock(&self.rx).recv_timeout(timeout) {
            Ok(()) => WaitOutcome::Interrupted,
            Err(RecvTimeoutError::Timeout) => WaitOutcome::Elapsed,
            // Unreachable while `self.tx` is alive
            Err(RecvTimeoutError::Disconnected) => {
                std::thread::sleep(timeout);
                WaitOutcome::Elapsed
            }
        }
    }
}

impl Default for PollSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for waking a coordinator's poll wait early
#[derive(Debug, Clone)]
pub struct Interrupter {
    tx: Sender<()>,
}

impl Interrupter {
    pub fn interrupt(&self) {
        // The coordinator is gone if this fails; nothing left to wake
        let _ = self.tx.send(());
    }
}
