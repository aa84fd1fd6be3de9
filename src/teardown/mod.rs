//! Process teardown hooks
//!
//! A submission attempt registers a hook that kills its cluster application
//! should the host process go away while the application may still be
//! running. Hooks run when:
//! 1. SIGINT/SIGTERM arrives (the process then exits with code 130; a second
//!    signal exits at once)
//! 2. the main thread panics (before the previous panic hook runs)
//! 3. the host calls [`TeardownRegistry::run_all`] on its way out
//!
//! Each hook runs at most once. Dropping the [`TeardownGuard`] returned by
//! registration removes a hook that is no longer needed.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{error, info, warn};

use crate::client::ClientError;
use crate::sync::lock;

/// Exit code after teardown triggered by a signal
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Teardown errors
#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("force terminate failed: {0}")]
    ForceTerminate(#[from] ClientError),

    #[error("teardown hook panicked: {0}")]
    Panicked(String),

    #[error("failed to install signal handler: {0}")]
    SignalHandler(#[from] ctrlc::Error),
}

/// What triggered a teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    Signal,
    Panic,
    Exit,
}

impl std::fmt::Display for TeardownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeardownReason::Signal => write!(f, "signal"),
            TeardownReason::Panic => write!(f, "panic"),
            TeardownReason::Exit => write!(f, "exit"),
        }
    }
}

type Hook = Box<dyn FnOnce() -> Result<(), TeardownError> + Send>;

/// Outcome of running the registered hooks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub ran: usize,
    pub failed: usize,
}

/// Registry of one-shot cleanup actions
#[derive(Default)]
pub struct TeardownRegistry {
    hooks: Mutex<BTreeMap<u64, (String, Hook)>>,
    next_id: AtomicU64,
}

impl TeardownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry wired to process signals and panics by [`install_process_hooks`]
    pub fn global() -> Arc<TeardownRegistry> {
        static GLOBAL: OnceLock<Arc<TeardownRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TeardownRegistry::new())))
    }

    /// Register a hook; it stays registered until run or until the guard drops
    pub fn register<F>(self: &Arc<Self>, name: impl Into<String>, hook: F) -> TeardownGuard
    where
        F: FnOnce() -> Result<(), TeardownError> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let name = name.into();
        info!(hook = %name, "registered teardown hook");
        lock(&self.hooks).insert(id, (name, Box::new(hook)));
        TeardownGuard {
            registry: Arc::clone(self),
            id,
            detached: false,
        }
    }

    /// Number of hooks still waiting to run
    pub fn pending(&self) -> usize {
        lock(&self.hooks).len()
    }

    pub fn pending_names(&self) -> Vec<String> {
        lock(&self.hooks).values().map(|(name, _)| name.clone()).collect()
    }

    /// Drop every hook without running it; returns how many were dropped
    pub fn disarm_all(&self) -> usize {
        let hooks = std::mem::take(&mut *lock(&self.hooks));
        if !hooks.is_empty() {
            info!(count = hooks.len(), "disarmed teardown hooks");
        }
        hooks.len()
    }

    /// Run every registered hook once, in registration order
    ///
    /// Failures and panics are logged and counted, never propagated.
    pub fn run_all(&self, reason: TeardownReason) -> TeardownReport {
        let hooks = std::mem::take(&mut *lock(&self.hooks));
        let mut report = TeardownReport::default();
        if hooks.is_empty() {
            return report;
        }

        warn!(%reason, count = hooks.len(), "running teardown hooks");
        for (_, (name, hook)) in hooks {
            report.ran += 1;
            let result = panic::catch_unwind(AssertUnwindSafe(hook))
                .unwrap_or_else(|payload| Err(TeardownError::Panicked(panic_message(&*payload))));
            match result {
                Ok(()) => info!(hook = %name, "teardown hook completed"),
                Err(e) => {
                    report.failed += 1;
                    error!(hook = %name, error = %e, "teardown hook failed");
                }
            }
        }
        report
    }

    fn deregister(&self, id: u64) {
        if let Some((name, _)) = lock(&self.hooks).remove(&id) {
            info!(hook = %name, "deregistered teardown hook");
        }
    }
}

impl std::fmt::Debug for TeardownRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeardownRegistry")
            .field("pending", &self.pending_names())
            .finish()
    }
}

/// Keeps a hook registered; dropping it deregisters the hook
#[derive(Debug)]
#[must_use = "dropping the guard deregisters the hook immediately"]
pub struct TeardownGuard {
    registry: Arc<TeardownRegistry>,
    id: u64,
    detached: bool,
}

impl TeardownGuard {
    /// Whether the hook is still waiting to run
    pub fn is_armed(&self) -> bool {
        lock(&self.registry.hooks).contains_key(&self.id)
    }

    /// Give up the guard but leave the hook registered
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.detached {
            self.registry.deregister(self.id);
        }
    }
}

/// Extract a readable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

static SIGNAL_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Whether a termination signal has started teardown
pub fn signal_received() -> bool {
    SIGNAL_RECEIVED.load(Ordering::SeqCst)
}

/// Park the calling thread while signal teardown runs
///
/// The teardown thread ends the process with [`EXIT_CODE_INTERRUPTED`].
pub fn await_signal_exit() -> ! {
    loop {
        std::thread::park();
    }
}

/// Wire `registry` to SIGINT/SIGTERM and to main-thread panics
///
/// Must be called once at program startup; later calls are no-ops.
pub fn install_process_hooks(registry: Arc<TeardownRegistry>) -> Result<(), TeardownError> {
    static INSTALLED: AtomicBool = AtomicBool::new(false);
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }

    let on_signal = Arc::clone(&registry);
    let signal_count = AtomicU8::new(0);
    ctrlc::set_handler(move || {
        // Second signal: exit now, hooks may still be running
        if signal_count.fetch_add(1, Ordering::SeqCst) > 0 {
            warn!("received second termination signal, exiting immediately");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        }
        warn!("received termination signal");
        SIGNAL_RECEIVED.store(true, Ordering::SeqCst);
        let registry = Arc::clone(&on_signal);
        std::thread::spawn(move || {
            let report = registry.run_all(TeardownReason::Signal);
            info!(ran = report.ran, failed = report.failed, "teardown finished, exiting");
            std::process::exit(EXIT_CODE_INTERRUPTED);
        });
    })?;

    // Only a main-thread panic takes the process down
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if std::thread::current().name() == Some("main") {
            registry.run_all(TeardownReason::Panic);
        }
        previous(info);
    }));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_hook(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> Result<(), TeardownError> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_run_all_runs_each_hook_once() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let _a = registry.register("a", counting_hook(&counter));
        let _b = registry.register("b", counting_hook(&counter));

        let report = registry.run_all(TeardownReason::Exit);
        assert_eq!(report, TeardownReport { ran: 2, failed: 0 });
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        let report = registry.run_all(TeardownReason::Exit);
        assert_eq!(report, TeardownReport::default());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dropping_guard_deregisters() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = registry.register("kill", counting_hook(&counter));
        assert!(guard.is_armed());
        assert_eq!(registry.pending(), 1);

        drop(guard);
        assert_eq!(registry.pending(), 0);
        registry.run_all(TeardownReason::Exit);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_guard_drop_after_run_is_noop() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let guard = registry.register("kill", counting_hook(&counter));
        registry.run_all(TeardownReason::Signal);
        assert!(!guard.is_armed());
        drop(guard);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failures_and_panics_do_not_stop_other_hooks() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let _failing = registry.register("failing", || {
            Err(TeardownError::ForceTerminate(ClientError::ResourceManager(
                "connection refused".to_string(),
            )))
        });
        let _panicking = registry.register("panicking", || panic!("boom"));
        let _ok = registry.register("ok", counting_hook(&counter));

        let report = registry.run_all(TeardownReason::Panic);
        assert_eq!(report, TeardownReport { ran: 3, failed: 2 });
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_hook_stays_registered() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        registry.register("kill", counting_hook(&counter)).detach();
        assert_eq!(registry.pending(), 1);

        registry.run_all(TeardownReason::Exit);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disarm_all() {
        let registry = Arc::new(TeardownRegistry::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let _guard = registry.register("kill", counting_hook(&counter));
        assert_eq!(registry.pending_names(), vec!["kill".to_string()]);

        assert_eq!(registry.disarm_all(), 1);
        registry.run_all(TeardownReason::Exit);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_message() {
        let payload = panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static message");
        let payload = panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 42");
    }
}
