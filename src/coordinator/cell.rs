//! Shared slot for the application id reported by the submission client

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::appid::ApplicationId;
use crate::client::CompletionNotifier;
use crate::sync::lock;

/// Written by the client's thread, polled by the coordinator's
///
/// Repeated notifications overwrite the stored id (last write wins).
#[derive(Debug, Default)]
pub struct IdentifierCell {
    value: Mutex<Option<ApplicationId>>,
    notifications: AtomicU64,
}

impl IdentifierCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current id, if any has been reported
    pub fn get(&self) -> Option<ApplicationId> {
        *lock(&self.value)
    }

    /// How many times an id has been reported
    pub fn notifications(&self) -> u64 {
        self.notifications.load(Ordering::SeqCst)
    }

    pub fn record(&self, id: ApplicationId) {
        let previous = lock(&self.value).replace(id);
        self.notifications.fetch_add(1, Ordering::SeqCst);
        match previous {
            None => info!(application_id = %id, "received application id"),
            Some(previous) if previous == id => {
                info!(application_id = %id, "application id reported again")
            }
            Some(previous) => {
                warn!(%previous, application_id = %id, "application id overwritten")
            }
        }
    }
}

impl CompletionNotifier for IdentifierCell {
    fn on_identifier_received(&self, id: ApplicationId) {
        self.record(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_empty_until_notified() {
        let cell = IdentifierCell::new();
        assert_eq!(cell.get(), None);
        assert_eq!(cell.notifications(), 0);

        cell.on_identifier_received(ApplicationId::new(1, 1));
        assert_eq!(cell.get(), Some(ApplicationId::new(1, 1)));
        assert_eq!(cell.notifications(), 1);
    }

    #[test]
    fn test_last_write_wins() {
        let cell = IdentifierCell::new();
        cell.record(ApplicationId::new(1, 1));
        cell.record(ApplicationId::new(1, 2));
        cell.record(ApplicationId::new(1, 2));
        assert_eq!(cell.get(), Some(ApplicationId::new(1, 2)));
        assert_eq!(cell.notifications(), 3);
    }

    #[test]
    fn test_written_from_another_thread() {
        let cell = Arc::new(IdentifierCell::new());
        let writer = Arc::clone(&cell);
        std::thread::spawn(move || writer.on_identifier_received(ApplicationId::new(7, 9)))
            .join()
            .unwrap();
        assert_eq!(cell.get(), Some(ApplicationId::new(7, 9)));
    }
}
