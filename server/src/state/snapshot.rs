use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::RwLock;

use crate::triage::InboxSnapshot;

/// Shared handle to the latest inbox snapshot plus a refresh-in-flight flag.
/// Clones are cheap and all point at the same data.
#[derive(Clone)]
pub struct SnapshotStore {
    snapshot: Arc<RwLock<InboxSnapshot>>,
    refresh_in_flight: Arc<AtomicBool>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        SnapshotStore {
            snapshot: Arc::new(RwLock::new(InboxSnapshot::empty())),
            refresh_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current snapshot with the in-flight flag folded in.
    pub async fn read(&self) -> InboxSnapshot {
        let mut snapshot = self.snapshot.read().await.clone();
        snapshot.is_processing = self.is_processing();
        snapshot
    }

    pub async fn replace(&self, snapshot: InboxSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// Claim the refresh slot. Returns false when a refresh is already
    /// running, in which case the caller must not call `end_refresh`.
    pub fn begin_refresh(&self) -> bool {
        self.refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn end_refresh(&self) {
        self.refresh_in_flight.store(false, Ordering::SeqCst);
    }

    pub fn is_processing(&self) -> bool {
        self.refresh_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triage::{build_snapshot, DataSource};

    #[tokio::test]
    async fn test_replace_and_read() {
        let store = SnapshotStore::new();
        assert!(store.read().await.all_emails.is_empty());

        let snapshot = build_snapshot(Vec::new(), "user@example.com", DataSource::Gmail, None);
        store.replace(snapshot).await;
        assert!(!store.read().await.demo_mode);
    }

    #[test]
    fn test_only_one_refresh_claims_the_slot() {
        let store = SnapshotStore::new();
        assert!(store.begin_refresh());
        assert!(!store.begin_refresh());
        assert!(store.is_processing());

        store.end_refresh();
        assert!(!store.is_processing());
        assert!(store.begin_refresh());
    }

    #[tokio::test]
    async fn test_read_reports_in_flight_refresh() {
        let store = SnapshotStore::new();
        assert!(!store.read().await.is_processing);
        store.begin_refresh();
        assert!(store.read().await.is_processing);
        store.end_refresh();
    }
}
