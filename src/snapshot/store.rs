use std::sync::{Arc, RwLock};

use super::Snapshot;

/// Holds the single current [`Snapshot`].
///
/// Publishing swaps one `Arc`; reading clones it. The lock is never held
/// across anything but that pointer operation, so readers and the publisher
/// cannot block each other meaningfully, and a reader holding a snapshot is
/// unaffected by later publishes.
#[derive(Debug)]
pub struct SnapshotStore {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotStore {
    /// Creates a store primed with the cold-start snapshot.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Replaces the current snapshot in a single indivisible step.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut current = self.current.write().expect("snapshot lock poisoned");
        *current = Arc::new(snapshot);
    }

    /// Returns the latest published snapshot.
    pub fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.read().expect("snapshot lock poisoned"))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
