//! Immutable point-in-time snapshots of the container population and the
//! store that publishes them.
//!
//! A [`Snapshot`] is never mutated after construction; the collection engine
//! builds a wholly new one each cycle and swaps it in through the
//! [`SnapshotStore`]. That single invariant is what lets scrape handlers and
//! the collector run without any shared locking beyond a pointer swap.

use std::collections::BTreeMap;

mod store;

pub use store::SnapshotStore;

use crate::container::{ContainerID, ContainerRef};
use crate::metrics::{FileMetric, ResourceMetric};
use crate::runtime::ErrorKind;

/// Metrics and error state for one container at collection time.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    container: ContainerRef,
    files: Vec<FileMetric>,
    resources: Option<ResourceMetric>,
    /// When the carried metric values were actually collected (UNIX epoch
    /// seconds); under carry-forward this lags the snapshot's timestamp.
    collected_at: u64,
    error: Option<ErrorKind>,
}

impl ContainerEntry {
    /// Entry for a successful per-container collection.
    pub fn collected(
        container: ContainerRef,
        files: Vec<FileMetric>,
        resources: ResourceMetric,
        collected_at: u64,
    ) -> Self {
        Self {
            container,
            files,
            resources: Some(resources),
            collected_at,
            error: None,
        }
    }

    /// Entry for a container whose fetch failed with no prior data to fall
    /// back on.
    pub fn failed(container: ContainerRef, error: ErrorKind, collected_at: u64) -> Self {
        Self {
            container,
            files: Vec::new(),
            resources: None,
            collected_at,
            error: Some(error),
        }
    }

    /// Entry reusing the previous cycle's metric values after a failed
    /// fetch, marked with the failure.
    pub fn carried_forward(previous: &ContainerEntry, container: ContainerRef, error: ErrorKind) -> Self {
        Self {
            container,
            files: previous.files.clone(),
            resources: previous.resources,
            collected_at: previous.collected_at,
            error: Some(error),
        }
    }

    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn files(&self) -> &[FileMetric] {
        &self.files
    }

    pub fn resources(&self) -> Option<&ResourceMetric> {
        self.resources.as_ref()
    }

    pub fn collected_at(&self) -> u64 {
        self.collected_at
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.error
    }
}

/// One published collection result: every container known at collection
/// time, keyed by id.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: BTreeMap<ContainerID, ContainerEntry>,
    /// Counts successful collections; 0 is the cold-start snapshot.
    generation: u64,
    /// UNIX epoch seconds of the last successful collection.
    generated_at: u64,
    cycle_error: Option<ErrorKind>,
}

impl Snapshot {
    /// The cold-start snapshot served before any collection has completed.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
            generation: 0,
            generated_at: 0,
            cycle_error: None,
        }
    }

    pub fn new(
        entries: BTreeMap<ContainerID, ContainerEntry>,
        generation: u64,
        generated_at: u64,
    ) -> Self {
        Self {
            entries,
            generation,
            generated_at,
            cycle_error: None,
        }
    }

    /// The snapshot republished when a whole cycle fails: same entries, same
    /// generation and timestamp, with the cycle-level error recorded.
    pub fn with_cycle_error(&self, error: ErrorKind) -> Self {
        Self {
            entries: self.entries.clone(),
            generation: self.generation,
            generated_at: self.generated_at,
            cycle_error: Some(error),
        }
    }

    pub fn entries(&self) -> &BTreeMap<ContainerID, ContainerEntry> {
        &self.entries
    }

    pub fn get(&self, id: &ContainerID) -> Option<&ContainerEntry> {
        self.entries.get(id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn generated_at(&self) -> u64 {
        self.generated_at
    }

    pub fn cycle_error(&self) -> Option<ErrorKind> {
        self.cycle_error
    }

    /// Whether no successful collection happened within the given interval.
    pub fn is_stale(&self, now: u64, interval_secs: u64) -> bool {
        self.generation == 0 || now.saturating_sub(self.generated_at) > interval_secs
    }
}

/// Current time as UNIX epoch seconds.
pub fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs()
}
