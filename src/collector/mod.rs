//! The collection engine: periodic enumeration of the container population,
//! bounded parallel metric fetches, and reconciliation into a fresh
//! immutable snapshot each cycle.
//!
//! Failure containment is the whole design: a single container's failed
//! fetch downgrades that one entry (reusing its last-known-good values when
//! there are any), while a failed enumeration leaves the previous snapshot
//! serving with a cycle-level error recorded. Neither ever crashes the
//! process or blocks a scrape.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::container::{ContainerID, ContainerRef};
use crate::metrics::{FileMetric, ResourceMetric};
use crate::runtime::{ErrorKind, RuntimeClient};
use crate::snapshot::{self, ContainerEntry, Snapshot, SnapshotStore};

/// Drives collection cycles and publishes their results.
pub struct Engine {
    client: Arc<dyn RuntimeClient>,
    store: Arc<SnapshotStore>,
    interval: Duration,
    worker_limit: usize,
    refresh: Arc<Notify>,
}

impl Engine {
    pub fn new(
        client: Arc<dyn RuntimeClient>,
        store: Arc<SnapshotStore>,
        interval: Duration,
        worker_limit: usize,
    ) -> Self {
        Self {
            client,
            store,
            interval,
            worker_limit,
            refresh: Arc::new(Notify::new()),
        }
    }

    /// Handle for nudging the engine when a scrape observes a stale
    /// snapshot. Notifications are coalesced and never block the sender.
    pub fn refresh_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.refresh)
    }

    /// Runs collection cycles until the surrounding task is dropped.
    ///
    /// The first tick fires immediately, so the cold-start snapshot is
    /// replaced as soon as the runtime answers.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.refresh.notified() => {
                    let now = snapshot::now_epoch_secs();
                    if !self.store.current().is_stale(now, self.interval.as_secs()) {
                        continue;
                    }
                    log::debug!("refreshing stale snapshot on scrape request");
                }
            }

            self.collect_once().await;
        }
    }

    /// Executes one collection cycle and publishes its snapshot.
    pub async fn collect_once(&self) {
        let previous = self.store.current();

        let containers = match self.client.list_containers().await {
            Ok(containers) => containers,
            Err(err) => {
                log::error!("failed to enumerate containers: {}", err);
                self.store.publish(previous.with_cycle_error(err.kind()));
                return;
            }
        };

        let started_at = snapshot::now_epoch_secs();
        let mut results = self.fetch_all(&containers).await;

        let mut entries = BTreeMap::new();
        for container in containers {
            let id = container.id().clone();
            let entry = match results.remove(&id) {
                Some(Ok((files, resources))) => {
                    ContainerEntry::collected(container, files, resources, started_at)
                }
                Some(Err(kind)) => downgrade(&previous, container, kind, started_at),
                // Straggler past the cycle deadline counts as a timeout.
                None => downgrade(&previous, container, ErrorKind::Timeout, started_at),
            };
            entries.insert(id, entry);
        }

        let generation = previous.generation() + 1;
        let entry_count = entries.len();
        self.store
            .publish(Snapshot::new(entries, generation, snapshot::now_epoch_secs()));
        log::debug!(
            "published snapshot generation {} with {} entries",
            generation,
            entry_count
        );
    }

    /// Fans out per-container fetches, bounded by the worker limit and the
    /// cycle deadline. Containers missing from the result map did not finish
    /// in time; their tasks are detached, not aborted.
    async fn fetch_all(&self, containers: &[ContainerRef]) -> HashMap<ContainerID, FetchResult> {
        let semaphore = Arc::new(Semaphore::new(self.worker_limit));
        let mut tasks = JoinSet::new();
        for container in containers {
            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let id = container.id().clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("fetch semaphore closed");
                let result = fetch_container(client.as_ref(), &id).await;
                (id, result)
            });
        }

        let deadline = tokio::time::Instant::now() + self.interval;
        let mut results = HashMap::with_capacity(containers.len());
        while !tasks.is_empty() {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((id, result)))) => {
                    results.insert(id, result);
                }
                Ok(Some(Err(err))) => {
                    // A panicked fetch is an invariant violation; let it take
                    // the engine down so the supervisor restarts the process.
                    if err.is_panic() {
                        std::panic::resume_unwind(err.into_panic());
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    log::warn!(
                        "collection deadline reached with {} fetches outstanding",
                        tasks.len()
                    );
                    tasks.detach_all();
                    break;
                }
            }
        }

        results
    }
}

type FetchResult = Result<(Vec<FileMetric>, ResourceMetric), ErrorKind>;

/// Fetches both metric families for one container; either failing downgrades
/// the whole container for this cycle.
async fn fetch_container(client: &dyn RuntimeClient, id: &ContainerID) -> FetchResult {
    let (files, resources) = tokio::join!(
        client.fetch_file_metrics(id),
        client.fetch_resource_metrics(id)
    );

    match (files, resources) {
        (Ok(files), Ok(resources)) => Ok((files, resources)),
        (Err(err), _) | (_, Err(err)) => {
            log::warn!("failed to collect metrics for container `{}`: {}", id, err);
            Err(err.kind())
        }
    }
}

/// Entry for a container whose fetch failed this cycle: last-known-good
/// values with an error marker when the previous snapshot has them, an empty
/// errored entry otherwise.
fn downgrade(
    previous: &Snapshot,
    container: ContainerRef,
    error: ErrorKind,
    now: u64,
) -> ContainerEntry {
    match previous.get(container.id()) {
        Some(prev) => ContainerEntry::carried_forward(prev, container, error),
        None => ContainerEntry::failed(container, error, now),
    }
}
