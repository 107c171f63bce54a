//! Drains the local pending queue into the remote store.
//!
//! Entries are written one at a time, in insertion order, each carrying its
//! correlation id as an embedded field (the remote store assigns its own
//! document id). On the first failing write the whole run stops: nothing
//! commits after a record that failed, so commit order always equals enqueue
//! order. The failed entry and everything behind it stay queued for the next
//! trigger.
//!
//! Drains are triggered by connectivity restoration, by a successful new
//! enqueue, or manually; the engine itself only exposes [`SyncEngine::drain`]
//! and leaves the triggering to the embedding application. A drain already
//! in flight makes a concurrent trigger a no-op (see [`DrainReport::skipped`])
//! rather than queueing a second run.

use crate::queue::PendingQueue;
use crate::store::{RemoteStore, WriteOutcome};
use common::error::CoreError;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// What one drain run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Entries for which a remote write was attempted.
    pub attempted: usize,
    /// Entries confirmed remotely and removed from the queue.
    pub committed: usize,
    /// True when the trigger was ignored because a drain was in flight.
    pub skipped: bool,
}

impl DrainReport {
    pub(crate) fn skipped() -> Self {
        DrainReport {
            attempted: 0,
            committed: 0,
            skipped: true,
        }
    }
}

pub struct SyncEngine<R: RemoteStore> {
    queue: Arc<PendingQueue>,
    remote: Arc<R>,
    draining: AtomicBool,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(queue: Arc<PendingQueue>, remote: Arc<R>) -> Self {
        SyncEngine {
            queue,
            remote,
            draining: AtomicBool::new(false),
        }
    }

    /// Push every pending entry to the remote store, stopping at the first
    /// failure. Never invoked concurrently with itself: a trigger landing
    /// while a drain runs returns immediately with a skipped report.
    pub async fn drain(&self) -> Result<DrainReport, CoreError> {
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("sync drain already in flight, trigger ignored");
            return Ok(DrainReport::skipped());
        }
        let result = self.drain_inner().await;
        self.draining.store(false, Ordering::SeqCst);
        result
    }

    async fn drain_inner(&self) -> Result<DrainReport, CoreError> {
        let entries = self.queue.list()?;
        let mut report = DrainReport {
            attempted: 0,
            committed: 0,
            skipped: false,
        };

        for entry in entries {
            report.attempted += 1;
            match self.remote.insert_record(&entry.record).await {
                Ok(outcome) => {
                    if outcome == WriteOutcome::AlreadyPresent {
                        // An earlier run committed this entry but crashed or
                        // lost the ack before removing it locally.
                        debug!(
                            "correlation id {} already remote, deduplicated",
                            entry.correlation_id
                        );
                    }
                    self.queue.remove(&entry.correlation_id)?;
                    report.committed += 1;
                }
                Err(e) => {
                    // Halt here: committing later entries would break the
                    // commit-order-equals-enqueue-order guarantee.
                    warn!(
                        "sync halted at correlation id {}: {} ({} of {} committed)",
                        entry.correlation_id, e, report.committed, report.attempted
                    );
                    break;
                }
            }
        }

        if report.committed > 0 {
            info!(
                "sync drain committed {} of {} pending entries",
                report.committed, report.attempted
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRemote;
    use common::model::record::MeasurementRecord;

    fn record(corr: &str) -> MeasurementRecord {
        MeasurementRecord {
            client_id: "c1".to_string(),
            area: "Recepção".to_string(),
            waste_type: "Rejeito".to_string(),
            waste_sub_type: None,
            weight_kg: 2.0,
            collector_id: "col-1".to_string(),
            created_at_ms: 1_700_000_000_000,
            submitted_by: "user-1".to_string(),
            correlation_id: corr.to_string(),
        }
    }

    fn setup() -> (Arc<PendingQueue>, Arc<MemoryRemote>, SyncEngine<MemoryRemote>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let queue = Arc::new(PendingQueue::open_in_memory().unwrap());
        let remote = Arc::new(MemoryRemote::new());
        let engine = SyncEngine::new(queue.clone(), remote.clone());
        (queue, remote, engine)
    }

    #[tokio::test]
    async fn drain_commits_in_enqueue_order_and_empties_queue() {
        let (queue, remote, engine) = setup();
        for corr in ["a", "b", "c"] {
            queue.enqueue(record(corr)).unwrap();
        }
        let report = engine.drain().await.unwrap();
        assert_eq!((report.attempted, report.committed), (3, 3));
        assert!(queue.is_empty().unwrap());
        assert_eq!(remote.record_count(), 3);
    }

    #[tokio::test]
    async fn draining_twice_leaves_exactly_one_remote_copy() {
        let (queue, remote, engine) = setup();
        queue.enqueue(record("r")).unwrap();
        engine.drain().await.unwrap();
        // Re-enqueue as if the ack had been lost after the commit.
        queue.enqueue(record("r")).unwrap();
        let report = engine.drain().await.unwrap();
        assert_eq!(report.committed, 1);
        assert_eq!(remote.record_count_for("r"), 1);
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn first_failure_halts_the_run() {
        let (queue, remote, engine) = setup();
        for corr in ["a", "b", "c"] {
            queue.enqueue(record(corr)).unwrap();
        }
        remote.fail_writes_for("b");

        let report = engine.drain().await.unwrap();
        assert_eq!((report.attempted, report.committed), (2, 1));
        assert_eq!(remote.record_count_for("a"), 1);
        assert_eq!(remote.record_count_for("b"), 0);
        assert_eq!(remote.record_count_for("c"), 0);
        // b and c stay queued, in order, for the next trigger.
        let remaining: Vec<String> = queue
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.correlation_id)
            .collect();
        assert_eq!(remaining, ["b", "c"]);

        remote.clear_write_failures();
        let report = engine.drain().await.unwrap();
        assert_eq!((report.attempted, report.committed), (2, 2));
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn drain_of_empty_queue_is_a_noop() {
        let (_queue, remote, engine) = setup();
        let report = engine.drain().await.unwrap();
        assert_eq!((report.attempted, report.committed), (0, 0));
        assert!(!report.skipped);
        assert_eq!(remote.record_count(), 0);
    }
}
