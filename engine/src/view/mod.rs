//! The unified record view: pending and remote records merged into one
//! de-duplicated, newest-first list.
//!
//! Screens like the operational log need individual entries, not aggregates,
//! and they need them whether or not the entries have synced yet. The merge
//! is a pure function of the current queue and the requested remote page:
//! remote records whose correlation id is still pending are subtracted, so a
//! record never shows twice, and a record that has just been confirmed
//! remotely swaps sides without a visible gap or duplicate (the local entry
//! is deleted in the same logical step that the remote copy becomes
//! visible).
//!
//! Recompute on every queue-changed notification
//! ([`crate::queue::PendingQueue::subscribe_changes`]) and on every new
//! remote snapshot; the two triggers may interleave freely because each
//! recomputation starts from current state.

use crate::queue::PendingQueue;
use crate::store::RemoteStore;
use common::error::CoreError;
use common::model::record::MeasurementRecord;
use std::collections::HashSet;
use std::sync::Arc;

/// Options for one view computation.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    /// Maximum size of the remote portion.
    pub page_size: usize,
    /// Continue the remote portion strictly before this timestamp. Pending
    /// entries are only folded in on the first page (`None`): they are
    /// expected to be few and are never paginated.
    pub before_ms: Option<i64>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        ViewOptions {
            page_size: 50,
            before_ms: None,
        }
    }
}

/// The merged result of one computation.
#[derive(Debug, Clone)]
pub struct RecordView {
    /// Pending ∪ (remote − pending), newest first.
    pub records: Vec<MeasurementRecord>,
    /// Cursor to continue the remote portion, when more remote records exist.
    pub next_before_ms: Option<i64>,
    /// The client's unsynced count at computation time.
    pub pending_count: usize,
}

pub struct UnifiedRecordView<R: RemoteStore> {
    queue: Arc<PendingQueue>,
    remote: Arc<R>,
}

impl<R: RemoteStore> UnifiedRecordView<R> {
    pub fn new(queue: Arc<PendingQueue>, remote: Arc<R>) -> Self {
        UnifiedRecordView { queue, remote }
    }

    /// Compute the merged view for one client.
    pub async fn view(
        &self,
        client_id: &str,
        options: &ViewOptions,
    ) -> Result<RecordView, CoreError> {
        let pending = self.queue.list_for_client(client_id)?;
        let pending_count = pending.len();
        let pending_ids: HashSet<&str> =
            pending.iter().map(|e| e.correlation_id.as_str()).collect();

        let page = self
            .remote
            .records_page(client_id, options.page_size, options.before_ms)
            .await?;

        let mut records: Vec<MeasurementRecord> = page
            .records
            .into_iter()
            .filter(|r| !pending_ids.contains(r.correlation_id.as_str()))
            .collect();

        if options.before_ms.is_none() {
            records.extend(pending.into_iter().map(|e| e.record));
        }
        records.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));

        Ok(RecordView {
            records,
            next_before_ms: page.next_before_ms,
            pending_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryRemote;

    fn record(corr: &str, created_at_ms: i64) -> MeasurementRecord {
        MeasurementRecord {
            client_id: "c1".to_string(),
            area: "Cozinha".to_string(),
            waste_type: "Orgânico".to_string(),
            waste_sub_type: Some("Pré-preparo".to_string()),
            weight_kg: 1.5,
            collector_id: "col-1".to_string(),
            created_at_ms,
            submitted_by: "user-1".to_string(),
            correlation_id: corr.to_string(),
        }
    }

    fn setup() -> (Arc<PendingQueue>, Arc<MemoryRemote>, UnifiedRecordView<MemoryRemote>) {
        let queue = Arc::new(PendingQueue::open_in_memory().unwrap());
        let remote = Arc::new(MemoryRemote::new());
        let view = UnifiedRecordView::new(queue.clone(), remote.clone());
        (queue, remote, view)
    }

    #[tokio::test]
    async fn merges_newest_first_across_sources() {
        let (queue, remote, view) = setup();
        remote.seed_record(record("remote-old", 100));
        remote.seed_record(record("remote-new", 300));
        queue.enqueue(record("pending-mid", 200)).unwrap();

        let result = view.view("c1", &ViewOptions::default()).await.unwrap();
        let ids: Vec<&str> = result
            .records
            .iter()
            .map(|r| r.correlation_id.as_str())
            .collect();
        assert_eq!(ids, ["remote-new", "pending-mid", "remote-old"]);
        assert_eq!(result.pending_count, 1);
    }

    #[tokio::test]
    async fn a_record_never_shows_twice() {
        let (queue, remote, view) = setup();
        // The same correlation id is both queued and already remote, the
        // window between remote confirmation and local removal.
        queue.enqueue(record("dup", 200)).unwrap();
        remote.seed_record(record("dup", 200));
        remote.seed_record(record("other", 100));

        let result = view.view("c1", &ViewOptions::default()).await.unwrap();
        let dup_count = result
            .records
            .iter()
            .filter(|r| r.correlation_id == "dup")
            .count();
        assert_eq!(dup_count, 1);
        assert_eq!(result.records.len(), 2);
    }

    #[tokio::test]
    async fn confirmed_record_swaps_sides_without_gap() {
        let (queue, remote, view) = setup();
        queue.enqueue(record("r", 100)).unwrap();

        let before = view.view("c1", &ViewOptions::default()).await.unwrap();
        assert_eq!(before.records.len(), 1);

        // Remote confirmation and local removal, as the sync engine does it.
        remote.seed_record(record("r", 100));
        queue.remove("r").unwrap();

        let after = view.view("c1", &ViewOptions::default()).await.unwrap();
        assert_eq!(after.records.len(), 1);
        assert_eq!(after.records[0].correlation_id, "r");
        assert_eq!(after.pending_count, 0);
    }

    #[tokio::test]
    async fn remote_portion_paginates_pending_does_not() {
        let (queue, remote, view) = setup();
        for i in 0..5 {
            remote.seed_record(record(&format!("remote-{i}"), 100 + i));
        }
        queue.enqueue(record("pending", 1_000)).unwrap();

        let options = ViewOptions {
            page_size: 2,
            before_ms: None,
        };
        let first = view.view("c1", &options).await.unwrap();
        // 2 remote + 1 pending on the first page.
        assert_eq!(first.records.len(), 3);
        let cursor = first.next_before_ms.expect("more remote records exist");

        let second = view
            .view(
                "c1",
                &ViewOptions {
                    page_size: 2,
                    before_ms: Some(cursor),
                },
            )
            .await
            .unwrap();
        // Continuation pages carry only the remote portion.
        assert_eq!(second.records.len(), 2);
        assert!(second
            .records
            .iter()
            .all(|r| r.correlation_id.starts_with("remote-")));
    }

    #[tokio::test]
    async fn other_clients_records_are_excluded() {
        let (queue, remote, view) = setup();
        queue.enqueue(record("mine", 100)).unwrap();
        let mut foreign = record("theirs", 200);
        foreign.client_id = "c2".to_string();
        remote.seed_record(foreign);

        let result = view.view("c1", &ViewOptions::default()).await.unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].correlation_id, "mine");
    }
}
