//! In-memory remote store used by the test suites.
//!
//! Behaves like the real document store for the primitives the pipeline
//! needs: correlation-id deduplication on writes, newest-first paging,
//! range queries, exact-key rollup reads, and snapshot-pushing live
//! subscriptions. Failures are scriptable per correlation id (writes) and
//! per client (reads) so the halt-on-first-failure and slice-isolation
//! behaviours can be exercised deterministically.

use super::{RecordSubscription, RecordsPage, RemoteStore, SubscriptionHandle, WriteOutcome};
use common::error::CoreError;
use common::model::record::MeasurementRecord;
use common::model::rollup::RollupDocument;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tokio::sync::mpsc;

struct MonthSubscriber {
    client_id: String,
    start_ms: i64,
    end_ms: i64,
    tx: mpsc::Sender<Vec<MeasurementRecord>>,
    handle: SubscriptionHandle,
}

#[derive(Default)]
struct Inner {
    records: Vec<MeasurementRecord>,
    daily: HashMap<(String, String), RollupDocument>,
    monthly: HashMap<(String, String), RollupDocument>,
    fail_writes: HashSet<String>,
    fail_reads: HashSet<String>,
    subscribers: Vec<MonthSubscriber>,
}

#[derive(Default)]
pub struct MemoryRemote {
    inner: Mutex<Inner>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write carrying this correlation id fail until cleared.
    pub fn fail_writes_for(&self, correlation_id: &str) {
        self.lock().fail_writes.insert(correlation_id.to_string());
    }

    pub fn clear_write_failures(&self) {
        self.lock().fail_writes.clear();
    }

    /// Make every read for this client fail.
    pub fn fail_reads_for(&self, client_id: &str) {
        self.lock().fail_reads.insert(client_id.to_string());
    }

    pub fn insert_daily_rollup(&self, doc: RollupDocument) {
        self.lock()
            .daily
            .insert((doc.client_id.clone(), doc.id.clone()), doc);
    }

    pub fn insert_monthly_rollup(&self, doc: RollupDocument) {
        self.lock()
            .monthly
            .insert((doc.client_id.clone(), doc.id.clone()), doc);
    }

    /// Number of stored records carrying this correlation id. Test helper
    /// for the idempotence assertions.
    pub fn record_count_for(&self, correlation_id: &str) -> usize {
        self.lock()
            .records
            .iter()
            .filter(|r| r.correlation_id == correlation_id)
            .count()
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Seed a record directly, bypassing the idempotence check, as if it
    /// had been written by another device.
    pub fn seed_record(&self, record: MeasurementRecord) {
        let mut inner = self.lock();
        inner.records.push(record);
        Self::notify(&mut inner);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only happens after a panic in a test.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(inner: &mut Inner) {
        inner.subscribers.retain(|s| !s.handle.is_cancelled());
        for sub in &inner.subscribers {
            let snapshot: Vec<MeasurementRecord> = inner
                .records
                .iter()
                .filter(|r| {
                    r.client_id == sub.client_id
                        && r.created_at_ms >= sub.start_ms
                        && r.created_at_ms < sub.end_ms
                })
                .cloned()
                .collect();
            let _ = sub.tx.try_send(snapshot);
        }
    }
}

impl RemoteStore for MemoryRemote {
    async fn insert_record(
        &self,
        record: &MeasurementRecord,
    ) -> Result<WriteOutcome, CoreError> {
        let mut inner = self.lock();
        if inner.fail_writes.contains(&record.correlation_id) {
            return Err(CoreError::RemoteWrite(format!(
                "write rejected for {}",
                record.correlation_id
            )));
        }
        if inner
            .records
            .iter()
            .any(|r| r.correlation_id == record.correlation_id)
        {
            return Ok(WriteOutcome::AlreadyPresent);
        }
        inner.records.push(record.clone());
        Self::notify(&mut inner);
        Ok(WriteOutcome::Inserted)
    }

    async fn records_page(
        &self,
        client_id: &str,
        page_size: usize,
        before_ms: Option<i64>,
    ) -> Result<RecordsPage, CoreError> {
        let inner = self.lock();
        if inner.fail_reads.contains(client_id) {
            return Err(CoreError::RemoteRead(format!(
                "read rejected for client {client_id}"
            )));
        }
        let mut matching: Vec<MeasurementRecord> = inner
            .records
            .iter()
            .filter(|r| r.client_id == client_id)
            .filter(|r| before_ms.map_or(true, |b| r.created_at_ms < b))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at_ms.cmp(&a.created_at_ms));
        // The cursor is the boundary timestamp and the next page filters
        // strictly below it, so a page must never end inside a run of equal
        // timestamps: extend it until the run is complete.
        let mut cut = page_size.min(matching.len());
        while cut > 0
            && cut < matching.len()
            && matching[cut].created_at_ms == matching[cut - 1].created_at_ms
        {
            cut += 1;
        }
        let has_more = matching.len() > cut;
        matching.truncate(cut);
        let next_before_ms = if has_more {
            matching.last().map(|r| r.created_at_ms)
        } else {
            None
        };
        Ok(RecordsPage {
            records: matching,
            next_before_ms,
        })
    }

    async fn records_in_range(
        &self,
        client_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<MeasurementRecord>, CoreError> {
        let inner = self.lock();
        if inner.fail_reads.contains(client_id) {
            return Err(CoreError::RemoteRead(format!(
                "read rejected for client {client_id}"
            )));
        }
        Ok(inner
            .records
            .iter()
            .filter(|r| {
                r.client_id == client_id
                    && r.created_at_ms >= start_ms
                    && r.created_at_ms < end_ms
            })
            .cloned()
            .collect())
    }

    async fn daily_rollups(
        &self,
        client_id: &str,
        month_key: &str,
    ) -> Result<Vec<RollupDocument>, CoreError> {
        let inner = self.lock();
        if inner.fail_reads.contains(client_id) {
            return Err(CoreError::RemoteRead(format!(
                "read rejected for client {client_id}"
            )));
        }
        let mut docs: Vec<RollupDocument> = inner
            .daily
            .iter()
            .filter(|((c, day), _)| c == client_id && day.starts_with(month_key))
            .map(|(_, doc)| doc.clone())
            .collect();
        docs.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(docs)
    }

    async fn monthly_rollup(
        &self,
        client_id: &str,
        month_key: &str,
    ) -> Result<Option<RollupDocument>, CoreError> {
        let inner = self.lock();
        if inner.fail_reads.contains(client_id) {
            return Err(CoreError::RemoteRead(format!(
                "read rejected for client {client_id}"
            )));
        }
        Ok(inner
            .monthly
            .get(&(client_id.to_string(), month_key.to_string()))
            .cloned())
    }

    fn subscribe_records(
        &self,
        client_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> RecordSubscription {
        let (tx, rx) = mpsc::channel(16);
        let handle = SubscriptionHandle::new();
        self.lock().subscribers.push(MonthSubscriber {
            client_id: client_id.to_string(),
            start_ms,
            end_ms,
            tx,
            handle: handle.clone(),
        });
        RecordSubscription {
            snapshots: rx,
            handle,
        }
    }
}
