//! Abstractions over the external collaborators of the pipeline.
//!
//! The remote document store and the client catalog are opaque dependencies:
//! the pipeline only needs the handful of primitives below (point writes,
//! filtered range queries, exact-key rollup reads, and a live month
//! subscription). Keeping them behind traits lets every component run against
//! the in-memory fake in [`memory`] during tests, and lets the embedding
//! application plug in its real store without the pipeline knowing which one.

pub mod memory;

use common::error::CoreError;
use common::model::client::ClientEntry;
use common::model::record::MeasurementRecord;
use common::model::rollup::RollupDocument;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of an idempotent record write.
///
/// The store deduplicates on the embedded correlation id: writing a record it
/// already holds acknowledges without inserting, which is what makes
/// at-least-once delivery during sync safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    /// A record with the same correlation id was already present.
    AlreadyPresent,
}

/// One page of a newest-first record query.
#[derive(Debug, Clone)]
pub struct RecordsPage {
    pub records: Vec<MeasurementRecord>,
    /// Cursor for the next page: pass as `before_ms` to continue. `None`
    /// when the query is exhausted.
    pub next_before_ms: Option<i64>,
}

/// Cancellation capability for a live subscription.
///
/// Cancelling is immediate and silent: once the flag is set, no further
/// snapshot is emitted for this subscription. Handles are cheap to clone;
/// all clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionHandle {
    cancelled: Arc<AtomicBool>,
}

impl SubscriptionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A live subscription over raw records for one client and month.
///
/// The store pushes a full snapshot of the matching records on every change.
#[derive(Debug)]
pub struct RecordSubscription {
    pub snapshots: mpsc::Receiver<Vec<MeasurementRecord>>,
    pub handle: SubscriptionHandle,
}

/// The remote document store, reduced to the primitives the pipeline uses.
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    /// Point write of a measurement, deduplicated by correlation id.
    async fn insert_record(&self, record: &MeasurementRecord)
        -> Result<WriteOutcome, CoreError>;

    /// Newest-first page of a client's records, optionally before a cursor.
    async fn records_page(
        &self,
        client_id: &str,
        page_size: usize,
        before_ms: Option<i64>,
    ) -> Result<RecordsPage, CoreError>;

    /// All records of a client with `start_ms <= created_at_ms < end_ms`.
    async fn records_in_range(
        &self,
        client_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<MeasurementRecord>, CoreError>;

    /// All daily rollup documents of a client within one month
    /// (`daily_totals/{client}/days/{YYYY-MM-DD}`).
    async fn daily_rollups(
        &self,
        client_id: &str,
        month_key: &str,
    ) -> Result<Vec<RollupDocument>, CoreError>;

    /// The monthly rollup document of a client, if one exists
    /// (`monthly_totals/{client}/months/{YYYY-MM}`).
    async fn monthly_rollup(
        &self,
        client_id: &str,
        month_key: &str,
    ) -> Result<Option<RollupDocument>, CoreError>;

    /// Open a live subscription over a client's records in a time range.
    fn subscribe_records(
        &self,
        client_id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> RecordSubscription;
}

/// Read-only per-client flags supplied by the client catalog.
#[allow(async_fn_in_trait)]
pub trait ClientCatalog {
    async fn client(&self, client_id: &str) -> Result<Option<ClientEntry>, CoreError>;
}

/// A catalog backed by a preloaded map, enough for tests and for embedders
/// that fetch the catalog once at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    clients: HashMap<String, ClientEntry>,
}

impl StaticCatalog {
    pub fn new(entries: Vec<ClientEntry>) -> Self {
        StaticCatalog {
            clients: entries.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }
}

impl ClientCatalog for StaticCatalog {
    async fn client(&self, client_id: &str) -> Result<Option<ClientEntry>, CoreError> {
        Ok(self.clients.get(client_id).cloned())
    }
}
