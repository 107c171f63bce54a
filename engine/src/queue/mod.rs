//! The local pending queue.
//!
//! Every measurement is written here first, before any network round trip,
//! so a weighing recorded on a disconnected device is never lost. An entry's
//! mere existence signals "unsynced"; it is removed exactly when the sync
//! engine confirms the corresponding remote write, or when the user deletes
//! it beforehand. A UNIQUE index on the correlation id enforces the
//! at-most-one-entry-per-correlation-id invariant at the storage level.
//!
//! The queue emits a coalescing change notification (a bumped revision on a
//! watch channel) after every successful enqueue or remove, so dependent
//! views can recompute without polling.

use common::error::CoreError;
use common::model::record::{MeasurementRecord, PendingEntry};
use rusqlite::{params, Connection, ErrorCode};
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::watch;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS pending_entries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    correlation_id TEXT NOT NULL UNIQUE,
    client_id      TEXT NOT NULL,
    enqueued_at_ms INTEGER NOT NULL,
    record_json    TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_pending_client ON pending_entries (client_id);
";

/// Embedded store of not-yet-confirmed measurements.
pub struct PendingQueue {
    conn: Mutex<Connection>,
    changed_tx: watch::Sender<u64>,
}

impl PendingQueue {
    /// Open (and create if needed) the queue database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(local_err)?;
        Self::with_connection(conn)
    }

    /// A queue that lives only as long as the process. Used in tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(local_err)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        conn.execute_batch(SCHEMA).map_err(local_err)?;
        let (changed_tx, _) = watch::channel(0u64);
        Ok(PendingQueue {
            conn: Mutex::new(conn),
            changed_tx,
        })
    }

    /// A receiver whose value bumps on every queue change. The value itself
    /// is just a revision counter; consumers only care that it moved.
    pub fn subscribe_changes(&self) -> watch::Receiver<u64> {
        self.changed_tx.subscribe()
    }

    /// Persist a measurement locally, minting a correlation id when the
    /// record does not carry one yet. Returns the correlation id under which
    /// the entry is queued. Succeeds with no network reachability; a local
    /// storage failure surfaces as [`CoreError::LocalStore`] and the caller
    /// must not assume the record was queued.
    pub fn enqueue(&self, mut record: MeasurementRecord) -> Result<String, CoreError> {
        if !record.weight_kg.is_finite() || record.weight_kg <= 0.0 {
            return Err(CoreError::InvalidRecord(format!(
                "weight must be positive, got {}",
                record.weight_kg
            )));
        }
        if record.correlation_id.is_empty() {
            record.correlation_id = Uuid::new_v4().to_string();
        }
        let json = serde_json::to_string(&record)?;
        let enqueued_at_ms = chrono::Utc::now().timestamp_millis();

        let conn = self.lock();
        conn.execute(
            "INSERT INTO pending_entries (correlation_id, client_id, enqueued_at_ms, record_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![record.correlation_id, record.client_id, enqueued_at_ms, json],
        )
        .map_err(|e| match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if f.code == ErrorCode::ConstraintViolation =>
            {
                CoreError::DuplicatePending(record.correlation_id.clone())
            }
            _ => local_err(e),
        })?;
        drop(conn);

        self.notify();
        Ok(record.correlation_id)
    }

    /// All pending entries, in insertion (rowid) order.
    pub fn list(&self) -> Result<Vec<PendingEntry>, CoreError> {
        self.query_entries("SELECT id, correlation_id, enqueued_at_ms, record_json
                            FROM pending_entries ORDER BY id", &[])
    }

    /// The pending entries of one client, in insertion order.
    pub fn list_for_client(&self, client_id: &str) -> Result<Vec<PendingEntry>, CoreError> {
        self.query_entries(
            "SELECT id, correlation_id, enqueued_at_ms, record_json
             FROM pending_entries WHERE client_id = ?1 ORDER BY id",
            &[client_id],
        )
    }

    /// Delete the entry queued under `correlation_id`. Deleting an id that is
    /// no longer queued is not an error (the sync engine may race an explicit
    /// user delete).
    pub fn remove(&self, correlation_id: &str) -> Result<(), CoreError> {
        let removed = self
            .lock()
            .execute(
                "DELETE FROM pending_entries WHERE correlation_id = ?1",
                params![correlation_id],
            )
            .map_err(local_err)?;
        if removed > 0 {
            self.notify();
        }
        Ok(())
    }

    /// The visible "unsynced count".
    pub fn len(&self) -> Result<usize, CoreError> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM pending_entries", [], |row| row.get(0))
            .map_err(local_err)?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.len()? == 0)
    }

    fn query_entries(
        &self,
        sql: &str,
        args: &[&str],
    ) -> Result<Vec<PendingEntry>, CoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(sql).map_err(local_err)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(local_err)?;

        let mut entries = Vec::new();
        for row in rows {
            let (row_id, correlation_id, enqueued_at_ms, json) = row.map_err(local_err)?;
            let record: MeasurementRecord = serde_json::from_str(&json)?;
            entries.push(PendingEntry {
                row_id,
                correlation_id,
                enqueued_at_ms,
                record,
            });
        }
        Ok(entries)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // Poisoning only follows a panic on another thread; recover the
        // connection rather than cascading.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.changed_tx.send_modify(|rev| *rev += 1);
    }
}

fn local_err(e: rusqlite::Error) -> CoreError {
    CoreError::LocalStore(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(client: &str, corr: &str, weight: f64) -> MeasurementRecord {
        MeasurementRecord {
            client_id: client.to_string(),
            area: "Cozinha".to_string(),
            waste_type: "Orgânico".to_string(),
            waste_sub_type: None,
            weight_kg: weight,
            collector_id: "col-1".to_string(),
            created_at_ms: 1_700_000_000_000,
            submitted_by: "user-1".to_string(),
            correlation_id: corr.to_string(),
        }
    }

    #[test]
    fn enqueue_mints_correlation_id_when_absent() {
        let queue = PendingQueue::open_in_memory().unwrap();
        let id = queue.enqueue(record("c1", "", 10.0)).unwrap();
        assert!(!id.is_empty());
        let entries = queue.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].correlation_id, id);
        assert_eq!(entries[0].record.correlation_id, id);
    }

    #[test]
    fn enqueue_keeps_supplied_correlation_id() {
        let queue = PendingQueue::open_in_memory().unwrap();
        let id = queue.enqueue(record("c1", "corr-1", 10.0)).unwrap();
        assert_eq!(id, "corr-1");
    }

    #[test]
    fn duplicate_correlation_id_is_rejected() {
        let queue = PendingQueue::open_in_memory().unwrap();
        queue.enqueue(record("c1", "corr-1", 10.0)).unwrap();
        let err = queue.enqueue(record("c1", "corr-1", 12.0)).unwrap_err();
        assert!(matches!(err, CoreError::DuplicatePending(id) if id == "corr-1"));
        assert_eq!(queue.len().unwrap(), 1);
    }

    #[test]
    fn non_positive_weight_is_invalid() {
        let queue = PendingQueue::open_in_memory().unwrap();
        assert!(matches!(
            queue.enqueue(record("c1", "", 0.0)),
            Err(CoreError::InvalidRecord(_))
        ));
        assert!(matches!(
            queue.enqueue(record("c1", "", -3.5)),
            Err(CoreError::InvalidRecord(_))
        ));
        assert!(queue.is_empty().unwrap());
    }

    #[test]
    fn list_preserves_insertion_order() {
        let queue = PendingQueue::open_in_memory().unwrap();
        for i in 0..5 {
            queue.enqueue(record("c1", &format!("corr-{i}"), 1.0)).unwrap();
        }
        let ids: Vec<String> = queue
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.correlation_id)
            .collect();
        assert_eq!(ids, ["corr-0", "corr-1", "corr-2", "corr-3", "corr-4"]);
    }

    #[test]
    fn list_for_client_filters() {
        let queue = PendingQueue::open_in_memory().unwrap();
        queue.enqueue(record("c1", "a", 1.0)).unwrap();
        queue.enqueue(record("c2", "b", 1.0)).unwrap();
        queue.enqueue(record("c1", "c", 1.0)).unwrap();
        let entries = queue.list_for_client("c1").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.record.client_id == "c1"));
    }

    #[test]
    fn remove_is_idempotent_and_notifies_once() {
        let queue = PendingQueue::open_in_memory().unwrap();
        let mut rx = queue.subscribe_changes();
        queue.enqueue(record("c1", "corr-1", 1.0)).unwrap();
        queue.remove("corr-1").unwrap();
        queue.remove("corr-1").unwrap();
        assert!(queue.is_empty().unwrap());
        // enqueue + one effective remove = two revisions
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 2);
    }

    #[test]
    fn entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pending.sqlite");
        {
            let queue = PendingQueue::open(&path).unwrap();
            queue.enqueue(record("c1", "corr-1", 4.2)).unwrap();
        }
        let queue = PendingQueue::open(&path).unwrap();
        let entries = queue.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.weight_kg, 4.2);
    }
}
