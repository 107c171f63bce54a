use serde::{Deserialize, Serialize};

/// A single waste-weighing event.
///
/// Records are immutable once created: they are deleted by explicit user
/// action only, never updated in place. The `correlation_id` is minted on the
/// client at creation time and is independent of any identifier the remote
/// store assigns; it is the sole mechanism for idempotent sync and for
/// de-duplicating the local and remote views of the same event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    /// The client site this weighing belongs to.
    pub client_id: String,
    /// Free-form area label within the site (e.g. "Cozinha", "Recepção").
    pub area: String,
    /// Waste type name as configured in the client's contract.
    pub waste_type: String,
    /// Optional finer-grained sub-type of the waste type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waste_sub_type: Option<String>,
    /// Measured weight in kilograms. Always positive.
    pub weight_kg: f64,
    /// The collector company assigned to this waste stream.
    pub collector_id: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at_ms: i64,
    /// The user who submitted the weighing.
    pub submitted_by: String,
    /// Client-minted opaque unique token. See struct docs.
    pub correlation_id: String,
}

/// A measurement held in the local pending queue, awaiting remote
/// confirmation. Its mere existence signals "unsynced": there is no separate
/// status field. At most one entry exists per correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingEntry {
    /// Internal rowid assigned by the local store. Insertion order.
    pub row_id: i64,
    /// Copy of the record's correlation id, the lookup key.
    pub correlation_id: String,
    /// When the entry was queued, epoch milliseconds. Diagnostics only.
    pub enqueued_at_ms: i64,
    /// The full measurement as submitted.
    pub record: MeasurementRecord,
}
