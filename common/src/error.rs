//! Shared error taxonomy for the ingestion and aggregation pipeline.
//!
//! Every fallible operation in the `engine` crate returns `Result<_, CoreError>`.
//! The variants map onto the failure classes the pipeline distinguishes:
//!
//! - `LocalStore`: the embedded queue database could not complete a write or
//!   read. The record is not guaranteed queued; callers must surface this.
//! - `DuplicatePending`: an enqueue collided with an entry that already holds
//!   the same correlation id.
//! - `RemoteWrite` / `RemoteRead`: the remote document store rejected or
//!   failed an operation. Sync failures keep the pending entry queued.
//! - `InvalidRecord`: a measurement failed validation before persistence.
//!
//! None of these are fatal to the process; the pipeline degrades to partial
//! or empty results and logs the cause.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// The local pending-queue database failed a read or write.
    #[error("local store failure: {0}")]
    LocalStore(String),

    /// An entry with this correlation id is already queued.
    #[error("a pending entry already exists for correlation id {0}")]
    DuplicatePending(String),

    /// A remote write was rejected or could not be acknowledged.
    #[error("remote write failed: {0}")]
    RemoteWrite(String),

    /// A remote read (records, rollups or configuration) failed.
    #[error("remote read failed: {0}")]
    RemoteRead(String),

    /// The measurement did not pass validation (e.g. non-positive weight).
    #[error("invalid measurement: {0}")]
    InvalidRecord(String),

    /// A record or document could not be serialized or deserialized.
    #[error("serialization failure: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
