//! The durable event log seam.
//!
//! The engine never owns delivery state — it derives everything from the
//! log's cursor and pending-entry ledger through these primitives. The log's
//! replication, retention trimming, and group bookkeeping are assumed
//! correct; both implementations (`RedisLog`, `MemoryLog`) honor the same
//! contract: an id is pending for at most one consumer at a time, and ack
//! is idempotent.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

/// One record as read from the stream: the log-assigned id plus the flat
/// field/value pairs it was appended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub id: String,
    pub fields: Vec<(String, String)>,
}

/// A delivered-but-unacknowledged entry in the group's ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub id: String,
    pub consumer: String,
    pub idle_ms: u64,
    pub delivery_count: u64,
}

/// Group-level delivery state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    pub last_delivered_id: String,
}

/// Append-only event log with consumer-group semantics.
///
/// Implementations are scoped to one stream key and one group name, fixed
/// at construction.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Append one record under the approximate retention cap. Returns the
    /// log-assigned id.
    async fn append(&self, fields: &[(String, String)]) -> Result<String>;

    /// Ensure the consumer group exists at cursor `0`. Idempotent —
    /// group-already-exists is not an error.
    async fn create_group(&self) -> Result<()>;

    /// Blocking read of entries never delivered to any consumer, assigned
    /// to `consumer`. Returns an empty batch when `block` elapses.
    async fn read_group(&self, consumer: &str, block: Duration) -> Result<Vec<StreamEntry>>;

    /// Settle an entry. Idempotent — acking a settled or unknown id is a
    /// no-op.
    async fn ack(&self, id: &str) -> Result<()>;

    /// Atomically transfer ownership of up to `max_count` pending entries
    /// idle at least `min_idle` to `consumer`, returning them for
    /// reprocessing.
    async fn claim_stale(
        &self,
        consumer: &str,
        min_idle: Duration,
        max_count: usize,
    ) -> Result<Vec<StreamEntry>>;

    /// The group's pending-entry ledger, up to `max_count` entries.
    async fn list_pending(&self, max_count: usize) -> Result<Vec<PendingEntry>>;

    /// Group delivery state, or `None` if the group does not exist yet.
    async fn group_info(&self) -> Result<Option<GroupInfo>>;

    /// The most recent `max_count` entries, newest first.
    async fn recent_events(&self, max_count: usize) -> Result<Vec<StreamEntry>>;
}
