use crate::domain::{ApiKey, DomainResult, VerifiedEvent};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

/// Trait for the key/value identity cache in front of the API-key store.
///
/// `get` distinguishes a miss (`Ok(None)`) from an error; callers treat an
/// error as a miss. `set` is best-effort with a fixed TTL.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityCache: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DomainResult<()>;
}

/// Trait for the durable API-key store.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    /// Look up a non-revoked key record by its prefix.
    async fn find_active_by_prefix(&self, prefix: &str) -> DomainResult<Option<ApiKey>>;
}

/// Trait for publishing verified events to the log.
///
/// `produce` returns only after the log has acknowledged the record, so a
/// success response to the client never races an in-memory loss window.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn produce(&self, event: &VerifiedEvent) -> DomainResult<()>;
}

/// An owned record fetched from the log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub payload: Bytes,
    pub partition: i32,
    pub offset: i64,
}

/// Trait for the consumer side of the log.
///
/// `commit_offsets` marks everything fetched so far as processed; the
/// guidance loop only calls it after the enclosing database transaction
/// committed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait RecordStream: Send {
    /// Fetch up to `max_records` records, waiting at most `max_wait`.
    /// An empty result is a normal idle cycle; an error is fatal.
    async fn fetch(&mut self, max_records: usize, max_wait: Duration)
        -> DomainResult<Vec<LogRecord>>;

    async fn commit_offsets(&mut self) -> DomainResult<()>;
}

/// Trait for the transactional metering store written by the guidance loop.
#[async_trait]
pub trait MeterWriter: Send + Sync {
    async fn begin(&self) -> DomainResult<Box<dyn MeterTransaction>>;
}

/// One open database transaction. Inserts dedupe on
/// `(organization_id, idempotency_id)` inside the store routine, so a replay
/// of already-committed records is a no-op.
#[async_trait]
pub trait MeterTransaction: Send {
    async fn insert_event(&mut self, event: &VerifiedEvent) -> DomainResult<()>;

    async fn commit(self: Box<Self>) -> DomainResult<()>;

    async fn rollback(self: Box<Self>) -> DomainResult<()>;
}

/// Trait for the fire-and-forget product analytics sink.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait AnalyticsSink: Send + Sync {
    /// Record how many events each tenant had persisted this poll cycle.
    /// Never fails and never blocks beyond the enqueue.
    fn record_processed(&self, counts: HashMap<i64, u64>);
}
