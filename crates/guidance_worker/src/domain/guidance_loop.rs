use common::{
    AnalyticsSink, DomainError, DomainResult, MeterTransaction, MeterWriter, RecordStream,
    StreamEnvelope,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Tuning knobs of the consumer loop.
#[derive(Debug, Clone)]
pub struct GuidanceSettings {
    /// Inserts per database transaction.
    pub batch_size: usize,
    /// Upper bound on records pulled per poll cycle.
    pub fetch_max_records: usize,
    /// How long an idle poll waits before cycling.
    pub fetch_max_wait: Duration,
}

/// The consumer loop binding the log to the metering table.
///
/// Invariant: log offsets for a set of records are committed iff the
/// database transaction containing those records committed first. Every
/// persistence-level failure is returned as an error, which the binary
/// turns into a process exit; the uncommitted offsets then replay on
/// restart and the store's idempotency constraint absorbs the duplicates.
pub struct GuidanceLoop {
    stream: Box<dyn RecordStream>,
    writer: Arc<dyn MeterWriter>,
    analytics: Arc<dyn AnalyticsSink>,
    settings: GuidanceSettings,
}

impl GuidanceLoop {
    pub fn new(
        stream: Box<dyn RecordStream>,
        writer: Arc<dyn MeterWriter>,
        analytics: Arc<dyn AnalyticsSink>,
        settings: GuidanceSettings,
    ) -> Self {
        Self {
            stream,
            writer,
            analytics,
            settings,
        }
    }

    /// Run until cancelled. Cancellation is observed between poll cycles,
    /// so an in-flight transaction always completes before exit.
    pub async fn run(mut self, shutdown: CancellationToken) -> DomainResult<()> {
        info!(
            batch_size = self.settings.batch_size,
            "starting guidance loop"
        );

        while !shutdown.is_cancelled() {
            self.poll_once().await?;
        }

        info!("guidance loop stopped gracefully");
        Ok(())
    }

    /// One poll cycle: fetch, ingest into transactions of at most
    /// `batch_size` rows, flush, then emit telemetry.
    async fn poll_once(&mut self) -> DomainResult<()> {
        let records = self
            .stream
            .fetch(self.settings.fetch_max_records, self.settings.fetch_max_wait)
            .await?;

        if records.is_empty() {
            return Ok(());
        }

        debug!(record_count = records.len(), "ingesting fetched records");

        let mut tx = self.writer.begin().await?;
        let mut count = 0usize;
        let mut processed: HashMap<i64, u64> = HashMap::new();

        for record in records {
            let envelope: StreamEnvelope =
                serde_json::from_slice(&record.payload).map_err(|e| {
                    // Stage A validated the payload before producing it, so
                    // a decode failure here is a broken invariant.
                    DomainError::CorruptRecord(format!(
                        "partition {} offset {}: {}",
                        record.partition, record.offset, e
                    ))
                })?;

            let event = envelope.event.ok_or_else(|| {
                DomainError::CorruptRecord(format!(
                    "record from organization {} has no event",
                    envelope.organization_id
                ))
            })?;

            tx.insert_event(&event).await?;
            count += 1;

            if count >= self.settings.batch_size {
                tx.commit().await?;
                self.stream.commit_offsets().await?;
                tx = self.writer.begin().await?;
                count = 0;
            }

            *processed.entry(event.organization_id).or_default() += 1;
        }

        if count > 0 {
            tx.commit().await?;
            self.stream.commit_offsets().await?;
        } else {
            tx.rollback().await?;
        }

        self.analytics.record_processed(processed);
        Ok(())
    }
}
