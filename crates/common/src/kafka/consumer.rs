use crate::domain::{DomainError, DomainResult, LogRecord, RecordStream};
use crate::kafka::KafkaSettings;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::Message;
use std::time::Duration;
use tracing::debug;

/// Kafka-backed record stream with auto-commit disabled. Offsets advance
/// only through explicit `commit_offsets` calls from the guidance loop.
pub struct KafkaRecordStream {
    consumer: StreamConsumer,
}

impl KafkaRecordStream {
    pub fn connect(settings: &KafkaSettings, consumer_group: &str) -> Result<Self> {
        let consumer: StreamConsumer = settings
            .client_config()
            .set("group.id", consumer_group)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .set("enable.partition.eof", "false")
            .create()
            .context("failed to create kafka consumer")?;

        consumer
            .subscribe(&[settings.topic.as_str()])
            .context("failed to subscribe to events topic")?;

        Ok(Self { consumer })
    }
}

#[async_trait]
impl RecordStream for KafkaRecordStream {
    async fn fetch(
        &mut self,
        max_records: usize,
        max_wait: Duration,
    ) -> DomainResult<Vec<LogRecord>> {
        let deadline = tokio::time::Instant::now() + max_wait;
        let mut records = Vec::new();

        while records.len() < max_records {
            let message = match tokio::time::timeout_at(deadline, self.consumer.recv()).await {
                Ok(Ok(message)) => message,
                // Non-retriable fetch errors (librdkafka retries transient
                // ones internally) and client teardown are both fatal.
                Ok(Err(err)) => return Err(DomainError::LogError(err.to_string())),
                Err(_) => break,
            };

            records.push(LogRecord {
                payload: Bytes::copy_from_slice(message.payload().unwrap_or_default()),
                partition: message.partition(),
                offset: message.offset(),
            });
        }

        debug!(record_count = records.len(), "fetched records from log");
        Ok(records)
    }

    async fn commit_offsets(&mut self) -> DomainResult<()> {
        self.consumer
            .commit_consumer_state(CommitMode::Sync)
            .map_err(|e| DomainError::LogError(e.to_string()))
    }
}
