use crate::domain::{DomainError, DomainResult, MeterTransaction, MeterWriter, VerifiedEvent};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// The opaque upsert routine. It dedupes on
/// `(organization_id, idempotency_id)` with an on-conflict no-op, which is
/// what makes log replays invisible to billing.
const INSERT_METRIC_SQL: &str = "SELECT insert_metric($1, $2, $3, $4, $5, $6)";

/// PostgreSQL implementation of the `MeterWriter` trait.
///
/// Transactions are driven explicitly (`BEGIN`/`COMMIT`/`ROLLBACK`) so an
/// open transaction can outlive a single call and follow the guidance
/// loop's batch boundaries. Each transaction pins one pooled connection.
#[derive(Clone)]
pub struct PostgresMeterWriter {
    client: PostgresClient,
}

impl PostgresMeterWriter {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MeterWriter for PostgresMeterWriter {
    async fn begin(&self) -> DomainResult<Box<dyn MeterTransaction>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        conn.batch_execute("BEGIN")
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(Box::new(PostgresMeterTransaction { conn }))
    }
}

pub struct PostgresMeterTransaction {
    conn: deadpool_postgres::Client,
}

#[async_trait]
impl MeterTransaction for PostgresMeterTransaction {
    async fn insert_event(&mut self, event: &VerifiedEvent) -> DomainResult<()> {
        let statement = self
            .conn
            .prepare_cached(INSERT_METRIC_SQL)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let properties = Value::Object(event.properties.clone());

        self.conn
            .execute(
                &statement,
                &[
                    &event.organization_id,
                    &event.customer_id,
                    &event.event_name,
                    &event.time_created,
                    &properties,
                    &event.idempotency_id,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(
            organization_id = event.organization_id,
            idempotency_id = %event.idempotency_id,
            "staged metric insert"
        );
        Ok(())
    }

    async fn commit(self: Box<Self>) -> DomainResult<()> {
        self.conn
            .batch_execute("COMMIT")
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))
    }

    async fn rollback(self: Box<Self>) -> DomainResult<()> {
        self.conn
            .batch_execute("ROLLBACK")
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))
    }
}
