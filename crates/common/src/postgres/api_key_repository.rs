use crate::domain::{ApiKey, ApiKeyStore, DomainError, DomainResult};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tracing::{debug, instrument};

const FIND_ACTIVE_BY_PREFIX_SQL: &str = "SELECT organization_id, created, name, revoked, \
     expiry_date, hashed_key, prefix \
     FROM metering_billing_apitoken \
     WHERE prefix = $1 AND revoked = false \
     LIMIT 1";

/// PostgreSQL implementation of the `ApiKeyStore` trait.
#[derive(Clone)]
pub struct PostgresApiKeyStore {
    client: PostgresClient,
}

impl PostgresApiKeyStore {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ApiKeyStore for PostgresApiKeyStore {
    #[instrument(skip(self, prefix))]
    async fn find_active_by_prefix(&self, prefix: &str) -> DomainResult<Option<ApiKey>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        debug!("looking up api key by prefix");

        let row = conn
            .query_opt(FIND_ACTIVE_BY_PREFIX_SQL, &[&prefix])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(row.map(|row| ApiKey {
            organization_id: row.get("organization_id"),
            created: row.get("created"),
            name: row.get("name"),
            revoked: row.get("revoked"),
            expiry_date: row.get("expiry_date"),
            hashed_key: row.get("hashed_key"),
            prefix: row.get("prefix"),
        }))
    }
}
