use crate::domain::{DomainError, DomainResult, IdentityCache};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::info;

/// Cache entries outlive most request bursts but not a key rotation cycle.
pub const IDENTITY_CACHE_TTL_SECS: u64 = 5 * 60 * 60;

/// Redis implementation of the `IdentityCache` trait.
///
/// The connection manager reconnects on its own; a request that races a
/// reconnect surfaces as a cache error, which callers treat as a miss.
#[derive(Clone)]
pub struct RedisIdentityCache {
    connection: ConnectionManager,
}

impl RedisIdentityCache {
    /// Accepts `redis://` and `rediss://` URLs.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis url")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("failed to connect to redis")?;

        info!("connected to identity cache");
        Ok(Self { connection })
    }
}

#[async_trait]
impl IdentityCache for RedisIdentityCache {
    async fn get(&self, key: &str) -> DomainResult<Option<String>> {
        let mut connection = self.connection.clone();
        let value: Option<String> = connection
            .get(key)
            .await
            .map_err(|e| DomainError::CacheError(e.to_string()))?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> DomainResult<()> {
        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(key, value, IDENTITY_CACHE_TTL_SECS)
            .await
            .map_err(|e| DomainError::CacheError(e.to_string()))?;
        Ok(())
    }
}
