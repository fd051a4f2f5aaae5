use chrono::Utc;
use common::{key_prefix, ApiKeyStore, DomainError, DomainResult, IdentityCache};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Resolves a presented API key to the tenant that owns it.
///
/// Lookups go cache-through: a cache hit skips the store entirely, a miss
/// (or cache error) falls back to the store and repopulates the cache. The
/// cache never fails a request.
pub struct ApiKeyAuthenticator {
    store: Arc<dyn ApiKeyStore>,
    cache: Arc<dyn IdentityCache>,
}

impl ApiKeyAuthenticator {
    pub fn new(store: Arc<dyn ApiKeyStore>, cache: Arc<dyn IdentityCache>) -> Self {
        Self { store, cache }
    }

    /// Authenticate the value of the `X-API-KEY` header, returning the
    /// owning organization id.
    #[instrument(skip(self, header))]
    pub async fn authenticate(&self, header: Option<&str>) -> DomainResult<i64> {
        let key = match header {
            Some(key) if !key.is_empty() => key,
            _ => return Err(DomainError::MissingApiKey),
        };

        match self.cache.get(key).await {
            Ok(Some(cached)) => match cached.parse::<i64>() {
                Ok(organization_id) => {
                    debug!(organization_id, "api key resolved from cache");
                    return Ok(organization_id);
                }
                Err(_) => {
                    warn!("unparsable identity cache entry, falling back to store");
                }
            },
            Ok(None) => {}
            Err(error) => {
                warn!(error = %error, "identity cache read failed, falling back to store");
            }
        }

        let prefix = key_prefix(key);

        let api_key = self
            .store
            .find_active_by_prefix(prefix)
            .await?
            .ok_or(DomainError::InvalidApiKey)?;

        api_key.ensure_usable(Utc::now())?;

        if let Err(error) = self
            .cache
            .set(key, &api_key.organization_id.to_string())
            .await
        {
            warn!(error = %error, "failed to populate identity cache");
        }

        debug!(
            organization_id = api_key.organization_id,
            "api key resolved from store"
        );
        Ok(api_key.organization_id)
    }
}
