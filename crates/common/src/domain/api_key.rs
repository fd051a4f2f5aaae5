use crate::domain::{DomainError, DomainResult};
use chrono::{DateTime, Utc};

/// A tenant API key as stored in `metering_billing_apitoken`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiKey {
    pub organization_id: i64,
    pub created: DateTime<Utc>,
    pub name: String,
    pub revoked: bool,
    pub expiry_date: Option<DateTime<Utc>>,
    pub hashed_key: String,
    pub prefix: String,
}

impl ApiKey {
    /// A key is usable iff it is not revoked and not past its expiry date.
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.revoked {
            return Err(DomainError::RevokedApiKey);
        }

        if let Some(expiry) = self.expiry_date {
            if expiry < now {
                return Err(DomainError::ExpiredApiKey);
            }
        }

        Ok(())
    }
}

/// The lookup prefix of a presented key: everything before the first `.`,
/// or the whole key when it carries no separator.
pub fn key_prefix(key: &str) -> &str {
    match key.split_once('.') {
        Some((prefix, _)) => prefix,
        None => key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usable_key() -> ApiKey {
        ApiKey {
            organization_id: 42,
            created: Utc::now() - Duration::days(10),
            name: "production".to_string(),
            revoked: false,
            expiry_date: None,
            hashed_key: "hashed".to_string(),
            prefix: "mk_live".to_string(),
        }
    }

    #[test]
    fn test_usable_key_passes() {
        assert!(usable_key().ensure_usable(Utc::now()).is_ok());
    }

    #[test]
    fn test_revoked_key_rejected() {
        let key = ApiKey {
            revoked: true,
            ..usable_key()
        };
        assert!(matches!(
            key.ensure_usable(Utc::now()),
            Err(DomainError::RevokedApiKey)
        ));
    }

    #[test]
    fn test_expired_key_rejected() {
        let key = ApiKey {
            expiry_date: Some(Utc::now() - Duration::hours(1)),
            ..usable_key()
        };
        assert!(matches!(
            key.ensure_usable(Utc::now()),
            Err(DomainError::ExpiredApiKey)
        ));
    }

    #[test]
    fn test_future_expiry_accepted() {
        let key = ApiKey {
            expiry_date: Some(Utc::now() + Duration::days(30)),
            ..usable_key()
        };
        assert!(key.ensure_usable(Utc::now()).is_ok());
    }

    #[test]
    fn test_key_prefix_before_first_dot() {
        assert_eq!(key_prefix("mk_live.s3cr3t"), "mk_live");
        assert_eq!(key_prefix("a.b.c"), "a");
    }

    #[test]
    fn test_key_prefix_without_separator_is_whole_key() {
        assert_eq!(key_prefix("bare-key"), "bare-key");
    }
}
