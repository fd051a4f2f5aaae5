use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons an inbound event is rejected before it reaches the log.
///
/// The display strings are part of the public API surface: they are returned
/// verbatim in the `failed_events` map of the track response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EventRejection {
    #[error("No idempotency_id provided")]
    MissingIdempotencyId,

    #[error("No customer_id provided")]
    MissingCustomerId,

    #[error("Invalid time_created")]
    InvalidTimeCreated,

    #[error("Time created too far in the past or future. Events must be within 30 days before or 1 day ahead of current time.")]
    TimeOutOfWindow,
}

/// An event exactly as a tenant application submitted it.
///
/// Every field defaults at decode time so that malformed events surface as
/// per-event validation reasons instead of failing the whole request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub customer_id: String,
    #[serde(default)]
    pub idempotency_id: String,
    #[serde(default)]
    pub time_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub event_name: String,
}

impl RawEvent {
    /// Checks run in order; the first failure wins.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), EventRejection> {
        if self.idempotency_id.is_empty() {
            return Err(EventRejection::MissingIdempotencyId);
        }

        if self.customer_id.is_empty() {
            return Err(EventRejection::MissingCustomerId);
        }

        let Some(time_created) = self.time_created else {
            return Err(EventRejection::InvalidTimeCreated);
        };

        let window_start = now - Duration::days(30);
        let window_end = now + Duration::days(1);

        if time_created < window_start || time_created > window_end {
            return Err(EventRejection::TimeOutOfWindow);
        }

        Ok(())
    }

    /// Stamps the event with its tenant identity. Fields are moved, not
    /// cloned. Callers validate first; a missing timestamp degrades to the
    /// epoch rather than panicking.
    pub fn into_verified(self, organization_id: i64) -> VerifiedEvent {
        VerifiedEvent {
            organization_id,
            customer_id: self.customer_id,
            idempotency_id: self.idempotency_id,
            time_created: self.time_created.unwrap_or(DateTime::UNIX_EPOCH),
            properties: self.properties,
            event_name: self.event_name,
        }
    }
}

/// A validated event stamped with the tenant that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEvent {
    pub organization_id: i64,
    pub customer_id: String,
    pub idempotency_id: String,
    pub time_created: DateTime<Utc>,
    pub properties: Map<String, Value>,
    pub event_name: String,
}

/// Wire wrapper for log records: `{ "organization_id": N, "event": {…} }`.
///
/// `event` is optional on the read side so the consumer can distinguish a
/// present-but-null event (a corruption invariant break) from a decode error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEnvelope {
    pub organization_id: i64,
    pub event: Option<VerifiedEvent>,
}

impl StreamEnvelope {
    pub fn wrap(event: VerifiedEvent) -> Self {
        Self {
            organization_id: event.organization_id,
            event: Some(event),
        }
    }
}
