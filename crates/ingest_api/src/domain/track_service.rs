use chrono::{DateTime, Utc};
use common::{EventProducer, RawEvent};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Key under which failures of events without an idempotency id are reported.
const NO_IDEMPOTENCY_ID: &str = "no_idempotency_id";

/// Three-state request summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessState {
    All,
    Some,
    None,
}

/// Result of tracking a batch: the summary state plus the per-event failure
/// reasons, keyed by idempotency id.
#[derive(Debug)]
pub struct TrackOutcome {
    pub success: SuccessState,
    pub failed_events: BTreeMap<String, String>,
}

impl TrackOutcome {
    fn new(total: usize, failed_events: BTreeMap<String, String>) -> Self {
        // An empty batch counts as all-failed: there is nothing to confirm.
        let success = if failed_events.len() == total {
            SuccessState::None
        } else if !failed_events.is_empty() {
            SuccessState::Some
        } else {
            SuccessState::All
        };

        Self {
            success,
            failed_events,
        }
    }
}

/// Validates each event of a batch and hands the survivors to the log,
/// one synchronous produce per event. A failure never aborts its siblings.
pub struct TrackEventsService {
    producer: Arc<dyn EventProducer>,
}

impl TrackEventsService {
    pub fn new(producer: Arc<dyn EventProducer>) -> Self {
        Self { producer }
    }

    #[instrument(skip(self, events), fields(batch_size = events.len()))]
    pub async fn track(
        &self,
        organization_id: i64,
        events: Vec<RawEvent>,
        now: DateTime<Utc>,
    ) -> TrackOutcome {
        let total = events.len();
        let mut failed_events = BTreeMap::new();

        for event in events {
            if let Err(rejection) = event.validate(now) {
                let key = if event.idempotency_id.is_empty() {
                    NO_IDEMPOTENCY_ID.to_string()
                } else {
                    event.idempotency_id.clone()
                };
                failed_events.insert(key, rejection.to_string());
                continue;
            }

            let verified = event.into_verified(organization_id);

            if let Err(error) = self.producer.produce(&verified).await {
                failed_events.insert(
                    verified.idempotency_id.clone(),
                    format!("Failed to produce event to kafka: {error}"),
                );
            }
        }

        debug!(
            total,
            failed = failed_events.len(),
            "tracked event batch"
        );
        TrackOutcome::new(total, failed_events)
    }
}
