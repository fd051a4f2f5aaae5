use crate::domain::{SuccessState, TrackOutcome};
use crate::http::{AppState, TenantContext};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use chrono::Utc;
use common::RawEvent;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct RawEventBatch {
    batch: Vec<RawEvent>,
}

/// Body of every track response, successful or not.
#[derive(Debug, Serialize)]
pub struct TrackEventResponse {
    pub success: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failed_events: BTreeMap<String, String>,
}

impl TrackEventResponse {
    pub fn failure(key: &str, reason: String) -> Self {
        Self {
            success: "none",
            failed_events: BTreeMap::from([(key.to_string(), reason)]),
        }
    }
}

impl From<TrackOutcome> for TrackEventResponse {
    fn from(outcome: TrackOutcome) -> Self {
        let success = match outcome.success {
            SuccessState::All => "all",
            SuccessState::Some => "some",
            SuccessState::None => "none",
        };
        Self {
            success,
            failed_events: outcome.failed_events,
        }
    }
}

/// POST /api/track/
///
/// Accepts `{"batch": [RawEvent, …]}` or a bare `RawEvent`.
pub async fn track_events(
    State(state): State<AppState>,
    Extension(tenant): Extension<TenantContext>,
    body: Bytes,
) -> Response {
    let events = match decode_events(&body) {
        Ok(events) => events,
        Err(response) => return response,
    };

    let outcome = state
        .tracker
        .track(tenant.organization_id, events, Utc::now())
        .await;

    let status = if outcome.success == SuccessState::None {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::CREATED
    };

    (status, Json(TrackEventResponse::from(outcome))).into_response()
}

fn decode_events(body: &[u8]) -> Result<Vec<RawEvent>, Response> {
    if let Ok(batch) = serde_json::from_slice::<RawEventBatch>(body) {
        return Ok(batch.batch);
    }

    match serde_json::from_slice::<RawEvent>(body) {
        Ok(event) => Ok(vec![event]),
        Err(_) => Err((
            StatusCode::BAD_REQUEST,
            Json(TrackEventResponse::failure(
                "no_idempotency_id",
                "Invalid JSON".to_string(),
            )),
        )
            .into_response()),
    }
}
