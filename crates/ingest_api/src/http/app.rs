use crate::domain::{ApiKeyAuthenticator, TrackEventsService};
use crate::http::{require_api_key, track_events};
use axum::{middleware, routing::post, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub authenticator: Arc<ApiKeyAuthenticator>,
    pub tracker: Arc<TrackEventsService>,
}

impl AppState {
    pub fn new(authenticator: Arc<ApiKeyAuthenticator>, tracker: Arc<TrackEventsService>) -> Self {
        Self {
            authenticator,
            tracker,
        }
    }
}

/// Builds the ingestion router. Every route sits behind API-key
/// authentication.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/track/", post(track_events))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
