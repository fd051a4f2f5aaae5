use crate::http::{AppState, TrackEventResponse};
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::DomainError;

/// The authenticated tenant, attached to the request after a successful
/// API-key lookup.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext {
    pub organization_id: i64,
}

/// Middleware resolving the `X-API-KEY` header to a `TenantContext`.
///
/// Header name matching is case-insensitive (the `http` crate normalizes
/// names on ingress).
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    match state.authenticator.authenticate(header.as_deref()).await {
        Ok(organization_id) => {
            request
                .extensions_mut()
                .insert(TenantContext { organization_id });
            next.run(request).await
        }
        Err(error) => auth_failure(error),
    }
}

fn auth_failure(error: DomainError) -> Response {
    let (status, reason) = match error {
        DomainError::MissingApiKey
        | DomainError::InvalidApiKey
        | DomainError::RevokedApiKey
        | DomainError::ExpiredApiKey => (StatusCode::BAD_REQUEST, error.to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    };

    (status, Json(TrackEventResponse::failure("auth", reason))).into_response()
}
