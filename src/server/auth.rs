//! Bearer token middleware for protected routes

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::server::{ApiError, AppState};

/// Reject requests whose bearer token does not match the configured one.
///
/// Passes everything through when no token is configured.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingAuthorization)?;
    let value = header.to_str().map_err(|_| ApiError::InvalidScheme)?;

    if bearer_token(value)? != expected {
        warn!("Rejected request to {} with invalid token", request.uri().path());
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}

/// Split an Authorization header value into its bearer token.
fn bearer_token(value: &str) -> Result<&str, ApiError> {
    let value = value.trim();
    let (scheme, token) = value.split_once(' ').unwrap_or((value, ""));

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::InvalidScheme);
    }

    Ok(token.trim())
}
