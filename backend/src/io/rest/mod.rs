//! # REST API Interface Layer
//!
//! HTTP endpoints for the daily cash tracker. This layer handles:
//! - Request/response serialization
//! - Bearer-token identity extraction
//! - Error translation from the domain taxonomy to HTTP status codes
//!
//! Handlers never contain business logic; they log the request, call a
//! service, and translate the result.

pub mod admin_apis;
pub mod auth_apis;
pub mod calendar_apis;
pub mod entry_apis;
pub mod events_apis;
pub mod profile_apis;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use crate::domain::{AuthenticatedUser, DomainError};
use crate::AppState;

/// Pull the bearer token out of the Authorization header
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
}

/// Resolve the session token on every request. Handlers that take an
/// `AuthenticatedUser` argument are authenticated; the domain re-derives
/// capabilities from the store on each call.
#[axum::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already resolved earlier in this request
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(user.clone());
        }

        let token = bearer_token(&parts.headers).ok_or_else(|| {
            (StatusCode::UNAUTHORIZED, "Missing bearer token").into_response()
        })?;

        match state.auth_service.authenticate(token).await {
            Ok(user) => {
                parts.extensions.insert(user.clone());
                Ok(user)
            }
            Err(DomainError::Storage(e)) => {
                error!("Failed to resolve session: {:#}", e);
                Err((StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response())
            }
            Err(e) => Err((StatusCode::UNAUTHORIZED, e.to_string()).into_response()),
        }
    }
}

/// Translate a domain error to an HTTP response
pub(crate) fn error_response(error: DomainError) -> Response {
    match &error {
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, error.to_string()).into_response(),
        DomainError::Authorization(_) => (StatusCode::FORBIDDEN, error.to_string()).into_response(),
        DomainError::NotFound(_) => (StatusCode::NOT_FOUND, error.to_string()).into_response(),
        DomainError::Storage(e) => {
            error!("Storage failure: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
