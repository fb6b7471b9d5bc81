//! # REST API for Authentication
//!
//! Sign-up, sign-in, anonymous sign-in, sign-out, and the current-user
//! endpoint that drives the post-login profile-setup flow.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use tracing::info;

use crate::domain::commands::auth::{SignInCommand, SignUpCommand};
use crate::domain::AuthenticatedUser;
use crate::AppState;
use shared::{SignInRequest, SignUpRequest};

use super::{bearer_token, error_response};

/// Register an email-backed account
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/signup");

    let command = SignUpCommand {
        email: request.email,
        password: request.password,
    };
    match state.auth_service.sign_up(command).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Sign in with credentials
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> impl IntoResponse {
    info!("POST /api/auth/signin");

    let command = SignInCommand {
        email: request.email,
        password: request.password,
    };
    match state.auth_service.sign_in(command).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        // Bad credentials read as 401 here, not as a capability failure
        Err(crate::domain::DomainError::Authorization(message)) => {
            (StatusCode::UNAUTHORIZED, message).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Create an anonymous account and session
pub async fn sign_in_anonymous(State(state): State<AppState>) -> impl IntoResponse {
    info!("POST /api/auth/anonymous");

    match state.auth_service.sign_in_anonymous().await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Close the current session
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    info!("POST /api/auth/signout");

    let Some(token) = bearer_token(&headers) else {
        return (StatusCode::UNAUTHORIZED, "Missing bearer token").into_response();
    };
    match state.auth_service.sign_out(token).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// The signed-in user plus their profile, if set up yet
pub async fn current_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    info!("GET /api/auth/me for {}", user.user_id);

    match state.auth_service.current_user(&user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}
