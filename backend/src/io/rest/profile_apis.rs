//! # REST API for Profile Management
//!
//! Self-service profile setup and profile reads.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use tracing::info;

use crate::domain::commands::profiles::CreateProfileCommand;
use crate::domain::AuthenticatedUser;
use crate::AppState;
use shared::CreateProfileRequest;

use super::error_response;

/// Create the caller's profile
pub async fn create_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateProfileRequest>,
) -> impl IntoResponse {
    info!("POST /api/profiles for {}", user.user_id);

    let command = CreateProfileCommand {
        username: request.username,
    };
    match state.profile_service.create_profile(&user, command).await {
        Ok(response) => (StatusCode::CREATED, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Get a profile by user ID (self, or any user for admins)
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("GET /api/profiles/{}", user_id);

    match state
        .profile_service
        .get_profile(&user, Some(&user_id))
        .await
    {
        Ok(Some(profile)) => (StatusCode::OK, Json(profile)).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Profile not found").into_response(),
        Err(e) => error_response(e),
    }
}
