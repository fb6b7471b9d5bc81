//! # REST API for Administration
//!
//! User table, renames, fixed deductions, user deletion, bulk resets, and
//! the cross-user month overview. Every operation re-checks the caller's
//! admin role in the domain layer.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::info;

use crate::domain::commands::admin::{
    MonthOverviewQuery, ResetCommand, UpdateDeductionsCommand, UpdateUsernameCommand,
};
use crate::domain::AuthenticatedUser;
use crate::AppState;
use shared::{ResetRequest, UpdateDeductionsRequest, UpdateUsernameRequest};

use super::error_response;

#[derive(Debug, Deserialize)]
pub struct OverviewParams {
    pub year: i32,
    pub month: u32,
}

/// All profiles with their auth emails
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> impl IntoResponse {
    info!("GET /api/admin/users");

    match state.admin_service.list_users(&user).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Rename a user's profile
pub async fn update_username(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateUsernameRequest>,
) -> impl IntoResponse {
    info!("PUT /api/admin/users/{}/username", user_id);

    let command = UpdateUsernameCommand {
        user_id,
        new_username: request.new_username,
    };
    match state.admin_service.update_username(&user, command).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Set a user's fixed deductions
pub async fn update_deductions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
    Json(request): Json<UpdateDeductionsRequest>,
) -> impl IntoResponse {
    info!("PUT /api/admin/users/{}/deductions", user_id);

    let command = UpdateDeductionsCommand {
        user_id,
        deductions: request.deductions,
    };
    match state.admin_service.update_deductions(&user, command).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete a non-admin user and all their data
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/admin/users/{}", user_id);

    match state.admin_service.delete_user(&user, &user_id).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete every daily entry; keep all accounts
pub async fn reset_data_only(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ResetRequest>,
) -> impl IntoResponse {
    info!("POST /api/admin/reset/data");

    let command = ResetCommand {
        confirmation: request.confirmation,
    };
    match state.admin_service.reset_data_only(&user, command).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete every daily entry and every non-admin account
pub async fn complete_reset(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ResetRequest>,
) -> impl IntoResponse {
    info!("POST /api/admin/reset/complete");

    let command = ResetCommand {
        confirmation: request.confirmation,
    };
    match state.admin_service.complete_reset(&user, command).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Per-user aggregates for one month
pub async fn month_overview(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<OverviewParams>,
) -> impl IntoResponse {
    info!("GET /api/admin/overview/month {}-{}", params.year, params.month);

    let query = MonthOverviewQuery {
        year: params.year,
        month: params.month,
    };
    match state.admin_service.month_overview(&user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}
