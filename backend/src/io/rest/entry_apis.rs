//! # REST API for Daily Entries
//!
//! Upsert, list, delete, and the monthly advance aggregate.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::info;

use crate::domain::commands::entries::{
    ListEntriesQuery, MonthlyAdvancesQuery, UpsertEntryCommand,
};
use crate::domain::AuthenticatedUser;
use crate::AppState;
use shared::UpsertEntryRequest;

use super::error_response;

#[derive(Debug, Deserialize)]
pub struct ListEntriesParams {
    pub user_id: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AdvancesParams {
    pub user_id: Option<String>,
    pub year_month: String,
}

/// List entries for a user, optionally restricted to one month
pub async fn list_entries(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListEntriesParams>,
) -> impl IntoResponse {
    info!("GET /api/entries for {}", user.user_id);

    let query = ListEntriesQuery {
        target_user_id: params.user_id,
        year: params.year,
        month: params.month,
    };
    match state.entry_service.list_entries(&user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Create or update the entry for (user, date)
pub async fn upsert_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpsertEntryRequest>,
) -> impl IntoResponse {
    info!("POST /api/entries {} by {}", request.date, user.user_id);

    let command = UpsertEntryCommand {
        date: request.date,
        cash_amount: request.cash_amount,
        network_amount: request.network_amount,
        purchases_amount: request.purchases_amount,
        advance_amount: request.advance_amount,
        notes: request.notes,
        target_user_id: request.target_user_id,
    };
    match state.entry_service.upsert_entry(&user, command).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}

/// Delete an entry (admin only)
pub async fn delete_entry(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(entry_id): Path<String>,
) -> impl IntoResponse {
    info!("DELETE /api/entries/{}", entry_id);

    match state.entry_service.delete_entry(&user, &entry_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

/// Sum of advance amounts for one user and month
pub async fn monthly_advances(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<AdvancesParams>,
) -> impl IntoResponse {
    info!("GET /api/entries/advances {}", params.year_month);

    let query = MonthlyAdvancesQuery {
        target_user_id: params.user_id,
        year_month: params.year_month,
    };
    match state.entry_service.monthly_advances(&user, query).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => error_response(e),
    }
}
