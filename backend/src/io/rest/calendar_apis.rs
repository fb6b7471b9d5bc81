//! # REST API for the Calendar Month Grid

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use serde::Deserialize;
use tracing::info;

use crate::domain::commands::entries::ListEntriesQuery;
use crate::domain::AuthenticatedUser;
use crate::AppState;

use super::error_response;

#[derive(Debug, Deserialize)]
pub struct MonthGridParams {
    pub user_id: Option<String>,
    pub year: i32,
    pub month: u32,
}

/// Month grid with each day's entry attached. The entry read applies the
/// usual self-or-admin check; the grid itself is pure computation.
pub async fn month_grid(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<MonthGridParams>,
) -> impl IntoResponse {
    info!("GET /api/calendar/month {}-{}", params.year, params.month);

    let query = ListEntriesQuery {
        target_user_id: params.user_id,
        year: Some(params.year),
        month: Some(params.month),
    };
    let entries = match state.entry_service.list_entries(&user, query).await {
        Ok(response) => response.entries,
        Err(e) => return error_response(e),
    };

    match state
        .calendar_service
        .month_grid(params.year, params.month, entries)
    {
        Ok(grid) => (StatusCode::OK, Json(grid)).into_response(),
        Err(e) => error_response(e),
    }
}
