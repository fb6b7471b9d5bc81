//! # tillbook backend
//!
//! Daily cash reconciliation for a single retail outlet: staff record each
//! day's cash/network/purchase/advance amounts, an administrator reviews,
//! edits, and resets aggregated data across users, months, and years.
//!
//! ## Architecture
//!
//! The backend follows a layered architecture:
//! ```text
//! Presentation layer (any client of the REST API + change feed)
//!     ↓
//! IO Layer (REST handlers, WebSocket change feed)
//!     ↓
//! Domain Layer (validation, authorization, aggregation)
//!     ↓
//! Storage Layer (SQLite document store)
//! ```
//!
//! Reads are reactive: every successful mutation publishes a change event,
//! and subscribers re-run their queries rather than polling.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use axum::http::Method;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::domain::{
    AdminService, AuthService, CalendarService, ChangeFeed, EntryService, ProfileService,
};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub profile_service: ProfileService,
    pub entry_service: EntryService,
    pub admin_service: AdminService,
    pub calendar_service: CalendarService,
    pub change_feed: ChangeFeed,
}

/// Wire the services over an already-open store
pub fn build_state(db: DbConnection) -> AppState {
    let db = std::sync::Arc::new(db);
    let change_feed = ChangeFeed::new();

    AppState {
        auth_service: AuthService::new(db.clone(), change_feed.clone()),
        profile_service: ProfileService::new(db.clone(), change_feed.clone()),
        entry_service: EntryService::new(db.clone(), change_feed.clone()),
        admin_service: AdminService::new(db.clone(), change_feed.clone()),
        calendar_service: CalendarService::new(),
        change_feed,
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(database_url: &str) -> anyhow::Result<AppState> {
    info!("Setting up database");
    let db = DbConnection::new(database_url).await?;

    info!("Setting up application state");
    Ok(build_state(db))
}

/// Create the Axum router with all routes configured
pub fn create_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/auth/signup", post(io::rest::auth_apis::sign_up))
        .route("/auth/signin", post(io::rest::auth_apis::sign_in))
        .route("/auth/anonymous", post(io::rest::auth_apis::sign_in_anonymous))
        .route("/auth/signout", post(io::rest::auth_apis::sign_out))
        .route("/auth/me", get(io::rest::auth_apis::current_user))
        .route("/profiles", post(io::rest::profile_apis::create_profile))
        .route("/profiles/:user_id", get(io::rest::profile_apis::get_profile))
        .route(
            "/entries",
            get(io::rest::entry_apis::list_entries).post(io::rest::entry_apis::upsert_entry),
        )
        .route(
            "/entries/advances",
            get(io::rest::entry_apis::monthly_advances),
        )
        .route(
            "/entries/:entry_id",
            axum::routing::delete(io::rest::entry_apis::delete_entry),
        )
        .route("/calendar/month", get(io::rest::calendar_apis::month_grid))
        .route("/admin/users", get(io::rest::admin_apis::list_users))
        .route(
            "/admin/users/:user_id",
            axum::routing::delete(io::rest::admin_apis::delete_user),
        )
        .route(
            "/admin/users/:user_id/username",
            put(io::rest::admin_apis::update_username),
        )
        .route(
            "/admin/users/:user_id/deductions",
            put(io::rest::admin_apis::update_deductions),
        )
        .route("/admin/reset/data", post(io::rest::admin_apis::reset_data_only))
        .route(
            "/admin/reset/complete",
            post(io::rest::admin_apis::complete_reset),
        )
        .route(
            "/admin/overview/month",
            get(io::rest::admin_apis::month_overview),
        )
        .route("/events", get(io::rest::events_apis::change_events));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(app_state)
}
