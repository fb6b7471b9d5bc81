use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identity record owned by the auth subsystem. `email` is `None` for
/// anonymous handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    /// ID in format: "user::<uuid>"
    pub id: String,
    pub email: Option<String>,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

impl UserAccount {
    pub fn generate_id() -> String {
        format!("user::{}", uuid::Uuid::new_v4())
    }
}

/// Per-user application profile. Exactly one per user account; the first
/// profile ever created in the system holds the admin role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    /// Unique display name (admin-editable)
    pub username: String,
    pub is_admin: bool,
    /// Fixed monetary amount withheld from the user's settlement,
    /// admin-editable only. Never negative.
    pub deductions: f64,
    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// One user's recorded amounts for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    /// ID in format: "entry::<uuid>"
    pub id: String,
    pub user_id: String,
    /// ISO calendar date (YYYY-MM-DD), unique per user
    pub date: String,
    pub cash_amount: f64,
    pub network_amount: f64,
    pub purchases_amount: f64,
    /// Cash drawn ahead of settlement, accumulated monthly
    pub advance_amount: f64,
    pub notes: String,
    /// Creation timestamp (RFC 3339); survives updates
    pub created_at: String,
    /// Last-modified timestamp (RFC 3339)
    pub updated_at: String,
}

impl DailyEntry {
    pub fn generate_id() -> String {
        format!("entry::{}", uuid::Uuid::new_v4())
    }

    /// cash + network
    pub fn total(&self) -> f64 {
        self.cash_amount + self.network_amount
    }

    /// total - purchases
    pub fn remaining(&self) -> f64 {
        self.total() - self.purchases_amount
    }

    /// The entry's date as a typed calendar date, `None` if the stored
    /// string is malformed.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// Returned by sign-up / sign-in; `token` is an opaque bearer session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserAccount,
}

/// The currently authenticated user plus their profile, if set up yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserAccount,
    pub profile: Option<UserProfile>,
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProfileRequest {
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub success_message: String,
}

// ---------------------------------------------------------------------------
// Daily entries
// ---------------------------------------------------------------------------

/// Upsert payload: creates the entry for (target user, date) or updates it
/// in place. `target_user_id` defaults to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpsertEntryRequest {
    pub date: String,
    pub cash_amount: f64,
    pub network_amount: f64,
    pub purchases_amount: f64,
    pub advance_amount: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub target_user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryResponse {
    pub entry: DailyEntry,
    pub success_message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryListResponse {
    pub entries: Vec<DailyEntry>,
}

/// Read-time sum of advance amounts over one user's entries in one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAdvancesResponse {
    pub user_id: String,
    /// Month key (YYYY-MM)
    pub year_month: String,
    pub advances_total: f64,
}

// ---------------------------------------------------------------------------
// Calendar
// ---------------------------------------------------------------------------

/// Type of calendar day for explicit rendering logic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CalendarDayType {
    /// Empty padding day before the start of the month
    PaddingBefore,
    /// Actual day within the month
    MonthDay,
    /// Empty padding day after the end of the month (grid alignment)
    PaddingAfter,
}

/// A single cell in the month grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
    /// Day of month (0 for padding cells)
    pub day: u32,
    pub day_type: CalendarDayType,
    pub entry: Option<DailyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
    /// Weekday of day 1 (0 = Sunday, 1 = Monday, ...)
    pub first_day_of_week: u32,
    pub days: Vec<CalendarDay>,
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

/// Profile joined with its auth-owned email, for the admin user table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserOverview {
    pub profile: UserProfile,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateUsernameRequest {
    pub new_username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateDeductionsRequest {
    pub deductions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteUserResponse {
    pub entries_deleted: u64,
    pub success_message: String,
}

/// Typed-phrase confirmation for the irreversible bulk resets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetRequest {
    pub confirmation: String,
}

/// Counts reported by a bulk reset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResetSummary {
    pub entries_deleted: u64,
    pub profiles_deleted: u64,
    pub users_deleted: u64,
    pub message: String,
}

/// One user's aggregated amounts for a month, for the admin overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMonthSummary {
    pub user_id: String,
    pub username: String,
    pub days_recorded: u32,
    pub cash_total: f64,
    pub network_total: f64,
    pub purchases_total: f64,
    pub advances_total: f64,
    /// cash + network
    pub gross_total: f64,
    /// gross - purchases
    pub remaining_total: f64,
    pub deductions: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthOverviewResponse {
    pub year: i32,
    pub month: u32,
    pub users: Vec<UserMonthSummary>,
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

/// Document collection touched by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Collection {
    Users,
    Profiles,
    Entries,
}

/// Published on every successful mutation; subscribers re-run affected
/// queries on receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    /// User whose documents changed; `None` for system-wide sweeps
    pub user_id: Option<String>,
    /// Entry date for single-entry changes
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> DailyEntry {
        DailyEntry {
            id: DailyEntry::generate_id(),
            user_id: "user::test".to_string(),
            date: "2024-03-15".to_string(),
            cash_amount: 100.0,
            network_amount: 50.0,
            purchases_amount: 30.0,
            advance_amount: 20.0,
            notes: String::new(),
            created_at: "2024-03-15T12:00:00+00:00".to_string(),
            updated_at: "2024-03-15T12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_derived_totals() {
        let entry = sample_entry();
        assert_eq!(entry.total(), 150.0);
        assert_eq!(entry.remaining(), 120.0);
    }

    #[test]
    fn test_calendar_date_parsing() {
        let mut entry = sample_entry();
        assert!(entry.calendar_date().is_some());

        entry.date = "not-a-date".to_string();
        assert!(entry.calendar_date().is_none());
    }

    #[test]
    fn test_change_event_round_trip() {
        let event = ChangeEvent {
            collection: Collection::Entries,
            user_id: Some("user::abc".to_string()),
            date: Some("2024-03-15".to_string()),
        };

        let json = serde_json::to_string(&event).expect("serialize");
        let back: ChangeEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, event);
    }

    #[test]
    fn test_upsert_request_defaults() {
        let json = r#"{
            "date": "2024-03-15",
            "cash_amount": 1.0,
            "network_amount": 2.0,
            "purchases_amount": 0.0,
            "advance_amount": 0.0
        }"#;
        let request: UpsertEntryRequest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(request.notes, "");
        assert!(request.target_user_id.is_none());
    }
}
