//! Domain-level command and query types
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer is responsible for mapping
//! the public DTOs defined in the `shared` crate to these internal types.

pub mod auth {
    /// Input for registering an email-backed account.
    #[derive(Debug, Clone)]
    pub struct SignUpCommand {
        pub email: String,
        pub password: String,
    }

    /// Input for signing in with credentials.
    #[derive(Debug, Clone)]
    pub struct SignInCommand {
        pub email: String,
        pub password: String,
    }
}

pub mod profiles {
    /// Input for self-service profile setup.
    #[derive(Debug, Clone)]
    pub struct CreateProfileCommand {
        pub username: String,
    }
}

pub mod entries {
    /// Input for creating or updating one (user, date) entry.
    #[derive(Debug, Clone)]
    pub struct UpsertEntryCommand {
        pub date: String,
        pub cash_amount: f64,
        pub network_amount: f64,
        pub purchases_amount: f64,
        pub advance_amount: f64,
        pub notes: String,
        /// Defaults to the caller when absent
        pub target_user_id: Option<String>,
    }

    /// Query parameters for listing entries.
    #[derive(Debug, Clone, Default)]
    pub struct ListEntriesQuery {
        pub target_user_id: Option<String>,
        pub year: Option<i32>,
        pub month: Option<u32>,
    }

    /// Query for the monthly advance aggregate.
    #[derive(Debug, Clone)]
    pub struct MonthlyAdvancesQuery {
        pub target_user_id: Option<String>,
        /// Month key (YYYY-MM)
        pub year_month: String,
    }
}

pub mod admin {
    /// Input for renaming a user's profile.
    #[derive(Debug, Clone)]
    pub struct UpdateUsernameCommand {
        pub user_id: String,
        pub new_username: String,
    }

    /// Input for setting a profile's fixed deductions.
    #[derive(Debug, Clone)]
    pub struct UpdateDeductionsCommand {
        pub user_id: String,
        pub deductions: f64,
    }

    /// Typed-phrase confirmation for a bulk reset.
    #[derive(Debug, Clone)]
    pub struct ResetCommand {
        pub confirmation: String,
    }

    /// Query for the cross-user month overview.
    #[derive(Debug, Clone)]
    pub struct MonthOverviewQuery {
        pub year: i32,
        pub month: u32,
    }
}
