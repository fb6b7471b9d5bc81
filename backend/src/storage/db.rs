use anyhow::Result;
use sqlx::{migrate::MigrateDatabase, Row, Sqlite, SqlitePool};
use std::sync::Arc;

use shared::{DailyEntry, UserAccount, UserProfile};

/// A user row together with its credential hash. Only the auth service
/// sees this; everything else works with `UserAccount`.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub account: UserAccount,
    pub password_hash: Option<String>,
}

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // Connect to the database
        let pool = SqlitePool::connect(url).await?;

        // Setup database schema
        Self::setup_schema(&pool).await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        // Identity records owned by the auth subsystem
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT,
                password_hash TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
            ON users(email) WHERE email IS NOT NULL;
            "#,
        )
        .execute(pool)
        .await?;

        // Bearer session tokens
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id
            ON sessions(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        // One profile per user
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                is_admin BOOLEAN NOT NULL DEFAULT FALSE,
                deductions REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        // Usernames are unique case-insensitively
        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS idx_user_profiles_username
            ON user_profiles(LOWER(username));
            "#,
        )
        .execute(pool)
        .await?;

        // One entry per (user, calendar date)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS daily_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                date TEXT NOT NULL,
                cash_amount REAL NOT NULL,
                network_amount REAL NOT NULL,
                purchases_amount REAL NOT NULL,
                advance_amount REAL NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE(user_id, date),
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_daily_entries_date
            ON daily_entries(date);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    /// Store a user identity record
    pub async fn store_user(
        &self,
        account: &UserAccount,
        password_hash: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(password_hash)
        .bind(&account.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<Option<UserAccount>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, created_at FROM users WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| UserAccount {
            id: r.get("id"),
            email: r.get("email"),
            created_at: r.get("created_at"),
        }))
    }

    /// Get a user and its credential hash by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            r#"
            SELECT id, email, password_hash, created_at FROM users WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| StoredUser {
            account: UserAccount {
                id: r.get("id"),
                email: r.get("email"),
                created_at: r.get("created_at"),
            },
            password_hash: r.get("password_hash"),
        }))
    }

    /// Delete a user and everything keyed to it: entries, sessions, profile,
    /// then the identity record. Each row goes independently; a crash mid-way
    /// leaves a partial deletion that a re-run completes. Returns the number
    /// of daily entries removed.
    pub async fn delete_user_data(&self, user_id: &str) -> Result<u64> {
        let entries_deleted = sqlx::query("DELETE FROM daily_entries WHERE user_id = ?")
            .bind(user_id)
            .execute(&*self.pool)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&*self.pool)
            .await?;

        sqlx::query("DELETE FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .execute(&*self.pool)
            .await?;

        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&*self.pool)
            .await?;

        Ok(entries_deleted)
    }

    /// Delete every account that does not hold the admin role: their
    /// sessions, profiles, and identity records. Users that never completed
    /// profile setup count as non-admin. Returns (profiles, users) deleted.
    pub async fn delete_non_admin_accounts(&self) -> Result<(u64, u64)> {
        sqlx::query(
            r#"
            DELETE FROM sessions WHERE user_id NOT IN (
                SELECT user_id FROM user_profiles WHERE is_admin = TRUE
            )
            "#,
        )
        .execute(&*self.pool)
        .await?;

        let profiles_deleted = sqlx::query("DELETE FROM user_profiles WHERE is_admin = FALSE")
            .execute(&*self.pool)
            .await?
            .rows_affected();

        let users_deleted = sqlx::query(
            r#"
            DELETE FROM users WHERE id NOT IN (
                SELECT user_id FROM user_profiles
            )
            "#,
        )
        .execute(&*self.pool)
        .await?
        .rows_affected();

        Ok((profiles_deleted, users_deleted))
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Store a session token for a user
    pub async fn store_session(&self, token: &str, user_id: &str, created_at: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions (token, user_id, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Resolve a session token to its user, if the session exists
    pub async fn get_session_user(&self, token: &str) -> Result<Option<UserAccount>> {
        let row = sqlx::query(
            r#"
            SELECT u.id, u.email, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| UserAccount {
            id: r.get("id"),
            email: r.get("email"),
            created_at: r.get("created_at"),
        }))
    }

    /// Delete a session token; returns false if it did not exist
    pub async fn delete_session(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Insert a profile for a user. The admin bit is computed inside the
    /// statement: it is true iff no profile exists yet, so the check and the
    /// insert cannot be split by a concurrent first sign-up.
    pub async fn store_profile(
        &self,
        user_id: &str,
        username: &str,
        created_at: &str,
    ) -> Result<UserProfile> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, username, is_admin, deductions, created_at)
            VALUES (?, ?, (SELECT COUNT(*) FROM user_profiles) = 0, 0, ?)
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(created_at)
        .execute(&*self.pool)
        .await?;

        self.get_profile(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile missing after insert: {}", user_id))
    }

    /// Get a profile by user ID
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, username, is_admin, deductions, created_at
            FROM user_profiles
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| Self::map_profile(&r)))
    }

    /// List all profiles with their auth emails, oldest first
    pub async fn list_profiles_with_email(&self) -> Result<Vec<(UserProfile, Option<String>)>> {
        let rows = sqlx::query(
            r#"
            SELECT p.user_id, p.username, p.is_admin, p.deductions, p.created_at,
                   u.email
            FROM user_profiles p
            JOIN users u ON u.id = p.user_id
            ORDER BY p.created_at ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| (Self::map_profile(r), r.get("email")))
            .collect())
    }

    /// Check whether a username is already taken (case-insensitive),
    /// optionally ignoring one user (for renames)
    pub async fn username_taken(&self, username: &str, exclude_user: Option<&str>) -> Result<bool> {
        let row = if let Some(exclude) = exclude_user {
            sqlx::query(
                r#"
                SELECT 1 AS hit FROM user_profiles
                WHERE LOWER(username) = LOWER(?) AND user_id != ?
                "#,
            )
            .bind(username)
            .bind(exclude)
            .fetch_optional(&*self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT 1 AS hit FROM user_profiles WHERE LOWER(username) = LOWER(?)
                "#,
            )
            .bind(username)
            .fetch_optional(&*self.pool)
            .await?
        };

        Ok(row.is_some())
    }

    /// Rename a profile; returns false if the user has no profile
    pub async fn update_username(&self, user_id: &str, username: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE user_profiles SET username = ? WHERE user_id = ?")
            .bind(username)
            .bind(user_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set a profile's fixed deductions; returns false if no profile
    pub async fn update_deductions(&self, user_id: &str, deductions: f64) -> Result<bool> {
        let result = sqlx::query("UPDATE user_profiles SET deductions = ? WHERE user_id = ?")
            .bind(deductions)
            .bind(user_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn map_profile(row: &sqlx::sqlite::SqliteRow) -> UserProfile {
        UserProfile {
            user_id: row.get("user_id"),
            username: row.get("username"),
            is_admin: row.get("is_admin"),
            deductions: row.get("deductions"),
            created_at: row.get("created_at"),
        }
    }

    // -----------------------------------------------------------------------
    // Daily entries
    // -----------------------------------------------------------------------

    /// Create or update the entry for (user, date) in one statement. On
    /// conflict the amounts, notes, and updated_at are replaced; the row's
    /// id and created_at survive. Returns the stored row.
    pub async fn upsert_entry(&self, entry: &DailyEntry) -> Result<DailyEntry> {
        sqlx::query(
            r#"
            INSERT INTO daily_entries
                (id, user_id, date, cash_amount, network_amount,
                 purchases_amount, advance_amount, notes, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, date) DO UPDATE SET
                cash_amount = excluded.cash_amount,
                network_amount = excluded.network_amount,
                purchases_amount = excluded.purchases_amount,
                advance_amount = excluded.advance_amount,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.user_id)
        .bind(&entry.date)
        .bind(entry.cash_amount)
        .bind(entry.network_amount)
        .bind(entry.purchases_amount)
        .bind(entry.advance_amount)
        .bind(&entry.notes)
        .bind(&entry.created_at)
        .bind(&entry.updated_at)
        .execute(&*self.pool)
        .await?;

        self.get_entry(&entry.user_id, &entry.date)
            .await?
            .ok_or_else(|| {
                anyhow::anyhow!("entry missing after upsert: {} {}", entry.user_id, entry.date)
            })
    }

    /// Get the entry for (user, date)
    pub async fn get_entry(&self, user_id: &str, date: &str) -> Result<Option<DailyEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, date, cash_amount, network_amount,
                   purchases_amount, advance_amount, notes, created_at, updated_at
            FROM daily_entries
            WHERE user_id = ? AND date = ?
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| Self::map_entry(&r)))
    }

    /// Get an entry by its ID
    pub async fn get_entry_by_id(&self, entry_id: &str) -> Result<Option<DailyEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, date, cash_amount, network_amount,
                   purchases_amount, advance_amount, notes, created_at, updated_at
            FROM daily_entries
            WHERE id = ?
            "#,
        )
        .bind(entry_id)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|r| Self::map_entry(&r)))
    }

    /// List a user's entries ordered by date, optionally restricted to one
    /// month (`month` is a "YYYY-MM" key)
    pub async fn list_entries(&self, user_id: &str, month: Option<&str>) -> Result<Vec<DailyEntry>> {
        let rows = if let Some(month) = month {
            sqlx::query(
                r#"
                SELECT id, user_id, date, cash_amount, network_amount,
                       purchases_amount, advance_amount, notes, created_at, updated_at
                FROM daily_entries
                WHERE user_id = ? AND date LIKE ?
                ORDER BY date ASC
                "#,
            )
            .bind(user_id)
            .bind(format!("{}-%", month))
            .fetch_all(&*self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT id, user_id, date, cash_amount, network_amount,
                       purchases_amount, advance_amount, notes, created_at, updated_at
                FROM daily_entries
                WHERE user_id = ?
                ORDER BY date ASC
                "#,
            )
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?
        };

        Ok(rows.iter().map(|r| Self::map_entry(r)).collect())
    }

    /// Delete an entry by ID; returns false if it did not exist
    pub async fn delete_entry(&self, entry_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM daily_entries WHERE id = ?")
            .bind(entry_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every daily entry system-wide; returns the count removed
    pub async fn delete_all_entries(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM daily_entries")
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    fn map_entry(row: &sqlx::sqlite::SqliteRow) -> DailyEntry {
        DailyEntry {
            id: row.get("id"),
            user_id: row.get("user_id"),
            date: row.get("date"),
            cash_amount: row.get("cash_amount"),
            network_amount: row.get("network_amount"),
            purchases_amount: row.get("purchases_amount"),
            advance_amount: row.get("advance_amount"),
            notes: row.get("notes"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}
