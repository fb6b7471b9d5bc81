use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::DbConnection;
use shared::{
    ChangeEvent, Collection, DeleteUserResponse, MonthOverviewResponse, ProfileResponse,
    ResetSummary, UserListResponse, UserMonthSummary, UserOverview,
};

use super::access::require_admin;
use super::auth_service::AuthenticatedUser;
use super::change_feed::ChangeFeed;
use super::commands::admin::{
    MonthOverviewQuery, ResetCommand, UpdateDeductionsCommand, UpdateUsernameCommand,
};
use super::entry_service::format_month_key;
use super::errors::{DomainError, DomainResult};
use super::profile_service::validate_username;

/// Confirmation phrase for the data-only reset. Compared byte-for-byte.
pub const DATA_RESET_PHRASE: &str = "RESET DATA";
/// Confirmation phrase for the complete reset. Compared byte-for-byte.
pub const COMPLETE_RESET_PHRASE: &str = "RESET EVERYTHING";

/// Service for the administrator operations: user management, fixed
/// deductions, and the irreversible bulk resets. Every operation re-checks
/// the caller's admin role against the store.
#[derive(Clone)]
pub struct AdminService {
    db: Arc<DbConnection>,
    feed: ChangeFeed,
}

impl AdminService {
    pub fn new(db: Arc<DbConnection>, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// All profiles joined with their auth emails, oldest first
    pub async fn list_users(&self, caller: &AuthenticatedUser) -> DomainResult<UserListResponse> {
        require_admin(&self.db, caller).await?;

        let users = self
            .db
            .list_profiles_with_email()
            .await?
            .into_iter()
            .map(|(profile, email)| UserOverview { profile, email })
            .collect();

        Ok(UserListResponse { users })
    }

    /// Rename any user's profile
    pub async fn update_username(
        &self,
        caller: &AuthenticatedUser,
        command: UpdateUsernameCommand,
    ) -> DomainResult<ProfileResponse> {
        require_admin(&self.db, caller).await?;

        let username = command.new_username.trim().to_string();
        validate_username(&username)?;

        self.db
            .get_profile(&command.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("Profile not found: {}", command.user_id))
            })?;

        if self
            .db
            .username_taken(&username, Some(&command.user_id))
            .await?
        {
            return Err(DomainError::validation("Username is already taken"));
        }

        self.db.update_username(&command.user_id, &username).await?;
        info!("Renamed {} to {}", command.user_id, username);

        self.feed.publish(ChangeEvent {
            collection: Collection::Profiles,
            user_id: Some(command.user_id.clone()),
            date: None,
        });

        let profile = self
            .db
            .get_profile(&command.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile vanished during rename"))?;

        Ok(ProfileResponse {
            profile,
            success_message: "Username updated successfully".to_string(),
        })
    }

    /// Set any user's fixed deductions (including the caller's own)
    pub async fn update_deductions(
        &self,
        caller: &AuthenticatedUser,
        command: UpdateDeductionsCommand,
    ) -> DomainResult<ProfileResponse> {
        require_admin(&self.db, caller).await?;

        if !command.deductions.is_finite() {
            return Err(DomainError::validation("Deductions must be a finite number"));
        }
        if command.deductions < 0.0 {
            return Err(DomainError::validation("Deductions cannot be negative"));
        }

        self.db
            .get_profile(&command.user_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found(format!("Profile not found: {}", command.user_id))
            })?;

        self.db
            .update_deductions(&command.user_id, command.deductions)
            .await?;
        info!(
            "Set deductions for {} to {}",
            command.user_id, command.deductions
        );

        self.feed.publish(ChangeEvent {
            collection: Collection::Profiles,
            user_id: Some(command.user_id.clone()),
            date: None,
        });

        let profile = self
            .db
            .get_profile(&command.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("profile vanished during update"))?;

        Ok(ProfileResponse {
            profile,
            success_message: "Deductions updated successfully".to_string(),
        })
    }

    /// Delete a non-admin user along with their profile, sessions, and all
    /// daily entries. Admin accounts cannot be deleted, not even by another
    /// admin.
    pub async fn delete_user(
        &self,
        caller: &AuthenticatedUser,
        user_id: &str,
    ) -> DomainResult<DeleteUserResponse> {
        require_admin(&self.db, caller).await?;

        self.db
            .get_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("User not found: {}", user_id)))?;

        if let Some(profile) = self.db.get_profile(user_id).await? {
            if profile.is_admin {
                return Err(DomainError::validation(
                    "Administrator accounts cannot be deleted",
                ));
            }
        }

        let entries_deleted = self.db.delete_user_data(user_id).await?;
        info!("Deleted user {} ({} entries)", user_id, entries_deleted);

        self.feed.publish(ChangeEvent {
            collection: Collection::Users,
            user_id: Some(user_id.to_string()),
            date: None,
        });

        Ok(DeleteUserResponse {
            entries_deleted,
            success_message: "User deleted successfully".to_string(),
        })
    }

    /// Delete every daily entry system-wide; users and profiles untouched.
    /// Irreversible, so gated behind the exact confirmation phrase; on
    /// mismatch nothing is deleted.
    pub async fn reset_data_only(
        &self,
        caller: &AuthenticatedUser,
        command: ResetCommand,
    ) -> DomainResult<ResetSummary> {
        require_admin(&self.db, caller).await?;
        check_confirmation(&command.confirmation, DATA_RESET_PHRASE)?;

        warn!("Data-only reset requested by {}", caller.user_id);
        let entries_deleted = self.db.delete_all_entries().await?;

        self.feed.publish(ChangeEvent {
            collection: Collection::Entries,
            user_id: None,
            date: None,
        });

        info!("Data-only reset removed {} entries", entries_deleted);
        Ok(ResetSummary {
            entries_deleted,
            profiles_deleted: 0,
            users_deleted: 0,
            message: format!(
                "Deleted {} entries; all users and profiles preserved",
                entries_deleted
            ),
        })
    }

    /// Delete every daily entry and every non-admin account. Admin accounts
    /// all survive. Bulk deletion is per-row; a crash mid-way leaves a
    /// partial state and the operation is re-runnable.
    pub async fn complete_reset(
        &self,
        caller: &AuthenticatedUser,
        command: ResetCommand,
    ) -> DomainResult<ResetSummary> {
        require_admin(&self.db, caller).await?;
        check_confirmation(&command.confirmation, COMPLETE_RESET_PHRASE)?;

        warn!("Complete reset requested by {}", caller.user_id);
        let entries_deleted = self.db.delete_all_entries().await?;
        let (profiles_deleted, users_deleted) = self.db.delete_non_admin_accounts().await?;

        for collection in [Collection::Entries, Collection::Profiles, Collection::Users] {
            self.feed.publish(ChangeEvent {
                collection,
                user_id: None,
                date: None,
            });
        }

        info!(
            "Complete reset removed {} entries, {} profiles, {} users",
            entries_deleted, profiles_deleted, users_deleted
        );
        Ok(ResetSummary {
            entries_deleted,
            profiles_deleted,
            users_deleted,
            message: format!(
                "Deleted {} entries and {} user accounts; administrators preserved",
                entries_deleted, users_deleted
            ),
        })
    }

    /// Per-user aggregates for one month, across every profiled user
    pub async fn month_overview(
        &self,
        caller: &AuthenticatedUser,
        query: MonthOverviewQuery,
    ) -> DomainResult<MonthOverviewResponse> {
        require_admin(&self.db, caller).await?;
        let month_key = format_month_key(query.year, query.month)?;

        let mut users = Vec::new();
        for (profile, _email) in self.db.list_profiles_with_email().await? {
            let entries = self
                .db
                .list_entries(&profile.user_id, Some(&month_key))
                .await?;

            let cash_total: f64 = entries.iter().map(|e| e.cash_amount).sum();
            let network_total: f64 = entries.iter().map(|e| e.network_amount).sum();
            let purchases_total: f64 = entries.iter().map(|e| e.purchases_amount).sum();
            let advances_total: f64 = entries.iter().map(|e| e.advance_amount).sum();
            let gross_total = cash_total + network_total;

            users.push(UserMonthSummary {
                user_id: profile.user_id,
                username: profile.username,
                days_recorded: entries.len() as u32,
                cash_total,
                network_total,
                purchases_total,
                advances_total,
                gross_total,
                remaining_total: gross_total - purchases_total,
                deductions: profile.deductions,
            });
        }

        Ok(MonthOverviewResponse {
            year: query.year,
            month: query.month,
            users,
        })
    }
}

fn check_confirmation(supplied: &str, expected: &str) -> DomainResult<()> {
    if supplied != expected {
        return Err(DomainError::validation(format!(
            "Confirmation phrase does not match; type \"{}\" exactly",
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::change_feed::ChangeFeed;
    use crate::domain::commands::entries::UpsertEntryCommand;
    use crate::domain::entry_service::EntryService;
    use chrono::Utc;
    use shared::UserAccount;

    struct TestContext {
        service: AdminService,
        entries: EntryService,
        db: Arc<DbConnection>,
        admin: AuthenticatedUser,
        clerk: AuthenticatedUser,
    }

    async fn setup_test() -> TestContext {
        let db = Arc::new(
            DbConnection::init_test()
                .await
                .expect("Failed to create test database"),
        );
        let feed = ChangeFeed::new();
        let admin = test_user(&db, Some("Owner"), Some("owner@shop.test")).await;
        let clerk = test_user(&db, Some("Clerk"), Some("clerk@shop.test")).await;
        TestContext {
            service: AdminService::new(db.clone(), feed.clone()),
            entries: EntryService::new(db.clone(), feed),
            db,
            admin,
            clerk,
        }
    }

    async fn test_user(
        db: &DbConnection,
        username: Option<&str>,
        email: Option<&str>,
    ) -> AuthenticatedUser {
        let account = UserAccount {
            id: UserAccount::generate_id(),
            email: email.map(|e| e.to_string()),
            created_at: Utc::now().to_rfc3339(),
        };
        db.store_user(&account, None).await.expect("store user");
        if let Some(username) = username {
            db.store_profile(&account.id, username, &Utc::now().to_rfc3339())
                .await
                .expect("store profile");
        }
        AuthenticatedUser {
            user_id: account.id,
            email: account.email,
        }
    }

    async fn record_entry(ctx: &TestContext, caller: &AuthenticatedUser, date: &str, cash: f64) {
        ctx.entries
            .upsert_entry(
                caller,
                UpsertEntryCommand {
                    date: date.to_string(),
                    cash_amount: cash,
                    network_amount: 0.0,
                    purchases_amount: 0.0,
                    advance_amount: 5.0,
                    notes: String::new(),
                    target_user_id: None,
                },
            )
            .await
            .expect("record entry");
    }

    #[tokio::test]
    async fn test_every_admin_operation_rejects_non_admin_callers() {
        let ctx = setup_test().await;
        let clerk = &ctx.clerk;
        let target = ctx.admin.user_id.clone();

        // Inputs are valid in every case; the capability check must fire first
        let results: Vec<DomainResult<()>> = vec![
            ctx.service.list_users(clerk).await.map(|_| ()),
            ctx.service
                .update_username(
                    clerk,
                    UpdateUsernameCommand {
                        user_id: target.clone(),
                        new_username: "NewName".to_string(),
                    },
                )
                .await
                .map(|_| ()),
            ctx.service
                .update_deductions(
                    clerk,
                    UpdateDeductionsCommand {
                        user_id: target.clone(),
                        deductions: 10.0,
                    },
                )
                .await
                .map(|_| ()),
            ctx.service.delete_user(clerk, &target).await.map(|_| ()),
            ctx.service
                .reset_data_only(
                    clerk,
                    ResetCommand {
                        confirmation: DATA_RESET_PHRASE.to_string(),
                    },
                )
                .await
                .map(|_| ()),
            ctx.service
                .complete_reset(
                    clerk,
                    ResetCommand {
                        confirmation: COMPLETE_RESET_PHRASE.to_string(),
                    },
                )
                .await
                .map(|_| ()),
            ctx.service
                .month_overview(
                    clerk,
                    MonthOverviewQuery {
                        year: 2024,
                        month: 3,
                    },
                )
                .await
                .map(|_| ()),
        ];

        for result in results {
            assert!(matches!(result, Err(DomainError::Authorization(_))));
        }
    }

    #[tokio::test]
    async fn test_rename_validations() {
        let ctx = setup_test().await;

        let result = ctx
            .service
            .update_username(
                &ctx.admin,
                UpdateUsernameCommand {
                    user_id: ctx.clerk.user_id.clone(),
                    new_username: "  ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        // Collides with the admin's own name, case-insensitively
        let result = ctx
            .service
            .update_username(
                &ctx.admin,
                UpdateUsernameCommand {
                    user_id: ctx.clerk.user_id.clone(),
                    new_username: "owner".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        // Renaming to the current name is fine
        let response = ctx
            .service
            .update_username(
                &ctx.admin,
                UpdateUsernameCommand {
                    user_id: ctx.clerk.user_id.clone(),
                    new_username: "Clerk".to_string(),
                },
            )
            .await
            .expect("rename");
        assert_eq!(response.profile.username, "Clerk");

        // Unknown target
        let result = ctx
            .service
            .update_username(
                &ctx.admin,
                UpdateUsernameCommand {
                    user_id: "user::nonexistent".to_string(),
                    new_username: "Anyone".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_deductions_validation_and_update() {
        let ctx = setup_test().await;

        let result = ctx
            .service
            .update_deductions(
                &ctx.admin,
                UpdateDeductionsCommand {
                    user_id: ctx.clerk.user_id.clone(),
                    deductions: -5.0,
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let response = ctx
            .service
            .update_deductions(
                &ctx.admin,
                UpdateDeductionsCommand {
                    user_id: ctx.clerk.user_id.clone(),
                    deductions: 250.0,
                },
            )
            .await
            .expect("update");
        assert_eq!(response.profile.deductions, 250.0);

        // An admin may adjust their own deductions too
        let response = ctx
            .service
            .update_deductions(
                &ctx.admin,
                UpdateDeductionsCommand {
                    user_id: ctx.admin.user_id.clone(),
                    deductions: 100.0,
                },
            )
            .await
            .expect("own update");
        assert_eq!(response.profile.deductions, 100.0);
    }

    #[tokio::test]
    async fn test_delete_user_cascades_and_protects_admins() {
        let ctx = setup_test().await;
        record_entry(&ctx, &ctx.clerk, "2024-03-01", 10.0).await;
        record_entry(&ctx, &ctx.clerk, "2024-03-02", 20.0).await;

        // Admins are protected
        let result = ctx.service.delete_user(&ctx.admin, &ctx.admin.user_id).await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        let response = ctx
            .service
            .delete_user(&ctx.admin, &ctx.clerk.user_id)
            .await
            .expect("delete");
        assert_eq!(response.entries_deleted, 2);

        // Post-condition: the user's entries are gone
        let remaining = ctx
            .db
            .list_entries(&ctx.clerk.user_id, None)
            .await
            .expect("list");
        assert!(remaining.is_empty());
        assert!(ctx
            .db
            .get_user(&ctx.clerk.user_id)
            .await
            .expect("get")
            .is_none());

        let result = ctx.service.delete_user(&ctx.admin, &ctx.clerk.user_id).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_data_only_reset_requires_exact_phrase() {
        let ctx = setup_test().await;
        record_entry(&ctx, &ctx.clerk, "2024-03-01", 10.0).await;

        // Wrong phrase: nothing is deleted
        for phrase in ["reset data", "RESET DATA ", "Data Reset", ""] {
            let result = ctx
                .service
                .reset_data_only(
                    &ctx.admin,
                    ResetCommand {
                        confirmation: phrase.to_string(),
                    },
                )
                .await;
            assert!(matches!(result, Err(DomainError::Validation(_))));
        }
        let entries = ctx
            .db
            .list_entries(&ctx.clerk.user_id, None)
            .await
            .expect("list");
        assert_eq!(entries.len(), 1);

        // Correct phrase: entries go, accounts stay
        let summary = ctx
            .service
            .reset_data_only(
                &ctx.admin,
                ResetCommand {
                    confirmation: DATA_RESET_PHRASE.to_string(),
                },
            )
            .await
            .expect("reset");
        assert_eq!(summary.entries_deleted, 1);
        assert_eq!(summary.users_deleted, 0);

        assert!(ctx
            .db
            .list_entries(&ctx.clerk.user_id, None)
            .await
            .expect("list")
            .is_empty());
        assert!(ctx
            .db
            .get_profile(&ctx.clerk.user_id)
            .await
            .expect("get")
            .is_some());
    }

    #[tokio::test]
    async fn test_complete_reset_preserves_admins_only() {
        let ctx = setup_test().await;
        record_entry(&ctx, &ctx.clerk, "2024-03-01", 10.0).await;
        record_entry(&ctx, &ctx.admin, "2024-03-01", 99.0).await;

        let summary = ctx
            .service
            .complete_reset(
                &ctx.admin,
                ResetCommand {
                    confirmation: COMPLETE_RESET_PHRASE.to_string(),
                },
            )
            .await
            .expect("reset");

        assert_eq!(summary.entries_deleted, 2);
        assert_eq!(summary.profiles_deleted, 1);
        assert_eq!(summary.users_deleted, 1);

        assert!(ctx
            .db
            .get_profile(&ctx.admin.user_id)
            .await
            .expect("get")
            .is_some());
        assert!(ctx
            .db
            .get_user(&ctx.clerk.user_id)
            .await
            .expect("get")
            .is_none());
        assert!(ctx
            .db
            .list_entries(&ctx.admin.user_id, None)
            .await
            .expect("list")
            .is_empty());
    }

    #[tokio::test]
    async fn test_month_overview_aggregates_per_user() {
        let ctx = setup_test().await;
        record_entry(&ctx, &ctx.clerk, "2024-03-01", 100.0).await;
        record_entry(&ctx, &ctx.clerk, "2024-03-02", 50.0).await;
        record_entry(&ctx, &ctx.clerk, "2024-04-01", 999.0).await; // other month

        let overview = ctx
            .service
            .month_overview(
                &ctx.admin,
                MonthOverviewQuery {
                    year: 2024,
                    month: 3,
                },
            )
            .await
            .expect("overview");

        assert_eq!(overview.users.len(), 2);
        let clerk_summary = overview
            .users
            .iter()
            .find(|u| u.user_id == ctx.clerk.user_id)
            .expect("clerk row");
        assert_eq!(clerk_summary.days_recorded, 2);
        assert_eq!(clerk_summary.cash_total, 150.0);
        assert_eq!(clerk_summary.gross_total, 150.0);
        assert_eq!(clerk_summary.advances_total, 10.0);

        let result = ctx
            .service
            .month_overview(
                &ctx.admin,
                MonthOverviewQuery {
                    year: 2024,
                    month: 13,
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
