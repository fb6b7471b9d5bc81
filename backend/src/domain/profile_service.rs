use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::storage::DbConnection;
use shared::{ChangeEvent, Collection, ProfileResponse, UserProfile};

use super::access::ensure_self_or_admin;
use super::auth_service::AuthenticatedUser;
use super::change_feed::ChangeFeed;
use super::commands::profiles::CreateProfileCommand;
use super::errors::{DomainError, DomainResult};

/// Service for user profile setup and reads
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DbConnection>,
    feed: ChangeFeed,
}

impl ProfileService {
    pub fn new(db: Arc<DbConnection>, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// Self-service profile setup, once per account. The first profile ever
    /// created in the system holds the admin role; the store decides that
    /// atomically. Re-submitting returns the existing profile unchanged so a
    /// double-submitted setup form is harmless.
    pub async fn create_profile(
        &self,
        caller: &AuthenticatedUser,
        command: CreateProfileCommand,
    ) -> DomainResult<ProfileResponse> {
        let username = command.username.trim().to_string();
        info!("Creating profile for {}: {}", caller.user_id, username);

        if let Some(existing) = self.db.get_profile(&caller.user_id).await? {
            return Ok(ProfileResponse {
                profile: existing,
                success_message: "Profile already exists".to_string(),
            });
        }

        validate_username(&username)?;
        if self.db.username_taken(&username, None).await? {
            return Err(DomainError::validation("Username is already taken"));
        }

        let profile = self
            .db
            .store_profile(&caller.user_id, &username, &Utc::now().to_rfc3339())
            .await?;

        info!(
            "Created profile for {} (admin: {})",
            profile.user_id, profile.is_admin
        );

        self.feed.publish(ChangeEvent {
            collection: Collection::Profiles,
            user_id: Some(profile.user_id.clone()),
            date: None,
        });

        Ok(ProfileResponse {
            profile,
            success_message: "Profile created successfully".to_string(),
        })
    }

    /// Get a profile. Non-admin callers may only read their own; `None`
    /// when the target has not completed setup.
    pub async fn get_profile(
        &self,
        caller: &AuthenticatedUser,
        target_user_id: Option<&str>,
    ) -> DomainResult<Option<UserProfile>> {
        let target = target_user_id.unwrap_or(&caller.user_id);
        ensure_self_or_admin(&self.db, caller, target).await?;
        Ok(self.db.get_profile(target).await?)
    }
}

/// Username validation shared with the admin rename operation.
pub(crate) fn validate_username(username: &str) -> DomainResult<()> {
    if username.is_empty() {
        return Err(DomainError::validation("Username cannot be empty"));
    }
    if username.len() > 32 {
        return Err(DomainError::validation(
            "Username cannot exceed 32 characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::UserAccount;

    async fn setup_test() -> (ProfileService, Arc<DbConnection>) {
        let db = Arc::new(
            DbConnection::init_test()
                .await
                .expect("Failed to create test database"),
        );
        (ProfileService::new(db.clone(), ChangeFeed::new()), db)
    }

    async fn test_user(db: &DbConnection) -> AuthenticatedUser {
        let account = UserAccount {
            id: UserAccount::generate_id(),
            email: None,
            created_at: Utc::now().to_rfc3339(),
        };
        db.store_user(&account, None).await.expect("store user");
        AuthenticatedUser {
            user_id: account.id,
            email: None,
        }
    }

    #[tokio::test]
    async fn test_first_profile_becomes_admin() {
        let (service, db) = setup_test().await;
        let first = test_user(&db).await;
        let second = test_user(&db).await;

        let first_response = service
            .create_profile(
                &first,
                CreateProfileCommand {
                    username: "Owner".to_string(),
                },
            )
            .await
            .expect("first profile");
        let second_response = service
            .create_profile(
                &second,
                CreateProfileCommand {
                    username: "Clerk".to_string(),
                },
            )
            .await
            .expect("second profile");

        assert!(first_response.profile.is_admin);
        assert!(!second_response.profile.is_admin);
    }

    #[tokio::test]
    async fn test_create_profile_validation() {
        let (service, db) = setup_test().await;
        let user = test_user(&db).await;

        // Empty username
        let result = service
            .create_profile(
                &user,
                CreateProfileCommand {
                    username: "   ".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));

        // Too long
        let result = service
            .create_profile(
                &user,
                CreateProfileCommand {
                    username: "x".repeat(33),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected_case_insensitively() {
        let (service, db) = setup_test().await;
        let first = test_user(&db).await;
        let second = test_user(&db).await;

        service
            .create_profile(
                &first,
                CreateProfileCommand {
                    username: "Owner".to_string(),
                },
            )
            .await
            .expect("first profile");

        let result = service
            .create_profile(
                &second,
                CreateProfileCommand {
                    username: "OWNER".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_resubmit_returns_existing_profile() {
        let (service, db) = setup_test().await;
        let user = test_user(&db).await;

        let first = service
            .create_profile(
                &user,
                CreateProfileCommand {
                    username: "Owner".to_string(),
                },
            )
            .await
            .expect("create");
        let second = service
            .create_profile(
                &user,
                CreateProfileCommand {
                    username: "Different".to_string(),
                },
            )
            .await
            .expect("resubmit");

        assert_eq!(second.profile, first.profile);
        assert_eq!(second.success_message, "Profile already exists");
    }

    #[tokio::test]
    async fn test_profile_reads_respect_capabilities() {
        let (service, db) = setup_test().await;
        let admin = test_user(&db).await;
        let clerk = test_user(&db).await;

        service
            .create_profile(
                &admin,
                CreateProfileCommand {
                    username: "Owner".to_string(),
                },
            )
            .await
            .expect("admin profile");
        service
            .create_profile(
                &clerk,
                CreateProfileCommand {
                    username: "Clerk".to_string(),
                },
            )
            .await
            .expect("clerk profile");

        // Self-read is fine
        let own = service
            .get_profile(&clerk, None)
            .await
            .expect("own profile");
        assert_eq!(own.expect("present").username, "Clerk");

        // Clerk may not read the admin's profile
        let result = service.get_profile(&clerk, Some(&admin.user_id)).await;
        assert!(matches!(result, Err(DomainError::Authorization(_))));

        // Admin may read anyone's
        let read = service
            .get_profile(&admin, Some(&clerk.user_id))
            .await
            .expect("admin read");
        assert_eq!(read.expect("present").username, "Clerk");
    }
}
