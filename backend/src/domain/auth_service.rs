use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::DbConnection;
use shared::{AuthResponse, ChangeEvent, Collection, MeResponse, UserAccount};

use super::change_feed::ChangeFeed;
use super::commands::auth::{SignInCommand, SignUpCommand};
use super::errors::{DomainError, DomainResult};

/// Identity resolved from a session token. Carries no capability flags;
/// services re-derive those from the store per call.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: Option<String>,
}

/// Service for account registration and session management
#[derive(Clone)]
pub struct AuthService {
    db: Arc<DbConnection>,
    feed: ChangeFeed,
}

impl AuthService {
    pub fn new(db: Arc<DbConnection>, feed: ChangeFeed) -> Self {
        Self { db, feed }
    }

    /// Register an email-backed account and open a session
    pub async fn sign_up(&self, command: SignUpCommand) -> DomainResult<AuthResponse> {
        let email = command.email.trim().to_lowercase();
        info!("Signing up new account: {}", email);

        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::validation("A valid email address is required"));
        }
        if command.password.len() < 8 {
            return Err(DomainError::validation(
                "Password must be at least 8 characters",
            ));
        }
        if self.db.get_user_by_email(&email).await?.is_some() {
            return Err(DomainError::validation("Email is already registered"));
        }

        let account = UserAccount {
            id: UserAccount::generate_id(),
            email: Some(email),
            created_at: Utc::now().to_rfc3339(),
        };
        let password_hash = hash_password(&command.password)?;
        self.db.store_user(&account, Some(&password_hash)).await?;

        self.feed.publish(ChangeEvent {
            collection: Collection::Users,
            user_id: Some(account.id.clone()),
            date: None,
        });

        let token = self.open_session(&account.id).await?;
        Ok(AuthResponse {
            token,
            user: account,
        })
    }

    /// Sign in with credentials. Failures are reported with one unified
    /// message so the response does not reveal which part was wrong.
    pub async fn sign_in(&self, command: SignInCommand) -> DomainResult<AuthResponse> {
        let email = command.email.trim().to_lowercase();

        let stored = match self.db.get_user_by_email(&email).await? {
            Some(stored) => stored,
            None => {
                warn!("Sign-in failed, unknown email");
                return Err(invalid_credentials());
            }
        };

        let password_ok = stored
            .password_hash
            .as_deref()
            .map(|hash| verify_password(hash, &command.password))
            .unwrap_or(false);

        if !password_ok {
            warn!("Sign-in failed, bad password for {}", stored.account.id);
            return Err(invalid_credentials());
        }

        info!("Signed in: {}", stored.account.id);
        let token = self.open_session(&stored.account.id).await?;
        Ok(AuthResponse {
            token,
            user: stored.account,
        })
    }

    /// Create an anonymous account (no email, no credentials) and open a
    /// session for it
    pub async fn sign_in_anonymous(&self) -> DomainResult<AuthResponse> {
        let account = UserAccount {
            id: UserAccount::generate_id(),
            email: None,
            created_at: Utc::now().to_rfc3339(),
        };
        self.db.store_user(&account, None).await?;
        info!("Created anonymous account: {}", account.id);

        self.feed.publish(ChangeEvent {
            collection: Collection::Users,
            user_id: Some(account.id.clone()),
            date: None,
        });

        let token = self.open_session(&account.id).await?;
        Ok(AuthResponse {
            token,
            user: account,
        })
    }

    /// Close a session. Closing an already-closed session is not an error.
    pub async fn sign_out(&self, token: &str) -> DomainResult<()> {
        self.db.delete_session(token).await?;
        Ok(())
    }

    /// Resolve a bearer token to the authenticated identity
    pub async fn authenticate(&self, token: &str) -> DomainResult<AuthenticatedUser> {
        match self.db.get_session_user(token).await? {
            Some(account) => Ok(AuthenticatedUser {
                user_id: account.id,
                email: account.email,
            }),
            None => Err(DomainError::authorization("Invalid or expired session")),
        }
    }

    /// The signed-in user plus their profile, if set up yet
    pub async fn current_user(&self, caller: &AuthenticatedUser) -> DomainResult<MeResponse> {
        let user = self
            .db
            .get_user(&caller.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User account no longer exists"))?;
        let profile = self.db.get_profile(&caller.user_id).await?;
        Ok(MeResponse { user, profile })
    }

    async fn open_session(&self, user_id: &str) -> DomainResult<String> {
        let token = uuid::Uuid::new_v4().to_string();
        self.db
            .store_session(&token, user_id, &Utc::now().to_rfc3339())
            .await?;
        Ok(token)
    }
}

fn invalid_credentials() -> DomainError {
    DomainError::authorization("Invalid email or password")
}

fn hash_password(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::Storage(anyhow::anyhow!("password hashing failed: {}", e)))
}

fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
