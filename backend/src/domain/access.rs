//! Capability checks shared by the services.
//!
//! The caller's admin status is re-derived from the store on every call,
//! keyed by the authenticated identity, never taken from request input.

use crate::storage::DbConnection;
use shared::UserProfile;

use super::auth_service::AuthenticatedUser;
use super::errors::{DomainError, DomainResult};

/// Fail unless the caller holds the admin role. Returns the caller's
/// profile so admin operations can refer to it.
pub async fn require_admin(
    db: &DbConnection,
    caller: &AuthenticatedUser,
) -> DomainResult<UserProfile> {
    let profile = db
        .get_profile(&caller.user_id)
        .await?
        .ok_or_else(|| DomainError::authorization("Administrator access required"))?;

    if !profile.is_admin {
        return Err(DomainError::authorization("Administrator access required"));
    }

    Ok(profile)
}

/// Fail unless the caller is the target user or an admin.
pub async fn ensure_self_or_admin(
    db: &DbConnection,
    caller: &AuthenticatedUser,
    target_user_id: &str,
) -> DomainResult<()> {
    if caller.user_id == target_user_id {
        return Ok(());
    }

    match db.get_profile(&caller.user_id).await? {
        Some(profile) if profile.is_admin => Ok(()),
        _ => Err(DomainError::authorization(
            "You may only access your own records",
        )),
    }
}
