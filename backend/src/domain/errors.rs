use thiserror::Error;

/// Error taxonomy for every domain operation. Each failure is scoped to a
/// single call; prior state is unchanged, and nothing is retried
/// automatically.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("{0}")]
    Validation(String),

    /// Capability check failed
    #[error("{0}")]
    Authorization(String),

    /// Referenced user, profile, or entry is absent
    #[error("{0}")]
    NotFound(String),

    /// Persistence collaborator failure
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
