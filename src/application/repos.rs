//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::users::{UserRecord, UserRole};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Insert parameters for a user whose password has already been hashed.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    /// Insert one row. Violating the email uniqueness constraint yields
    /// [`RepoError::Duplicate`].
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError>;

    /// Case-insensitive lookup by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError>;

    async fn count_users(&self) -> Result<u64, RepoError>;
}
