use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use thiserror::Error;
use tracing::debug;

use crate::application::repos::{CreateUserParams, RepoError, UsersRepo};
use crate::domain::error::DomainError;
use crate::domain::users::{NewUser, UserRecord};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed: {0}")]
    Validation(#[from] DomainError),
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl UserError {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Repo(RepoError::Duplicate { .. }))
    }
}

/// Validates user attributes, hashes the password and hands the row to the repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UsersRepo>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UsersRepo>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, attributes: NewUser) -> Result<UserRecord, UserError> {
        attributes.validate()?;

        let role = attributes.effective_role();
        let password_hash = hash_password(&attributes.password)?;
        let NewUser {
            name, phone, email, ..
        } = attributes;

        let record = self
            .repo
            .create_user(CreateUserParams {
                name: name.trim().to_string(),
                phone: phone.trim().to_string(),
                email: email.trim().to_string(),
                password_hash,
                role,
            })
            .await?;

        debug!(
            target = "portfolio::users",
            user_id = %record.id,
            role = %record.role,
            "user created"
        );
        Ok(record)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserError> {
        Ok(self.repo.find_by_email(email.trim()).await?)
    }
}

/// Argon2id PHC string for `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, UserError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| UserError::Hashing(err.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .and_then(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed))
        .is_ok()
}
