//! User accounts: roles, the creation attribute set, and persisted records.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

pub const MIN_PASSWORD_LEN: usize = 6;

/// Account role. Rows created without an explicit role are ordinary users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl Display for UserRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(DomainError::validation(
                "role",
                format!("`{other}` is not a known role"),
            )),
        }
    }
}

/// Attributes accepted when creating a user.
///
/// `password_confirmation` only exists to be compared against `password`;
/// neither value outlives [`NewUser::validate`] in plain text.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    #[serde(default)]
    pub role: Option<UserRole>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("phone", &self.phone)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("password_confirmation", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

impl NewUser {
    pub fn effective_role(&self) -> UserRole {
        self.role.unwrap_or_default()
    }

    /// Check field-level constraints. The first violation wins.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name", "can't be blank"));
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            return Err(DomainError::validation("phone", "can't be blank"));
        }
        if !phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation("phone", "must contain digits only"));
        }

        validate_email(self.email.trim())?;

        if self.password.is_empty() {
            return Err(DomainError::validation("password", "can't be blank"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(
                "password",
                format!("is too short (minimum is {MIN_PASSWORD_LEN} characters)"),
            ));
        }
        if self.password != self.password_confirmation {
            return Err(DomainError::validation(
                "password_confirmation",
                "doesn't match password",
            ));
        }

        Ok(())
    }
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    let mut parts = email.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next();
    match domain {
        Some(domain) if parts.next().is_none() && !local.is_empty() && !domain.is_empty() => {
            Ok(())
        }
        _ if email.is_empty() => Err(DomainError::validation("email", "can't be blank")),
        _ => Err(DomainError::validation("email", "is invalid")),
    }
}

/// A stored user row. Only the password hash is ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}
