#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use portfolio::application::repos::{CreateUserParams, RepoError, UsersRepo};
use portfolio::domain::users::UserRecord;
use portfolio::infra::db::PostgresRepositories;

/// In-memory user store enforcing case-insensitive email uniqueness.
#[derive(Default)]
pub struct InMemoryUsersRepo {
    users: Mutex<Vec<UserRecord>>,
}

impl InMemoryUsersRepo {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn snapshot(&self) -> Vec<UserRecord> {
        self.users.lock().await.clone()
    }
}

#[async_trait]
impl UsersRepo for InMemoryUsersRepo {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.lock().await;
        if users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(&params.email))
        {
            return Err(RepoError::Duplicate {
                constraint: "users_email_key".to_string(),
            });
        }

        let now = OffsetDateTime::now_utc();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: params.name,
            phone: params.phone,
            email: params.email,
            password_hash: params.password_hash,
            role: params.role,
            created_at: now,
            updated_at: now,
        };
        users.push(record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .lock()
            .await
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        Ok(self.users.lock().await.len() as u64)
    }
}

/// Repositories over a pool that never reaches a database.
pub fn unreachable_repositories() -> Arc<PostgresRepositories> {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy("postgres://portfolio@127.0.0.1:1/portfolio")
        .expect("lazy pool");
    Arc::new(PostgresRepositories::new(pool))
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.expect("collect body").to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}
