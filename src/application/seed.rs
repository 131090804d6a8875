//! Bootstrap accounts: a seed plan of user attribute sets and the loader that inserts them.

use std::{fs, io, io::Write, path::Path};

use metrics::counter;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::users::{UserError, UserService};
use crate::domain::users::{NewUser, UserRecord, UserRole};

const SEED_PASSWORD: &str = "asdfasdf";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seeding `{email}` failed: {source}")]
    User {
        email: String,
        #[source]
        source: UserError,
    },
    #[error("failed to write seed output: {0}")]
    Output(#[from] io::Error),
    #[error("invalid seed plan: {0}")]
    Plan(String),
}

/// What to do when an entry's email already exists in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// Abort on the first failure, duplicates included.
    #[default]
    Fail,
    /// Leave existing accounts untouched and continue with the next entry.
    SkipExisting,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    #[serde(flatten)]
    pub attributes: NewUser,
    /// Line written to the output once the row exists.
    #[serde(default)]
    pub announcement: Option<String>,
}

impl SeedEntry {
    fn announcement(&self) -> String {
        self.announcement
            .clone()
            .unwrap_or_else(|| format!("{} created", self.attributes.email))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPlan {
    #[serde(default)]
    pub users: Vec<SeedEntry>,
}

impl SeedPlan {
    /// The two bootstrap accounts: an administrator and an ordinary user.
    pub fn default_users() -> Self {
        Self {
            users: vec![
                SeedEntry {
                    attributes: NewUser {
                        name: "Sebastian Valdez".to_string(),
                        phone: "4152994331".to_string(),
                        email: "seb@test.com".to_string(),
                        password: SEED_PASSWORD.to_string(),
                        password_confirmation: SEED_PASSWORD.to_string(),
                        role: Some(UserRole::Admin),
                    },
                    announcement: Some("admin created!".to_string()),
                },
                SeedEntry {
                    attributes: NewUser {
                        name: "Joe Shmoe".to_string(),
                        phone: "5552224343".to_string(),
                        email: "user@test.com".to_string(),
                        password: SEED_PASSWORD.to_string(),
                        password_confirmation: SEED_PASSWORD.to_string(),
                        role: None,
                    },
                    announcement: Some("user created".to_string()),
                },
            ],
        }
    }

    /// Parse a plan made of `[[users]]` tables.
    pub fn from_toml_str(data: &str) -> Result<Self, SeedError> {
        let plan: SeedPlan =
            toml::from_str(data).map_err(|err| SeedError::Plan(err.to_string()))?;
        if plan.users.is_empty() {
            return Err(SeedError::Plan("plan declares no users".to_string()));
        }
        Ok(plan)
    }

    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let data = fs::read_to_string(path)
            .map_err(|err| SeedError::Plan(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&data)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SeedReport {
    pub created: Vec<UserRecord>,
    /// Emails left untouched under [`ConflictPolicy::SkipExisting`].
    pub skipped: Vec<String>,
}

#[derive(Clone)]
pub struct SeedLoader {
    users: UserService,
}

impl SeedLoader {
    pub fn new(users: UserService) -> Self {
        Self { users }
    }

    /// Insert every entry in order, writing each entry's announcement to `out`
    /// after its row is created.
    ///
    /// Entries are independent inserts: when one fails, rows created by
    /// earlier entries stay in place and their announcements are still flushed.
    pub async fn run<W: Write>(
        &self,
        plan: &SeedPlan,
        policy: ConflictPolicy,
        out: &mut W,
    ) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();
        let outcome = self.seed_entries(plan, policy, out, &mut report).await;
        let flushed = out.flush();
        outcome?;
        flushed?;
        Ok(report)
    }

    async fn seed_entries<W: Write>(
        &self,
        plan: &SeedPlan,
        policy: ConflictPolicy,
        out: &mut W,
        report: &mut SeedReport,
    ) -> Result<(), SeedError> {
        for entry in &plan.users {
            let email = entry.attributes.email.trim().to_string();

            if policy == ConflictPolicy::SkipExisting
                && self
                    .users
                    .find_by_email(&email)
                    .await
                    .map_err(|source| SeedError::User {
                        email: email.clone(),
                        source,
                    })?
                    .is_some()
            {
                self.record_skip(report, email);
                continue;
            }

            match self.users.create(entry.attributes.clone()).await {
                Ok(record) => {
                    writeln!(out, "{}", entry.announcement())?;
                    counter!("portfolio_seed_users_created_total").increment(1);
                    info!(
                        target = "portfolio::seed",
                        email = %record.email,
                        role = %record.role,
                        "seeded user"
                    );
                    report.created.push(record);
                }
                Err(err) if err.is_duplicate() && policy == ConflictPolicy::SkipExisting => {
                    self.record_skip(report, email);
                }
                Err(source) => return Err(SeedError::User { email, source }),
            }
        }
        Ok(())
    }

    fn record_skip(&self, report: &mut SeedReport, email: String) {
        counter!("portfolio_seed_users_skipped_total").increment(1);
        warn!(
            target = "portfolio::seed",
            email = %email,
            "user already exists; skipping"
        );
        report.skipped.push(email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_matches_bootstrap_accounts() {
        let plan = SeedPlan::default_users();
        assert_eq!(plan.len(), 2);

        let admin = &plan.users[0];
        assert_eq!(admin.attributes.email, "seb@test.com");
        assert_eq!(admin.attributes.effective_role(), UserRole::Admin);
        assert_eq!(admin.announcement(), "admin created!");

        let user = &plan.users[1];
        assert_eq!(user.attributes.email, "user@test.com");
        assert_eq!(user.attributes.role, None);
        assert_eq!(user.announcement(), "user created");

        for entry in &plan.users {
            entry.attributes.validate().expect("seed rows are valid");
        }
    }

    #[test]
    fn toml_plan_parses_users_tables() {
        let plan = SeedPlan::from_toml_str(
            r#"
            [[users]]
            name = "Grace"
            phone = "5550001"
            email = "grace@example.com"
            password = "hopper!"
            password_confirmation = "hopper!"
            role = "admin"
            announcement = "grace ready"

            [[users]]
            name = "Linus"
            phone = "5550002"
            email = "linus@example.com"
            password = "kernel!"
            password_confirmation = "kernel!"
            "#,
        )
        .expect("valid plan");

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.users[0].attributes.role, Some(UserRole::Admin));
        assert_eq!(plan.users[0].announcement(), "grace ready");
        assert_eq!(plan.users[1].attributes.role, None);
        assert_eq!(plan.users[1].announcement(), "linus@example.com created");
    }

    #[test]
    fn empty_plan_is_rejected() {
        let err = SeedPlan::from_toml_str("").unwrap_err();
        assert!(matches!(err, SeedError::Plan(_)));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let err = SeedPlan::from_toml_str(
            r#"
            [[users]]
            name = "X"
            phone = "1"
            email = "x@example.com"
            password = "xxxxxx"
            password_confirmation = "xxxxxx"
            role = "root"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Plan(_)));
    }
}
