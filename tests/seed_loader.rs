mod support;

use std::io::{self, Write};
use std::sync::Arc;

use portfolio::application::repos::{RepoError, UsersRepo};
use portfolio::application::seed::{ConflictPolicy, SeedError, SeedLoader, SeedPlan};
use portfolio::application::users::{UserError, UserService, verify_password};
use portfolio::domain::users::UserRole;

use support::InMemoryUsersRepo;

fn loader(repo: &Arc<InMemoryUsersRepo>) -> SeedLoader {
    let repo: Arc<dyn UsersRepo> = repo.clone();
    SeedLoader::new(UserService::new(repo))
}

fn output(buf: Vec<u8>) -> String {
    String::from_utf8(buf).expect("utf8 output")
}

#[tokio::test]
async fn seeding_empty_store_creates_admin_then_user() {
    let repo = InMemoryUsersRepo::new();
    let mut out = Vec::new();

    let report = loader(&repo)
        .run(&SeedPlan::default_users(), ConflictPolicy::Fail, &mut out)
        .await
        .expect("seed succeeds");

    assert_eq!(report.created.len(), 2);
    assert!(report.skipped.is_empty());
    assert_eq!(output(out), "admin created!\nuser created\n");

    let rows = repo.snapshot().await;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].email, "seb@test.com");
    assert_eq!(rows[0].name, "Sebastian Valdez");
    assert_eq!(rows[0].phone, "4152994331");
    assert_eq!(rows[0].role, UserRole::Admin);
    assert_eq!(rows[1].email, "user@test.com");
    assert_eq!(rows[1].name, "Joe Shmoe");
    assert_eq!(rows[1].role, UserRole::User);
}

#[tokio::test]
async fn stored_rows_hold_only_a_password_hash() {
    let repo = InMemoryUsersRepo::new();
    loader(&repo)
        .run(
            &SeedPlan::default_users(),
            ConflictPolicy::Fail,
            &mut Vec::new(),
        )
        .await
        .expect("seed succeeds");

    for row in repo.snapshot().await {
        assert_ne!(row.password_hash, "asdfasdf");
        assert!(!row.password_hash.contains("asdfasdf"));
        assert!(verify_password("asdfasdf", &row.password_hash));
    }
}

#[tokio::test]
async fn rerun_fails_on_duplicate_email_without_new_rows() {
    let repo = InMemoryUsersRepo::new();
    let seed = loader(&repo);
    seed.run(
        &SeedPlan::default_users(),
        ConflictPolicy::Fail,
        &mut Vec::new(),
    )
    .await
    .expect("first run succeeds");

    let mut out = Vec::new();
    let err = seed
        .run(&SeedPlan::default_users(), ConflictPolicy::Fail, &mut out)
        .await
        .expect_err("second run fails");

    match err {
        SeedError::User { email, source } => {
            assert_eq!(email, "seb@test.com");
            assert!(matches!(
                source,
                UserError::Repo(RepoError::Duplicate { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.is_empty());
    assert_eq!(repo.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn failure_midway_keeps_earlier_rows() {
    let repo = InMemoryUsersRepo::new();
    let mut plan = SeedPlan::default_users();
    plan.users[1].attributes.password_confirmation = "different".to_string();

    let mut out = Vec::new();
    let err = loader(&repo)
        .run(&plan, ConflictPolicy::Fail, &mut out)
        .await
        .expect_err("mismatched confirmation aborts");

    assert!(matches!(
        err,
        SeedError::User {
            source: UserError::Validation(_),
            ..
        }
    ));
    assert_eq!(output(out), "admin created!\n");
    let rows = repo.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, UserRole::Admin);
}

/// Holds written bytes until `flush`, like a buffered terminal writer.
#[derive(Default)]
struct FlushOnlyWriter {
    pending: Vec<u8>,
    flushed: Vec<u8>,
}

impl Write for FlushOnlyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushed.append(&mut self.pending);
        Ok(())
    }
}

#[tokio::test]
async fn announcements_are_flushed_when_a_later_entry_fails() {
    let repo = InMemoryUsersRepo::new();
    let mut plan = SeedPlan::default_users();
    plan.users[1].attributes.phone = "555-2224".to_string();

    let mut out = FlushOnlyWriter::default();
    loader(&repo)
        .run(&plan, ConflictPolicy::Fail, &mut out)
        .await
        .expect_err("invalid phone aborts");

    assert!(out.pending.is_empty());
    assert_eq!(output(out.flushed), "admin created!\n");
}

#[tokio::test]
async fn skip_policy_makes_rerun_succeed() {
    let repo = InMemoryUsersRepo::new();
    let seed = loader(&repo);
    seed.run(
        &SeedPlan::default_users(),
        ConflictPolicy::Fail,
        &mut Vec::new(),
    )
    .await
    .expect("first run succeeds");

    let mut out = Vec::new();
    let report = seed
        .run(
            &SeedPlan::default_users(),
            ConflictPolicy::SkipExisting,
            &mut out,
        )
        .await
        .expect("skip run succeeds");

    assert!(report.created.is_empty());
    assert_eq!(report.skipped, vec!["seb@test.com", "user@test.com"]);
    assert!(out.is_empty());
    assert_eq!(repo.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn skip_policy_still_creates_missing_accounts() {
    let repo = InMemoryUsersRepo::new();
    let seed = loader(&repo);

    let mut first_only = SeedPlan::default_users();
    first_only.users.truncate(1);
    seed.run(&first_only, ConflictPolicy::Fail, &mut Vec::new())
        .await
        .expect("admin seeded");

    let mut out = Vec::new();
    let report = seed
        .run(
            &SeedPlan::default_users(),
            ConflictPolicy::SkipExisting,
            &mut out,
        )
        .await
        .expect("skip run succeeds");

    assert_eq!(report.skipped, vec!["seb@test.com"]);
    assert_eq!(report.created.len(), 1);
    assert_eq!(output(out), "user created\n");
}

#[tokio::test]
async fn skip_policy_does_not_hide_validation_errors() {
    let repo = InMemoryUsersRepo::new();
    let mut plan = SeedPlan::default_users();
    plan.users[0].attributes.phone = "415-299".to_string();

    let err = loader(&repo)
        .run(&plan, ConflictPolicy::SkipExisting, &mut Vec::new())
        .await
        .expect_err("invalid phone aborts");

    assert!(matches!(
        err,
        SeedError::User {
            source: UserError::Validation(_),
            ..
        }
    ));
    assert_eq!(repo.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn email_uniqueness_ignores_case() {
    let repo = InMemoryUsersRepo::new();
    let seed = loader(&repo);
    seed.run(
        &SeedPlan::default_users(),
        ConflictPolicy::Fail,
        &mut Vec::new(),
    )
    .await
    .expect("first run succeeds");

    let mut plan = SeedPlan::default_users();
    plan.users.truncate(1);
    plan.users[0].attributes.email = "SEB@test.com".to_string();

    let err = seed
        .run(&plan, ConflictPolicy::Fail, &mut Vec::new())
        .await
        .expect_err("case variant is a duplicate");
    assert!(matches!(err, SeedError::User { .. }));
}

#[tokio::test]
async fn plan_loads_from_toml_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("seeds.toml");
    std::fs::write(
        &path,
        r#"
        [[users]]
        name = "Grace Hopper"
        phone = "5550100"
        email = "grace@example.com"
        password = "cobol-rules"
        password_confirmation = "cobol-rules"
        role = "admin"
        announcement = "grace created"
        "#,
    )
    .expect("write seed file");

    let plan = SeedPlan::load(&path).expect("plan loads");
    let repo = InMemoryUsersRepo::new();
    let mut out = Vec::new();
    loader(&repo)
        .run(&plan, ConflictPolicy::Fail, &mut out)
        .await
        .expect("seed succeeds");

    assert_eq!(output(out), "grace created\n");
    assert_eq!(repo.snapshot().await[0].role, UserRole::Admin);
}

#[test]
fn missing_plan_file_is_reported() {
    let err = SeedPlan::load(std::path::Path::new("/nonexistent/seeds.toml")).unwrap_err();
    assert!(matches!(err, SeedError::Plan(_)));
}
