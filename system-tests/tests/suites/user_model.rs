// system-tests/tests/suites/user_model.rs
// ============================================================================
// Module: User Model Scenarios
// Description: Unit-level user persistence and credential checks.
// Purpose: Cover model behavior that needs direct fixture access.
// Dependencies: remediation-harness, remediation-store-sqlite
// ============================================================================

//! User model scenarios. These run in-process only: they read and write rows
//! through the isolated session rather than the public API.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::missing_docs_in_private_items,
    reason = "Scenario bodies assert with panics and are named by behavior."
)]

use remediation_core::Role;
use remediation_harness::Harness;
use remediation_harness::HarnessConfig;
use remediation_harness::HarnessError;
use remediation_harness::PrincipalOverrides;
use remediation_harness::TEST_PASSWORD;
use remediation_harness::broker::LOGIN_PATH;
use remediation_harness::make_principal;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::users;

type TestResult = Result<(), HarnessError>;

fn harness() -> Result<Harness, HarnessError> {
    Harness::in_process(HarnessConfig::load()?)
}

#[test]
fn principal_hash_verifies_only_the_fixed_password() -> TestResult {
    let principal = make_principal(Role::User, PrincipalOverrides::default())?;
    assert!(principal.verifies(TEST_PASSWORD));
    assert!(!principal.verifies("wrongpassword"));
    assert!(!principal.verifies(""));
    assert_ne!(principal.password_hash.as_str(), TEST_PASSWORD);
    Ok(())
}

#[test]
fn role_defaults_follow_naming_scheme() -> TestResult {
    for role in Role::ALL {
        let principal = make_principal(role, PrincipalOverrides::default())?;
        assert_eq!(principal.username, format!("test_{role}"));
        assert_eq!(principal.email, format!("{role}@test.com"));
        assert_eq!(principal.full_name.as_deref(), Some(format!("Test {}", role.title()).as_str()));
        assert!(principal.is_active);
    }
    Ok(())
}

#[test]
fn created_user_is_found_by_username() -> TestResult {
    let harness = harness()?;
    let session = harness.require_session()?;
    let admin = harness.principal(Role::Admin)?;
    harness.provision(&admin)?;
    let found: Result<_, StoreError> =
        session.read(|conn| users::find_user_by_username(conn, &admin.username));
    let Some(user) = found? else {
        panic!("provisioned admin must be visible to the session");
    };
    assert!(user.id.get() > 0);
    assert_eq!(user.role, Role::Admin);
    assert_eq!(user.email, "admin@test.com");
    assert!(user.is_active);
    assert!(admin.verifies(TEST_PASSWORD));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn deactivated_user_cannot_log_in() -> TestResult {
    let harness = harness()?;
    let session = harness.require_session()?;
    let user = make_principal(Role::User, PrincipalOverrides::default())?;
    harness.provision(&user)?;

    let before = harness.client().post_json(LOGIN_PATH, &user.credentials().body(), &[]).await?;
    assert_eq!(before.status, 200);

    let stored: Result<_, StoreError> =
        session.read(|conn| users::find_user_by_username(conn, &user.username));
    let Some(stored) = stored? else {
        panic!("provisioned user must be visible to the session");
    };
    let deactivated: Result<(), StoreError> =
        session.unit_of_work(|conn| users::set_user_active(conn, stored.id, false));
    deactivated?;

    let refreshed: Result<_, StoreError> =
        session.read(|conn| users::find_user_by_username(conn, &user.username));
    assert!(refreshed?.is_some_and(|row| !row.is_active));

    let after = harness.client().post_json(LOGIN_PATH, &user.credentials().body(), &[]).await?;
    assert_eq!(after.status, 401);
    assert!(after.body.get("access_token").is_none());
    Ok(())
}

#[test]
fn duplicate_username_is_a_store_conflict() -> TestResult {
    let harness = harness()?;
    let admin = harness.principal(Role::Admin)?;
    harness.provision(&admin)?;
    let duplicate = make_principal(
        Role::User,
        PrincipalOverrides::default().username(admin.username.clone()).email("other@test.com"),
    )?;
    let result = remediation_harness::credentials::persist_principal(
        harness.require_session()?,
        &duplicate,
    );
    assert!(matches!(result, Err(HarnessError::Store(StoreError::Conflict(_)))));
    Ok(())
}
