// system-tests/tests/suites/isolation.rs
// ============================================================================
// Module: Isolation Scenarios
// Description: Session rollback and override revocation across harnesses.
// Purpose: Prove that no test observes another test's writes or wiring.
// Dependencies: remediation-harness, tempfile
// ============================================================================

//! Isolation scenarios run against one shared database file so that
//! leftovers from an earlier harness would be visible to a later one.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::missing_docs_in_private_items,
    reason = "Scenario bodies assert with panics and are named by behavior."
)]

use std::panic::AssertUnwindSafe;

use remediation_core::Role;
use remediation_harness::Harness;
use remediation_harness::HarnessConfig;
use remediation_harness::HarnessError;
use remediation_harness::broker::LOGIN_PATH;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::users;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn shared(temp: &TempDir) -> HarnessConfig {
    HarnessConfig {
        database: Some(temp.path().join("shared.db")),
        run_root: Some(temp.path().join("runs")),
        ..HarnessConfig::default()
    }
}

fn user_count(harness: &Harness) -> Result<usize, HarnessError> {
    let listed: Result<_, StoreError> = harness.require_session()?.read(users::list_users);
    Ok(listed?.len())
}

#[test]
fn writes_do_not_reach_the_next_harness() -> TestResult {
    let temp = TempDir::new()?;
    let first = Harness::in_process(shared(&temp))?;
    for role in Role::ALL {
        first.provision(&first.principal(role)?)?;
    }
    assert_eq!(user_count(&first)?, 3);
    drop(first);

    let second = Harness::in_process(shared(&temp))?;
    assert_eq!(user_count(&second)?, 0);
    Ok(())
}

#[test]
fn panicking_test_leaves_nothing_behind() -> TestResult {
    let temp = TempDir::new()?;
    let config = shared(&temp);
    let unwound = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let harness = Harness::in_process(config.clone()).unwrap_or_else(|err| panic!("{err}"));
        let admin = harness.principal(Role::Admin).unwrap_or_else(|err| panic!("{err}"));
        harness.provision(&admin).unwrap_or_else(|err| panic!("{err}"));
        panic!("assertion failed inside the test body");
    }));
    assert!(unwound.is_err());

    let next = Harness::in_process(config)?;
    assert_eq!(user_count(&next)?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn networked_run_leaves_nothing_in_the_shared_database() -> TestResult {
    let temp = TempDir::new()?;
    let networked = Harness::networked(shared(&temp)).await?;
    let header = networked.login_as(Role::Admin).await?;
    assert!(header.ready().is_some());
    drop(networked);

    let next = Harness::in_process(shared(&temp))?;
    assert_eq!(user_count(&next)?, 0);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn leaked_client_loses_the_session_after_teardown() -> TestResult {
    let temp = TempDir::new()?;
    let harness = Harness::in_process(shared(&temp))?;
    let admin = harness.principal(Role::Admin)?;
    harness.provision(&admin)?;
    let leaked = harness.client().clone();

    let live = leaked.post_json(LOGIN_PATH, &admin.credentials().body(), &[]).await?;
    assert_eq!(live.status, 200);
    assert!(harness.override_active());

    drop(harness);
    let stale = leaked.post_json(LOGIN_PATH, &admin.credentials().body(), &[]).await?;
    assert_eq!(stale.status, 503);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn parallel_harnesses_have_private_state() -> TestResult {
    let tasks: Vec<_> = Role::ALL
        .into_iter()
        .map(|role| {
            tokio::spawn(async move {
                let harness = Harness::in_process(HarnessConfig::default())?;
                harness.provision(&harness.principal(role)?)?;
                user_count(&harness)
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await??, 1);
    }
    Ok(())
}
