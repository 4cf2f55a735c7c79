// system-tests/tests/suites/builders.rs
// ============================================================================
// Module: Sample Builder Scenarios
// Description: Pre-existing domain state created through the harness.
// Purpose: Verify sample records persist with valid references and sealed secrets.
// Dependencies: remediation-harness, remediation-store-sqlite
// ============================================================================

//! Sample builder scenarios. Records are persisted through the isolated
//! session, so they are visible to the application for the duration of the
//! test and gone afterward.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::missing_docs_in_private_items,
    reason = "Scenario bodies assert with panics and are named by behavior."
)]

use remediation_core::AlertStatus;
use remediation_core::CredentialAuthType;
use remediation_core::Role;
use remediation_core::SecretSealer;
use remediation_harness::Harness;
use remediation_harness::HarnessConfig;
use remediation_harness::builders::SAMPLE_API_KEY;
use remediation_harness::builders::SAMPLE_SSH_KEY;
use remediation_harness::builders::mock_llm_response;
use remediation_harness::builders::mock_ssh_output;
use remediation_harness::builders::sample_alert;
use remediation_harness::builders::sample_llm_provider;
use remediation_harness::builders::sample_server;
use remediation_harness::credentials::persist_principal;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::records;
use remediation_store_sqlite::users;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn full_fixture_set_is_consistent() -> TestResult {
    let harness = Harness::in_process(HarnessConfig::load()?)?;
    let session = harness.require_session()?;
    let owner = persist_principal(session, &harness.principal(Role::Admin)?)?;

    let alert = sample_alert(session)?;
    let server = sample_server(session, harness.sealer(), &owner)?;
    let provider = sample_llm_provider(session, harness.sealer())?;

    assert_eq!(alert.status, AlertStatus::Firing);
    assert_eq!(alert.annotations["summary"], "Memory usage above 90%");

    let stored_owner: Result<_, StoreError> =
        session.read(|conn| users::get_user(conn, server.created_by));
    assert_eq!(stored_owner?.map(|user| user.username), Some(owner.username.clone()));
    assert_eq!(server.auth_type, CredentialAuthType::Key);
    assert!(server.password_encrypted.is_none());

    let Some(ssh_key) = server.ssh_key_encrypted.as_ref() else {
        panic!("key-authenticated server must carry a sealed key");
    };
    assert_ne!(ssh_key.as_str(), SAMPLE_SSH_KEY);
    assert_eq!(harness.sealer().open(ssh_key)?, SAMPLE_SSH_KEY);

    let Some(api_key) = provider.api_key_encrypted.as_ref() else {
        panic!("sample provider must carry a sealed key");
    };
    assert_ne!(api_key.as_str(), SAMPLE_API_KEY);
    assert_eq!(harness.sealer().open(api_key)?, SAMPLE_API_KEY);

    let reread: Result<_, StoreError> =
        session.read(|conn| records::get_llm_provider(conn, provider.id));
    assert_eq!(reread?, Some(provider));
    Ok(())
}

#[test]
fn sample_records_are_discarded_with_the_session() -> TestResult {
    let temp = TempDir::new()?;
    let config = HarnessConfig {
        database: Some(temp.path().join("shared.db")),
        ..HarnessConfig::default()
    };
    let alert_id = {
        let harness = Harness::in_process(config.clone())?;
        let session = harness.require_session()?;
        let owner = persist_principal(session, &harness.principal(Role::Admin)?)?;
        sample_server(session, harness.sealer(), &owner)?;
        sample_alert(session)?.id
    };

    let harness = Harness::in_process(config)?;
    let session = harness.require_session()?;
    let alert: Result<_, StoreError> = session.read(|conn| records::get_alert(conn, alert_id));
    assert!(alert?.is_none());
    let owner = persist_principal(session, &harness.principal(Role::Admin)?)?;
    let server = sample_server(session, harness.sealer(), &owner)?;
    assert_eq!(server.name, "test-server-01");
    Ok(())
}

#[test]
fn collaborator_payloads_are_canned() {
    let analysis = mock_llm_response();
    assert!(analysis.analysis.starts_with("**Root Cause**"));
    assert_eq!(analysis.recommendations.len(), 3);
    assert_eq!(analysis.recommendations[1], "2. Restart the affected service");

    let ssh = mock_ssh_output();
    assert_eq!(ssh.exit_code, 0);
    assert!(ssh.stderr.is_empty());
    assert_eq!(ssh.stdout.lines().next(), Some("Memory usage: 92%"));
}
