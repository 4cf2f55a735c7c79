// crates/remediation-harness/src/builders.rs
// ============================================================================
// Module: Sample Entity Builders
// Description: Representative alert, server credential, and LLM provider rows.
// Purpose: Give tests pre-existing state with valid references and sealed secrets.
// Dependencies: remediation-core, remediation-store-sqlite, serde
// ============================================================================

//! ## Overview
//! Each `sample_*` builder persists one record through the test's session and
//! returns the stored, id-populated row. The `default_*` functions return the
//! unsaved value so a test can adjust a field before inserting. Secrets are
//! sealed before they reach a row; plaintext never hits the database.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use remediation_core::Alert;
use remediation_core::AlertSeverity;
use remediation_core::AlertStatus;
use remediation_core::CredentialAuthType;
use remediation_core::LlmProvider;
use remediation_core::LlmProviderType;
use remediation_core::NewAlert;
use remediation_core::NewLlmProvider;
use remediation_core::NewServerCredential;
use remediation_core::RemoteProtocol;
use remediation_core::SecretSealer;
use remediation_core::ServerCredential;
use remediation_core::ServerOsType;
use remediation_core::User;
use remediation_core::UserId;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::records;
use serde::Serialize;
use serde_json::json;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Plaintext SSH key sealed into the sample server credential.
pub const SAMPLE_SSH_KEY: &str = "test-ssh-key";
/// Plaintext API key sealed into the sample LLM provider.
pub const SAMPLE_API_KEY: &str = "sk-test-key";

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Firing critical memory alert.
#[must_use]
pub fn default_alert() -> NewAlert {
    NewAlert {
        fingerprint: "test-alert-001".to_string(),
        alert_name: "HighMemoryUsage".to_string(),
        severity: AlertSeverity::Critical,
        instance: "prod-server-01".to_string(),
        job: "node-exporter".to_string(),
        status: AlertStatus::Firing,
        labels: string_map(&[
            ("env", "production"),
            ("service", "api"),
            ("alertname", "HighMemoryUsage"),
        ]),
        annotations: string_map(&[
            ("summary", "Memory usage above 90%"),
            ("description", "Server memory usage is critically high"),
        ]),
        raw_alert: json!({}),
    }
}

/// Key-authenticated Linux server owned by `owner`.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] when the key cannot be sealed.
pub fn default_server(
    owner: UserId,
    sealer: &dyn SecretSealer,
) -> Result<NewServerCredential, HarnessError> {
    Ok(NewServerCredential {
        name: "test-server-01".to_string(),
        hostname: "192.168.1.100".to_string(),
        port: 22,
        username: "testuser".to_string(),
        os_type: ServerOsType::Linux,
        protocol: RemoteProtocol::Ssh,
        auth_type: CredentialAuthType::Key,
        ssh_key_encrypted: Some(sealer.seal(SAMPLE_SSH_KEY)?),
        password_encrypted: None,
        environment: "testing".to_string(),
        created_by: owner,
    })
}

/// Enabled default OpenAI provider.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] when the key cannot be sealed.
pub fn default_llm_provider(sealer: &dyn SecretSealer) -> Result<NewLlmProvider, HarnessError> {
    Ok(NewLlmProvider {
        name: "Test OpenAI".to_string(),
        provider_type: LlmProviderType::OpenAi,
        model_id: "gpt-4".to_string(),
        api_key_encrypted: Some(sealer.seal(SAMPLE_API_KEY)?),
        is_default: true,
        enabled: true,
    })
}

/// Collects string pairs into an ordered map.
fn string_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Persists [`default_alert`].
///
/// # Errors
///
/// Returns [`HarnessError::Store`] when the insert fails.
pub fn sample_alert(session: &Session) -> Result<Alert, HarnessError> {
    let alert = default_alert();
    Ok(session.unit_of_work(|conn| records::insert_alert(conn, &alert))?)
}

/// Persists [`default_server`] owned by `owner`.
///
/// # Errors
///
/// Returns [`HarnessError::Store`] when the insert fails, for example when
/// `owner` is not visible to `session`.
pub fn sample_server(
    session: &Session,
    sealer: &dyn SecretSealer,
    owner: &User,
) -> Result<ServerCredential, HarnessError> {
    let server = default_server(owner.id, sealer)?;
    Ok(session.unit_of_work(|conn| records::insert_server_credential(conn, &server))?)
}

/// Persists [`default_llm_provider`].
///
/// # Errors
///
/// Returns [`HarnessError::Store`] when the insert fails.
pub fn sample_llm_provider(
    session: &Session,
    sealer: &dyn SecretSealer,
) -> Result<LlmProvider, HarnessError> {
    let provider = default_llm_provider(sealer)?;
    Ok(session.unit_of_work(|conn| records::insert_llm_provider(conn, &provider))?)
}

// ============================================================================
// SECTION: Collaborator Payloads
// ============================================================================

/// Canned LLM analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockLlmResponse {
    /// Markdown analysis text.
    pub analysis: String,
    /// Ordered remediation steps.
    pub recommendations: Vec<String>,
}

/// Canned remote command result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MockSshOutput {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Process exit status.
    pub exit_code: i32,
}

/// Returns a memory-pressure analysis with three recommendations.
#[must_use]
pub fn mock_llm_response() -> MockLlmResponse {
    MockLlmResponse {
        analysis: "**Root Cause**: High memory usage detected\n\n**Impact**: Service performance degraded"
            .to_string(),
        recommendations: vec![
            "1. Check for memory leaks in application".to_string(),
            "2. Restart the affected service".to_string(),
            "3. Monitor memory usage trends".to_string(),
        ],
    }
}

/// Returns a successful memory report.
#[must_use]
pub fn mock_ssh_output() -> MockSshOutput {
    MockSshOutput {
        stdout: "Memory usage: 92%\nSwap usage: 45%".to_string(),
        stderr: String::new(),
        exit_code: 0,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use remediation_core::AlertSeverity;
    use remediation_core::Role;
    use remediation_core::SecretSealer;
    use remediation_core::UserId;
    use remediation_core::XChaChaSealer;
    use remediation_store_sqlite::StoreError;
    use remediation_store_sqlite::records;

    use super::SAMPLE_API_KEY;
    use super::SAMPLE_SSH_KEY;
    use super::mock_llm_response;
    use super::mock_ssh_output;
    use super::sample_alert;
    use super::sample_llm_provider;
    use super::sample_server;
    use crate::config::HarnessConfig;
    use crate::credentials::PrincipalOverrides;
    use crate::credentials::make_principal;
    use crate::credentials::persist_principal;
    use crate::error::HarnessError;
    use crate::session::InfraGate;
    use crate::session::TestDatabase;

    fn open() -> TestDatabase {
        let gate: &'static InfraGate = Box::leak(Box::new(InfraGate::new()));
        TestDatabase::open_with_gate(&HarnessConfig::default(), gate).unwrap()
    }

    #[test]
    fn alert_defaults_round_trip() {
        let db = open();
        let isolated = db.isolated().unwrap();
        let alert = sample_alert(isolated.session()).unwrap();
        assert!(alert.id.get() > 0);
        assert_eq!(alert.alert_name, "HighMemoryUsage");
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert_eq!(alert.labels["service"], "api");
        let stored: Result<_, StoreError> =
            isolated.session().read(|conn| records::get_alert(conn, alert.id));
        assert_eq!(stored.unwrap(), Some(alert));
    }

    #[test]
    fn server_references_owner_and_seals_key() {
        let db = open();
        let sealer = XChaChaSealer::ephemeral();
        let isolated = db.isolated().unwrap();
        let owner = make_principal(Role::Admin, PrincipalOverrides::default()).unwrap();
        let owner = persist_principal(isolated.session(), &owner).unwrap();
        let server = sample_server(isolated.session(), &sealer, &owner).unwrap();
        assert_eq!(server.created_by, owner.id);
        assert_eq!(server.port, 22);
        let sealed = server.ssh_key_encrypted.as_ref().unwrap();
        assert_ne!(sealed.as_str(), SAMPLE_SSH_KEY);
        assert!(!sealed.as_str().contains(SAMPLE_SSH_KEY));
        assert_eq!(sealer.open(sealed).unwrap(), SAMPLE_SSH_KEY);
    }

    #[test]
    fn server_rejects_unknown_owner() {
        let db = open();
        let sealer = XChaChaSealer::ephemeral();
        let isolated = db.isolated().unwrap();
        let principal = make_principal(Role::User, PrincipalOverrides::default()).unwrap();
        let mut dangling = persist_principal(isolated.session(), &principal).unwrap();
        dangling.id = UserId::new(dangling.id.get() + 1000);
        let result = sample_server(isolated.session(), &sealer, &dangling);
        assert!(matches!(result, Err(HarnessError::Store(StoreError::Conflict(_)))));
    }

    #[test]
    fn provider_seals_api_key() {
        let db = open();
        let sealer = XChaChaSealer::ephemeral();
        let isolated = db.isolated().unwrap();
        let provider = sample_llm_provider(isolated.session(), &sealer).unwrap();
        assert_eq!(provider.name, "Test OpenAI");
        assert!(provider.is_default && provider.enabled);
        let sealed = provider.api_key_encrypted.as_ref().unwrap();
        assert_ne!(sealed.as_str(), SAMPLE_API_KEY);
        assert_eq!(sealer.open(sealed).unwrap(), SAMPLE_API_KEY);
    }

    #[test]
    fn canned_payloads_match_collaborator_shapes() {
        let llm = serde_json::to_value(mock_llm_response()).unwrap();
        assert_eq!(llm["recommendations"].as_array().unwrap().len(), 3);
        let ssh = serde_json::to_value(mock_ssh_output()).unwrap();
        assert_eq!(ssh["exit_code"], 0);
        assert_eq!(ssh["stderr"], "");
    }
}
