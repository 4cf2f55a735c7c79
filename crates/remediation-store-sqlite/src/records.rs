// crates/remediation-store-sqlite/src/records.rs
// ============================================================================
// Module: Domain Record Repository
// Description: Persist alerts, server credentials, and LLM providers.
// Purpose: Store operational records with sealed secrets and strict labels.
// Dependencies: remediation-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Secret-bearing columns accept and return [`SealedSecret`] only, so the
//! repository cannot be handed a plaintext secret by accident. JSON columns
//! are decoded on read and fail closed when malformed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use remediation_core::Alert;
use remediation_core::AlertId;
use remediation_core::AlertSeverity;
use remediation_core::AlertStatus;
use remediation_core::CredentialAuthType;
use remediation_core::LlmProvider;
use remediation_core::LlmProviderId;
use remediation_core::LlmProviderType;
use remediation_core::NewAlert;
use remediation_core::NewLlmProvider;
use remediation_core::NewServerCredential;
use remediation_core::ParseEnumError;
use remediation_core::RemoteProtocol;
use remediation_core::SealedSecret;
use remediation_core::ServerCredential;
use remediation_core::ServerCredentialId;
use remediation_core::ServerOsType;
use remediation_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::StoreError;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Alerts
// ============================================================================

/// Inserts an alert and returns the stored row.
///
/// # Errors
///
/// Returns [`StoreError`] when encoding or the insert fails.
pub fn insert_alert(conn: &Connection, alert: &NewAlert) -> Result<Alert, StoreError> {
    conn.execute(
        "INSERT INTO alerts (fingerprint, alert_name, severity, instance, job, status, \
         labels_json, annotations_json, raw_alert_json, received_at) VALUES (?1, ?2, ?3, ?4, ?5, \
         ?6, ?7, ?8, ?9, ?10)",
        params![
            alert.fingerprint,
            alert.alert_name,
            alert.severity.as_str(),
            alert.instance,
            alert.job,
            alert.status.as_str(),
            encode_json(&alert.labels)?,
            encode_json(&alert.annotations)?,
            encode_json(&alert.raw_alert)?,
            unix_millis()
        ],
    )?;
    let id = AlertId::new(conn.last_insert_rowid());
    get_alert(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("alert {id}")))
}

/// Loads an alert by identifier.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or the row is malformed.
pub fn get_alert(conn: &Connection, id: AlertId) -> Result<Option<Alert>, StoreError> {
    let row = conn
        .query_row(
            "SELECT fingerprint, alert_name, severity, instance, job, status, labels_json, \
             annotations_json, raw_alert_json, received_at FROM alerts WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, i64>(9)?,
                ))
            },
        )
        .optional()?;
    let Some((
        fingerprint,
        alert_name,
        severity,
        instance,
        job,
        status,
        labels,
        annotations,
        raw_alert,
        received_at_ms,
    )) = row
    else {
        return Ok(None);
    };
    Ok(Some(Alert {
        id,
        fingerprint,
        alert_name,
        severity: AlertSeverity::parse(&severity).map_err(invalid_label)?,
        instance,
        job,
        status: AlertStatus::parse(&status).map_err(invalid_label)?,
        labels: decode_json::<BTreeMap<String, String>>(&labels)?,
        annotations: decode_json::<BTreeMap<String, String>>(&annotations)?,
        raw_alert: decode_json(&raw_alert)?,
        received_at_ms,
    }))
}

// ============================================================================
// SECTION: Server Credentials
// ============================================================================

/// Inserts a server credential and returns the stored row.
///
/// # Errors
///
/// Returns [`StoreError::Conflict`] when the name is taken or the owner does
/// not exist.
pub fn insert_server_credential(
    conn: &Connection,
    server: &NewServerCredential,
) -> Result<ServerCredential, StoreError> {
    conn.execute(
        "INSERT INTO server_credentials (name, hostname, port, username, os_type, protocol, \
         auth_type, ssh_key_encrypted, password_encrypted, environment, created_by, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            server.name,
            server.hostname,
            server.port,
            server.username,
            server.os_type.as_str(),
            server.protocol.as_str(),
            server.auth_type.as_str(),
            server.ssh_key_encrypted.as_ref().map(SealedSecret::as_str),
            server.password_encrypted.as_ref().map(SealedSecret::as_str),
            server.environment,
            server.created_by.get(),
            unix_millis()
        ],
    )?;
    let id = ServerCredentialId::new(conn.last_insert_rowid());
    get_server_credential(conn, id)?
        .ok_or_else(|| StoreError::NotFound(format!("server credential {id}")))
}

/// Loads a server credential by identifier.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or the row is malformed.
pub fn get_server_credential(
    conn: &Connection,
    id: ServerCredentialId,
) -> Result<Option<ServerCredential>, StoreError> {
    let row = conn
        .query_row(
            "SELECT name, hostname, port, username, os_type, protocol, auth_type, \
             ssh_key_encrypted, password_encrypted, environment, created_by, created_at FROM \
             server_credentials WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u16>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                    row.get::<_, i64>(10)?,
                    row.get::<_, i64>(11)?,
                ))
            },
        )
        .optional()?;
    let Some((
        name,
        hostname,
        port,
        username,
        os_type,
        protocol,
        auth_type,
        ssh_key,
        password,
        environment,
        created_by,
        created_at_ms,
    )) = row
    else {
        return Ok(None);
    };
    Ok(Some(ServerCredential {
        id,
        name,
        hostname,
        port,
        username,
        os_type: ServerOsType::parse(&os_type).map_err(invalid_label)?,
        protocol: RemoteProtocol::parse(&protocol).map_err(invalid_label)?,
        auth_type: CredentialAuthType::parse(&auth_type).map_err(invalid_label)?,
        ssh_key_encrypted: ssh_key.map(SealedSecret::from_stored),
        password_encrypted: password.map(SealedSecret::from_stored),
        environment,
        created_by: UserId::new(created_by),
        created_at_ms,
    }))
}

// ============================================================================
// SECTION: LLM Providers
// ============================================================================

/// Inserts an LLM provider and returns the stored row.
///
/// # Errors
///
/// Returns [`StoreError::Conflict`] when the name is taken.
pub fn insert_llm_provider(
    conn: &Connection,
    provider: &NewLlmProvider,
) -> Result<LlmProvider, StoreError> {
    conn.execute(
        "INSERT INTO llm_providers (name, provider_type, model_id, api_key_encrypted, \
         is_default, enabled, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            provider.name,
            provider.provider_type.as_str(),
            provider.model_id,
            provider.api_key_encrypted.as_ref().map(SealedSecret::as_str),
            provider.is_default,
            provider.enabled,
            unix_millis()
        ],
    )?;
    let id = LlmProviderId::new(conn.last_insert_rowid());
    get_llm_provider(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("llm provider {id}")))
}

/// Loads an LLM provider by identifier.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or the row is malformed.
pub fn get_llm_provider(
    conn: &Connection,
    id: LlmProviderId,
) -> Result<Option<LlmProvider>, StoreError> {
    let row = conn
        .query_row(
            "SELECT name, provider_type, model_id, api_key_encrypted, is_default, enabled, \
             created_at FROM llm_providers WHERE id = ?1",
            params![id.get()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, bool>(4)?,
                    row.get::<_, bool>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            },
        )
        .optional()?;
    let Some((name, provider_type, model_id, api_key, is_default, enabled, created_at_ms)) = row
    else {
        return Ok(None);
    };
    Ok(Some(LlmProvider {
        id,
        name,
        provider_type: LlmProviderType::parse(&provider_type).map_err(invalid_label)?,
        model_id,
        api_key_encrypted: api_key.map(SealedSecret::from_stored),
        is_default,
        enabled,
        created_at_ms,
    }))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps an unknown persisted label to a store error.
fn invalid_label(err: ParseEnumError) -> StoreError {
    StoreError::Invalid(err.to_string())
}

/// Serializes a JSON column.
fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|err| StoreError::Invalid(err.to_string()))
}

/// Parses a JSON column.
fn decode_json<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, StoreError> {
    serde_json::from_str(text).map_err(|err| StoreError::Invalid(err.to_string()))
}
