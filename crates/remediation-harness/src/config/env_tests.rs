// crates/remediation-harness/src/config/env_tests.rs
// ============================================================================
// Module: Harness Env Unit Tests
// Description: Unit coverage for strict harness environment parsing.
// Purpose: Ensure configuration parsing fails closed on invalid inputs.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Lookups are served from a map, so these tests never touch process state.

#![allow(
    clippy::panic,
    clippy::use_debug,
    clippy::expect_used,
    clippy::unwrap_used,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use super::HarnessConfig;
use super::HarnessEnv;
use super::MIN_REQUEST_TIMEOUT;
use crate::error::HarnessError;

fn load(pairs: &[(HarnessEnv, &str)]) -> Result<HarnessConfig, HarnessError> {
    let vars: HashMap<&'static str, OsString> =
        pairs.iter().map(|(key, value)| (key.as_str(), OsString::from(*value))).collect();
    HarnessConfig::from_lookup(|name| vars.get(name).cloned())
}

fn assert_config_error(result: Result<HarnessConfig, HarnessError>, needle: &str) {
    match result {
        Err(HarnessError::Config(message)) => {
            assert!(message.contains(needle), "{message} does not mention {needle}");
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn empty_environment_yields_defaults() {
    let config = load(&[]).unwrap();
    assert_eq!(config, HarnessConfig::default());
    assert_eq!(config.admin_username, "test_admin");
    assert_eq!(config.admin_password, "TestPassw0rd!");
    assert!(config.base_url.is_none(), "unset base url selects a spawned local target");
}

#[test]
fn database_url_accepts_sqlite_scheme_and_bare_paths() {
    let config = load(&[(HarnessEnv::DatabaseUrl, "sqlite:///tmp/remediation/test.db")]).unwrap();
    assert_eq!(config.database, Some(PathBuf::from("/tmp/remediation/test.db")));
    let config = load(&[(HarnessEnv::DatabaseUrl, "target/test.db")]).unwrap();
    assert_eq!(config.database, Some(PathBuf::from("target/test.db")));
}

#[test]
fn database_url_rejects_foreign_schemes_and_memory() {
    assert_config_error(
        load(&[(HarnessEnv::DatabaseUrl, "postgresql://user:pw@localhost:5433/db")]),
        "postgresql",
    );
    assert_config_error(load(&[(HarnessEnv::DatabaseUrl, "sqlite://:memory:")]), "database file");
}

#[test]
fn base_url_requires_http() {
    let config = load(&[(HarnessEnv::BaseUrl, "https://staging.example.test")]).unwrap();
    assert_eq!(config.base_url.unwrap().host_str(), Some("staging.example.test"));
    assert_config_error(load(&[(HarnessEnv::BaseUrl, "ftp://example.test")]), "http or https");
    assert_config_error(load(&[(HarnessEnv::BaseUrl, "not a url")]), "valid url");
}

#[test]
fn timeout_never_drops_below_minimum() {
    let config = load(&[(HarnessEnv::TimeoutSeconds, "5")]).unwrap();
    assert_eq!(config.timeout, MIN_REQUEST_TIMEOUT);
    let config = load(&[(HarnessEnv::TimeoutSeconds, "90")]).unwrap();
    assert_eq!(config.timeout, Duration::from_secs(90));
}

#[test]
fn timeout_rejects_zero_and_garbage() {
    assert_config_error(load(&[(HarnessEnv::TimeoutSeconds, "0")]), "greater than zero");
    assert_config_error(load(&[(HarnessEnv::TimeoutSeconds, "soon")]), "positive integer");
}

#[test]
fn empty_values_fail_closed() {
    for key in HarnessEnv::ALL {
        assert_config_error(load(&[(key, "   ")]), key.as_str());
    }
}

#[test]
fn admin_overrides_apply() {
    let config = load(&[
        (HarnessEnv::AdminUsername, "ops_admin"),
        (HarnessEnv::AdminPassword, "s3cret!"),
        (HarnessEnv::RunRoot, "target/harness"),
    ])
    .unwrap();
    assert_eq!(config.admin_username, "ops_admin");
    assert_eq!(config.admin_password, "s3cret!");
    assert_eq!(config.run_root, Some(PathBuf::from("target/harness")));
}

#[cfg(unix)]
#[test]
fn invalid_utf8_fails_closed() {
    use std::os::unix::ffi::OsStringExt;

    let raw = OsString::from_vec(vec![0x66, 0xff, 0x6f]);
    let result = HarnessConfig::from_lookup(|name| {
        (name == HarnessEnv::RunRoot.as_str()).then(|| raw.clone())
    });
    assert_config_error(result, "UTF-8");
}
