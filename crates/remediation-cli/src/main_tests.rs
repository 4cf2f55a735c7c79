// crates/remediation-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Tests
// Description: Unit tests for argument parsing and config validation.
// Purpose: Ensure commands parse as documented and invalid config fails closed.
// Dependencies: remediation-cli main helpers
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions use unwrap and panic for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;

use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigArgs;
use super::ConfigCommand;
use super::build_env_filter;
use super::command_config_validate;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn seed_fixtures_accepts_admin_overrides() {
    let cli = Cli::try_parse_from([
        "remediation-engine",
        "seed-fixtures",
        "--config",
        "engine.toml",
        "--admin-username",
        "ops_admin",
    ])
    .unwrap();
    let Commands::SeedFixtures(command) = cli.command else {
        panic!("expected seed-fixtures");
    };
    assert_eq!(command.config.config.unwrap().to_str(), Some("engine.toml"));
    assert_eq!(command.admin_username.as_deref(), Some("ops_admin"));
    assert!(command.admin_password.is_none());
}

#[test]
fn config_validate_parses_nested_subcommand() {
    let cli = Cli::try_parse_from(["remediation-engine", "config", "validate"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Config {
            command: ConfigCommand::Validate(ConfigArgs {
                config: None,
            })
        }
    ));
    assert!(Cli::try_parse_from(["remediation-engine"]).is_err());
    assert!(Cli::try_parse_from(["remediation-engine", "migrate"]).is_err());
}

#[test]
fn config_validate_reports_invalid_files() {
    let temp = tempfile::TempDir::new().unwrap();
    let good = temp.path().join("good.toml");
    fs::write(&good, "[server]\nbind = \"127.0.0.1:8080\"\n").unwrap();
    let bad = temp.path().join("bad.toml");
    fs::write(&bad, "[server]\nbind = \"localhost\"\n").unwrap();

    let ok = command_config_validate(&ConfigArgs {
        config: Some(good),
    });
    assert!(ok.is_ok());
    let err = command_config_validate(&ConfigArgs {
        config: Some(bad),
    })
    .unwrap_err();
    assert!(err.to_string().contains("config load failed"));
}

#[test]
fn configured_level_builds_a_filter() {
    assert!(build_env_filter("debug").is_ok());
}
