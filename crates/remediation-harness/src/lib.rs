// crates/remediation-harness/src/lib.rs
// ============================================================================
// Module: Remediation Test Harness
// Description: Dual-mode fixtures for remediation engine tests.
// Purpose: Run one test body in-process or against a live deployment.
// Dependencies: remediation-api, remediation-store-sqlite, reqwest, tokio
// ============================================================================

//! ## Overview
//! The harness materializes principals with known credentials, gives each
//! test an isolated, always-rolled-back session, wires that session into a
//! private application instance, and exposes one client interface over an
//! in-process or networked transport. Logins go through the token broker,
//! which fails in-process and skips networked when a principal is unusable.
//! Sample builders persist alerts, server credentials, and LLM providers
//! with sealed secrets.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bridge;
pub mod broker;
pub mod builders;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod harness;
pub mod local;
pub mod reporter;
pub mod session;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bridge::OverrideGuard;
pub use bridge::RevocableSource;
pub use bridge::install_override;
pub use broker::AuthHeader;
pub use broker::Gate;
pub use broker::LoginCredentials;
pub use broker::login;
pub use client::ApiRequest;
pub use client::ApiResponse;
pub use client::ApiTransport;
pub use client::ClientMode;
pub use client::HarnessClient;
pub use client::InProcessTransport;
pub use client::NetworkedTransport;
pub use config::HarnessConfig;
pub use credentials::ADMIN_USERNAME;
pub use credentials::Principal;
pub use credentials::PrincipalOverrides;
pub use credentials::TEST_PASSWORD;
pub use credentials::make_principal;
pub use error::HarnessError;
pub use harness::Harness;
pub use local::LocalServer;
pub use local::fixture_principals;
pub use local::seed_principals;
pub use local::spawn_local_server;
pub use reporter::TestReporter;
pub use reporter::TestStatus;
pub use session::InfraGate;
pub use session::IsolatedSession;
pub use session::TestDatabase;
