// crates/remediation-harness/src/local.rs
// ============================================================================
// Module: Local Target
// Description: Seeded, loopback-bound instance for networked runs.
// Purpose: Exercise the networked client without an external deployment.
// Dependencies: remediation-api, tokio, url
// ============================================================================

//! ## Overview
//! Networked tests normally target a deployment whose principals were seeded
//! out of band with [`seed_principals`]. When no base URL is configured the
//! harness instead spawns a [`LocalServer`]: a private database seeded with
//! the fixture principals, served on an ephemeral loopback port and shut
//! down when the handle is dropped.
//!
//! The local target never opens the configured test database. Its seeding
//! and login tokens are committed, and they must not outlive the test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

use remediation_api::ApiServer;
use remediation_api::ApiServerError;
use remediation_api::AppDependencies;
use remediation_api::TokenService;
use remediation_core::HashCost;
use remediation_core::Role;
use remediation_core::User;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::SessionSource;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::users;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

use crate::client::HarnessClient;
use crate::config::HarnessConfig;
use crate::credentials::Principal;
use crate::credentials::PrincipalOverrides;
use crate::credentials::admin_principal;
use crate::credentials::make_principal;
use crate::credentials::persist_principal;
use crate::error::HarnessError;
use crate::session::TestDatabase;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lifetime of tokens issued by a local server.
const LOCAL_TOKEN_TTL: Duration = Duration::from_secs(3600);
/// How long to wait for a spawned server to answer its health probe.
const READINESS_TIMEOUT: Duration = Duration::from_secs(10);
/// Delay between readiness attempts.
const READINESS_POLL: Duration = Duration::from_millis(50);

// ============================================================================
// SECTION: Seeding
// ============================================================================

/// Returns the admin, engineer, and user principals networked tests expect.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] when a password cannot be hashed.
pub fn fixture_principals(config: &HarnessConfig) -> Result<Vec<Principal>, HarnessError> {
    Ok(vec![
        admin_principal(config)?,
        make_principal(Role::Engineer, PrincipalOverrides::default())?,
        make_principal(Role::User, PrincipalOverrides::default())?,
    ])
}

/// Inserts each principal whose username is not already present.
///
/// Existing users are returned unchanged, so reseeding a deployment never
/// resets a password or reactivates an account.
///
/// # Errors
///
/// Returns [`HarnessError::Store`] when a lookup or insert fails.
pub fn seed_principals(
    session: &Session,
    principals: &[Principal],
) -> Result<Vec<User>, HarnessError> {
    let mut seeded = Vec::with_capacity(principals.len());
    for principal in principals {
        let existing: Result<_, StoreError> =
            session.read(|conn| users::find_user_by_username(conn, &principal.username));
        let user = match existing? {
            Some(user) => user,
            None => {
                let user = persist_principal(session, principal)?;
                tracing::info!(username = %user.username, role = %user.role, "principal seeded");
                user
            }
        };
        seeded.push(user);
    }
    Ok(seeded)
}

// ============================================================================
// SECTION: Local Server
// ============================================================================

/// Handle to a spawned local instance.
///
/// [`LocalServer::shutdown`] is the clean path. Dropping the handle signals
/// shutdown and releases the database once the serving task has stopped.
pub struct LocalServer {
    /// Base URL of the instance.
    base_url: Url,
    /// Graceful shutdown trigger.
    shutdown: Option<oneshot::Sender<()>>,
    /// Serving task.
    join: Option<JoinHandle<Result<(), ApiServerError>>>,
    /// Backing database; released after the serving task finishes.
    database: Option<TestDatabase>,
}

impl LocalServer {
    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns the backing database.
    #[must_use]
    pub const fn database(&self) -> Option<&TestDatabase> {
        self.database.as_ref()
    }

    /// Stops the server and waits for the serving task to finish.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when serving ended with an error.
    pub async fn shutdown(mut self) -> Result<(), HarnessError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        match join.await {
            Ok(result) => result.map_err(|err| HarnessError::Transport(err.to_string())),
            Err(err) => Err(HarnessError::Transport(format!("server task: {err}"))),
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let (Some(join), Some(database)) = (self.join.take(), self.database.take()) else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    let _ = join.await;
                    drop(database);
                });
            }
            Err(_) => {
                join.abort();
                drop(database);
            }
        }
    }
}

/// Spawns a seeded instance on an ephemeral loopback port and waits until it
/// answers `/health`.
///
/// # Errors
///
/// Returns [`HarnessError::InfrastructureUnavailable`] when the database,
/// listener, or readiness probe fails.
pub async fn spawn_local_server(config: &HarnessConfig) -> Result<LocalServer, HarnessError> {
    let private = HarnessConfig {
        database: None,
        ..config.clone()
    };
    let database = TestDatabase::open(&private)?;
    let primary = database.database().session()?;
    seed_principals(&primary, &fixture_principals(config)?)?;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|err| HarnessError::InfrastructureUnavailable(format!("loopback bind: {err}")))?;
    let addr = listener
        .local_addr()
        .map_err(|err| HarnessError::InfrastructureUnavailable(format!("listener address: {err}")))?;
    let base_url = Url::parse(&format!("http://{addr}"))
        .map_err(|err| HarnessError::Config(format!("local base url: {err}")))?;

    let tokens = TokenService::new(LOCAL_TOKEN_TTL, HashCost::Fast)
        .map_err(|err| HarnessError::Config(err.to_string()))?;
    let deps = AppDependencies::new(database.database(), tokens);
    let server = ApiServer::from_dependencies(addr, deps);
    let (shutdown, signal) = oneshot::channel::<()>();
    let join = tokio::spawn(server.serve_with_shutdown(listener, async move {
        let _ = signal.await;
    }));

    let handle = LocalServer {
        base_url,
        shutdown: Some(shutdown),
        join: Some(join),
        database: Some(database),
    };
    wait_for_ready(&handle.base_url, config.timeout).await?;
    tracing::debug!(base_url = %handle.base_url, "local target ready");
    Ok(handle)
}

/// Polls `/health` until it answers 200 or [`READINESS_TIMEOUT`] expires.
async fn wait_for_ready(base_url: &Url, timeout: Duration) -> Result<(), HarnessError> {
    let client = HarnessClient::networked(base_url.clone(), timeout)?;
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts = attempts.saturating_add(1);
        let outcome = client.get("/health", &[]).await;
        match outcome {
            Ok(response) if response.status == 200 => return Ok(()),
            Ok(response) if start.elapsed() > READINESS_TIMEOUT => {
                return Err(HarnessError::InfrastructureUnavailable(format!(
                    "local target not ready after {attempts} attempts: status {}",
                    response.status
                )));
            }
            Err(err) if start.elapsed() > READINESS_TIMEOUT => {
                return Err(HarnessError::InfrastructureUnavailable(format!(
                    "local target not ready after {attempts} attempts: {err}"
                )));
            }
            _ => tokio::time::sleep(READINESS_POLL).await,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
