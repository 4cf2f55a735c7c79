// crates/remediation-harness/src/harness.rs
// ============================================================================
// Module: Harness
// Description: One parameterized fixture over both client modes.
// Purpose: Let a test body be written once and run in-process or networked.
// Dependencies: remediation-api, remediation-core, remediation-store-sqlite
// ============================================================================

//! ## Overview
//! [`Harness`] owns everything a single test needs:
//! - in-process: a [`TestDatabase`], an [`IsolatedSession`], and an
//!   [`OverrideGuard`] whose application instance backs the client;
//! - networked: a client bound to the configured base URL, or to a
//!   [`LocalServer`] spawned for the test when no base URL is set.
//!
//! Fields drop in teardown order: the override is revoked first, then the
//! session rolls back, then the database is released.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::slice;
use std::time::Duration;

use remediation_api::AppDependencies;
use remediation_api::TokenService;
use remediation_core::HashCost;
use remediation_core::Role;
use remediation_core::XChaChaSealer;
use remediation_store_sqlite::Session;

use crate::bridge::OverrideGuard;
use crate::bridge::install_override;
use crate::broker::AuthHeader;
use crate::broker::Gate;
use crate::broker::login;
use crate::client::ClientMode;
use crate::client::HarnessClient;
use crate::config::HarnessConfig;
use crate::credentials::Principal;
use crate::credentials::PrincipalOverrides;
use crate::credentials::admin_principal;
use crate::credentials::make_principal;
use crate::error::HarnessError;
use crate::local::LocalServer;
use crate::local::seed_principals;
use crate::local::spawn_local_server;
use crate::reporter::TestReporter;
use crate::session::IsolatedSession;
use crate::session::TestDatabase;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lifetime of tokens issued by the in-process application.
const IN_PROCESS_TOKEN_TTL: Duration = Duration::from_secs(3600);

// ============================================================================
// SECTION: Targets
// ============================================================================

/// Resources held for the active mode.
enum Target {
    /// Application invoked in memory.
    InProcess {
        /// Installed override; dropped first.
        guard: OverrideGuard,
        /// Per-test session; rolled back second.
        session: IsolatedSession,
        /// Engine released last.
        database: TestDatabase,
    },
    /// Real HTTP.
    Networked {
        /// Spawned instance when no base URL is configured.
        local: Option<LocalServer>,
    },
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Per-test fixture in either client mode.
pub struct Harness {
    /// Mode-agnostic client.
    client: HarnessClient,
    /// Configuration the harness was built from.
    config: HarnessConfig,
    /// Sealer for secret-bearing fixtures.
    sealer: XChaChaSealer,
    /// Mode-specific resources.
    target: Target,
}

impl Harness {
    /// Builds a harness in `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the mode's resources cannot be acquired.
    pub async fn new(mode: ClientMode, config: HarnessConfig) -> Result<Self, HarnessError> {
        match mode {
            ClientMode::InProcess => Self::in_process(config),
            ClientMode::Networked => Self::networked(config).await,
        }
    }

    /// Builds an in-process harness over a fresh isolated session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InfrastructureUnavailable`] when the test
    /// database or session cannot be acquired.
    pub fn in_process(config: HarnessConfig) -> Result<Self, HarnessError> {
        let database = TestDatabase::open(&config)?;
        let session = database.isolated()?;
        let tokens = TokenService::new(IN_PROCESS_TOKEN_TTL, HashCost::Fast)
            .map_err(|err| HarnessError::Config(err.to_string()))?;
        let base = AppDependencies::new(database.database(), tokens);
        let guard = install_override(&base, session.session());
        let client = HarnessClient::in_process(guard.router());
        Ok(Self {
            client,
            config,
            sealer: XChaChaSealer::ephemeral(),
            target: Target::InProcess {
                guard,
                session,
                database,
            },
        })
    }

    /// Builds a networked harness against the configured base URL, or
    /// against a freshly spawned local instance when none is configured.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError`] when the client or local instance cannot be
    /// built.
    pub async fn networked(config: HarnessConfig) -> Result<Self, HarnessError> {
        let (base_url, local) = match &config.base_url {
            Some(url) => (url.clone(), None),
            None => {
                let local = spawn_local_server(&config).await?;
                (local.base_url().clone(), Some(local))
            }
        };
        tracing::debug!(%base_url, spawned = local.is_some(), "networked harness");
        let client = HarnessClient::networked(base_url, config.timeout)?;
        Ok(Self {
            client,
            config,
            sealer: XChaChaSealer::ephemeral(),
            target: Target::Networked {
                local,
            },
        })
    }

    /// Returns the client.
    #[must_use]
    pub const fn client(&self) -> &HarnessClient {
        &self.client
    }

    /// Returns the delivery mode.
    #[must_use]
    pub fn mode(&self) -> ClientMode {
        self.client.mode()
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Returns the fixture sealer.
    #[must_use]
    pub const fn sealer(&self) -> &XChaChaSealer {
        &self.sealer
    }

    /// Returns the isolated session in in-process mode.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        match &self.target {
            Target::InProcess {
                session, ..
            } => Some(session.session()),
            Target::Networked {
                ..
            } => None,
        }
    }

    /// Returns the isolated session, failing outside in-process mode.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] in networked mode.
    pub fn require_session(&self) -> Result<&Session, HarnessError> {
        self.session().ok_or_else(|| {
            HarnessError::Config("fixture persistence requires in-process mode".to_string())
        })
    }

    /// Returns true while the dependency override is installed.
    #[must_use]
    pub fn override_active(&self) -> bool {
        match &self.target {
            Target::InProcess {
                guard, ..
            } => guard.is_active(),
            Target::Networked {
                ..
            } => false,
        }
    }

    /// Returns the test database in in-process mode.
    #[must_use]
    pub const fn database(&self) -> Option<&TestDatabase> {
        match &self.target {
            Target::InProcess {
                database, ..
            } => Some(database),
            Target::Networked {
                local,
            } => match local {
                Some(local) => local.database(),
                None => None,
            },
        }
    }

    /// Returns the principal the harness uses for `role`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when the password cannot be hashed.
    pub fn principal(&self, role: Role) -> Result<Principal, HarnessError> {
        match role {
            Role::Admin => admin_principal(&self.config),
            Role::Engineer | Role::User => make_principal(role, PrincipalOverrides::default()),
        }
    }

    /// Makes `principal` available to the target.
    ///
    /// In-process the principal is inserted unless present. Networked
    /// targets are seeded out of band, so this is a no-op there.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Store`] when the insert fails.
    pub fn provision(&self, principal: &Principal) -> Result<(), HarnessError> {
        if let Some(session) = self.session() {
            seed_principals(session, slice::from_ref(principal))?;
        }
        Ok(())
    }

    /// Logs in as `principal` through the active client.
    ///
    /// # Errors
    ///
    /// See [`login`].
    pub async fn login(&self, principal: &Principal) -> Result<Gate<AuthHeader>, HarnessError> {
        login(&self.client, &principal.credentials()).await
    }

    /// Provisions the principal for `role` and logs in as it.
    ///
    /// # Errors
    ///
    /// See [`Harness::provision`] and [`login`].
    pub async fn login_as(&self, role: Role) -> Result<Gate<AuthHeader>, HarnessError> {
        let principal = self.principal(role)?;
        self.provision(&principal)?;
        self.login(&principal).await
    }

    /// Creates a reporter rooted at the configured run root.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the artifact directory cannot be created.
    pub fn reporter(&self, test_name: &str) -> io::Result<TestReporter> {
        TestReporter::new(&self.config, &format!("{}_{test_name}", mode_slug(self.mode())))
    }
}

/// Directory-safe mode label.
const fn mode_slug(mode: ClientMode) -> &'static str {
    match mode {
        ClientMode::InProcess => "in_process",
        ClientMode::Networked => "networked",
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

    use remediation_core::Role;
    use remediation_store_sqlite::StoreError;
    use remediation_store_sqlite::users;

    use super::Harness;
    use crate::client::ClientMode;
    use crate::config::HarnessConfig;

    #[tokio::test]
    async fn in_process_login_as_provisions_and_authenticates() {
        let harness = Harness::in_process(HarnessConfig::default()).unwrap();
        assert_eq!(harness.mode(), ClientMode::InProcess);
        assert!(harness.override_active());
        let header = harness.login_as(Role::Engineer).await.unwrap().ready().unwrap();
        let response = harness.client().get("/api/auth/me", &[header.pair()]).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body["username"], "test_engineer");
    }

    #[tokio::test]
    async fn provisioning_twice_keeps_one_row() {
        let harness = Harness::in_process(HarnessConfig::default()).unwrap();
        let admin = harness.principal(Role::Admin).unwrap();
        harness.provision(&admin).unwrap();
        harness.provision(&admin).unwrap();
        let all: Result<_, StoreError> = harness.session().unwrap().read(users::list_users);
        assert_eq!(all.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn networked_without_base_url_spawns_local_target() {
        let harness = Harness::networked(HarnessConfig::default()).await.unwrap();
        assert_eq!(harness.mode(), ClientMode::Networked);
        assert!(harness.session().is_none());
        assert!(harness.require_session().is_err());
        let header = harness.login_as(Role::User).await.unwrap().ready().unwrap();
        let response = harness.client().get("/api/users", &[header.pair()]).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body.as_array().unwrap().len(), 3);
    }
}
