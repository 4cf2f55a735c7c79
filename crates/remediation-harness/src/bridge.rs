// crates/remediation-harness/src/bridge.rs
// ============================================================================
// Module: Dependency Override Bridge
// Description: Application instances wired to an isolated session.
// Purpose: Redirect persistence for one test without any global registry.
// Dependencies: remediation-api, remediation-store-sqlite, axum
// ============================================================================

//! ## Overview
//! The application takes its persistence dependency as an
//! `Arc<dyn SessionSource>`. [`install_override`] builds a fresh router whose
//! source is a [`RevocableSource`] over the test's session. Dropping the
//! returned [`OverrideGuard`], or calling [`OverrideGuard::remove`], revokes
//! the source: any router clone that outlives the test answers 503 instead of
//! reaching the session. The base dependencies are never modified.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use axum::Router;
use remediation_api::AppDependencies;
use remediation_api::build_router;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::SessionSource;
use remediation_store_sqlite::StoreError;

// ============================================================================
// SECTION: Revocable Source
// ============================================================================

/// Session source that stops serving once revoked.
pub struct RevocableSource {
    /// Session handed to the application.
    session: Session,
    /// Set when the override is removed.
    revoked: AtomicBool,
}

impl RevocableSource {
    /// Wraps `session`.
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self {
            session,
            revoked: AtomicBool::new(false),
        }
    }

    /// Stops serving the session.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Returns true once revoked.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl SessionSource for RevocableSource {
    fn session(&self) -> Result<Session, StoreError> {
        if self.is_revoked() {
            return Err(StoreError::Unavailable("dependency override removed".to_string()));
        }
        self.session.session()
    }
}

// ============================================================================
// SECTION: Override Guard
// ============================================================================

/// Installed override; revokes on removal or drop.
pub struct OverrideGuard {
    /// Source wired into the application instance.
    source: Arc<RevocableSource>,
    /// Application instance bound to the source.
    router: Router,
}

impl OverrideGuard {
    /// Returns a handle to the overridden application.
    #[must_use]
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Returns true while the override is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.source.is_revoked()
    }

    /// Removes the override.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        self.source.revoke();
        tracing::debug!("dependency override removed");
    }
}

/// Builds an application instance whose persistence is `session`.
#[must_use]
pub fn install_override(base: &AppDependencies, session: &Session) -> OverrideGuard {
    let source = Arc::new(RevocableSource::new(session.clone()));
    let sessions: Arc<dyn SessionSource> = Arc::clone(&source) as Arc<dyn SessionSource>;
    let router = build_router(base.with_sessions(sessions));
    tracing::debug!("dependency override installed");
    OverrideGuard {
        source,
        router,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
