// crates/remediation-api/src/server.rs
// ============================================================================
// Module: API Server
// Description: HTTP router, request handlers, and the server runner.
// Purpose: Expose login, user listing, and health over HTTP.
// Dependencies: axum, tokio, remediation-store-sqlite, tracing
// ============================================================================

//! ## Overview
//! [`build_router`] turns an [`AppDependencies`] value into an axum router.
//! The persistence dependency is an explicit `Arc<dyn SessionSource>`, so the
//! same router serves production traffic against the shared database session
//! and in-process tests against an isolated one. Storage work runs on the
//! blocking pool. Error bodies are always `{"detail": "<message>"}`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::DefaultBodyLimit;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use remediation_config::RemediationConfig;
use remediation_core::HashCost;
use remediation_core::User;
use remediation_core::UserSummary;
use remediation_store_sqlite::Database;
use remediation_store_sqlite::SessionSource;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::users;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::audit::AuditSink;
use crate::audit::AuthAction;
use crate::audit::AuthAuditEvent;
use crate::audit::FileAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::auth::AuthError;
use crate::auth::TokenService;
use crate::auth::fingerprint;
use crate::auth::parse_bearer_token;
use crate::auth::token_digest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default request body limit when none is configured.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Service name reported by the health endpoint.
const SERVICE_NAME: &str = "remediation-engine";

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// Everything the request pipeline needs, passed in explicitly.
#[derive(Clone)]
pub struct AppDependencies {
    /// Persistence dependency.
    pub sessions: Arc<dyn SessionSource>,
    /// Login and token lifecycle.
    pub tokens: TokenService,
    /// Authentication audit sink.
    pub audit: Arc<dyn AuditSink>,
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl AppDependencies {
    /// Builds dependencies with a no-op audit sink and the default body limit.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionSource>, tokens: TokenService) -> Self {
        Self {
            sessions,
            tokens,
            audit: Arc::new(NoopAuditSink),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the request body limit.
    #[must_use]
    pub const fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Returns a copy whose persistence dependency is `sessions`.
    #[must_use]
    pub fn with_sessions(&self, sessions: Arc<dyn SessionSource>) -> Self {
        Self {
            sessions,
            ..self.clone()
        }
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Builds the application router.
pub fn build_router(deps: AppDependencies) -> Router {
    let max_body_bytes = deps.max_body_bytes;
    Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/api/auth/login", post(handle_login))
        .route("/api/auth/me", get(handle_me))
        .route("/api/users", get(handle_list_users))
        .fallback(handle_not_found)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(Arc::new(deps))
}

/// Login request body.
#[derive(Debug, Deserialize)]
struct LoginRequest {
    /// Login name.
    username: String,
    /// Plaintext password.
    password: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
struct TokenResponse {
    /// Opaque bearer token.
    access_token: String,
    /// Always `bearer`.
    token_type: &'static str,
}

/// Answers the bare root; the engine serves no index page.
async fn handle_root() -> Response {
    ApiError::NotFound.into_response()
}

/// Answers unknown routes.
async fn handle_not_found() -> Response {
    ApiError::NotFound.into_response()
}

/// Reports liveness.
async fn handle_health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Verifies a password and issues a bearer token.
async fn handle_login(
    State(state): State<Arc<AppDependencies>>,
    body: Bytes,
) -> Result<Json<TokenResponse>, ApiError> {
    let request: LoginRequest =
        serde_json::from_slice(&body).map_err(|err| ApiError::Validation(err.to_string()))?;
    let username = request.username.clone();
    let outcome = run_blocking(Arc::clone(&state), move |deps| -> Result<_, AuthError> {
        let session = deps.sessions.session()?;
        session.unit_of_work(|conn| {
            let user = deps.tokens.authenticate(conn, &request.username, &request.password)?;
            deps.tokens.issue(conn, &user)
        })
    })
    .await?;
    match outcome {
        Ok(token) => {
            state.audit.record(&AuthAuditEvent::allowed(
                AuthAction::Login,
                &username,
                Some(token.fingerprint),
            ));
            tracing::info!(username = %username, "login accepted");
            Ok(Json(TokenResponse {
                access_token: token.value,
                token_type: "bearer",
            }))
        }
        Err(err) => {
            state.audit.record(&AuthAuditEvent::denied(
                AuthAction::Login,
                Some(&username),
                err.to_string(),
            ));
            tracing::warn!(username = %username, reason = %err, "login rejected");
            Err(err.into())
        }
    }
}

/// Returns the authenticated caller.
async fn handle_me(
    State(state): State<Arc<AppDependencies>>,
    headers: HeaderMap,
) -> Result<Json<UserSummary>, ApiError> {
    let user = current_user(&state, &headers).await?;
    Ok(Json(user.summary()))
}

/// Lists users for an authenticated caller.
async fn handle_list_users(
    State(state): State<Arc<AppDependencies>>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    current_user(&state, &headers).await?;
    let listed = run_blocking(Arc::clone(&state), |deps| -> Result<_, StoreError> {
        deps.sessions.session()?.read(users::list_users)
    })
    .await??;
    Ok(Json(listed.iter().map(User::summary).collect()))
}

/// Authenticates the bearer token on a request.
async fn current_user(state: &Arc<AppDependencies>, headers: &HeaderMap) -> Result<User, ApiError> {
    let header = headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok());
    let token = match parse_bearer_token(header) {
        Ok(token) => token,
        Err(err) => {
            state.audit.record(&AuthAuditEvent::denied(AuthAction::Token, None, err.to_string()));
            return Err(err.into());
        }
    };
    let token_fingerprint = fingerprint(&token_digest(&token));
    let resolved = run_blocking(Arc::clone(state), move |deps| -> Result<_, AuthError> {
        let session = deps.sessions.session()?;
        session.read(|conn| deps.tokens.resolve(conn, &token))
    })
    .await?;
    match resolved {
        Ok(user) => {
            state.audit.record(&AuthAuditEvent::allowed(
                AuthAction::Token,
                &user.username,
                Some(token_fingerprint),
            ));
            Ok(user)
        }
        Err(err) => {
            state.audit.record(&AuthAuditEvent::denied(AuthAction::Token, None, err.to_string()));
            Err(err.into())
        }
    }
}

/// Runs storage work on the blocking pool.
async fn run_blocking<T, F>(state: Arc<AppDependencies>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppDependencies) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|err| ApiError::Internal(format!("worker failed: {err}")))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Request handling errors rendered as `{"detail": ...}` bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or invalid credentials (401).
    #[error("{0}")]
    Unauthenticated(String),
    /// Malformed request body (422).
    #[error("{0}")]
    Validation(String),
    /// Unknown route (404).
    #[error("Not Found")]
    NotFound,
    /// Persistence unavailable (503).
    #[error("{0}")]
    Unavailable(String),
    /// Unexpected failure (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status for the error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::SessionClosed | StoreError::Unavailable(_) | StoreError::Busy(_) => {
                Self::Unavailable(error.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Unauthenticated(message) => Self::Unauthenticated(message),
            AuthError::Inactive => Self::Unauthenticated(error.to_string()),
            AuthError::Store(store) => store.into(),
            AuthError::Password(message) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        }
        let mut response = (status, Json(json!({ "detail": self.to_string() }))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// API server errors.
#[derive(Debug, Error)]
pub enum ApiServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// Remediation engine HTTP server.
pub struct ApiServer {
    /// Bind address.
    bind: SocketAddr,
    /// Request pipeline dependencies.
    deps: AppDependencies,
}

impl ApiServer {
    /// Builds a server from configuration, opening the configured database.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] when configuration or initialization fails.
    pub fn from_config(config: &RemediationConfig) -> Result<Self, ApiServerError> {
        config.validate().map_err(|err| ApiServerError::Config(err.to_string()))?;
        let bind = config.server.bind_addr().map_err(|err| ApiServerError::Config(err.to_string()))?;
        let database = Database::open(config.database.clone())
            .map_err(|err| ApiServerError::Init(err.to_string()))?;
        let tokens =
            TokenService::new(Duration::from_secs(config.auth.token_ttl_secs), HashCost::Standard)
                .map_err(|err| ApiServerError::Init(err.to_string()))?;
        let audit: Arc<dyn AuditSink> = match &config.logging.audit_log_path {
            Some(path) => Arc::new(
                FileAuditSink::new(path).map_err(|err| ApiServerError::Init(err.to_string()))?,
            ),
            None => Arc::new(StderrAuditSink),
        };
        let deps = AppDependencies::new(Arc::new(database), tokens)
            .with_audit(audit)
            .with_max_body_bytes(config.server.max_body_bytes);
        Ok(Self::from_dependencies(bind, deps))
    }

    /// Builds a server from explicit dependencies.
    #[must_use]
    pub const fn from_dependencies(bind: SocketAddr, deps: AppDependencies) -> Self {
        Self {
            bind,
            deps,
        }
    }

    /// Returns the configured bind address.
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        self.bind
    }

    /// Binds the configured address and serves until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ApiServerError> {
        let listener = TcpListener::bind(self.bind)
            .await
            .map_err(|err| ApiServerError::Transport(format!("http bind failed: {err}")))?;
        self.serve_with_listener(listener).await
    }

    /// Serves on an already bound listener until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] when serving fails.
    pub async fn serve_with_listener(self, listener: TcpListener) -> Result<(), ApiServerError> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Serves on `listener` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`ApiServerError`] when serving fails.
    pub async fn serve_with_shutdown<S>(
        self,
        listener: TcpListener,
        shutdown: S,
    ) -> Result<(), ApiServerError>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|err| ApiServerError::Transport(format!("listener address: {err}")))?;
        tracing::info!(%addr, "remediation engine listening");
        axum::serve(listener, build_router(self.deps))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ApiServerError::Transport(format!("http server failed: {err}")))
    }
}
