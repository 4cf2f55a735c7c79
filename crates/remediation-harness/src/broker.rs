// crates/remediation-harness/src/broker.rs
// ============================================================================
// Module: Auth Token Broker
// Description: Login through the active client and hand back a bearer header.
// Purpose: Encode the fail-versus-skip policy for unusable principals.
// Dependencies: serde_json, tracing
// ============================================================================

//! ## Overview
//! [`login`] posts credentials to the login endpoint. A 200 yields a
//! [`Gate::Ready`] header. Any other status depends on the client mode:
//! - in-process, the test provisioned the principal itself, so the refusal is
//!   a regression and surfaces as [`HarnessError::Assertion`];
//! - networked, the principal may simply not exist on the target yet, so the
//!   result is [`Gate::Skip`] with a diagnostic.
//!
//! A request that never got a response is always [`HarnessError::Transport`],
//! never a skip.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Value;
use serde_json::json;

use crate::client::ClientMode;
use crate::client::HarnessClient;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Login endpoint.
pub const LOGIN_PATH: &str = "/api/auth/login";
/// Authorization header name.
pub const AUTHORIZATION: &str = "Authorization";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Outcome of a capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate<T> {
    /// The capability is available.
    Ready(T),
    /// The dependent test should be recorded as skipped.
    Skip(String),
}

impl<T> Gate<T> {
    /// Returns the ready value, if any.
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Skip(_) => None,
        }
    }

    /// Returns the skip reason, if any.
    #[must_use]
    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            Self::Ready(_) => None,
            Self::Skip(reason) => Some(reason),
        }
    }
}

/// Login request body.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

impl LoginCredentials {
    /// Builds credentials.
    #[must_use]
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Returns the JSON body posted to [`LOGIN_PATH`].
    #[must_use]
    pub fn body(&self) -> Value {
        json!({ "username": self.username, "password": self.password })
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Ready-to-send `Authorization: Bearer <token>` header.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthHeader {
    /// Full header value including the scheme.
    value: String,
}

impl AuthHeader {
    /// Wraps a bearer token.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self {
            value: format!("Bearer {token}"),
        }
    }

    /// Returns the header value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the `(name, value)` pair accepted by [`HarnessClient`].
    #[must_use]
    pub fn pair(&self) -> (&str, &str) {
        (AUTHORIZATION, &self.value)
    }
}

impl fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthHeader").field(&"Bearer <redacted>").finish()
    }
}

// ============================================================================
// SECTION: Broker
// ============================================================================

/// Logs in and returns a bearer header, or a skip in networked mode.
///
/// # Errors
///
/// Returns [`HarnessError::Transport`] when the login request gets no
/// response, and [`HarnessError::Assertion`] when an in-process login is
/// refused or any successful login lacks a bearer token.
pub async fn login(
    client: &HarnessClient,
    credentials: &LoginCredentials,
) -> Result<Gate<AuthHeader>, HarnessError> {
    let response = client.post_json(LOGIN_PATH, &credentials.body(), &[]).await?;
    if response.status == 200 {
        return bearer_from(&response.body, &credentials.username).map(Gate::Ready);
    }
    let diagnostic = format!(
        "login for {} returned {}: {}",
        credentials.username,
        response.status,
        response.detail().unwrap_or("no detail")
    );
    match client.mode() {
        ClientMode::InProcess => Err(HarnessError::Assertion(diagnostic)),
        ClientMode::Networked => {
            tracing::warn!(
                username = %credentials.username,
                status = response.status,
                "principal unusable on target"
            );
            Ok(Gate::Skip(format!("principal not provisioned on target; {diagnostic}")))
        }
    }
}

/// Extracts the bearer token from a 200 login body.
fn bearer_from(body: &Value, username: &str) -> Result<AuthHeader, HarnessError> {
    let token = body
        .get("access_token")
        .and_then(Value::as_str)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            HarnessError::Assertion(format!("login for {username} returned 200 without a token"))
        })?;
    let scheme = body.get("token_type").and_then(Value::as_str).unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(HarnessError::Assertion(format!(
            "login for {username} returned token_type '{scheme}', expected bearer"
        )));
    }
    Ok(AuthHeader::bearer(token))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
