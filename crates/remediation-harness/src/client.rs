// crates/remediation-harness/src/client.rs
// ============================================================================
// Module: Dual-Mode Client
// Description: One request interface over in-process and networked transports.
// Purpose: Let a test body run unmodified against either mode.
// Dependencies: async-trait, axum, tower, reqwest, url, serde_json
// ============================================================================

//! ## Overview
//! [`HarnessClient`] exposes GET and JSON POST and always yields an
//! [`ApiResponse`] with the status and the parsed body (`null` when the body
//! is empty or not JSON). The transport is a strategy:
//! - [`InProcessTransport`] calls the router's `tower` service in memory.
//! - [`NetworkedTransport`] issues real HTTP with a bounded timeout.
//!
//! Non-2xx responses are responses, not errors. Only a request that never
//! produced a response becomes [`HarnessError::Transport`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::Method;
use axum::http::Request;
use axum::http::header::CONTENT_TYPE;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Largest response body buffered from the in-process application.
const MAX_RESPONSE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Where requests are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientMode {
    /// Router invoked in memory against an isolated session.
    InProcess,
    /// Real HTTP against a running instance.
    Networked,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProcess => f.write_str("in-process"),
            Self::Networked => f.write_str("networked"),
        }
    }
}

/// Transport-neutral request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path and query, starting with `/`.
    pub path: String,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

/// Status and parsed body of a response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body, or `null`.
    pub body: Value,
}

impl ApiResponse {
    /// Builds a response from raw body bytes.
    #[must_use]
    pub fn from_bytes(status: u16, bytes: &[u8]) -> Self {
        Self {
            status,
            body: serde_json::from_slice(bytes).unwrap_or(Value::Null),
        }
    }

    /// Returns the `detail` message of an error body.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.body.get("detail").and_then(Value::as_str)
    }
}

// ============================================================================
// SECTION: Transport Strategy
// ============================================================================

/// Request delivery strategy.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Returns the delivery mode.
    fn mode(&self) -> ClientMode;

    /// Delivers `request` and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when no response was received.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HarnessError>;
}

/// Calls the application router directly.
pub struct InProcessTransport {
    /// Application instance.
    router: Router,
}

impl InProcessTransport {
    /// Wraps an application instance.
    #[must_use]
    pub const fn new(router: Router) -> Self {
        Self {
            router,
        }
    }
}

#[async_trait]
impl ApiTransport for InProcessTransport {
    fn mode(&self) -> ClientMode {
        ClientMode::InProcess
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HarnessError> {
        let mut builder = Request::builder().method(request.method).uri(request.path.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = match &request.body {
            Some(json) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let http_request = builder
            .body(body)
            .map_err(|err| HarnessError::Transport(format!("invalid request: {err}")))?;
        let response = self
            .router
            .clone()
            .oneshot(http_request)
            .await
            .map_err(|err| HarnessError::Transport(format!("router failed: {err}")))?;
        let status = response.status().as_u16();
        let bytes = axum::body::to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .map_err(|err| HarnessError::Transport(format!("response body: {err}")))?;
        Ok(ApiResponse::from_bytes(status, &bytes))
    }
}

/// Issues HTTP requests to a running instance.
pub struct NetworkedTransport {
    /// Base URL requests are resolved against.
    base_url: Url,
    /// HTTP client with the request timeout applied.
    client: reqwest::Client,
}

impl NetworkedTransport {
    /// Builds a transport whose requests fail after `timeout`.
    ///
    /// The timeout is applied as given; [`HarnessConfig`](crate::HarnessConfig)
    /// enforces the floor for configured values.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be built.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| HarnessError::Transport(format!("failed to build http client: {err}")))?;
        Ok(Self {
            base_url,
            client,
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

#[async_trait]
impl ApiTransport for NetworkedTransport {
    fn mode(&self) -> ClientMode {
        ClientMode::Networked
    }

    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HarnessError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|err| HarnessError::Transport(format!("invalid path {}: {err}", request.path)))?;
        let mut builder = self.client.request(request.method, url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(json) = &request.body {
            builder = builder.json(json);
        }
        let response = builder
            .send()
            .await
            .map_err(|err| HarnessError::Transport(format!("{url}: {err}")))?;
        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| HarnessError::Transport(format!("{url} body: {err}")))?;
        Ok(ApiResponse::from_bytes(status, &bytes))
    }
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Mode-agnostic API client.
#[derive(Clone)]
pub struct HarnessClient {
    /// Delivery strategy.
    transport: Arc<dyn ApiTransport>,
}

impl HarnessClient {
    /// Wraps a transport.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            transport,
        }
    }

    /// Builds an in-process client over `router`.
    #[must_use]
    pub fn in_process(router: Router) -> Self {
        Self::new(Arc::new(InProcessTransport::new(router)))
    }

    /// Builds a networked client.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when the HTTP client cannot be built.
    pub fn networked(base_url: Url, timeout: Duration) -> Result<Self, HarnessError> {
        Ok(Self::new(Arc::new(NetworkedTransport::new(base_url, timeout)?)))
    }

    /// Returns the delivery mode.
    #[must_use]
    pub fn mode(&self) -> ClientMode {
        self.transport.mode()
    }

    /// Issues a GET.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when no response was received.
    pub async fn get(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, HarnessError> {
        self.transport.send(request(Method::GET, path, headers, None)).await
    }

    /// Issues a POST with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Transport`] when no response was received.
    pub async fn post_json(
        &self,
        path: &str,
        body: &Value,
        headers: &[(&str, &str)],
    ) -> Result<ApiResponse, HarnessError> {
        self.transport.send(request(Method::POST, path, headers, Some(body.clone()))).await
    }
}

/// Builds a transport-neutral request.
fn request(method: Method, path: &str, headers: &[(&str, &str)], body: Option<Value>) -> ApiRequest {
    ApiRequest {
        method,
        path: path.to_string(),
        headers: headers
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect(),
        body,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
