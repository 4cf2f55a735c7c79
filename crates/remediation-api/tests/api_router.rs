// crates/remediation-api/tests/api_router.rs
// ============================================================================
// Module: API Router Tests
// Description: Drive the router in memory against a temporary database.
// Purpose: Pin login, bearer auth, and error body behavior.
// Dependencies: remediation-api, remediation-store-sqlite, tower, tempfile
// ============================================================================

//! ## Overview
//! Requests go through `tower::ServiceExt::oneshot`, so these tests cover the
//! full axum pipeline without opening a socket.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use axum::http::header::WWW_AUTHENTICATE;
use remediation_api::AppDependencies;
use remediation_api::AuditSink;
use remediation_api::AuthAuditEvent;
use remediation_api::TokenService;
use remediation_api::build_router;
use remediation_core::HashCost;
use remediation_core::NewUser;
use remediation_core::Role;
use remediation_core::hash_password_with_cost;
use remediation_store_sqlite::Database;
use remediation_store_sqlite::DatabaseConfig;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::SessionSource;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::users;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const PASSWORD: &str = "TestPassw0rd!";

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<AuthAuditEvent>>,
}

impl AuditSink for RecordingSink {
    fn record(&self, event: &AuthAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

struct Fixture {
    _temp: TempDir,
    database: Arc<Database>,
    router: Router,
    audit: Arc<RecordingSink>,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let database = Arc::new(Database::open(DatabaseConfig::for_path(temp.path().join("api.db"))).unwrap());
    let session = database.session().unwrap();
    for (username, role, is_active) in
        [("test_admin", Role::Admin, true), ("test_user", Role::User, true), ("idle", Role::User, false)]
    {
        session
            .unit_of_work(|conn| {
                users::insert_user(conn, &NewUser {
                    username: username.to_string(),
                    email: format!("{username}@test.com"),
                    full_name: None,
                    password_hash: hash_password_with_cost(PASSWORD, HashCost::Fast).unwrap(),
                    role,
                    is_active,
                })
            })
            .unwrap();
    }
    let audit = Arc::new(RecordingSink::default());
    let tokens = TokenService::new(Duration::from_secs(60), HashCost::Fast).unwrap();
    let sessions: Arc<dyn SessionSource> = Arc::clone(&database) as Arc<dyn SessionSource>;
    let deps = AppDependencies::new(sessions, tokens).with_audit(Arc::clone(&audit) as Arc<dyn AuditSink>);
    Fixture {
        _temp: temp,
        database,
        router: build_router(deps),
        audit,
    }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let challenge = response
        .headers()
        .get(WWW_AUTHENTICATE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body, challenge)
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"username": username, "password": password}).to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

async fn login(router: &Router, username: &str) -> String {
    let (status, body, _) = send(router, login_request(username, PASSWORD)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn login_returns_bearer_token() {
    let fixture = fixture();
    let (status, body, _) = send(&fixture.router, login_request("test_admin", PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    assert!(!body["access_token"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_and_unknown_user_are_rejected() {
    let fixture = fixture();
    for (username, password) in [("test_admin", "WrongPassword"), ("nobody", PASSWORD)] {
        let (status, body, challenge) =
            send(&fixture.router, login_request(username, password)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.get("access_token").is_none());
        assert_eq!(body["detail"], "Incorrect username or password");
        assert_eq!(challenge.as_deref(), Some("Bearer"));
    }
}

#[tokio::test]
async fn inactive_user_cannot_log_in() {
    let fixture = fixture();
    let (status, body, _) = send(&fixture.router, login_request("idle", PASSWORD)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn malformed_login_body_is_unprocessable() {
    let fixture = fixture();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{\"username\": \"test_admin\"}"))
        .unwrap();
    let (status, body, _) = send(&fixture.router, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn users_require_bearer_token() {
    let fixture = fixture();
    let (status, body, challenge) = send(&fixture.router, get("/api/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Not authenticated");
    assert_eq!(challenge.as_deref(), Some("Bearer"));

    let (status, _, _) = send(&fixture.router, get("/api/users", Some("forged"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_list_omits_password_hashes() {
    let fixture = fixture();
    let token = login(&fixture.router, "test_admin").await;
    let (status, body, _) = send(&fixture.router, get("/api/users", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    for user in listed {
        assert!(user.get("password_hash").is_none());
        assert!(user["role"].is_string());
    }
}

#[tokio::test]
async fn me_returns_the_caller() {
    let fixture = fixture();
    let token = login(&fixture.router, "test_user").await;
    let (status, body, _) = send(&fixture.router, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "test_user");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn deactivated_user_token_stops_working() {
    let fixture = fixture();
    let token = login(&fixture.router, "test_user").await;
    let session = fixture.database.session().unwrap();
    session
        .unit_of_work(|conn| {
            let user = users::find_user_by_username(conn, "test_user")?.unwrap();
            users::set_user_active(conn, user.id, false)
        })
        .unwrap();
    let (status, body, _) = send(&fixture.router, get("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Inactive user");
}

#[tokio::test]
async fn health_and_root_answer() {
    let fixture = fixture();
    let (status, body, _) = send(&fixture.router, get("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body, _) = send(&fixture.router, get("/", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not Found");

    let (status, _, _) = send(&fixture.router, get("/missing", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn audit_records_login_decisions() {
    let fixture = fixture();
    let _ = login(&fixture.router, "test_admin").await;
    let _ = send(&fixture.router, login_request("test_admin", "nope")).await;
    let events = fixture.audit.events.lock().unwrap().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].decision, "allow");
    assert!(events[0].token_fingerprint.is_some());
    assert_eq!(events[1].decision, "deny");
    assert_eq!(events[1].subject.as_deref(), Some("test_admin"));
}

struct Unavailable;

impl SessionSource for Unavailable {
    fn session(&self) -> Result<Session, StoreError> {
        Err(StoreError::Unavailable("maintenance".to_string()))
    }
}

#[tokio::test]
async fn unavailable_storage_is_service_unavailable() {
    let tokens = TokenService::new(Duration::from_secs(60), HashCost::Fast).unwrap();
    let router = build_router(AppDependencies::new(Arc::new(Unavailable), tokens));
    let (status, body, _) = send(&router, login_request("test_admin", PASSWORD)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["detail"].as_str().unwrap().contains("maintenance"));
}
