// system-tests/tests/suites/auth_api.rs
// ============================================================================
// Module: Auth API Scenarios
// Description: Login and protected-endpoint behavior over the public API.
// Purpose: Pin the authentication contract in both client modes.
// Dependencies: remediation-harness
// ============================================================================

//! Authentication scenarios shared by the in-process and networked runs.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::missing_docs_in_private_items,
    reason = "Scenario bodies assert with panics and are named by behavior."
)]

use remediation_core::Role;
use remediation_harness::Harness;
use remediation_harness::PrincipalOverrides;
use remediation_harness::broker::LOGIN_PATH;
use remediation_harness::make_principal;
use remediation_system_tests::Outcome;
use remediation_system_tests::dual_mode::pass;
use remediation_system_tests::dual_mode::skip;
use remediation_system_tests::dual_mode_tests;
use remediation_system_tests::require_ready;
use serde_json::Value;
use serde_json::json;

dual_mode_tests!(
    login_success,
    login_wrong_password,
    login_unknown_user,
    login_inactive_user,
    login_malformed_body,
    users_requires_authentication,
    users_rejects_forged_token,
    users_with_token,
    me_returns_caller,
);

async fn login_success(harness: Harness) -> Outcome {
    let admin = harness.principal(Role::Admin)?;
    let header = require_ready!(harness.login_as(Role::Admin).await?);
    assert!(header.value().starts_with("Bearer "));
    let response = harness.client().post_json(LOGIN_PATH, &admin.credentials().body(), &[]).await?;
    assert_eq!(response.status, 200);
    assert!(response.body["access_token"].as_str().is_some_and(|token| !token.is_empty()));
    assert_eq!(response.body["token_type"], "bearer");
    pass()
}

async fn login_wrong_password(harness: Harness) -> Outcome {
    let admin = harness.principal(Role::Admin)?;
    harness.provision(&admin)?;
    let body = json!({ "username": admin.username, "password": "WrongPassword" });
    let response = harness.client().post_json(LOGIN_PATH, &body, &[]).await?;
    assert_eq!(response.status, 401);
    assert!(response.body.get("access_token").is_none());
    pass()
}

async fn login_unknown_user(harness: Harness) -> Outcome {
    let body = json!({ "username": "nonexistent", "password": "password123" });
    let response = harness.client().post_json(LOGIN_PATH, &body, &[]).await?;
    assert_eq!(response.status, 401);
    assert_eq!(response.detail(), Some("Incorrect username or password"));
    pass()
}

async fn login_inactive_user(harness: Harness) -> Outcome {
    if harness.session().is_none() {
        return skip("inactive principal needs fixture access");
    }
    let idle = make_principal(
        Role::User,
        PrincipalOverrides::default().username("test_idle").email("idle@test.com").inactive(),
    )?;
    harness.provision(&idle)?;
    let response = harness.client().post_json(LOGIN_PATH, &idle.credentials().body(), &[]).await?;
    assert_eq!(response.status, 401);
    assert!(response.body.get("access_token").is_none());
    pass()
}

async fn login_malformed_body(harness: Harness) -> Outcome {
    let response =
        harness.client().post_json(LOGIN_PATH, &json!({ "username": 42 }), &[]).await?;
    assert_eq!(response.status, 422);
    pass()
}

async fn users_requires_authentication(harness: Harness) -> Outcome {
    let response = harness.client().get("/api/users", &[]).await?;
    assert_eq!(response.status, 401);
    assert_eq!(response.detail(), Some("Not authenticated"));
    pass()
}

async fn users_rejects_forged_token(harness: Harness) -> Outcome {
    let response =
        harness.client().get("/api/users", &[("Authorization", "Bearer forged-token")]).await?;
    assert_eq!(response.status, 401);
    pass()
}

async fn users_with_token(harness: Harness) -> Outcome {
    let header = require_ready!(harness.login_as(Role::Admin).await?);
    let response = harness.client().get("/api/users", &[header.pair()]).await?;
    assert_eq!(response.status, 200);
    let listed = response.body.as_array().cloned().unwrap_or_default();
    assert!(!listed.is_empty());
    assert!(listed.iter().all(|user| user.get("password_hash").is_none()));
    let admin = harness.config().admin_username.as_str();
    assert!(listed.iter().any(|user| user["username"] == Value::from(admin)));
    pass()
}

async fn me_returns_caller(harness: Harness) -> Outcome {
    let header = require_ready!(harness.login_as(Role::User).await?);
    let response = harness.client().get("/api/auth/me", &[header.pair()]).await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["username"], "test_user");
    assert_eq!(response.body["role"], "user");
    pass()
}
