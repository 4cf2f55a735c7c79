// system-tests/tests/suites/smoke.rs
// ============================================================================
// Module: Smoke Scenarios
// Description: Reachability probes and transport failure handling.
// Purpose: Confirm a target is alive before deeper suites run.
// Dependencies: remediation-harness
// ============================================================================

//! Smoke scenarios. Probes accept any terminal status the reference
//! application may answer with; only a missing response fails.

#![allow(
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::missing_docs_in_private_items,
    reason = "Scenario bodies assert with panics and are named by behavior."
)]

use std::time::Duration;

use remediation_harness::Harness;
use remediation_harness::HarnessClient;
use remediation_harness::HarnessError;
use remediation_harness::LoginCredentials;
use remediation_harness::login;
use remediation_system_tests::Outcome;
use remediation_system_tests::dual_mode::pass;
use remediation_system_tests::dual_mode_tests;

dual_mode_tests!(health_reports_healthy, root_is_reachable, unknown_route_is_json_404);

/// Statuses that count as "the application answered" for the root probe.
const REACHABLE: [u16; 3] = [200, 307, 404];

async fn health_reports_healthy(harness: Harness) -> Outcome {
    let response = harness.client().get("/health", &[]).await?;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["status"], "healthy");
    pass()
}

async fn root_is_reachable(harness: Harness) -> Outcome {
    let response = harness.client().get("/", &[]).await?;
    assert!(REACHABLE.contains(&response.status), "unexpected root status {}", response.status);
    pass()
}

async fn unknown_route_is_json_404(harness: Harness) -> Outcome {
    let response = harness.client().get("/api/does-not-exist", &[]).await?;
    assert_eq!(response.status, 404);
    assert_eq!(response.detail(), Some("Not Found"));
    pass()
}

fn closed_port_client() -> HarnessClient {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let base = format!("http://{addr}").parse().unwrap();
    HarnessClient::networked(base, Duration::from_secs(30)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_target_is_a_transport_error() {
    let client = closed_port_client();
    let result = client.get("/health", &[]).await;
    assert!(matches!(result, Err(HarnessError::Transport(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_login_is_never_skipped() {
    let client = closed_port_client();
    let credentials = LoginCredentials::new("test_admin", "TestPassw0rd!");
    let result = login(&client, &credentials).await;
    assert!(matches!(result, Err(HarnessError::Transport(_))));
}
