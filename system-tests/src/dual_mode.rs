// system-tests/src/dual_mode.rs
// ============================================================================
// Module: Dual-Mode Runner
// Description: Harness construction and reporting around a scenario body.
// Purpose: Keep per-test setup, teardown, and summaries out of scenarios.
// Dependencies: remediation-harness
// ============================================================================

//! ## Overview
//! [`run`] loads [`HarnessConfig`] from the environment, builds a harness in
//! the requested mode, hands it to the scenario, and writes the summary. The
//! harness is owned by the scenario, so teardown runs when the body returns
//! or unwinds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;

use remediation_harness::ClientMode;
use remediation_harness::Gate;
use remediation_harness::Harness;
use remediation_harness::HarnessConfig;
use remediation_harness::HarnessError;
use remediation_harness::TestStatus;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Result of a scenario: ready (passed), skipped, or failed.
pub type Outcome = Result<Gate<()>, HarnessError>;

/// Runs `body` against a fresh harness in `mode`.
///
/// # Errors
///
/// Returns the harness construction error or the scenario's failure. Skips
/// are recorded and reported as success.
pub async fn run<F, Fut>(mode: ClientMode, test_name: &str, body: F) -> Result<(), HarnessError>
where
    F: FnOnce(Harness) -> Fut,
    Fut: Future<Output = Outcome>,
{
    let config = HarnessConfig::load()?;
    let harness = Harness::new(mode, config).await?;
    let mut reporter = harness
        .reporter(test_name)
        .map_err(|err| HarnessError::Config(format!("test reporter: {err}")))?;
    let outcome = body(harness).await;
    let written = match &outcome {
        Ok(Gate::Ready(())) => reporter.finish(TestStatus::Pass, Vec::new(), Vec::new()),
        Ok(Gate::Skip(reason)) => reporter.skip(reason),
        Err(err) => reporter.finish(TestStatus::Fail, vec![err.to_string()], Vec::new()),
    };
    if let Err(err) = written {
        tracing::warn!(test = test_name, %mode, error = %err, "summary write failed");
    }
    outcome.map(|_| ())
}

/// Passing outcome.
#[must_use]
pub const fn pass() -> Outcome {
    Ok(Gate::Ready(()))
}

/// Skipping outcome.
#[must_use]
pub fn skip(reason: &str) -> Outcome {
    Ok(Gate::Skip(reason.to_string()))
}
