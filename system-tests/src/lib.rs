// system-tests/src/lib.rs
// ============================================================================
// Module: Remediation System Tests Library
// Description: Shared runner for dual-mode system-test binaries.
// Purpose: Write each scenario once and run it in-process and networked.
// Dependencies: remediation-harness, tokio
// ============================================================================

//! ## Overview
//! Scenario bodies are `async fn(Harness) -> Outcome`. [`dual_mode_tests!`]
//! expands each named body into an `in_process` and a `networked` test, both
//! driven by [`dual_mode::run`], which builds the harness from the
//! environment and records a summary with pass, fail, or skip status.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dual_mode;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dual_mode::Outcome;
pub use remediation_harness::ClientMode;
pub use remediation_harness::Gate;
pub use remediation_harness::HarnessError;

// ============================================================================
// SECTION: Macros
// ============================================================================

/// Expands scenario bodies into one test per client mode.
#[macro_export]
macro_rules! dual_mode_tests {
    ($($name:ident),+ $(,)?) => {
        $(
            mod $name {
                /// Runs the scenario against the in-process application.
                #[tokio::test(flavor = "multi_thread")]
                async fn in_process() -> Result<(), $crate::HarnessError> {
                    $crate::dual_mode::run(
                        $crate::ClientMode::InProcess,
                        stringify!($name),
                        super::$name,
                    )
                    .await
                }

                /// Runs the scenario against a networked target.
                #[tokio::test(flavor = "multi_thread")]
                async fn networked() -> Result<(), $crate::HarnessError> {
                    $crate::dual_mode::run(
                        $crate::ClientMode::Networked,
                        stringify!($name),
                        super::$name,
                    )
                    .await
                }
            }
        )+
    };
}

/// Unwraps a ready gate or returns its skip from the enclosing scenario.
#[macro_export]
macro_rules! require_ready {
    ($gate:expr) => {
        match $gate {
            $crate::Gate::Ready(value) => value,
            $crate::Gate::Skip(reason) => return Ok($crate::Gate::Skip(reason)),
        }
    };
}
