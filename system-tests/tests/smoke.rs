// system-tests/tests/smoke.rs
// ============================================================================
// Module: Smoke Suite
// Description: Reachability and transport failure scenarios.
// Purpose: Run smoke probes in both client modes.
// Dependencies: suites/smoke.rs
// ============================================================================

//! Smoke Suite entry point for system-tests.

#[path = "suites/smoke.rs"]
mod smoke;
