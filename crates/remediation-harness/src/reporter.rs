// crates/remediation-harness/src/reporter.rs
// ============================================================================
// Module: Test Reporter
// Description: Per-test run roots and deterministic summaries.
// Purpose: Record pass, fail, and skip outcomes even when a test panics.
// Dependencies: serde, serde_jcs
// ============================================================================

//! ## Overview
//! A [`TestReporter`] owns one artifact directory per test. `summary.json`
//! is written with canonical JCS serialization and `summary.md` mirrors it
//! for humans. If a test drops its reporter without finishing, the summary is
//! still written, with status `panic` during unwinding and `unknown`
//! otherwise.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::config::HarnessConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Parent directory of run roots when none is configured.
const DEFAULT_ARTIFACT_DIR: &str = "target/remediation-tests";

// ============================================================================
// SECTION: Status
// ============================================================================

/// Final outcome of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Every assertion held.
    Pass,
    /// An assertion failed.
    Fail,
    /// A capability probe declined to run the test.
    Skip,
    /// The test unwound without finishing its report.
    Panic,
    /// The reporter was dropped without a status.
    Unknown,
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Skip => "skip",
            Self::Panic => "panic",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Serialized summary of one test.
#[derive(Debug, Serialize)]
struct TestSummary {
    /// Test name.
    test_name: String,
    /// Final outcome.
    status: TestStatus,
    /// Start time in unix milliseconds.
    started_at_ms: u128,
    /// End time in unix milliseconds.
    ended_at_ms: u128,
    /// Elapsed time.
    duration_ms: u128,
    /// Free-form notes, including skip reasons.
    notes: Vec<String>,
    /// Artifact file names written by the test.
    artifacts: Vec<String>,
}

/// Returns the current time in unix milliseconds.
fn now_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

/// Artifact directory of a single test.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    /// Directory holding this test's files.
    root: PathBuf,
}

impl TestArtifacts {
    /// Creates the artifact root for `test_name`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    pub fn new(config: &HarnessConfig, test_name: &str) -> io::Result<Self> {
        let root = match &config.run_root {
            Some(run_root) => run_root.join(test_name),
            None => PathBuf::from(DEFAULT_ARTIFACT_DIR)
                .join(format!("run_{}", now_millis()))
                .join(test_name),
        };
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the artifact directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when serialization or the write fails.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Writes a UTF-8 text artifact.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the write fails.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, value.as_bytes())?;
        Ok(path)
    }
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Writes a summary for one test, even on panic.
pub struct TestReporter {
    /// Artifact directory.
    artifacts: TestArtifacts,
    /// Test name.
    test_name: String,
    /// Creation time in unix milliseconds.
    started_at_ms: u128,
    /// Set once a summary was written.
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for `test_name`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the artifact directory cannot be created.
    pub fn new(config: &HarnessConfig, test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(config, test_name)?,
            test_name: test_name.to_string(),
            started_at_ms: now_millis(),
            finalized: false,
        })
    }

    /// Returns the artifact directory.
    #[must_use]
    pub const fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Writes the final summary.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when a summary file cannot be written.
    pub fn finish(
        &mut self,
        status: TestStatus,
        notes: Vec<String>,
        artifacts: Vec<String>,
    ) -> io::Result<()> {
        let ended_at_ms = now_millis();
        let summary = TestSummary {
            test_name: self.test_name.clone(),
            status,
            started_at_ms: self.started_at_ms,
            ended_at_ms,
            duration_ms: ended_at_ms.saturating_sub(self.started_at_ms),
            notes,
            artifacts,
        };
        self.artifacts.write_json("summary.json", &summary)?;
        self.artifacts.write_text("summary.md", &summary_markdown(&summary))?;
        self.finalized = true;
        Ok(())
    }

    /// Records a skip with `reason` as its only note.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when a summary file cannot be written.
    pub fn skip(&mut self, reason: &str) -> io::Result<()> {
        tracing::info!(test = %self.test_name, reason, "test skipped");
        self.finish(TestStatus::Skip, vec![reason.to_string()], Vec::new())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status =
            if std::thread::panicking() { TestStatus::Panic } else { TestStatus::Unknown };
        let note = vec!["test terminated without explicit summary".to_string()];
        if let Err(err) = self.finish(status, note, Vec::new()) {
            tracing::warn!(test = %self.test_name, error = %err, "summary write failed");
        }
    }
}

/// Renders the human-readable summary.
fn summary_markdown(summary: &TestSummary) -> String {
    let mut out = String::new();
    out.push_str("# Test Summary\n\n## Status\n\n");
    let _ = writeln!(out, "- Test: {}", summary.test_name);
    let _ = writeln!(out, "- Status: {}", summary.status);
    let _ = writeln!(out, "- Duration (ms): {}", summary.duration_ms);
    push_list(&mut out, "Notes", &summary.notes);
    push_list(&mut out, "Artifacts", &summary.artifacts);
    out
}

/// Appends a titled bullet list, or `None` when empty.
fn push_list(out: &mut String, title: &str, items: &[String]) {
    let _ = write!(out, "\n## {title}\n\n");
    if items.is_empty() {
        out.push_str("- None\n");
    }
    for item in items {
        let _ = writeln!(out, "- {item}");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
