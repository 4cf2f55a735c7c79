// crates/remediation-api/src/audit.rs
// ============================================================================
// Module: Authentication Audit Logging
// Description: Structured audit events for login and token decisions.
// Purpose: Emit redacted JSON-line audit records without hard dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every authentication decision produces one [`AuthAuditEvent`]. Events never
//! carry passwords or tokens; bearer tokens appear only as a short digest
//! fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Authenticated operation being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthAction {
    /// Password login.
    Login,
    /// Bearer token check on a protected route.
    Token,
}

/// Authentication audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Audited operation.
    pub action: AuthAction,
    /// Decision outcome.
    pub decision: &'static str,
    /// Username or user id when known.
    pub subject: Option<String>,
    /// Token digest fingerprint when a token was involved.
    pub token_fingerprint: Option<String>,
    /// Failure reason for deny events.
    pub reason: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(action: AuthAction, subject: &str, token_fingerprint: Option<String>) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            action,
            decision: "allow",
            subject: Some(subject.to_string()),
            token_fingerprint,
            reason: None,
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(action: AuthAction, subject: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            event: "auth_decision",
            timestamp_ms: now_ms(),
            action,
            decision: "deny",
            subject: subject.map(ToString::to_string),
            token_fingerprint: None,
            reason: Some(reason.into()),
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for authentication decisions.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &AuthAuditEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix time in milliseconds.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use super::AuditSink;
    use super::AuthAction;
    use super::AuthAuditEvent;
    use super::FileAuditSink;

    #[test]
    fn file_sink_appends_json_lines() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("audit").join("auth.jsonl");
        let sink = FileAuditSink::new(&path).unwrap();
        sink.record(&AuthAuditEvent::allowed(AuthAction::Login, "test_admin", None));
        sink.record(&AuthAuditEvent::denied(AuthAction::Token, None, "not authenticated"));
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> =
            content.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["decision"], "allow");
        assert_eq!(lines[0]["action"], "login");
        assert_eq!(lines[1]["decision"], "deny");
        assert_eq!(lines[1]["reason"], "not authenticated");
    }
}
