// crates/remediation-core/src/model.rs
// ============================================================================
// Module: Domain Model
// Description: Typed records persisted by the remediation engine.
// Purpose: Give users, alerts, server credentials, and LLM providers stable shapes.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Records come in two flavors: `New*` values describe a row before it is
//! inserted, and the plain record types carry the store-assigned identifier.
//! Enumerations are persisted as lowercase text labels; parsing an unknown
//! label fails closed with [`ParseEnumError`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::password::PasswordHash;
use crate::secrets::SealedSecret;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw row identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw row identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row identifier of a user.
    UserId
);
row_id!(
    /// Row identifier of an alert.
    AlertId
);
row_id!(
    /// Row identifier of a server credential.
    ServerCredentialId
);
row_id!(
    /// Row identifier of an LLM provider.
    LlmProviderId
);

// ============================================================================
// SECTION: Text Enumerations
// ============================================================================

/// Error returned when a persisted label does not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} label: {label}")]
pub struct ParseEnumError {
    /// Enumeration being parsed.
    pub kind: &'static str,
    /// Offending label.
    pub label: String,
}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Returns the persisted text label.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// Parses a persisted text label.
            ///
            /// # Errors
            ///
            /// Returns [`ParseEnumError`] when the label is unknown.
            pub fn parse(label: &str) -> Result<Self, ParseEnumError> {
                match label {
                    $($label => Ok(Self::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        label: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(
    /// Access role of a user.
    Role, "role" {
        /// Full administrative access.
        Admin => "admin",
        /// Operates remediation workflows.
        Engineer => "engineer",
        /// Read-mostly access.
        User => "user",
    }
);

impl Role {
    /// All roles in privilege order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::Engineer, Self::User];

    /// Returns the capitalized display name used for full names.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::Engineer => "Engineer",
            Self::User => "User",
        }
    }
}

text_enum!(
    /// Alert severity as reported by the alert source.
    AlertSeverity, "alert severity" {
        /// Page-worthy.
        Critical => "critical",
        /// Needs attention.
        Warning => "warning",
        /// Informational.
        Info => "info",
    }
);

text_enum!(
    /// Alert lifecycle status.
    AlertStatus, "alert status" {
        /// Alert is currently firing.
        Firing => "firing",
        /// Alert has resolved.
        Resolved => "resolved",
    }
);

text_enum!(
    /// Operating system family of a managed server.
    ServerOsType, "os type" {
        /// Linux hosts.
        Linux => "linux",
        /// Windows hosts.
        Windows => "windows",
    }
);

text_enum!(
    /// Remote execution protocol for a managed server.
    RemoteProtocol, "protocol" {
        /// Secure shell.
        Ssh => "ssh",
        /// Windows remote management.
        Winrm => "winrm",
    }
);

text_enum!(
    /// Authentication material type for a server credential.
    CredentialAuthType, "auth type" {
        /// Private key authentication.
        Key => "key",
        /// Password authentication.
        Password => "password",
    }
);

text_enum!(
    /// LLM provider family.
    LlmProviderType, "provider type" {
        /// OpenAI-compatible API.
        OpenAi => "openai",
        /// Anthropic API.
        Anthropic => "anthropic",
        /// Google API.
        Google => "google",
        /// Self-hosted Ollama.
        Ollama => "ollama",
        /// Any other endpoint.
        Custom => "custom",
    }
);

// ============================================================================
// SECTION: Users
// ============================================================================

/// User row prior to insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// One-way password hash; never the plaintext.
    pub password_hash: PasswordHash,
    /// Access role.
    pub role: Role,
    /// Whether the user may log in.
    pub is_active: bool,
}

/// Persisted user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Row identifier.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// One-way password hash.
    pub password_hash: PasswordHash,
    /// Access role.
    pub role: Role,
    /// Whether the user may log in.
    pub is_active: bool,
    /// Creation time in unix milliseconds.
    pub created_at_ms: i64,
}

impl User {
    /// Returns the externally visible projection of the user.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// User projection returned by the API. Carries no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    /// Row identifier.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Optional display name.
    pub full_name: Option<String>,
    /// Access role.
    pub role: Role,
    /// Whether the user may log in.
    pub is_active: bool,
}

// ============================================================================
// SECTION: Alerts
// ============================================================================

/// Alert row prior to insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAlert {
    /// Source-side deduplication fingerprint.
    pub fingerprint: String,
    /// Alert rule name.
    pub alert_name: String,
    /// Severity label.
    pub severity: AlertSeverity,
    /// Affected instance.
    pub instance: String,
    /// Scrape job that produced the alert.
    pub job: String,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Alert labels.
    pub labels: BTreeMap<String, String>,
    /// Alert annotations.
    pub annotations: BTreeMap<String, String>,
    /// Raw payload as received.
    pub raw_alert: Value,
}

/// Persisted alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    /// Row identifier.
    pub id: AlertId,
    /// Source-side deduplication fingerprint.
    pub fingerprint: String,
    /// Alert rule name.
    pub alert_name: String,
    /// Severity label.
    pub severity: AlertSeverity,
    /// Affected instance.
    pub instance: String,
    /// Scrape job that produced the alert.
    pub job: String,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Alert labels.
    pub labels: BTreeMap<String, String>,
    /// Alert annotations.
    pub annotations: BTreeMap<String, String>,
    /// Raw payload as received.
    pub raw_alert: Value,
    /// Receive time in unix milliseconds.
    pub received_at_ms: i64,
}

// ============================================================================
// SECTION: Server Credentials
// ============================================================================

/// Server credential row prior to insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewServerCredential {
    /// Unique display name.
    pub name: String,
    /// Host name or address.
    pub hostname: String,
    /// Remote port.
    pub port: u16,
    /// Remote login name.
    pub username: String,
    /// Operating system family.
    pub os_type: ServerOsType,
    /// Remote execution protocol.
    pub protocol: RemoteProtocol,
    /// Authentication material type.
    pub auth_type: CredentialAuthType,
    /// Sealed private key, when key auth is used.
    pub ssh_key_encrypted: Option<SealedSecret>,
    /// Sealed password, when password auth is used.
    pub password_encrypted: Option<SealedSecret>,
    /// Deployment environment label.
    pub environment: String,
    /// Owning user.
    pub created_by: UserId,
}

/// Persisted server credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCredential {
    /// Row identifier.
    pub id: ServerCredentialId,
    /// Unique display name.
    pub name: String,
    /// Host name or address.
    pub hostname: String,
    /// Remote port.
    pub port: u16,
    /// Remote login name.
    pub username: String,
    /// Operating system family.
    pub os_type: ServerOsType,
    /// Remote execution protocol.
    pub protocol: RemoteProtocol,
    /// Authentication material type.
    pub auth_type: CredentialAuthType,
    /// Sealed private key.
    pub ssh_key_encrypted: Option<SealedSecret>,
    /// Sealed password.
    pub password_encrypted: Option<SealedSecret>,
    /// Deployment environment label.
    pub environment: String,
    /// Owning user.
    pub created_by: UserId,
    /// Creation time in unix milliseconds.
    pub created_at_ms: i64,
}

// ============================================================================
// SECTION: LLM Providers
// ============================================================================

/// LLM provider row prior to insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLlmProvider {
    /// Unique display name.
    pub name: String,
    /// Provider family.
    pub provider_type: LlmProviderType,
    /// Model identifier passed to the provider.
    pub model_id: String,
    /// Sealed API key.
    pub api_key_encrypted: Option<SealedSecret>,
    /// Whether this provider is the default.
    pub is_default: bool,
    /// Whether this provider may be used.
    pub enabled: bool,
}

/// Persisted LLM provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmProvider {
    /// Row identifier.
    pub id: LlmProviderId,
    /// Unique display name.
    pub name: String,
    /// Provider family.
    pub provider_type: LlmProviderType,
    /// Model identifier passed to the provider.
    pub model_id: String,
    /// Sealed API key.
    pub api_key_encrypted: Option<SealedSecret>,
    /// Whether this provider is the default.
    pub is_default: bool,
    /// Whether this provider may be used.
    pub enabled: bool,
    /// Creation time in unix milliseconds.
    pub created_at_ms: i64,
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

    use super::LlmProviderType;
    use super::Role;

    #[test]
    fn role_labels_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_fails_closed() {
        let err = Role::parse("superuser").unwrap_err();
        assert_eq!(err.kind, "role");
        assert_eq!(err.label, "superuser");
    }

    #[test]
    fn provider_type_serializes_lowercase_label() {
        let value = serde_json::to_value(LlmProviderType::OpenAi).unwrap();
        assert_eq!(value, serde_json::json!("openai"));
    }
}
