//! Account records and credential status

use serde::{Deserialize, Serialize};

/// One entry of the account directory, as read at scan time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Login name
    pub name: String,
    /// User ID
    pub uid: u32,
    /// Primary group ID
    pub gid: u32,
    /// Home directory
    pub home: String,
    /// Login shell
    pub shell: String,
}

impl AccountRecord {
    pub fn new(
        name: impl Into<String>,
        uid: u32,
        gid: u32,
        home: impl Into<String>,
        shell: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            uid,
            gid,
            home: home.into(),
            shell: shell.into(),
        }
    }
}

/// Password state of a single account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    /// Password authentication is disabled (`!` or `*` marker, or `passwd -S` reports L/LK)
    Locked,
    /// A password hash is set and can be used to log in
    SetAndUsable,
    /// The credential field is empty / `passwd -S` reports NP
    NoPassword,
    /// Neither the credential store nor the fallback query answered
    Unknown,
}

impl CredentialStatus {
    /// Classify a raw shadow credential field
    pub fn from_shadow_field(field: &str) -> Self {
        if field.is_empty() {
            CredentialStatus::NoPassword
        } else if field.starts_with('!') || field.starts_with('*') {
            CredentialStatus::Locked
        } else {
            CredentialStatus::SetAndUsable
        }
    }

    /// Classify the status code printed by `passwd -S`
    pub fn from_status_code(code: &str) -> Self {
        match code {
            "P" | "PS" => CredentialStatus::SetAndUsable,
            "L" | "LK" => CredentialStatus::Locked,
            "NP" => CredentialStatus::NoPassword,
            _ => CredentialStatus::Unknown,
        }
    }

    /// Whether this status lets the account authenticate with a password
    pub fn is_usable(&self) -> bool {
        matches!(self, CredentialStatus::SetAndUsable)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialStatus::Locked => "locked",
            CredentialStatus::SetAndUsable => "set and usable",
            CredentialStatus::NoPassword => "no password",
            CredentialStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CredentialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a credential status came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusOrigin {
    /// Bulk credential store (shadow file)
    Store,
    /// Per-account status query
    Query,
    /// No source produced an answer
    Unanswered,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_field_classification() {
        assert_eq!(
            CredentialStatus::from_shadow_field("!$6$abc$def"),
            CredentialStatus::Locked
        );
        assert_eq!(CredentialStatus::from_shadow_field("*"), CredentialStatus::Locked);
        assert_eq!(CredentialStatus::from_shadow_field("!!"), CredentialStatus::Locked);
        assert_eq!(
            CredentialStatus::from_shadow_field("$6$salt$hash"),
            CredentialStatus::SetAndUsable
        );
        assert_eq!(
            CredentialStatus::from_shadow_field(""),
            CredentialStatus::NoPassword
        );
    }

    #[test]
    fn test_status_code_classification() {
        assert_eq!(CredentialStatus::from_status_code("P"), CredentialStatus::SetAndUsable);
        assert_eq!(CredentialStatus::from_status_code("PS"), CredentialStatus::SetAndUsable);
        assert_eq!(CredentialStatus::from_status_code("L"), CredentialStatus::Locked);
        assert_eq!(CredentialStatus::from_status_code("LK"), CredentialStatus::Locked);
        assert_eq!(CredentialStatus::from_status_code("NP"), CredentialStatus::NoPassword);
        assert_eq!(CredentialStatus::from_status_code("??"), CredentialStatus::Unknown);
    }

    #[test]
    fn test_only_set_password_is_usable() {
        assert!(CredentialStatus::SetAndUsable.is_usable());
        assert!(!CredentialStatus::Locked.is_usable());
        assert!(!CredentialStatus::NoPassword.is_usable());
        assert!(!CredentialStatus::Unknown.is_usable());
    }
}
