//! Issue definitions - misconfigurations found on system accounts

use crate::account::{AccountRecord, CredentialStatus};
use serde::{Deserialize, Serialize};

/// Kind of misconfiguration, in rule evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Interactive login shell on a system account
    LoginShellPresent,
    /// Home directory is empty, a sentinel, or missing on disk
    HomeMissingOrInvalid,
    /// A usable password is set
    CredentialUsable,
}

impl IssueKind {
    /// All kinds, in rule evaluation order
    pub const ALL: [IssueKind; 3] = [
        IssueKind::LoginShellPresent,
        IssueKind::HomeMissingOrInvalid,
        IssueKind::CredentialUsable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::LoginShellPresent => "login_shell_present",
            IssueKind::HomeMissingOrInvalid => "home_missing_or_invalid",
            IssueKind::CredentialUsable => "credential_usable",
        }
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A triggered rule plus the value that triggered it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub evidence: String,
}

impl Issue {
    pub fn login_shell(shell: &str) -> Self {
        Self {
            kind: IssueKind::LoginShellPresent,
            evidence: shell.to_string(),
        }
    }

    pub fn home_missing(home: &str) -> Self {
        Self {
            kind: IssueKind::HomeMissingOrInvalid,
            evidence: home.to_string(),
        }
    }

    pub fn credential_usable(status: CredentialStatus) -> Self {
        Self {
            kind: IssueKind::CredentialUsable,
            evidence: status.to_string(),
        }
    }

    /// Human-readable description used in reports
    pub fn description(&self) -> String {
        match self.kind {
            IssueKind::LoginShellPresent if self.evidence.is_empty() => {
                "empty login shell (defaults to /bin/sh)".to_string()
            }
            IssueKind::LoginShellPresent => format!("login shell {}", self.evidence),
            IssueKind::HomeMissingOrInvalid if self.evidence.is_empty() => {
                "no home directory".to_string()
            }
            IssueKind::HomeMissingOrInvalid => {
                format!("home {} missing or invalid", self.evidence)
            }
            IssueKind::CredentialUsable => format!("password {}", self.evidence),
        }
    }
}

/// A system account with at least one issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedAccount {
    pub account: AccountRecord,
    pub issues: Vec<Issue>,
}

impl FlaggedAccount {
    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|i| i.kind == kind)
    }

    /// Comma-joined issue descriptions
    pub fn summary(&self) -> String {
        self.issues
            .iter()
            .map(Issue::description)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
