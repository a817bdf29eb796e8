//! Error types for AcctAudit

use thiserror::Error;

/// Result type alias using AcctAudit Error
pub type Result<T> = std::result::Result<T, Error>;

/// AcctAudit error types
#[derive(Error, Debug)]
pub enum Error {
    // === Account Directory Errors ===
    #[error("Account source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("Malformed directory entry at line {line}: {reason}")]
    MalformedDirectoryEntry { line: usize, reason: String },

    // === Credential Errors ===
    #[error("Credential store {path} unreadable: {reason}")]
    CredentialStoreUnreadable { path: String, reason: String },

    // === Remediation Errors ===
    #[error("Account vanished: {account}")]
    AccountVanished { account: String },

    #[error("Privileged command failed: {command} ({status})")]
    PrivilegedCommandFailed { command: String, status: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfig { key: String, message: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Check if this error is fatal (should abort the whole run)
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::SourceUnavailable { .. }
                | Error::Configuration(_)
                | Error::InvalidConfig { .. }
        )
    }

    /// Get an error code for logging
    pub fn code(&self) -> &'static str {
        match self {
            Error::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            Error::MalformedDirectoryEntry { .. } => "MALFORMED_ENTRY",
            Error::CredentialStoreUnreadable { .. } => "CRED_STORE_UNREADABLE",
            Error::AccountVanished { .. } => "ACCOUNT_VANISHED",
            Error::PrivilegedCommandFailed { .. } => "PRIV_CMD_FAILED",
            Error::Configuration(_) => "CONFIG_ERROR",
            Error::InvalidConfig { .. } => "INVALID_CONFIG",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_source_and_config_errors_are_fatal() {
        let fatal = Error::SourceUnavailable {
            reason: "getent: not found; /etc/passwd: permission denied".into(),
        };
        assert!(fatal.is_fatal());
        assert!(Error::Configuration("bad".into()).is_fatal());

        let recoverable = [
            Error::CredentialStoreUnreadable {
                path: "/etc/shadow".into(),
                reason: "permission denied".into(),
            },
            Error::AccountVanished {
                account: "alice".into(),
            },
            Error::PrivilegedCommandFailed {
                command: "usermod -L alice".into(),
                status: "exit code 1".into(),
            },
            Error::MalformedDirectoryEntry {
                line: 3,
                reason: "expected 7 fields".into(),
            },
        ];
        for err in &recoverable {
            assert!(!err.is_fatal(), "{} should be recoverable", err.code());
        }
    }

    #[test]
    fn test_error_display() {
        let err = Error::AccountVanished {
            account: "bob".into(),
        };
        assert_eq!(err.to_string(), "Account vanished: bob");
        assert_eq!(err.code(), "ACCOUNT_VANISHED");
    }
}
