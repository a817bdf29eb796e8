//! AcctAudit Core - Foundation types and error handling
//!
//! This crate provides the core abstractions used throughout AcctAudit:
//! - `AccountRecord`: One account directory entry
//! - `CredentialStatus`: Password state of an account
//! - `Issue`, `FlaggedAccount`: Misconfigurations found on system accounts

pub mod account;
pub mod error;
pub mod issue;

// Re-export commonly used types at crate root
pub use account::{AccountRecord, CredentialStatus, StatusOrigin};
pub use error::{Error, Result};
pub use issue::{FlaggedAccount, Issue, IssueKind};
