//! AcctAudit Accounts - local account auditing and remediation
//!
//! This crate provides the audit engine:
//! - Account directory backends (`getent passwd`, `/etc/passwd`)
//! - Human / system classification by uid
//! - Credential status from the shadow store or `passwd -S`
//! - Misconfiguration rules for system accounts
//! - Interactive password rotation and account locking
//! - Plain-text report artifacts
//!
//! # Example
//!
//! ```no_run
//! use acctaudit_accounts::{privileged_runner, AccountAuditor, ReportWriter, SystemRunner};
//! use acctaudit_common::Config;
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let auditor = AccountAuditor::from_config(
//!     &config,
//!     Arc::new(SystemRunner),
//!     privileged_runner(&config.remediation.escalation_wrapper),
//! );
//!
//! let result = auditor.run_audit().unwrap();
//! println!("Flagged: {}", result.summary.flagged);
//!
//! ReportWriter::from_config(&config.output).write(&result).unwrap();
//! ```

pub mod auditor;
pub mod classifier;
pub mod credentials;
pub mod detector;
pub mod probe;
pub mod remediation;
pub mod report;
pub mod runner;
pub mod source;

#[cfg(test)]
mod testing;

pub use auditor::{AccountAuditor, AuditResult, AuditSummary};
pub use classifier::{Classification, Classifier};
pub use credentials::{
    select_resolver, CredentialStatusResolver, CredentialStore, QueryResolver, Resolution,
    StatusQuery, StoreResolver,
};
pub use detector::MisconfigurationDetector;
pub use probe::{AccountProbe, SystemProbe};
pub use remediation::{
    parse_answer, ActionOutcome, Answer, Prompter, RemediationDecision, RemediationWorkflow,
};
pub use report::ReportWriter;
pub use runner::{privileged_runner, CommandOutput, CommandRunner, Escalated, SystemRunner};
pub use source::{AccountDirectory, AccountSource, GetentSource, PasswdFileSource};
