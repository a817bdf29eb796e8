//! Plain-text audit artifacts
//!
//! Two files per run: the sorted list of human account names, and the system
//! account inventory followed by a dated section of flagged accounts.

use crate::auditor::AuditResult;
use crate::classifier::Classification;
use acctaudit_common::config::OutputConfig;
use acctaudit_core::{AccountRecord, Result};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Writes the human and system account artifacts
pub struct ReportWriter {
    human_path: PathBuf,
    system_path: PathBuf,
    host: String,
    timestamp: DateTime<Local>,
}

/// Column widths shared by inventory and flagged lines
struct Columns {
    name: usize,
    uid: usize,
    home: usize,
}

impl Columns {
    fn fit<'a>(accounts: impl Iterator<Item = &'a AccountRecord>) -> Self {
        let mut columns = Columns {
            name: 0,
            uid: 0,
            home: 0,
        };
        for account in accounts {
            columns.name = columns.name.max(account.name.chars().count());
            columns.uid = columns.uid.max(account.uid.to_string().len());
            columns.home = columns.home.max(account.home.chars().count());
        }
        columns
    }

    fn line(&self, account: &AccountRecord) -> String {
        format!(
            "{:<nw$}  {:>uw$}  {:<hw$}  {}",
            account.name,
            account.uid,
            account.home,
            account.shell,
            nw = self.name,
            uw = self.uid,
            hw = self.home,
        )
    }
}

impl ReportWriter {
    /// Stamped with the local host name and the current time
    pub fn new(human_path: impl Into<PathBuf>, system_path: impl Into<PathBuf>) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".into());

        Self {
            human_path: human_path.into(),
            system_path: system_path.into(),
            host,
            timestamp: Local::now(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.human_accounts, &config.system_accounts)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn human_path(&self) -> &Path {
        &self.human_path
    }

    pub fn system_path(&self) -> &Path {
        &self.system_path
    }

    /// One human account name per line, sorted
    pub fn render_human(&self, classification: &Classification) -> String {
        classification
            .human
            .keys()
            .map(|name| format!("{}\n", name))
            .collect()
    }

    /// System inventory, then the dated flagged section
    pub fn render_system(&self, result: &AuditResult) -> String {
        let columns = Columns::fit(
            result
                .classification
                .system_accounts()
                .chain(result.flagged.iter().map(|f| &f.account)),
        );

        let mut out = String::new();
        for account in result.classification.system_accounts() {
            let _ = writeln!(out, "{}", columns.line(account));
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "=== Misconfigured system accounts on {} ({}) ===",
            self.host,
            self.timestamp.format(TIMESTAMP_FORMAT)
        );

        for warning in &result.warnings {
            let _ = writeln!(out, "WARNING: {}", warning);
        }

        if result.flagged.is_empty() {
            let _ = writeln!(out, "none");
        }
        for flagged in &result.flagged {
            let _ = writeln!(out, "{}  {}", columns.line(&flagged.account), flagged.summary());
        }

        out
    }

    /// Truncate and write both artifacts
    pub fn write(&self, result: &AuditResult) -> Result<()> {
        fs::write(&self.human_path, self.render_human(&result.classification))?;
        fs::write(&self.system_path, self.render_system(result))?;

        info!(
            "Reports written to {} and {}",
            self.human_path.display(),
            self.system_path.display()
        );
        Ok(())
    }
}
