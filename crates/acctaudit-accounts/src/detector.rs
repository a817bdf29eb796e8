//! Misconfiguration rules for system accounts

use crate::credentials::{CredentialStatusResolver, Resolution};
use acctaudit_common::config::DetectionConfig;
use acctaudit_core::{AccountRecord, FlaggedAccount, Issue};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::debug;

/// Outcome of scanning a set of system accounts
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Accounts with at least one issue, sorted by name
    pub flagged: Vec<FlaggedAccount>,
    /// Credential status of every scanned account, keyed by name
    pub credentials: BTreeMap<String, Resolution>,
}

/// Evaluates the login-shell, home-directory and credential rules
#[derive(Debug, Clone)]
pub struct MisconfigurationDetector {
    login_shells: HashSet<String>,
    no_home_sentinels: Vec<String>,
}

impl MisconfigurationDetector {
    pub fn new<S, T>(login_shells: S, no_home_sentinels: T) -> Self
    where
        S: IntoIterator,
        S::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            login_shells: login_shells.into_iter().map(Into::into).collect(),
            no_home_sentinels: no_home_sentinels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &DetectionConfig) -> Self {
        Self::new(
            config.login_shells.iter().cloned(),
            config.no_home_sentinels.iter().cloned(),
        )
    }

    /// Shell basename is an interactive shell; an empty field means /bin/sh
    pub fn has_login_shell(&self, shell: &str) -> bool {
        let shell = shell.trim();
        if shell.is_empty() {
            return self.login_shells.contains("sh");
        }

        Path::new(shell)
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| self.login_shells.contains(n))
            .unwrap_or(false)
    }

    /// Home is empty, a sentinel, or not a directory on disk right now
    pub fn home_invalid(&self, home: &str) -> bool {
        home.trim().is_empty()
            || self.no_home_sentinels.iter().any(|s| s == home)
            || !Path::new(home).is_dir()
    }

    /// Run all three rules against one account, in declaration order
    pub fn evaluate(
        &self,
        account: &AccountRecord,
        resolver: &dyn CredentialStatusResolver,
    ) -> Vec<Issue> {
        self.inspect(account, resolver.resolve(&account.name))
    }

    /// Apply the rules given an already resolved credential status
    pub fn inspect(&self, account: &AccountRecord, resolution: Resolution) -> Vec<Issue> {
        let mut issues = Vec::new();

        if self.has_login_shell(&account.shell) {
            issues.push(Issue::login_shell(&account.shell));
        }

        if self.home_invalid(&account.home) {
            issues.push(Issue::home_missing(&account.home));
        }

        debug!(
            "{}: credential {} (from {:?})",
            account.name, resolution.status, resolution.origin
        );
        if resolution.status.is_usable() {
            issues.push(Issue::credential_usable(resolution.status));
        }

        issues
    }

    /// Evaluate every account, keeping each credential resolution
    pub fn scan<'a, I>(&self, accounts: I, resolver: &dyn CredentialStatusResolver) -> Detection
    where
        I: IntoIterator<Item = &'a AccountRecord>,
    {
        let mut detection = Detection::default();

        for account in accounts {
            let resolution = resolver.resolve(&account.name);
            detection
                .credentials
                .insert(account.name.clone(), resolution);

            let issues = self.inspect(account, resolution);
            if !issues.is_empty() {
                detection.flagged.push(FlaggedAccount {
                    account: account.clone(),
                    issues,
                });
            }
        }

        detection
            .flagged
            .sort_by(|a, b| a.account.name.cmp(&b.account.name));
        detection
    }
}

impl Default for MisconfigurationDetector {
    fn default() -> Self {
        Self::from_config(&DetectionConfig::default())
    }
}
