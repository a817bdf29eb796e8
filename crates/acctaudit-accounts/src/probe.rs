//! Live account lookups used during remediation

use crate::runner::{exit_status_text, CommandRunner};
use acctaudit_core::{Error, Result};
use std::sync::Arc;

/// Queries the live system (not the audit snapshot) about an account
pub trait AccountProbe {
    /// `Ok(false)` means the account is gone; `Err` means the lookup itself failed
    fn exists(&self, name: &str) -> Result<bool>;

    /// Names of all groups the account belongs to
    fn groups(&self, name: &str) -> Result<Vec<String>>;
}

/// Probe backed by `id(1)`
pub struct SystemProbe {
    runner: Arc<dyn CommandRunner>,
}

impl SystemProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

impl AccountProbe for SystemProbe {
    fn exists(&self, name: &str) -> Result<bool> {
        let args = ["-u".to_string(), "--".to_string(), name.to_string()];
        Ok(self.runner.output("id", &args)?.success())
    }

    fn groups(&self, name: &str) -> Result<Vec<String>> {
        let args = ["-nG".to_string(), "--".to_string(), name.to_string()];
        let output = self.runner.output("id", &args)?;

        if !output.success() {
            return Err(Error::AccountVanished {
                account: format!("{} ({})", name, exit_status_text(output.code)),
            });
        }

        Ok(output
            .stdout
            .split_whitespace()
            .map(|g| g.to_string())
            .collect())
    }
}
