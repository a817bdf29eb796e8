//! Credential status: bulk shadow store with a per-account `passwd -S` fallback
//!
//! The shadow file is fast and authoritative but usually readable only by
//! root; `passwd -S` answers one account at a time. Which strategy is used is
//! decided once, when the store is loaded.

use crate::runner::{exit_status_text, CommandRunner};
use acctaudit_core::{CredentialStatus, Error, StatusOrigin};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Contents of the credential store, or why it could not be read
#[derive(Debug, Clone)]
pub enum CredentialStore {
    Available {
        /// Account name to raw credential field
        entries: HashMap<String, String>,
        /// Lines dropped because they had no name or credential field
        skipped: usize,
    },
    Unavailable { path: PathBuf, reason: String },
}

impl CredentialStore {
    /// Read the store; an unreadable file is reported as `Unavailable`, not an error
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read(path) {
            Ok(bytes) => {
                let (entries, skipped) = Self::parse_entries(&String::from_utf8_lossy(&bytes));
                debug!("Loaded {} credential entries from {}", entries.len(), path.display());
                if skipped > 0 {
                    warn!("Skipped {} malformed credential entries in {}", skipped, path.display());
                }
                CredentialStore::Available { entries, skipped }
            }
            Err(e) => CredentialStore::Unavailable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        }
    }

    /// Parse shadow-format content, skipping lines without a name and credential field
    pub fn parse(content: &str) -> HashMap<String, String> {
        Self::parse_entries(content).0
    }

    /// Like [`CredentialStore::parse`], also returning the number of skipped lines
    pub fn parse_entries(content: &str) -> (HashMap<String, String>, usize) {
        let mut entries = HashMap::new();
        let mut skipped = 0;

        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.splitn(3, ':');
            let name = fields.next().unwrap_or_default();
            let credential = match fields.next() {
                Some(field) if !name.is_empty() => field,
                _ => {
                    warn!("Skipping malformed credential entry at line {}", idx + 1);
                    skipped += 1;
                    continue;
                }
            };

            entries
                .entry(name.to_string())
                .or_insert_with(|| credential.to_string());
        }

        (entries, skipped)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, CredentialStore::Available { .. })
    }

    /// Malformed lines dropped while parsing
    pub fn skipped(&self) -> usize {
        match self {
            CredentialStore::Available { skipped, .. } => *skipped,
            CredentialStore::Unavailable { .. } => 0,
        }
    }

    /// Raw credential field for `name`, if the store has one
    pub fn field(&self, name: &str) -> Option<&str> {
        match self {
            CredentialStore::Available { entries, .. } => entries.get(name).map(String::as_str),
            CredentialStore::Unavailable { .. } => None,
        }
    }

    /// The recoverable error describing an unreadable store
    pub fn unavailable_error(&self) -> Option<Error> {
        match self {
            CredentialStore::Available { .. } => None,
            CredentialStore::Unavailable { path, reason } => {
                Some(Error::CredentialStoreUnreadable {
                    path: path.display().to_string(),
                    reason: reason.clone(),
                })
            }
        }
    }
}

/// A resolved status and where it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub status: CredentialStatus,
    pub origin: StatusOrigin,
}

impl Resolution {
    pub fn unanswered() -> Self {
        Self {
            status: CredentialStatus::Unknown,
            origin: StatusOrigin::Unanswered,
        }
    }
}

/// Resolves the credential status of a single account
pub trait CredentialStatusResolver {
    /// Strategy name for logs
    fn strategy(&self) -> &'static str;

    fn resolve(&self, name: &str) -> Resolution;
}

/// Per-account status query (`passwd -S <name>`)
pub struct StatusQuery {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl StatusQuery {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    pub fn query(&self, name: &str) -> Resolution {
        let args = ["-S".to_string(), "--".to_string(), name.to_string()];
        let output = match self.runner.output(&self.program, &args) {
            Ok(output) => output,
            Err(e) => {
                warn!("Status query for {} failed: {}", name, e);
                return Resolution::unanswered();
            }
        };

        if !output.success() {
            warn!(
                "Status query for {} failed with {}: {}",
                name,
                exit_status_text(output.code),
                output.stderr.trim()
            );
            return Resolution::unanswered();
        }

        let status = Self::parse_status(&output.stdout);
        if status == CredentialStatus::Unknown {
            warn!("Unparsable status output for {}: {:?}", name, output.stdout.trim());
            return Resolution::unanswered();
        }

        Resolution {
            status,
            origin: StatusOrigin::Query,
        }
    }

    /// Status code is the second whitespace-separated field: `name P 01/01/2024 ...`
    pub fn parse_status(stdout: &str) -> CredentialStatus {
        stdout
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .map(CredentialStatus::from_status_code)
            .unwrap_or(CredentialStatus::Unknown)
    }
}

/// Store is readable: use it, query only accounts missing from it
pub struct StoreResolver {
    entries: HashMap<String, String>,
    fallback: StatusQuery,
}

impl StoreResolver {
    pub fn new(entries: HashMap<String, String>, fallback: StatusQuery) -> Self {
        Self { entries, fallback }
    }
}

impl CredentialStatusResolver for StoreResolver {
    fn strategy(&self) -> &'static str {
        "credential store with status query fallback"
    }

    fn resolve(&self, name: &str) -> Resolution {
        match self.entries.get(name) {
            Some(field) => Resolution {
                status: CredentialStatus::from_shadow_field(field),
                origin: StatusOrigin::Store,
            },
            None => {
                debug!("{} not in credential store, querying", name);
                self.fallback.query(name)
            }
        }
    }
}

/// Store is unreadable: every account goes through the query
pub struct QueryResolver {
    query: StatusQuery,
}

impl QueryResolver {
    pub fn new(query: StatusQuery) -> Self {
        Self { query }
    }
}

impl CredentialStatusResolver for QueryResolver {
    fn strategy(&self) -> &'static str {
        "status query only"
    }

    fn resolve(&self, name: &str) -> Resolution {
        self.query.query(name)
    }
}

/// Pick the resolver strategy for this run
pub fn select_resolver(
    store: CredentialStore,
    query: StatusQuery,
) -> Box<dyn CredentialStatusResolver> {
    match store {
        CredentialStore::Available { entries, .. } => Box::new(StoreResolver::new(entries, query)),
        CredentialStore::Unavailable { .. } => Box::new(QueryResolver::new(query)),
    }
}
