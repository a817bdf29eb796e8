//! Account directory backends
//!
//! Two backends produce identical records: the name service switch via
//! `getent passwd` (sees local files plus any configured network directory)
//! and direct parsing of the local passwd file. [`AccountDirectory`] tries them
//! in preference order.

use crate::runner::{exit_status_text, CommandRunner};
use acctaudit_common::config::SourcesConfig;
use acctaudit_core::{AccountRecord, Error, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lazy sequence of account records
pub type AccountIter = Box<dyn Iterator<Item = AccountRecord>>;

/// A backend able to enumerate the account directory
pub trait AccountSource {
    /// Short name for logs and reports
    fn describe(&self) -> String;

    /// Open the backend; fails only if it cannot be read at all
    fn accounts(&self) -> Result<AccountIter>;
}

/// Parse one passwd-format line
///
/// Returns `Ok(None)` for blank lines and comments.
pub fn parse_passwd_line(line: &str, line_no: usize) -> Result<Option<AccountRecord>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| Error::MalformedDirectoryEntry {
        line: line_no,
        reason,
    };

    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() != 7 {
        return Err(malformed(format!("expected 7 fields, found {}", parts.len())));
    }
    if parts[0].is_empty() {
        return Err(malformed("empty account name".into()));
    }

    let uid = parts[2]
        .parse::<u32>()
        .map_err(|_| malformed(format!("invalid uid {:?}", parts[2])))?;
    let gid = parts[3]
        .parse::<u32>()
        .map_err(|_| malformed(format!("invalid gid {:?}", parts[3])))?;

    Ok(Some(AccountRecord::new(parts[0], uid, gid, parts[5], parts[6])))
}

/// Turn raw lines into records, skipping malformed entries with a warning
fn records_from_lines<I>(lines: I, origin: String) -> AccountIter
where
    I: Iterator<Item = io::Result<String>> + 'static,
{
    let read_origin = origin.clone();
    let records = lines
        .map_while(move |line| match line {
            Ok(line) => Some(line),
            Err(e) => {
                warn!("Stopped reading {}: {}", read_origin, e);
                None
            }
        })
        .enumerate()
        .filter_map(move |(idx, line)| match parse_passwd_line(&line, idx + 1) {
            Ok(record) => record,
            Err(e) => {
                warn!(code = e.code(), "Skipping entry from {}: {}", origin, e);
                None
            }
        });

    Box::new(records)
}

/// Name-service-aware backend using `getent passwd`
pub struct GetentSource {
    runner: Arc<dyn CommandRunner>,
    program: String,
}

impl GetentSource {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }
}

impl AccountSource for GetentSource {
    fn describe(&self) -> String {
        format!("{} passwd", self.program)
    }

    fn accounts(&self) -> Result<AccountIter> {
        let output = self
            .runner
            .output(&self.program, &["passwd".to_string()])
            .map_err(|e| Error::SourceUnavailable {
                reason: format!("{}: {}", self.describe(), e),
            })?;

        if !output.success() {
            return Err(Error::SourceUnavailable {
                reason: format!("{}: {}", self.describe(), exit_status_text(output.code)),
            });
        }

        let lines: Vec<io::Result<String>> =
            output.stdout.lines().map(|l| Ok(l.to_string())).collect();
        Ok(records_from_lines(lines.into_iter(), self.describe()))
    }
}

/// Flat-file backend reading a passwd file
pub struct PasswdFileSource {
    path: PathBuf,
}

impl PasswdFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AccountSource for PasswdFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn accounts(&self) -> Result<AccountIter> {
        let file = File::open(&self.path).map_err(|e| Error::SourceUnavailable {
            reason: format!("{}: {}", self.describe(), e),
        })?;

        // Legacy-encoded GECOS fields must not end the read
        let lines = BufReader::new(file)
            .split(b'\n')
            .map(|line| line.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()));

        Ok(records_from_lines(lines, self.describe()))
    }
}

/// Ordered list of backends; the first one that opens wins
pub struct AccountDirectory {
    backends: Vec<Box<dyn AccountSource>>,
}

impl AccountDirectory {
    pub fn new(backends: Vec<Box<dyn AccountSource>>) -> Self {
        Self { backends }
    }

    /// getent first (when enabled), then the passwd file
    pub fn from_config(config: &SourcesConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let mut backends: Vec<Box<dyn AccountSource>> = Vec::new();
        if config.use_getent {
            backends.push(Box::new(GetentSource::new(
                runner,
                config.getent_command.clone(),
            )));
        }
        backends.push(Box::new(PasswdFileSource::new(&config.passwd_file)));
        Self::new(backends)
    }

    /// Open the first available backend, returning its name alongside the records
    pub fn open(&self) -> Result<(String, AccountIter)> {
        let mut failures = Vec::new();

        for backend in &self.backends {
            match backend.accounts() {
                Ok(records) => {
                    info!("Reading accounts from {}", backend.describe());
                    return Ok((backend.describe(), records));
                }
                Err(e) => {
                    debug!("Account backend {} unavailable: {}", backend.describe(), e);
                    failures.push(match e {
                        Error::SourceUnavailable { reason } => reason,
                        other => other.to_string(),
                    });
                }
            }
        }

        Err(Error::SourceUnavailable {
            reason: if failures.is_empty() {
                String::from("no account backends configured")
            } else {
                failures.join("; ")
            },
        })
    }
}

impl AccountSource for AccountDirectory {
    fn describe(&self) -> String {
        self.backends
            .iter()
            .map(|b| b.describe())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    fn accounts(&self) -> Result<AccountIter> {
        self.open().map(|(_, records)| records)
    }
}
