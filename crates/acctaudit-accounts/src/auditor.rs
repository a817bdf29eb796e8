//! Account auditor - orchestrates one audit pass

use crate::classifier::{Classification, Classifier};
use crate::credentials::{select_resolver, CredentialStore, Resolution, StatusQuery};
use crate::detector::MisconfigurationDetector;
use crate::runner::CommandRunner;
use crate::source::AccountDirectory;
use acctaudit_common::Config;
use acctaudit_core::{CredentialStatus, FlaggedAccount, IssueKind, Result, StatusOrigin};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Reads, classifies and inspects the local account database
pub struct AccountAuditor {
    directory: AccountDirectory,
    classifier: Classifier,
    detector: MisconfigurationDetector,
    /// Shadow-format credential store
    shadow_path: PathBuf,
    /// Runs the per-account status query
    query_runner: Arc<dyn CommandRunner>,
    query_program: String,
}

/// Result of a full audit run
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub classification: Classification,
    /// System accounts with at least one issue, sorted by name
    pub flagged: Vec<FlaggedAccount>,
    /// Credential status of every system account
    pub credentials: BTreeMap<String, Resolution>,
    /// Recoverable problems the operator should see
    pub warnings: Vec<String>,
    pub summary: AuditSummary,
}

/// Summary of audit results
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditSummary {
    /// Backend the accounts were read from
    pub source: String,
    /// Credential resolution strategy in use
    pub resolver: String,
    pub total_read: usize,
    pub human: usize,
    pub system: usize,
    pub excluded: usize,
    pub duplicates: usize,
    pub flagged: usize,
    /// Flagged accounts per issue kind
    pub by_issue: BTreeMap<IssueKind, usize>,
    /// System accounts per credential status
    pub by_status: BTreeMap<CredentialStatus, usize>,
    /// System accounts whose credential status no source answered
    pub unanswered: Vec<String>,
    pub credential_store_available: bool,
    /// Malformed credential store lines that were skipped
    pub credential_entries_skipped: usize,
}

impl AccountAuditor {
    pub fn new(
        directory: AccountDirectory,
        classifier: Classifier,
        detector: MisconfigurationDetector,
        shadow_path: impl Into<PathBuf>,
        query_runner: Arc<dyn CommandRunner>,
        query_program: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            classifier,
            detector,
            shadow_path: shadow_path.into(),
            query_runner,
            query_program: query_program.into(),
        }
    }

    /// Wire the auditor from configuration
    ///
    /// `runner` executes unprivileged lookups; `privileged` runs the status
    /// query, which needs root for accounts other than the caller's own.
    pub fn from_config(
        config: &Config,
        runner: Arc<dyn CommandRunner>,
        privileged: Arc<dyn CommandRunner>,
    ) -> Self {
        Self::new(
            AccountDirectory::from_config(&config.sources, runner),
            Classifier::from_config(&config.classification),
            MisconfigurationDetector::from_config(&config.detection),
            &config.sources.shadow_file,
            privileged,
            config.sources.passwd_command.clone(),
        )
    }

    /// Run one pass; only an unreadable account directory is an error
    pub fn run_audit(&self) -> Result<AuditResult> {
        let (source, records) = self.directory.open()?;
        let classification = self.classifier.classify(records);
        info!(
            "Classified {} accounts: {} human, {} system, {} excluded",
            classification.total_read,
            classification.human.len(),
            classification.system.len(),
            classification.excluded.len()
        );

        let mut warnings = Vec::new();
        let store = CredentialStore::load(&self.shadow_path);
        let credential_store_available = store.is_available();
        let credential_entries_skipped = store.skipped();
        if let Some(err) = store.unavailable_error() {
            warn!(code = err.code(), "{}; falling back to per-account status query", err);
            warnings.push(err.to_string());
        }
        if credential_entries_skipped > 0 {
            warnings.push(format!(
                "{} malformed credential entries skipped in {}",
                credential_entries_skipped,
                self.shadow_path.display()
            ));
        }

        let resolver = select_resolver(
            store,
            StatusQuery::new(self.query_runner.clone(), self.query_program.clone()),
        );
        debug!("Credential status strategy: {}", resolver.strategy());

        let detection = self
            .detector
            .scan(classification.system_accounts(), resolver.as_ref());
        let flagged = detection.flagged;
        let credentials = detection.credentials;

        let mut by_status = BTreeMap::new();
        let mut unanswered = Vec::new();
        for (name, resolution) in &credentials {
            *by_status.entry(resolution.status).or_insert(0) += 1;
            if resolution.origin == StatusOrigin::Unanswered {
                unanswered.push(name.clone());
            }
        }
        if !unanswered.is_empty() {
            warn!(
                "Credential status unknown for {} system accounts: {}",
                unanswered.len(),
                unanswered.join(", ")
            );
            for name in &unanswered {
                warnings.push(format!("credential status of {} unknown: no source answered", name));
            }
        }

        let mut by_issue = BTreeMap::new();
        for account in &flagged {
            for issue in &account.issues {
                *by_issue.entry(issue.kind).or_insert(0) += 1;
            }
        }

        let summary = AuditSummary {
            source,
            resolver: resolver.strategy().to_string(),
            total_read: classification.total_read,
            human: classification.human.len(),
            system: classification.system.len(),
            excluded: classification.excluded.len(),
            duplicates: classification.duplicates,
            flagged: flagged.len(),
            by_issue,
            by_status,
            unanswered,
            credential_store_available,
            credential_entries_skipped,
        };

        info!(
            "Audit complete: {} of {} system accounts flagged",
            summary.flagged, summary.system
        );

        Ok(AuditResult {
            classification,
            flagged,
            credentials,
            warnings,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{AccountSource, PasswdFileSource};
    use crate::testing::ScriptedRunner;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn auditor(passwd: &NamedTempFile, shadow: &str, runner: ScriptedRunner) -> AccountAuditor {
        let backends: Vec<Box<dyn AccountSource>> =
            vec![Box::new(PasswdFileSource::new(passwd.path()))];
        AccountAuditor::new(
            AccountDirectory::new(backends),
            Classifier::default(),
            MisconfigurationDetector::default(),
            shadow,
            Arc::new(runner),
            "passwd",
        )
    }

    fn passwd_fixture(home: &str) -> NamedTempFile {
        fixture(&format!(
            "root:x:0:0:root:{home}:/bin/bash\n\
daemon:x:1:1:daemon:{home}:/usr/sbin/nologin\n\
games:x:5:60:games:/nonexistent:/usr/sbin/nologin\n\
alice:x:1000:1000:Alice:/home/alice:/bin/bash\n\
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin\n"
        ))
    }

    #[test]
    fn test_audit_with_readable_store() {
        let home = tempfile::tempdir().unwrap();
        let passwd = passwd_fixture(home.path().to_str().unwrap());
        let shadow = fixture("root:$6$x$y:19000::::::\ndaemon:*:19000::::::\ngames:*:19000::::::\n");

        let result = auditor(&passwd, shadow.path().to_str().unwrap(), ScriptedRunner::new())
            .run_audit()
            .unwrap();

        assert!(result.warnings.is_empty());
        assert!(result.summary.credential_store_available);
        assert_eq!(result.summary.total_read, 5);
        assert_eq!(result.summary.human, 1);
        assert_eq!(result.summary.system, 3);
        assert_eq!(result.summary.excluded, 1);

        let names: Vec<&str> = result.flagged.iter().map(|f| f.account.name.as_str()).collect();
        assert_eq!(names, vec!["games", "root"]);
        assert!(result.flagged[1].has(IssueKind::LoginShellPresent));
        assert!(result.flagged[1].has(IssueKind::CredentialUsable));
        assert_eq!(result.summary.by_issue[&IssueKind::HomeMissingOrInvalid], 1);
        assert_eq!(result.summary.by_issue[&IssueKind::CredentialUsable], 1);
        assert_eq!(result.summary.by_status[&CredentialStatus::Locked], 2);
        assert_eq!(result.summary.by_status[&CredentialStatus::SetAndUsable], 1);
        assert!(result.summary.unanswered.is_empty());
        assert_eq!(result.credentials["daemon"].origin, StatusOrigin::Store);
    }

    #[test]
    fn test_unreadable_store_falls_back_to_query() {
        let home = tempfile::tempdir().unwrap();
        let passwd = passwd_fixture(home.path().to_str().unwrap());
        let runner = ScriptedRunner::new()
            .respond("passwd -S -- root", 0, "root L 01/01/2024 0 99999 7 -1\n")
            .respond("passwd -S -- daemon", 0, "daemon P 01/01/2024 0 99999 7 -1\n");

        let result = auditor(&passwd, "/nonexistent/shadow", runner)
            .run_audit()
            .unwrap();

        assert!(!result.summary.credential_store_available);
        assert_eq!(result.summary.resolver, "status query only");
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].contains("/nonexistent/shadow"));
        assert!(result.warnings[1].contains("games"));
        assert_eq!(result.summary.unanswered, vec!["games"]);
        assert_eq!(result.credentials["games"].status, CredentialStatus::Unknown);
        assert_eq!(result.credentials["root"].origin, StatusOrigin::Query);

        let daemon = result.flagged.iter().find(|f| f.account.name == "daemon").unwrap();
        assert!(daemon.has(IssueKind::CredentialUsable));
        let root = result.flagged.iter().find(|f| f.account.name == "root").unwrap();
        assert!(!root.has(IssueKind::CredentialUsable));
        // games: query unanswered, still flagged for its home
        let games = result.flagged.iter().find(|f| f.account.name == "games").unwrap();
        assert_eq!(games.issues.len(), 1);
    }

    #[test]
    fn test_from_config_wiring() {
        let home = tempfile::tempdir().unwrap();
        let passwd = passwd_fixture(home.path().to_str().unwrap());
        let shadow = fixture("root:!:19000::::::\n");
        let config = Config::builder()
            .use_getent(false)
            .passwd_file(passwd.path().to_str().unwrap())
            .shadow_file(shadow.path().to_str().unwrap())
            .build();

        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("passwd -S -- daemon", 0, "daemon L 01/01/2024 0 99999 7 -1\n")
                .respond("passwd -S -- games", 0, "games NP 01/01/2024 0 99999 7 -1\n"),
        );
        let result = AccountAuditor::from_config(&config, runner.clone(), runner.clone())
            .run_audit()
            .unwrap();

        assert_eq!(result.summary.source, passwd.path().display().to_string());
        assert_eq!(result.summary.resolver, "credential store with status query fallback");
        assert_eq!(result.credentials["root"].origin, StatusOrigin::Store);
        assert_eq!(result.credentials["games"].status, CredentialStatus::NoPassword);
        assert_eq!(runner.calls(), vec!["passwd -S -- daemon", "passwd -S -- games"]);
    }

    #[test]
    fn test_source_unavailable_is_fatal() {
        let backends: Vec<Box<dyn AccountSource>> =
            vec![Box::new(PasswdFileSource::new("/nonexistent/passwd"))];
        let auditor = AccountAuditor::new(
            AccountDirectory::new(backends),
            Classifier::default(),
            MisconfigurationDetector::default(),
            "/nonexistent/shadow",
            Arc::new(ScriptedRunner::new()),
            "passwd",
        );

        let err = auditor.run_audit().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code(), "SOURCE_UNAVAILABLE");
    }

    #[test]
    fn test_summary_serializes_to_json() {
        let home = tempfile::tempdir().unwrap();
        let passwd = passwd_fixture(home.path().to_str().unwrap());
        let result = auditor(&passwd, "/nonexistent/shadow", ScriptedRunner::new())
            .run_audit()
            .unwrap();

        let json = serde_json::to_value(&result.summary).unwrap();
        assert_eq!(json["human"], 1);
        assert_eq!(json["by_issue"]["home_missing_or_invalid"], 1);
        assert_eq!(json["by_status"]["unknown"], 3);
        assert_eq!(json["unanswered"][0], "daemon");
    }

    #[test]
    fn test_unanswered_account_reaches_the_report() {
        let home = tempfile::tempdir().unwrap();
        let passwd = fixture(&format!(
            "svc:x:120:120::{}:/usr/sbin/nologin\n",
            home.path().display()
        ));
        let runner = ScriptedRunner::new().respond("passwd -S -- svc", 1, "");

        let result = auditor(&passwd, "/nonexistent/shadow", runner)
            .run_audit()
            .unwrap();
        assert!(result.flagged.is_empty());
        assert_eq!(result.summary.unanswered, vec!["svc"]);

        let report = crate::report::ReportWriter::new("human.txt", "system.txt")
            .with_host("testhost")
            .render_system(&result);
        assert!(report.contains("WARNING: credential status of svc unknown"));

        let json = serde_json::to_value(&result.summary).unwrap();
        assert_eq!(json["by_status"]["unknown"], 1);
        assert_eq!(json["unanswered"][0], "svc");
    }

    #[test]
    fn test_malformed_store_lines_are_counted() {
        let home = tempfile::tempdir().unwrap();
        let passwd = passwd_fixture(home.path().to_str().unwrap());
        let shadow = fixture("root:*:1::::::\nbroken\ndaemon:*:1::::::\ngames:*:1::::::\n");

        let result = auditor(&passwd, shadow.path().to_str().unwrap(), ScriptedRunner::new())
            .run_audit()
            .unwrap();

        assert_eq!(result.summary.credential_entries_skipped, 1);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("1 malformed credential entries"));
    }
}
