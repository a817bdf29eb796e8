//! AcctAudit - interactive local account auditor
//!
//! This is the entry point for the `acctaudit` binary. One run:
//! - Reads and classifies the account directory
//! - Flags misconfigured system accounts and writes the report artifacts
//! - Walks the operator through password rotation and locking of human accounts

use acctaudit_accounts::{
    privileged_runner, AccountAuditor, AuditResult, Prompter, RemediationWorkflow,
    ReportWriter, SystemProbe, SystemRunner,
};
use acctaudit_common::logging::LogConfig;
use acctaudit_common::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::sync::Arc;
use tracing::{debug, error, info};

/// AcctAudit Local Account Auditor
#[derive(Parser, Debug)]
#[command(name = "acctaudit")]
#[command(version)]
#[command(about = "Audit local accounts and remediate human accounts interactively", long_about = None)]
struct Args {
    /// Configuration file path (defaults are used when it does not exist)
    #[arg(short, long, default_value = "/etc/acctaudit/acctaudit.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (pretty, json, compact)
    #[arg(long)]
    log_format: Option<String>,

    /// Human accounts artifact path
    #[arg(long)]
    human_out: Option<String>,

    /// System accounts artifact path
    #[arg(long)]
    system_out: Option<String>,

    /// Lowest uid of a human account
    #[arg(long)]
    human_floor: Option<u32>,

    /// Highest uid still audited
    #[arg(long)]
    uid_ceiling: Option<u32>,

    /// Write the reports and skip the remediation dialogue
    #[arg(long)]
    report_only: bool,

    /// Output format for the audit summary (text, json)
    #[arg(long, default_value = "text")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;

    acctaudit_common::logging::init_logging_with_config(LogConfig::from_settings(&config.logging));

    info!("AcctAudit v{}", env!("CARGO_PKG_VERSION"));
    debug!("Effective configuration: {:?}", config);

    let runner = Arc::new(SystemRunner);
    let privileged = privileged_runner(&config.remediation.escalation_wrapper);

    let auditor = AccountAuditor::from_config(&config, runner.clone(), privileged.clone());
    let result = match auditor.run_audit() {
        Ok(result) => result,
        Err(e) => {
            error!(code = e.code(), "Audit aborted: {}", e);
            return Err(e.into());
        }
    };

    match args.format.as_str() {
        "json" => print_results_json(&result)?,
        _ => print_results_text(&result),
    }

    ReportWriter::from_config(&config.output)
        .write(&result)
        .context("Failed to write report artifacts")?;

    let humans = result.classification.human_names();
    if humans.is_empty() {
        info!("No human accounts found, nothing to remediate");
        return Ok(());
    }
    if args.report_only || !config.remediation.enabled {
        info!("Remediation skipped for {} human accounts", humans.len());
        return Ok(());
    }

    let workflow = RemediationWorkflow::from_config(
        &config.remediation,
        privileged,
        Box::new(SystemProbe::new(runner)),
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut prompter = Prompter::new(stdin.lock(), stdout.lock());
    let decisions = workflow
        .run(&humans, &mut prompter)
        .context("Operator dialogue failed")?;

    let rotated = decisions.iter().filter(|d| d.password_rotated()).count();
    let locked = decisions.iter().filter(|d| d.account_locked()).count();
    prompter.say(&format!(
        "\nRemediation finished: {} passwords rotated, {} accounts locked.",
        rotated, locked
    ))?;

    Ok(())
}

/// Config file (when present), then environment, then command line
fn load_config(args: &Args) -> Result<Config> {
    let mut builder = Config::load(&args.config)?.into_builder();

    if let Some(ref level) = args.log_level {
        builder = builder.log_level(level.as_str());
    }
    if let Some(ref format) = args.log_format {
        builder = builder.log_format(format.as_str());
    }
    if let Some(ref path) = args.human_out {
        builder = builder.human_out(path.as_str());
    }
    if let Some(ref path) = args.system_out {
        builder = builder.system_out(path.as_str());
    }
    if let Some(floor) = args.human_floor {
        builder = builder.human_floor(floor);
    }
    if let Some(ceiling) = args.uid_ceiling {
        builder = builder.uid_ceiling(ceiling);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

/// Print results as JSON
fn print_results_json(result: &AuditResult) -> Result<()> {
    let output = serde_json::json!({
        "summary": result.summary,
        "warnings": result.warnings,
        "flagged": result.flagged,
        "credentials": result.credentials,
        "human_accounts": result.classification.human_names(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Print results as text
fn print_results_text(result: &AuditResult) {
    let summary = &result.summary;

    println!("\n=== Account Audit Results ===\n");
    println!("Source:     {}", summary.source);
    println!("Credential: {}", summary.resolver);

    for warning in &result.warnings {
        println!("WARNING:    {}", warning);
    }

    if !result.flagged.is_empty() {
        println!("\nMisconfigured system accounts:");
        for flagged in &result.flagged {
            println!(
                "  {:<20} uid {:<6} {}",
                flagged.account.name,
                flagged.account.uid,
                flagged.summary()
            );
        }
    }

    println!("\nSummary:");
    println!("  Read:       {}", summary.total_read);
    println!("  Human:      {}", summary.human);
    println!("  System:     {}", summary.system);
    println!("  Excluded:   {}", summary.excluded);
    if summary.duplicates > 0 {
        println!("  Duplicates: {}", summary.duplicates);
    }
    println!("  Flagged:    {}", summary.flagged);
    for (kind, count) in &summary.by_issue {
        println!("    {:<24} {}", kind.as_str(), count);
    }
    println!("  Credential status:");
    for (status, count) in &summary.by_status {
        println!("    {:<24} {}", status.as_str(), count);
    }
    if summary.credential_entries_skipped > 0 {
        println!("  Skipped credential entries: {}", summary.credential_entries_skipped);
    }
    println!();
}
