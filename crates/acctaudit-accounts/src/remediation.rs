//! Interactive remediation of human accounts
//!
//! Each account goes through two independent confirmations: rotate the
//! password, then (after showing group membership) lock the account. Prompts
//! repeat until the answer is yes, no, or empty; empty input and end of input
//! both mean no.

use crate::probe::AccountProbe;
use crate::runner::{exit_status_text, CommandRunner};
use acctaudit_common::config::RemediationConfig;
use acctaudit_core::Error;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{info, warn};

/// Operator answer to a yes/no question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

/// Interpret one line of operator input; `None` means ask again
pub fn parse_answer(input: &str) -> Option<Answer> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(Answer::Yes),
        "" | "n" | "no" => Some(Answer::No),
        _ => None,
    }
}

/// Line-oriented operator dialogue
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask until a valid answer arrives; end of input counts as no
    pub fn ask(&mut self, question: &str) -> io::Result<Answer> {
        loop {
            write!(self.output, "{} [y/N]: ", question)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(Answer::No);
            }

            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(self.output, "Please answer 'y' or 'n'.")?,
            }
        }
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

/// What happened to one remediation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    /// Operator declined (or gave no answer)
    Skipped,
    Succeeded,
    Failed,
}

/// Per-account result of the dialogue
#[derive(Debug, Clone, Serialize)]
pub struct RemediationDecision {
    pub account: String,
    pub rotation: ActionOutcome,
    pub lock: ActionOutcome,
    /// Account no longer existed when its turn came
    pub vanished: bool,
}

impl RemediationDecision {
    fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
            rotation: ActionOutcome::Skipped,
            lock: ActionOutcome::Skipped,
            vanished: false,
        }
    }

    pub fn password_rotated(&self) -> bool {
        self.rotation == ActionOutcome::Succeeded
    }

    pub fn account_locked(&self) -> bool {
        self.lock == ActionOutcome::Succeeded
    }
}

/// Dialogue states for one account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    CheckPresent,
    AskRotate,
    Rotating,
    SkipRotate,
    ShowGroups,
    AskLock,
    Locking,
    SkipLock,
    Done,
}

/// Drives the rotate / lock dialogue over a list of human accounts
pub struct RemediationWorkflow {
    runner: Arc<dyn CommandRunner>,
    probe: Box<dyn AccountProbe>,
    rotate_command: Vec<String>,
    lock_command: Vec<String>,
}

impl RemediationWorkflow {
    /// `runner` executes the mutating commands and should already carry any escalation wrapper
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        probe: Box<dyn AccountProbe>,
        rotate_command: Vec<String>,
        lock_command: Vec<String>,
    ) -> Self {
        Self {
            runner,
            probe,
            rotate_command,
            lock_command,
        }
    }

    pub fn from_config(
        config: &RemediationConfig,
        runner: Arc<dyn CommandRunner>,
        probe: Box<dyn AccountProbe>,
    ) -> Self {
        Self::new(
            runner,
            probe,
            config.rotate_command.clone(),
            config.lock_command.clone(),
        )
    }

    /// Process every account in order; one account's failure never stops the rest
    pub fn run<R: BufRead, W: Write>(
        &self,
        accounts: &[String],
        prompter: &mut Prompter<R, W>,
    ) -> io::Result<Vec<RemediationDecision>> {
        info!("Starting remediation for {} human accounts", accounts.len());

        let mut decisions = Vec::with_capacity(accounts.len());
        for name in accounts {
            decisions.push(self.remediate(name, prompter)?);
        }

        let rotated = decisions.iter().filter(|d| d.password_rotated()).count();
        let locked = decisions.iter().filter(|d| d.account_locked()).count();
        info!(
            "Remediation complete: {} passwords rotated, {} accounts locked",
            rotated, locked
        );

        Ok(decisions)
    }

    /// Full dialogue for a single account
    pub fn remediate<R: BufRead, W: Write>(
        &self,
        name: &str,
        prompter: &mut Prompter<R, W>,
    ) -> io::Result<RemediationDecision> {
        let mut decision = RemediationDecision::new(name);
        let mut step = Step::CheckPresent;

        while step != Step::Done {
            step = match step {
                Step::CheckPresent => {
                    prompter.say(&format!("\n=== {} ===", name))?;
                    match self.probe.exists(name) {
                        Ok(true) => Step::AskRotate,
                        Err(e) => {
                            warn!(code = e.code(), "Could not verify that {} exists: {}", name, e);
                            prompter.say(&format!(
                                "Could not verify that {} exists ({}), continuing.",
                                name, e
                            ))?;
                            Step::AskRotate
                        }
                        Ok(false) => {
                            let err = Error::AccountVanished {
                                account: name.to_string(),
                            };
                            warn!(code = err.code(), "{}", err);
                            prompter.say(&format!(
                                "Account {} no longer exists on this system, skipping.",
                                name
                            ))?;
                            decision.vanished = true;
                            Step::Done
                        }
                    }
                }
                Step::AskRotate => {
                    match prompter.ask(&format!("Rotate password for {}?", name))? {
                        Answer::Yes => Step::Rotating,
                        Answer::No => Step::SkipRotate,
                    }
                }
                Step::Rotating => {
                    decision.rotation =
                        self.execute(&self.rotate_command, name, "Password rotation", prompter)?;
                    Step::ShowGroups
                }
                Step::SkipRotate => {
                    prompter.say(&format!("Password for {} left unchanged.", name))?;
                    Step::ShowGroups
                }
                Step::ShowGroups => {
                    match self.probe.groups(name) {
                        Ok(groups) => {
                            prompter.say(&format!("Groups for {}: {}", name, groups.join(" ")))?
                        }
                        Err(e) => {
                            warn!("Group lookup for {} failed: {}", name, e);
                            prompter.say(&format!("Groups for {}: unavailable ({})", name, e))?
                        }
                    }
                    Step::AskLock
                }
                Step::AskLock => match prompter.ask(&format!("Lock account {}?", name))? {
                    Answer::Yes => Step::Locking,
                    Answer::No => Step::SkipLock,
                },
                Step::Locking => {
                    decision.lock =
                        self.execute(&self.lock_command, name, "Account lock", prompter)?;
                    Step::Done
                }
                Step::SkipLock => {
                    prompter.say(&format!("Account {} left unlocked.", name))?;
                    Step::Done
                }
                Step::Done => Step::Done,
            };
        }

        Ok(decision)
    }

    /// Run a configured command with `--` and the account name appended
    fn execute<R: BufRead, W: Write>(
        &self,
        command: &[String],
        name: &str,
        action: &str,
        prompter: &mut Prompter<R, W>,
    ) -> io::Result<ActionOutcome> {
        let Some((program, rest)) = command.split_first() else {
            prompter.say(&format!("{} for {} failed: no command configured", action, name))?;
            return Ok(ActionOutcome::Failed);
        };

        let mut args = rest.to_vec();
        args.push("--".to_string());
        args.push(name.to_string());
        let command_line = self.runner.command_line(program, &args);

        let status = match self.runner.interactive(program, &args) {
            Ok(Some(0)) => None,
            Ok(code) => Some(exit_status_text(code)),
            Err(e) => Some(e.to_string()),
        };

        match status {
            None => {
                info!("{} succeeded for {}", action, name);
                prompter.say(&format!("{} for {} succeeded.", action, name))?;
                Ok(ActionOutcome::Succeeded)
            }
            Some(status) => {
                let err = Error::PrivilegedCommandFailed {
                    command: command_line,
                    status,
                };
                warn!(code = err.code(), "{}", err);
                prompter.say(&format!("{} for {} failed: {}", action, name, err))?;
                Ok(ActionOutcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;
    use acctaudit_core::Result;
    use std::collections::HashMap;
    use std::io::Cursor;

    struct FakeProbe {
        groups: HashMap<String, Vec<String>>,
    }

    impl FakeProbe {
        fn with(accounts: &[(&str, &[&str])]) -> Box<Self> {
            Box::new(Self {
                groups: accounts
                    .iter()
                    .map(|(name, groups)| {
                        (name.to_string(), groups.iter().map(|g| g.to_string()).collect())
                    })
                    .collect(),
            })
        }
    }

    impl AccountProbe for FakeProbe {
        fn exists(&self, name: &str) -> Result<bool> {
            Ok(self.groups.contains_key(name))
        }

        fn groups(&self, name: &str) -> Result<Vec<String>> {
            self.groups
                .get(name)
                .cloned()
                .ok_or_else(|| Error::AccountVanished {
                    account: name.to_string(),
                })
        }
    }

    /// Every live lookup fails as if `id` could not be started
    struct BrokenLookup;

    impl AccountProbe for BrokenLookup {
        fn exists(&self, _name: &str) -> Result<bool> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "id").into())
        }

        fn groups(&self, _name: &str) -> Result<Vec<String>> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "id").into())
        }
    }

    fn workflow(runner: Arc<ScriptedRunner>, probe: Box<FakeProbe>) -> RemediationWorkflow {
        RemediationWorkflow::new(
            runner,
            probe,
            vec!["passwd".to_string()],
            vec!["usermod".to_string(), "-L".to_string()],
        )
    }

    fn prompter(input: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn transcript(prompter: Prompter<Cursor<Vec<u8>>, Vec<u8>>) -> String {
        String::from_utf8(prompter.into_output()).unwrap()
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(Answer::Yes));
        assert_eq!(parse_answer("  YES "), Some(Answer::Yes));
        assert_eq!(parse_answer("n"), Some(Answer::No));
        assert_eq!(parse_answer("No"), Some(Answer::No));
        assert_eq!(parse_answer("\n"), Some(Answer::No));
        assert_eq!(parse_answer("maybe"), None);
        assert_eq!(parse_answer("yy"), None);
    }

    #[test]
    fn test_ask_reprompts_until_valid() {
        let mut p = prompter("what\n???\ny\n");
        assert_eq!(p.ask("Proceed?").unwrap(), Answer::Yes);

        let out = transcript(p);
        assert_eq!(out.matches("Proceed? [y/N]: ").count(), 3);
        assert_eq!(out.matches("Please answer 'y' or 'n'.").count(), 2);
    }

    #[test]
    fn test_ask_eof_is_no() {
        let mut p = prompter("");
        assert_eq!(p.ask("Proceed?").unwrap(), Answer::No);
    }

    #[test]
    fn test_skip_rotate_then_lock() {
        let runner = Arc::new(ScriptedRunner::new().respond("usermod -L -- alice", 0, ""));
        let wf = workflow(runner.clone(), FakeProbe::with(&[("alice", &["alice", "sudo"])]));
        let mut p = prompter("\ny\n");

        let decision = wf.remediate("alice", &mut p).unwrap();
        assert!(!decision.password_rotated());
        assert!(decision.account_locked());
        assert_eq!(runner.calls(), vec!["usermod -L -- alice"]);

        let out = transcript(p);
        let groups_at = out.find("Groups for alice: alice sudo").unwrap();
        let lock_at = out.find("Lock account alice?").unwrap();
        assert!(groups_at < lock_at);
        assert!(out.contains("Password for alice left unchanged."));
    }

    #[test]
    fn test_rotate_and_decline_lock() {
        let runner = Arc::new(ScriptedRunner::new().respond("passwd -- bob", 0, ""));
        let wf = workflow(runner.clone(), FakeProbe::with(&[("bob", &["bob"])]));
        let mut p = prompter("yes\nn\n");

        let decision = wf.remediate("bob", &mut p).unwrap();
        assert!(decision.password_rotated());
        assert!(!decision.account_locked());
        assert_eq!(decision.lock, ActionOutcome::Skipped);
        assert_eq!(runner.calls(), vec!["passwd -- bob"]);
        assert!(transcript(p).contains("Account bob left unlocked."));
    }

    #[test]
    fn test_command_failure_does_not_abort() {
        let runner = Arc::new(
            ScriptedRunner::new()
                .respond("passwd -- carol", 1, "")
                .respond("usermod -L -- carol", 0, ""),
        );
        let wf = workflow(runner, FakeProbe::with(&[("carol", &["carol"])]));
        let mut p = prompter("y\ny\n");

        let decision = wf.remediate("carol", &mut p).unwrap();
        assert_eq!(decision.rotation, ActionOutcome::Failed);
        assert!(decision.account_locked());

        let out = transcript(p);
        assert!(out.contains("Password rotation for carol failed"));
        assert!(out.contains("exit code 1"));
        assert!(out.contains("Groups for carol"));
    }

    #[test]
    fn test_vanished_account_is_skipped() {
        let runner = Arc::new(ScriptedRunner::new().respond("usermod -L -- dave", 0, ""));
        let wf = workflow(runner.clone(), FakeProbe::with(&[("dave", &["dave"])]));
        let mut p = prompter("n\ny\n");

        let accounts = vec!["ghost".to_string(), "dave".to_string()];
        let decisions = wf.run(&accounts, &mut p).unwrap();

        assert_eq!(decisions.len(), 2);
        assert!(decisions[0].vanished);
        assert!(!decisions[0].password_rotated());
        assert!(decisions[1].account_locked());
        assert_eq!(runner.calls(), vec!["usermod -L -- dave"]);
        assert!(transcript(p).contains("Account ghost no longer exists"));
    }

    #[test]
    fn test_failed_existence_check_still_prompts() {
        let runner = Arc::new(ScriptedRunner::new().respond("passwd -- hank", 0, ""));
        let wf = RemediationWorkflow::new(
            runner.clone(),
            Box::new(BrokenLookup),
            vec!["passwd".to_string()],
            vec!["usermod".to_string(), "-L".to_string()],
        );
        let mut p = prompter("y\nn\n");

        let decision = wf.remediate("hank", &mut p).unwrap();
        assert!(!decision.vanished);
        assert!(decision.password_rotated());
        assert_eq!(runner.calls(), vec!["passwd -- hank"]);

        let out = transcript(p);
        assert!(out.contains("Could not verify that hank exists"));
        assert!(!out.contains("no longer exists"));
        assert!(out.contains("Groups for hank: unavailable"));
    }

    #[test]
    fn test_option_like_name_follows_separator() {
        let runner = Arc::new(ScriptedRunner::new().respond("usermod -L -- -G", 0, ""));
        let wf = workflow(runner.clone(), FakeProbe::with(&[("-G", &["users"])]));
        let mut p = prompter("n\ny\n");

        let decision = wf.remediate("-G", &mut p).unwrap();
        assert!(decision.account_locked());
        assert_eq!(runner.calls(), vec!["usermod -L -- -G"]);
    }

    #[test]
    fn test_eof_mid_dialogue_declines_everything_left() {
        let runner = Arc::new(ScriptedRunner::new());
        let wf = workflow(
            runner.clone(),
            FakeProbe::with(&[("erin", &["erin"]), ("frank", &["frank"])]),
        );
        let mut p = prompter("n\n");

        let accounts = vec!["erin".to_string(), "frank".to_string()];
        let decisions = wf.run(&accounts, &mut p).unwrap();

        assert!(decisions
            .iter()
            .all(|d| !d.password_rotated() && !d.account_locked()));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_escalated_runner_prefix_in_failure_message() {
        let base = Arc::new(ScriptedRunner::new());
        let runner = crate::runner::with_escalation(base, "sudo", false);
        let wf = RemediationWorkflow::new(
            runner,
            FakeProbe::with(&[("gina", &["gina"])]),
            vec!["passwd".to_string()],
            vec!["usermod".to_string(), "-L".to_string()],
        );
        let mut p = prompter("n\ny\n");

        let decision = wf.remediate("gina", &mut p).unwrap();
        assert_eq!(decision.lock, ActionOutcome::Failed);
        assert!(transcript(p).contains("sudo usermod -L -- gina"));
    }
}
