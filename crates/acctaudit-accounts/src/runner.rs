//! External command execution, optionally behind a privilege escalation wrapper

use std::io;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::debug;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Describe an exit code for operator-facing messages
pub fn exit_status_text(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("exit code {}", c),
        None => String::from("terminated by signal"),
    }
}

/// Capability to run external programs
pub trait CommandRunner: Send + Sync {
    /// Run to completion with stdout/stderr captured
    fn output(&self, program: &str, args: &[String]) -> io::Result<CommandOutput>;

    /// Run attached to the terminal (the program may prompt); returns the exit code
    fn interactive(&self, program: &str, args: &[String]) -> io::Result<Option<i32>>;

    /// Command line as it will actually be executed
    fn command_line(&self, program: &str, args: &[String]) -> String {
        std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs programs directly as the current user
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn output(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        debug!("Running: {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn interactive(&self, program: &str, args: &[String]) -> io::Result<Option<i32>> {
        debug!("Running interactively: {} {}", program, args.join(" "));

        let status = Command::new(program).args(args).status()?;
        Ok(status.code())
    }
}

/// Prefixes every command with an escalation wrapper such as `sudo`
pub struct Escalated {
    inner: Arc<dyn CommandRunner>,
    wrapper: String,
}

impl Escalated {
    pub fn new(inner: Arc<dyn CommandRunner>, wrapper: impl Into<String>) -> Self {
        Self {
            inner,
            wrapper: wrapper.into(),
        }
    }

    fn wrapped_args(&self, program: &str, args: &[String]) -> Vec<String> {
        std::iter::once(program.to_string())
            .chain(args.iter().cloned())
            .collect()
    }
}

impl CommandRunner for Escalated {
    fn output(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.inner
            .output(&self.wrapper, &self.wrapped_args(program, args))
    }

    fn interactive(&self, program: &str, args: &[String]) -> io::Result<Option<i32>> {
        self.inner
            .interactive(&self.wrapper, &self.wrapped_args(program, args))
    }

    fn command_line(&self, program: &str, args: &[String]) -> String {
        self.inner
            .command_line(&self.wrapper, &self.wrapped_args(program, args))
    }
}

/// Whether the current process already runs with root privileges
#[cfg(unix)]
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}

/// Wrap `base` with `wrapper` unless the process is already privileged
pub fn with_escalation(
    base: Arc<dyn CommandRunner>,
    wrapper: &str,
    already_privileged: bool,
) -> Arc<dyn CommandRunner> {
    if already_privileged || wrapper.trim().is_empty() {
        base
    } else {
        Arc::new(Escalated::new(base, wrapper.trim()))
    }
}

/// Runner for privileged commands, decided once from the effective uid
pub fn privileged_runner(wrapper: &str) -> Arc<dyn CommandRunner> {
    let privileged = is_privileged();
    debug!(
        "Effective uid is {}root; escalation wrapper {:?}",
        if privileged { "" } else { "not " },
        wrapper
    );
    with_escalation(Arc::new(SystemRunner), wrapper, privileged)
}
