//! Test doubles shared by the unit tests of this crate

use crate::runner::{CommandOutput, CommandRunner};
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;

/// Command runner answering from a fixed script and recording every call
#[derive(Default)]
pub struct ScriptedRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command_line` with the given exit code and stdout
    pub fn respond(mut self, command_line: &str, code: i32, stdout: &str) -> Self {
        self.responses.insert(
            command_line.to_string(),
            CommandOutput {
                code: Some(code),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        let line = self.command_line(program, args);
        self.calls.lock().unwrap().push(line.clone());
        self.responses
            .get(&line)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, line))
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        self.answer(program, args)
    }

    fn interactive(&self, program: &str, args: &[String]) -> io::Result<Option<i32>> {
        self.answer(program, args).map(|out| out.code)
    }
}
