// SPDX-License-Identifier: GPL-3.0-only

//! Subprocess execution behind a trait, so tasks can run against a
//! recording double in tests.

use std::collections::VecDeque;
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::error::{Result, SysError};

/// Environment variables never inherited by wrapped tools.
const PRUNED_ENV: &[&str] = &["MALLOC_PERTURB_"];

/// One external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stdin: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(ToString::to_string).collect(),
            stdin: None,
        }
    }

    pub fn with_args(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
        }
    }

    pub fn feeding(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn render(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Captured result of a tool invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutcome {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutcome {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

pub trait ToolRunner: Send + Sync {
    /// Run a tool to completion, capturing output. A non-zero exit status
    /// is NOT an error here; callers interpret the status against the
    /// tool's taxonomy.
    fn run(&self, command: &ToolCommand) -> Result<ToolOutcome>;
}

/// Runs tools on the live system.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutcome> {
        tracing::debug!("running: {}", command.render());

        let mut builder = Command::new(&command.program);
        builder
            .args(&command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for name in PRUNED_ENV {
            builder.env_remove(name);
        }
        if command.stdin.is_some() {
            builder.stdin(Stdio::piped());
        } else {
            builder.stdin(Stdio::null());
        }

        let mut child = builder.spawn().map_err(|source| SysError::Spawn {
            command: command.render(),
            source,
        })?;

        if let Some(input) = &command.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(input.as_bytes())?;
            }
        }

        let output = child.wait_with_output()?;
        let outcome = ToolOutcome {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if !outcome.success() {
            tracing::debug!(
                "{} exited {}: {}",
                command.program,
                outcome.status,
                outcome.stderr.trim()
            );
        }
        Ok(outcome)
    }
}

/// Records invocations and replays scripted outcomes. Used by tests across
/// the workspace.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    invocations: Mutex<Vec<ToolCommand>>,
    scripted: Mutex<VecDeque<ToolOutcome>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an outcome for the next unscripted invocation. Invocations
    /// beyond the queue succeed with empty output.
    pub fn push_outcome(&self, outcome: ToolOutcome) {
        self.scripted
            .lock()
            .expect("scripted outcomes lock")
            .push_back(outcome);
    }

    pub fn push_exit(&self, status: i32) {
        self.push_outcome(ToolOutcome {
            status,
            ..Default::default()
        });
    }

    pub fn invocations(&self) -> Vec<ToolCommand> {
        self.invocations.lock().expect("invocation lock").clone()
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.lock().expect("invocation lock").len()
    }

    /// Rendered command lines, for compact assertions.
    pub fn rendered(&self) -> Vec<String> {
        self.invocations()
            .iter()
            .map(ToolCommand::render)
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutcome> {
        self.invocations
            .lock()
            .expect("invocation lock")
            .push(command.clone());
        Ok(self
            .scripted
            .lock()
            .expect("scripted outcomes lock")
            .pop_front()
            .unwrap_or_default())
    }
}
