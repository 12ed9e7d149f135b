//! External command execution.
//!
//! Every interaction with the version-control binary goes through the
//! [`CommandRunner`] trait so the git layer can be exercised against a mock
//! runner in tests.
use async_trait::async_trait;
use log::*;
use std::path::PathBuf;
use tokio::process::Command;

use crate::error::Result;

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code (-1 when terminated by a signal).
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Abstraction for running an external program to completion.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// A nonzero exit code is reported through [`CommandOutput::code`], not
    /// as an error. Only failures to spawn the process are errors.
    async fn run(&self, program: &str, args: &[String])
    -> Result<CommandOutput>;
}

/// Runs commands as child processes inside a fixed working directory.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    cwd: PathBuf,
}

impl ProcessRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
    ) -> Result<CommandOutput> {
        debug!("running: {program} {}", args.join(" "));

        let output = Command::new(program)
            .args(args)
            .current_dir(&self.cwd)
            .output()
            .await?;

        let result = CommandOutput {
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        debug!("exit code {} for: {program}", result.code);

        Ok(result)
    }
}
