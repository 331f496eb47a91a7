use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use super::Stage;
use crate::error::{CaptionerError, Result};

/// Lines of captured stderr carried into a stage failure
const STDERR_TAIL_LINES: usize = 5;

/// A stage executable invocation
#[derive(Debug, Clone)]
pub struct StageCommand {
    pub program: String,
    pub args: Vec<String>,
    pub stage: Stage,
    verbose: bool,
    timeout: Option<Duration>,
}

impl StageCommand {
    /// Start from a configured command line such as `python3 scripts/burn_captions.py`.
    pub fn from_command_line(command_line: &str, stage: Stage) -> Result<Self> {
        let mut words = shell_words::split(command_line).map_err(|e| {
            CaptionerError::Config(format!("Invalid {} command '{}': {}", stage, command_line, e))
        })?;

        if words.is_empty() {
            return Err(CaptionerError::Config(format!("No command configured for {}", stage)));
        }

        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            stage,
            verbose: false,
            timeout: None,
        })
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add `--name value`
    pub fn option<V: ToString>(self, name: &str, value: V) -> Self {
        self.arg(format!("--{}", name)).arg(value.to_string())
    }

    /// Stream the tool's stdout/stderr to the terminal instead of discarding them
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Kill the tool if it runs longer than `timeout`
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shell-quoted rendering of the full command line
    pub fn printable(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        shell_words::join(words)
    }

    /// Run to completion. Launch failures, timeouts and non-zero exits are stage failures.
    pub async fn execute(&self) -> Result<()> {
        info!("Running: {}", self.printable());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).stdin(Stdio::null()).kill_on_drop(true);

        if self.verbose {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        } else {
            cmd.stdout(Stdio::null()).stderr(Stdio::piped());
        }

        let child = cmd.spawn().map_err(|e| {
            CaptionerError::stage(self.stage, format!("failed to launch {}: {}", self.program, e))
        })?;

        let waiting = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, waiting).await.map_err(|_| {
                CaptionerError::stage(
                    self.stage,
                    format!("{} timed out after {:?}", self.program, limit),
                )
            })?,
            None => waiting.await,
        }
        .map_err(|e| {
            CaptionerError::stage(self.stage, format!("failed waiting for {}: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail = stderr_tail(&stderr);
            let cause = if tail.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                format!("{} exited with {}: {}", self.program, output.status, tail)
            };
            return Err(CaptionerError::stage(self.stage, cause));
        }

        debug!("{} finished", self.stage);
        Ok(())
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
