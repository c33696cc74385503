//! Runner module - Process execution abstraction layer
//!
//! This module provides a unified interface for running external programs
//! (compilers, interpreters, compiled submissions):
//! - `ProcessRunner`: spawns a local child process with a wall-clock limit
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Know which language a command belongs to
//! - Delete any files

pub mod process;
#[cfg(test)]
pub(crate) mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name (resolved through PATH)
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Working directory
    pub work_dir: Option<std::path::PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        let args: Vec<String> = iter.cloned().collect();
        Self {
            program,
            args,
            work_dir: None,
        }
    }

    /// Program and arguments joined for log lines
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Resource limits for execution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunLimits {
    /// Wall-clock limit in milliseconds
    pub time_ms: u32,
}

impl RunLimits {
    pub fn new(time_ms: u32) -> Self {
        Self { time_ms }
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            time_ms: crate::config::DEFAULT_RUN_TIME_LIMIT_MS,
        }
    }
}

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Program exited normally with given exit code
    Exited(i32),
    /// Wall-clock limit exceeded, process killed
    TimeLimitExceeded,
    /// Killed by signal
    Signaled(i32),
    /// Cancelled by the caller, process killed or never started
    Cancelled,
}

impl RunStatus {
    /// Check if execution was successful (exited with code 0)
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }

    /// Short human description, used when a program failed silently
    pub fn describe(&self) -> String {
        match self {
            RunStatus::Exited(code) => format!("exited with code {}", code),
            RunStatus::TimeLimitExceeded => "time limit exceeded".to_string(),
            RunStatus::Signaled(sig) => match nix::sys::signal::Signal::try_from(*sig) {
                Ok(signal) => format!("killed by signal {}", signal.as_str()),
                Err(_) => format!("killed by signal {}", sig),
            },
            RunStatus::Cancelled => "cancelled".to_string(),
        }
    }
}

/// Outcome of running a program
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code (-1 if not applicable)
    pub exit_code: i32,
    /// Wall-clock time in milliseconds
    pub time_ms: u32,
    /// Stdout content
    pub stdout: String,
    /// Stderr content
    pub stderr: String,
    /// Execution status
    pub status: RunStatus,
}

impl RunOutcome {
    /// Check if execution was successful
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Outcome with no output, for runs that were stopped or never started
    pub fn interrupted(status: RunStatus, time_ms: u32) -> Self {
        Self {
            exit_code: -1,
            time_ms,
            stdout: String::new(),
            stderr: String::new(),
            status,
        }
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command with the given limits and optional stdin.
    ///
    /// `Err` is reserved for failures to start or wait on the process (e.g.
    /// the program is not installed). Timeouts and cancellation are reported
    /// through [`RunStatus`].
    async fn run(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome>;
}

// Re-exports
pub use process::ProcessRunner;
