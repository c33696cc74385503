//! Local process runner
//!
//! Spawns programs directly on the host. No sandboxing beyond a wall-clock
//! limit and kill-on-cancel.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{CommandSpec, RunLimits, RunOutcome, RunStatus, Runner};

/// Runner that executes programs as plain child processes
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::interrupted(RunStatus::Cancelled, 0));
        }

        debug!("Running: {} (limit {}ms)", cmd.display(), limits.time_ms);

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }

        let start = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", cmd.program))?;

        // Feed stdin concurrently so a program that writes before reading
        // cannot deadlock against a full pipe.
        let feeder = match (stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => {
                let input = input.to_owned();
                Some(tokio::spawn(async move {
                    if let Err(e) = pipe.write_all(input.as_bytes()).await {
                        debug!("Program stopped reading stdin: {}", e);
                    }
                }))
            }
            _ => None,
        };

        let limit = Duration::from_millis(u64::from(limits.time_ms));
        // Dropping the wait future drops the child, which kills it.
        let waited = tokio::select! {
            waited = tokio::time::timeout(limit, child.wait_with_output()) => Some(waited),
            _ = cancel.cancelled() => None,
        };
        let time_ms = u32::try_from(start.elapsed().as_millis()).unwrap_or(u32::MAX);

        if let Some(feeder) = feeder {
            feeder.abort();
        }

        let output = match waited {
            None => {
                debug!("Cancelled: {}", cmd.display());
                return Ok(RunOutcome::interrupted(RunStatus::Cancelled, time_ms));
            }
            Some(Err(_)) => {
                debug!("Timed out after {}ms: {}", time_ms, cmd.display());
                return Ok(RunOutcome::interrupted(
                    RunStatus::TimeLimitExceeded,
                    time_ms,
                ));
            }
            Some(Ok(output)) => output.context("Failed to wait for program")?,
        };

        let status = match (output.status.code(), output.status.signal()) {
            (Some(code), _) => RunStatus::Exited(code),
            (None, Some(sig)) => RunStatus::Signaled(sig),
            (None, None) => RunStatus::Exited(-1),
        };

        Ok(RunOutcome {
            exit_code: output.status.code().unwrap_or(-1),
            time_ms,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_echoes_stdin() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run(
                &CommandSpec::new("cat"),
                &RunLimits::default(),
                Some("3 4\n"),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.stdout, "3 4\n");
        assert_eq!(outcome.exit_code, 0);
    }

    #[tokio::test]
    async fn test_nonzero_exit_and_stderr() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run(
                &sh("echo boom >&2; exit 3"),
                &RunLimits::default(),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Exited(3));
        assert_eq!(outcome.stderr.trim(), "boom");
    }

    #[tokio::test]
    async fn test_signal_reported() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run(
                &sh("kill -9 $$"),
                &RunLimits::default(),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Signaled(9));
    }

    #[tokio::test]
    async fn test_time_limit() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run(
                &CommandSpec::new("sleep").with_args(["5"]),
                &RunLimits::new(200),
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::TimeLimitExceeded);
        assert!(outcome.time_ms < 5_000);
    }

    #[tokio::test]
    async fn test_cancel_kills_running_child() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let outcome = runner
            .run(
                &CommandSpec::new("sleep").with_args(["5"]),
                &RunLimits::new(10_000),
                None,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled);
        assert!(outcome.time_ms < 5_000);
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let runner = ProcessRunner::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = runner
            .run(
                &CommandSpec::new("definitely-not-a-real-program"),
                &RunLimits::default(),
                None,
                &cancel,
            )
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let runner = ProcessRunner::new();
        let result = runner
            .run(
                &CommandSpec::new("definitely-not-a-real-program"),
                &RunLimits::default(),
                None,
                &CancellationToken::new(),
            )
            .await;
        tokio_test::assert_err!(result);
    }

    #[tokio::test]
    async fn test_large_input_and_program_ignoring_stdin() {
        let runner = ProcessRunner::new();
        let input = "x".repeat(1 << 20);

        let echoed = runner
            .run(
                &CommandSpec::new("cat"),
                &RunLimits::default(),
                Some(&input),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(echoed.stdout.len(), input.len());

        let ignored = runner
            .run(
                &sh("echo done"),
                &RunLimits::default(),
                Some(&input),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(ignored.is_success());
        assert_eq!(ignored.stdout, "done\n");
    }
}
