//! Scripted runner for tests: records every command and answers from a closure

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::{CommandSpec, RunLimits, RunOutcome, RunStatus, Runner};

type Responder = dyn Fn(&CommandSpec, Option<&str>) -> Result<RunOutcome> + Send + Sync;

/// A recorded invocation: the command and the stdin it was given
#[derive(Debug, Clone)]
pub struct Call {
    pub cmd: CommandSpec,
    pub stdin: Option<String>,
}

pub struct ScriptedRunner {
    calls: Mutex<Vec<Call>>,
    respond: Box<Responder>,
}

impl ScriptedRunner {
    pub fn new(
        respond: impl Fn(&CommandSpec, Option<&str>) -> Result<RunOutcome> + Send + Sync + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        _limits: &RunLimits,
        stdin: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        if cancel.is_cancelled() {
            return Ok(RunOutcome::interrupted(RunStatus::Cancelled, 0));
        }
        self.calls.lock().unwrap().push(Call {
            cmd: cmd.clone(),
            stdin: stdin.map(str::to_owned),
        });
        (self.respond)(cmd, stdin)
    }
}

/// Outcome of a program that exited on its own
pub fn exited(code: i32, stdout: &str, stderr: &str) -> RunOutcome {
    RunOutcome {
        exit_code: code,
        time_ms: 1,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        status: RunStatus::Exited(code),
    }
}
