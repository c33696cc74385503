//! Language strategies
//!
//! A closed set of ways to turn a materialized source file into something
//! that can be run once per testcase:
//! - `Compiled`: invoke a compiler once, then run the produced binary
//! - `Interpreted`: run an interpreter on the source file directly
//!
//! New languages are added through the language table; a new *kind* of
//! language means a new variant here.

use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::languages::{LanguageConfig, LanguageKind};
use crate::runner::{CommandSpec, RunLimits, RunOutcome, RunStatus, Runner};
use crate::workspace::RunScratch;

const SOURCE_PLACEHOLDER: &str = "{source}";
const ARTIFACT_PLACEHOLDER: &str = "{artifact}";

/// Result of one compile or execute attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Submission-wide: the compiler rejected the source
    CompileFailed { diagnostic: String },
    /// The program crashed, exited non-zero, or could not be started
    RuntimeFailed { diagnostic: String },
    /// The program was killed after exceeding its wall-clock limit
    TimedOut { limit_ms: u32 },
    /// The caller cancelled the run
    Cancelled,
    Completed { output: String },
}

/// Directly executable form of a submission
#[derive(Debug, Clone)]
pub struct PreparedArtifact {
    /// Compiled binary, or the source file itself for interpreted languages
    pub path: PathBuf,
    command: CommandSpec,
}

impl PreparedArtifact {
    pub fn command(&self) -> &CommandSpec {
        &self.command
    }
}

#[derive(Debug, Clone)]
pub struct CompiledStrategy {
    compile_command: Vec<String>,
    run_command: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InterpretedStrategy {
    run_command: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum LanguageStrategy {
    Compiled(CompiledStrategy),
    Interpreted(InterpretedStrategy),
}

impl LanguageStrategy {
    pub fn for_language(config: &LanguageConfig) -> Self {
        match config.kind {
            LanguageKind::Compiled => LanguageStrategy::Compiled(CompiledStrategy {
                compile_command: config.compile_command.clone().unwrap_or_default(),
                run_command: config.run_command.clone(),
            }),
            LanguageKind::Interpreted => LanguageStrategy::Interpreted(InterpretedStrategy {
                run_command: config.run_command.clone(),
            }),
        }
    }

    pub fn kind(&self) -> LanguageKind {
        match self {
            LanguageStrategy::Compiled(_) => LanguageKind::Compiled,
            LanguageStrategy::Interpreted(_) => LanguageKind::Interpreted,
        }
    }

    /// Produce the artifact to execute. Runs at most once per submission.
    ///
    /// On failure the returned outcome is either `CompileFailed` or
    /// `Cancelled`; it applies to every testcase of the run.
    pub async fn prepare(
        &self,
        runner: &dyn Runner,
        scratch: &mut RunScratch,
        source: &Path,
        limits: &RunLimits,
        cancel: &CancellationToken,
    ) -> Result<PreparedArtifact, ExecutionOutcome> {
        match self {
            LanguageStrategy::Interpreted(strategy) => Ok(PreparedArtifact {
                path: source.to_path_buf(),
                command: expand_command(&strategy.run_command, source, None),
            }),
            LanguageStrategy::Compiled(strategy) => {
                if strategy.compile_command.is_empty() {
                    return Err(ExecutionOutcome::CompileFailed {
                        diagnostic: "No compile command configured".to_string(),
                    });
                }

                let artifact = scratch.allocate(None);
                let compile =
                    expand_command(&strategy.compile_command, source, Some(&artifact));
                info!(run_id = scratch.run_id(), "Compiling: {}", compile.display());

                let outcome = match runner.run(&compile, limits, None, cancel).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        return Err(ExecutionOutcome::CompileFailed {
                            diagnostic: format!("Compilation failed: {:#}", e),
                        })
                    }
                };

                match outcome.status {
                    RunStatus::Exited(0) => {
                        debug!(time_ms = outcome.time_ms, "Compilation succeeded");
                        Ok(PreparedArtifact {
                            command: expand_command(
                                &strategy.run_command,
                                source,
                                Some(&artifact),
                            ),
                            path: artifact,
                        })
                    }
                    RunStatus::Cancelled => Err(ExecutionOutcome::Cancelled),
                    RunStatus::TimeLimitExceeded => Err(ExecutionOutcome::CompileFailed {
                        diagnostic: format!(
                            "Compilation timed out after {} ms",
                            limits.time_ms
                        ),
                    }),
                    _ => Err(ExecutionOutcome::CompileFailed {
                        diagnostic: format!("Compilation failed: {}", failure_detail(&outcome)),
                    }),
                }
            }
        }
    }

    /// Run the artifact once with `input` on stdin
    pub async fn execute(
        &self,
        runner: &dyn Runner,
        artifact: &PreparedArtifact,
        input: &str,
        limits: &RunLimits,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let outcome = match runner
            .run(&artifact.command, limits, Some(input), cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                return ExecutionOutcome::RuntimeFailed {
                    diagnostic: format!("Execution failed: {:#}", e),
                }
            }
        };

        match outcome.status {
            RunStatus::Exited(0) => ExecutionOutcome::Completed {
                output: outcome.stdout,
            },
            RunStatus::TimeLimitExceeded => ExecutionOutcome::TimedOut {
                limit_ms: limits.time_ms,
            },
            RunStatus::Cancelled => ExecutionOutcome::Cancelled,
            RunStatus::Exited(_) | RunStatus::Signaled(_) => ExecutionOutcome::RuntimeFailed {
                diagnostic: format!("Execution failed: {}", failure_detail(&outcome)),
            },
        }
    }
}

/// Captured error stream, or stdout, or a description of how the program ended
fn failure_detail(outcome: &RunOutcome) -> String {
    let stderr = outcome.stderr.trim_end();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = outcome.stdout.trim_end();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    format!("program {}", outcome.status.describe())
}

/// Substitute `{source}` / `{artifact}` in a command template. The command
/// runs from the directory containing the source file.
fn expand_command(template: &[String], source: &Path, artifact: Option<&Path>) -> CommandSpec {
    let source_str = source.to_string_lossy();
    let artifact_str = artifact.map(|a| a.to_string_lossy());

    let expanded: Vec<String> = template
        .iter()
        .map(|part| {
            let part = part.replace(SOURCE_PLACEHOLDER, &source_str);
            match &artifact_str {
                Some(artifact) => part.replace(ARTIFACT_PLACEHOLDER, artifact),
                None => part,
            }
        })
        .collect();

    let cmd = CommandSpec::from_vec(&expanded);
    match source.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => cmd.with_work_dir(dir),
        _ => cmd,
    }
}
