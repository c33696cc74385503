//! Judger module - runs a materialized submission against its testcases
//!
//! Compiles at most once, then executes the artifact per testcase in order.
//! A compile failure fails every case with the same diagnostic; a failing
//! case never stops the ones after it.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::materializer::MaterializedFile;
use crate::model::{CaseResult, RunResult, TestCase, Verdict};
use crate::runner::{RunLimits, Runner};
use crate::strategy::{ExecutionOutcome, LanguageStrategy};
use crate::workspace::RunScratch;

/// Prefix of every synthesized diagnostic in `actual_output`
pub const ERROR_PREFIX: &str = "Error: ";

/// Wall-clock limits for one run
#[derive(Debug, Clone, Copy)]
pub struct JudgeLimits {
    pub compile: RunLimits,
    pub run: RunLimits,
}

/// Run every testcase against `file`, returning one result per case in order.
pub async fn run_cases(
    runner: &dyn Runner,
    scratch: &mut RunScratch,
    file: &MaterializedFile,
    cases: &[TestCase],
    limits: &JudgeLimits,
    cancel: &CancellationToken,
) -> RunResult {
    if cases.is_empty() {
        return Vec::new();
    }

    let strategy = LanguageStrategy::for_language(&file.language);

    let artifact = match strategy
        .prepare(runner, scratch, &file.path, &limits.compile, cancel)
        .await
    {
        Ok(artifact) => artifact,
        Err(outcome) => {
            warn!(
                run_id = scratch.run_id(),
                language = %file.language.name,
                "Submission could not be prepared; all {} testcases fail",
                cases.len()
            );
            return cases
                .iter()
                .map(|case| judge_case(case, outcome.clone()))
                .collect();
        }
    };

    let mut results = Vec::with_capacity(cases.len());
    for (idx, case) in cases.iter().enumerate() {
        let outcome = if cancel.is_cancelled() {
            ExecutionOutcome::Cancelled
        } else {
            strategy
                .execute(runner, &artifact, &case.input, &limits.run, cancel)
                .await
        };

        let result = judge_case(case, outcome);
        debug!(
            run_id = scratch.run_id(),
            testcase = idx + 1,
            verdict = %result.verdict,
            "Testcase judged"
        );
        results.push(result);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    info!(
        run_id = scratch.run_id(),
        language = %file.language.name,
        "Run summary: {}/{} passed",
        passed,
        results.len()
    );

    results
}

/// Turn one execution outcome into the caller-facing result
pub fn judge_case(case: &TestCase, outcome: ExecutionOutcome) -> CaseResult {
    let (actual_output, verdict) = match outcome {
        ExecutionOutcome::Completed { output } => {
            let verdict = if compare_output(&output, &case.expected_output) {
                Verdict::Accepted
            } else {
                Verdict::WrongAnswer
            };
            (output.trim().to_string(), verdict)
        }
        ExecutionOutcome::CompileFailed { diagnostic } => {
            (format!("{}{}", ERROR_PREFIX, diagnostic), Verdict::CompileError)
        }
        ExecutionOutcome::RuntimeFailed { diagnostic } => {
            (format!("{}{}", ERROR_PREFIX, diagnostic), Verdict::RuntimeError)
        }
        ExecutionOutcome::TimedOut { limit_ms } => (
            format!("{}Time limit exceeded ({} ms)", ERROR_PREFIX, limit_ms),
            Verdict::TimeLimitExceeded,
        ),
        ExecutionOutcome::Cancelled => {
            (format!("{}Run cancelled", ERROR_PREFIX), Verdict::Skipped)
        }
    };

    CaseResult {
        input: case.input.clone(),
        expected_output: case.expected_output.clone(),
        actual_output,
        passed: verdict == Verdict::Accepted,
        verdict,
    }
}

/// Compare program output with expected output.
///
/// Exact match after trimming surrounding whitespace; whitespace inside the
/// output is significant.
pub fn compare_output(actual: &str, expected: &str) -> bool {
    actual.trim() == expected.trim()
}
