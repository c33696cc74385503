//! Entry point for running a submission against sample testcases

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::HarnessConfig;
use crate::error::HarnessResult;
use crate::judger::{self, JudgeLimits};
use crate::languages::LanguageRegistry;
use crate::materializer;
use crate::model::{RunRequest, RunResult};
use crate::runner::{ProcessRunner, RunLimits, Runner};
use crate::workspace::ScratchSpace;

/// Owns the scratch directory, language table and process runner.
///
/// Cheap to share behind an `Arc`; concurrent `run_tests` calls never touch
/// each other's files.
pub struct Harness {
    languages: LanguageRegistry,
    scratch: ScratchSpace,
    limits: JudgeLimits,
    runner: Arc<dyn Runner>,
}

impl Harness {
    pub fn new(config: &HarnessConfig, languages: LanguageRegistry) -> Self {
        Self {
            languages,
            scratch: ScratchSpace::new(&config.scratch_dir),
            limits: JudgeLimits {
                compile: RunLimits::new(config.compile_time_limit_ms),
                run: RunLimits::new(config.run_time_limit_ms),
            },
            runner: Arc::new(ProcessRunner::new()),
        }
    }

    /// Build from configuration, loading the language table it points at
    pub fn from_config(config: &HarnessConfig) -> anyhow::Result<Self> {
        let languages = LanguageRegistry::load(config.languages_config.as_deref())?;
        Ok(Self::new(config, languages))
    }

    /// Replace the process runner
    pub fn with_runner(mut self, runner: Arc<dyn Runner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Materialize the submission, run it against every testcase and clean up.
    ///
    /// `Err` only for failures before any testcase runs (unsupported
    /// language, undecodable payload, unusable scratch directory, failed
    /// write). Otherwise the result has exactly one entry per testcase, in
    /// order. Files created for the run are removed in every case.
    pub async fn run_tests(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> HarnessResult<RunResult> {
        let language = self
            .languages
            .resolve(request.language.as_deref(), request.file_name.as_deref())?;

        if request.test_cases.is_empty() {
            return Ok(Vec::new());
        }

        self.scratch.ensure().await?;
        let mut scratch = self.scratch.begin_run();
        info!(
            run_id = scratch.run_id(),
            language = %language.name,
            kind = %language.kind,
            testcases = request.test_cases.len(),
            "Starting run"
        );

        let result =
            match materializer::materialize(&mut scratch, &request.file_content, language).await {
                Ok(file) => Ok(judger::run_cases(
                    self.runner.as_ref(),
                    &mut scratch,
                    &file,
                    &request.test_cases,
                    &self.limits,
                    cancel,
                )
                .await),
                Err(e) => Err(e),
            };

        scratch.release().await;
        result
    }
}
