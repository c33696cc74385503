use serde::{Deserialize, Serialize};
use std::fmt;

/// One sample: the stdin to feed and the stdout expected back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    #[serde(rename = "output", alias = "expectedOutput", alias = "expected_output")]
    pub expected_output: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Verdict of a single testcase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    CompileError,
    RuntimeError,
    TimeLimitExceeded,
    Skipped,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::WrongAnswer => "wrong_answer",
            Verdict::CompileError => "compile_error",
            Verdict::RuntimeError => "runtime_error",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::Skipped => "skipped",
        };
        write!(f, "{}", s)
    }
}

/// Result of running the submission against one testcase.
///
/// `actual_output` is the trimmed program output, or a diagnostic starting
/// with `Error: ` when the case did not complete. `passed` is authoritative;
/// callers should not re-derive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub passed: bool,
    pub verdict: Verdict,
}

/// One result per submitted testcase, in submission order
pub type RunResult = Vec<CaseResult>;

/// Everything needed for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Base64-encoded source file
    #[serde(alias = "fileContent")]
    pub file_content: String,
    /// Language name, alias, suffix, or `compiled` / `interpreted`
    #[serde(default)]
    pub language: Option<String>,
    /// Original file name; its suffix picks the language when no tag is given
    #[serde(default, alias = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, alias = "testCases")]
    pub test_cases: Vec<TestCase>,
}
