//! Sample Judge - runs a submission against a problem's sample testcases
//!
//! The core takes a transport-encoded source file, a language hint and an
//! ordered list of (input, expected output) pairs. It writes the source to a
//! scratch directory, compiles it once if the language needs it, runs it per
//! testcase with the input on stdin and returns one [`CaseResult`] per
//! testcase, in order.

pub mod config;
pub mod error;
pub mod fetch;
pub mod harness;
pub mod judger;
pub mod languages;
pub mod materializer;
pub mod model;
pub mod runner;
pub mod strategy;
pub mod workspace;

pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult};
pub use harness::Harness;
pub use model::{CaseResult, RunRequest, RunResult, TestCase, Verdict};
