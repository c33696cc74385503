//! Errors that abort a run before any testcase executes
//!
//! Anything that goes wrong *while* cases execute is not an error: it is
//! captured as an [`ExecutionOutcome`](crate::strategy::ExecutionOutcome) and
//! lands in the returned result set.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    /// Scratch directory missing and could not be created
    #[error("scratch directory {} is unusable: {source}", .path.display())]
    Environment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode submission payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to write submission to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),
}

pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
