//! Harness configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the binary).

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::warn;

/// Default per-case wall-clock limit
pub const DEFAULT_RUN_TIME_LIMIT_MS: u32 = 5_000;
/// Default compile wall-clock limit
pub const DEFAULT_COMPILE_TIME_LIMIT_MS: u32 = 30_000;
/// Default problem API endpoint used by the fetcher
pub const DEFAULT_PROBLEM_API_ENDPOINT: &str = "https://leetcode.com/graphql/";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Directory holding transient sources and compiled artifacts
    pub scratch_dir: PathBuf,
    /// Per-case run time limit in milliseconds (default: 5000ms)
    pub run_time_limit_ms: u32,
    /// Compile time limit in milliseconds (default: 30000ms = 30s)
    pub compile_time_limit_ms: u32,
    /// Optional languages TOML overriding the embedded table
    pub languages_config: Option<PathBuf>,
    /// GraphQL endpoint for problem statements
    pub problem_api_endpoint: String,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            scratch_dir: std::env::temp_dir().join("sample-judge"),
            run_time_limit_ms: DEFAULT_RUN_TIME_LIMIT_MS,
            compile_time_limit_ms: DEFAULT_COMPILE_TIME_LIMIT_MS,
            languages_config: None,
            problem_api_endpoint: DEFAULT_PROBLEM_API_ENDPOINT.to_string(),
        }
    }
}

impl HarnessConfig {
    /// Build configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("JUDGE_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Some(ms) = parse_limit_var("JUDGE_RUN_TIME_LIMIT_MS")? {
            config.run_time_limit_ms = ms;
        }
        if let Some(ms) = parse_limit_var("JUDGE_COMPILE_TIME_LIMIT_MS")? {
            config.compile_time_limit_ms = ms;
        }
        config.languages_config = std::env::var("LANGUAGES_CONFIG").ok().map(PathBuf::from);
        if let Ok(endpoint) = std::env::var("PROBLEM_API_ENDPOINT") {
            config.problem_api_endpoint = endpoint;
        }

        Ok(config)
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_run_time_limit_ms(mut self, ms: u32) -> Self {
        self.run_time_limit_ms = ms;
        self
    }

    pub fn with_compile_time_limit_ms(mut self, ms: u32) -> Self {
        self.compile_time_limit_ms = ms;
        self
    }
}

fn parse_limit_var(name: &str) -> Result<Option<u32>> {
    let raw = match std::env::var(name) {
        Ok(raw) => raw,
        Err(_) => return Ok(None),
    };
    let ms = raw
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid value for {}: {}", name, raw))?;
    if ms == 0 {
        warn!("{} is 0, keeping the default limit", name);
        return Ok(None);
    }
    Ok(Some(ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let config = HarnessConfig::default();
        assert_eq!(config.run_time_limit_ms, 5_000);
        assert_eq!(config.compile_time_limit_ms, 30_000);
        assert!(config.scratch_dir.ends_with("sample-judge"));
        assert!(config.languages_config.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = HarnessConfig::default()
            .with_scratch_dir("/tmp/elsewhere")
            .with_run_time_limit_ms(250)
            .with_compile_time_limit_ms(1000);
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/elsewhere"));
        assert_eq!(config.run_time_limit_ms, 250);
        assert_eq!(config.compile_time_limit_ms, 1000);
    }

    #[test]
    fn test_parse_limit_var_missing() {
        assert_eq!(
            parse_limit_var("SAMPLE_JUDGE_SURELY_UNSET_VARIABLE").unwrap(),
            None
        );
    }
}
