//! Host bridge for an editor panel
//!
//! Reads one JSON request per line on stdin and answers with one JSON
//! response per line on stdout. Logs go to stderr.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sample_judge::fetch::ProblemFetcher;
use sample_judge::{CaseResult, Harness, HarnessConfig, RunRequest, TestCase};

/// Request sent by the panel
#[derive(Debug, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum HostRequest {
    /// Scrape sample testcases from a problem URL
    FetchTestCases { url: String },
    /// Run a submission against testcases
    RunTestCases(RunRequest),
}

/// Response rendered by the panel
#[derive(Debug, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum HostResponse {
    DisplayTestCases { test_cases: Vec<TestCase> },
    DisplayRunResults { results: Vec<CaseResult> },
    ShowError { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_judge=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();

    let config = HarnessConfig::from_env()?;
    let harness = Harness::from_config(&config)?;
    info!(
        "Loaded language configurations: {:?}",
        harness.languages().names()
    );
    info!("Scratch directory: {}", config.scratch_dir.display());

    let fetcher = ProblemFetcher::new(config.problem_api_endpoint.clone());

    // Cancels the in-flight run and stops the loop
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received shutdown signal, cancelling");
                shutdown.cancel();
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    info!("Waiting for requests...");

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = shutdown.cancelled() => break,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<HostRequest>(&line) {
            Ok(request) => handle_request(request, &harness, &fetcher, &shutdown).await,
            Err(e) => {
                warn!("Failed to parse request: {}", e);
                HostResponse::ShowError {
                    message: format!("Invalid request: {}", e),
                }
            }
        };

        let mut payload = serde_json::to_string(&response)?;
        payload.push('\n');
        stdout.write_all(payload.as_bytes()).await?;
        stdout.flush().await?;
    }

    info!("Judge host shutdown complete");
    Ok(())
}

async fn handle_request(
    request: HostRequest,
    harness: &Harness,
    fetcher: &ProblemFetcher,
    shutdown: &CancellationToken,
) -> HostResponse {
    match request {
        HostRequest::FetchTestCases { url } => match fetcher.fetch_test_cases(&url).await {
            Ok(test_cases) => HostResponse::DisplayTestCases { test_cases },
            Err(e) => {
                error!("Failed to fetch test cases from {}: {:#}", url, e);
                HostResponse::ShowError {
                    message: "Unable to fetch test cases. Please check the URL.".to_string(),
                }
            }
        },
        HostRequest::RunTestCases(request) => {
            if request.test_cases.is_empty() {
                return HostResponse::ShowError {
                    message: "No test cases available to run!".to_string(),
                };
            }

            info!(
                "Received run request: file={}, language={}, testcases={}",
                request.file_name.as_deref().unwrap_or("-"),
                request.language.as_deref().unwrap_or("-"),
                request.test_cases.len()
            );

            match harness.run_tests(&request, &shutdown.child_token()).await {
                Ok(results) => HostResponse::DisplayRunResults { results },
                Err(e) => {
                    error!("Run failed: {}", e);
                    HostResponse::ShowError {
                        message: e.to_string(),
                    }
                }
            }
        }
    }
}
